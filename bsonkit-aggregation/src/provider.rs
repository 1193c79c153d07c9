//! Codec provider for expressions, filters and stages.

use std::any::TypeId;
use std::collections::HashMap;

use bsonkit_codec::{
    CodecHandle, CodecProvider, CodecRegistry, CodecResult, Encoder, MappingConfig,
    ValueCodecProvider,
};
use tracing::debug;

use crate::expression::{Expression, ExpressionCodec};
use crate::filters::{Filter, FilterCodec, Point, PointCodec};
use crate::pipeline::{AggregationPipeline, PipelineCodec};
use crate::stages::{
    AddFields, CollectionStats, Count, CurrentOp, Facet, Group, Limit, Lookup, Match, Merge, Out,
    PlanCacheStats, Projection, Redact, ReplaceRoot, ReplaceWith, Sample, Set, Skip, Sort, Stage,
    StageCodec, Unset, Unwind,
};

/// Supplies encoders for [`Expression`], [`Filter`], [`Point`],
/// [`AggregationPipeline`] and every built-in stage.
///
/// Values held inside expressions and filters are delegated back to the
/// registry, so this provider is chained with a [`ValueCodecProvider`].
#[derive(Debug, Clone)]
pub struct AggregationCodecProvider {
    codecs: HashMap<TypeId, CodecHandle>,
}

impl Default for AggregationCodecProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationCodecProvider {
    /// Every built-in encoder.
    pub fn new() -> Self {
        let mut provider = Self {
            codecs: HashMap::new(),
        };
        provider.install::<Expression, _>(ExpressionCodec);
        provider.install::<Filter, _>(FilterCodec);
        provider.install::<Point, _>(PointCodec);
        provider.install::<AggregationPipeline, _>(PipelineCodec);

        provider.install_stage::<Match>();
        provider.install_stage::<Projection>();
        provider.install_stage::<Sort>();
        provider.install_stage::<Limit>();
        provider.install_stage::<Skip>();
        provider.install_stage::<Group>();
        provider.install_stage::<AddFields>();
        provider.install_stage::<Set>();
        provider.install_stage::<Unset>();
        provider.install_stage::<ReplaceRoot>();
        provider.install_stage::<ReplaceWith>();
        provider.install_stage::<Unwind>();
        provider.install_stage::<Lookup>();
        provider.install_stage::<Count>();
        provider.install_stage::<Facet>();
        provider.install_stage::<Merge>();
        provider.install_stage::<Out>();
        provider.install_stage::<Redact>();
        provider.install_stage::<Sample>();
        provider.install_stage::<CollectionStats>();
        provider.install_stage::<CurrentOp>();
        provider.install_stage::<PlanCacheStats>();
        provider
    }

    /// Register a user-defined stage type.
    pub fn with_stage<S: Stage>(mut self) -> Self {
        self.install_stage::<S>();
        self
    }

    /// Replace the encoder for `T`.
    pub fn with_encoder<T, E>(mut self, encoder: E) -> Self
    where
        T: 'static,
        E: Encoder<T> + 'static,
    {
        self.install::<T, E>(encoder);
        self
    }

    fn install_stage<S: Stage>(&mut self) {
        self.install::<S, _>(StageCodec::<S>::new());
    }

    fn install<T, E>(&mut self, encoder: E)
    where
        T: 'static,
        E: Encoder<T> + 'static,
    {
        self.codecs
            .insert(TypeId::of::<T>(), CodecHandle::of_encoder::<T, E>(encoder));
    }
}

impl CodecProvider for AggregationCodecProvider {
    fn get(&self, type_id: TypeId, _registry: &CodecRegistry) -> Option<CodecHandle> {
        self.codecs.get(&type_id).cloned()
    }

    fn name(&self) -> &'static str {
        "AggregationCodecProvider"
    }
}

/// A registry with the aggregation encoders and the default value codecs.
pub fn aggregation_registry() -> CodecRegistry {
    CodecRegistry::builder()
        .provider(AggregationCodecProvider::new())
        .provider(ValueCodecProvider::new())
        .build()
}

/// A registry with the aggregation encoders and value codecs rebound as
/// `config` asks.
pub fn aggregation_registry_with_config(config: &MappingConfig) -> CodecResult<CodecRegistry> {
    let registry = CodecRegistry::builder()
        .provider(AggregationCodecProvider::new())
        .provider(ValueCodecProvider::from_config(config)?)
        .build();
    debug!("Built aggregation registry from config");
    Ok(registry)
}
