//! Aggregation pipeline stages.
//!
//! Every stage is a plain struct implementing [`Stage`]. A stage is encoded
//! as `{ <operator>: <body> }` by the [`StageCodec`] registered for its type,
//! so pipelines dispatch on the runtime type of each boxed stage and a
//! caller can replace the codec of any single stage.
//!
//! ```rust
//! use bsonkit_aggregation::aggregation_registry;
//! use bsonkit_aggregation::stages::Sort;
//! use bson::doc;
//!
//! let sort = Sort::new().ascending("name").descending("age");
//! assert_eq!(
//!     aggregation_registry().encode_to_document(&sort).unwrap(),
//!     doc! { "$sort": { "name": 1, "age": -1 } }
//! );
//! ```

mod diagnostics;
mod filtering;
mod grouping;
mod lookup;
mod output;
mod shaping;

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use bsonkit_codec::{CodecResult, DocumentWriter, DynValue, Encoder, EncoderContext};

pub use diagnostics::{CollectionStats, CurrentOp, PlanCacheStats};
pub use filtering::{Count, Limit, Match, Redact, Sample, Skip};
pub use grouping::{Facet, Group, Sort};
pub use lookup::Lookup;
pub use output::{Merge, Out, WhenMatched, WhenNotMatched};
pub use shaping::{AddFields, Projection, ReplaceRoot, ReplaceWith, Set, Unset, Unwind};

/// One stage of an aggregation pipeline.
pub trait Stage: DynValue + StageClone {
    /// The stage operator, including its `$`.
    fn stage_name(&self) -> &'static str;

    /// Write the value bound to the operator field.
    fn encode_body(&self, writer: &mut DocumentWriter, ctx: &EncoderContext<'_>)
    -> CodecResult<()>;
}

/// Cloning for boxed stages.
pub trait StageClone {
    /// Clone into a new box.
    fn clone_stage(&self) -> Box<dyn Stage>;
}

impl<T: Stage + Clone> StageClone for T {
    fn clone_stage(&self) -> Box<dyn Stage> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Stage> {
    fn clone(&self) -> Self {
        (**self).clone_stage()
    }
}

/// Codec writing a stage as `{ <operator>: <body> }`.
pub struct StageCodec<S>(PhantomData<fn() -> S>);

impl<S> StageCodec<S> {
    /// Create the codec.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S> Default for StageCodec<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for StageCodec<S> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for StageCodec<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageCodec<{}>", std::any::type_name::<S>())
    }
}

impl<S: Stage> Encoder<S> for StageCodec<S> {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &S,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.write_document(|w| {
            w.write_name(value.stage_name())?;
            value.encode_body(w, ctx)
        })
    }
}

/// Encode a boxed stage with the codec registered for its runtime type.
pub fn encode_stage(
    writer: &mut DocumentWriter,
    stage: &dyn Stage,
    ctx: &EncoderContext<'_>,
) -> CodecResult<()> {
    let any = stage.as_any();
    ctx.registry()
        .get(Any::type_id(any), stage.type_name())?
        .encode_any(writer, any, ctx)
}

/// Write `stages` as an array of stage documents.
pub(crate) fn write_stages(
    writer: &mut DocumentWriter,
    stages: &[Box<dyn Stage>],
    ctx: &EncoderContext<'_>,
) -> CodecResult<()> {
    writer.write_array(|w| {
        for stage in stages {
            encode_stage(w, &**stage, ctx)?;
        }
        Ok(())
    })
}
