//! Aggregation pipelines.
//!
//! An [`AggregationPipeline`] is an ordered list of boxed stages. Encoding
//! turns each stage into one document through the codec registered for its
//! runtime type; the documents are what a database client's `aggregate`
//! takes.
//!
//! ```rust
//! use bsonkit_aggregation::{AggregationPipeline, aggregation_registry, filters};
//! use bsonkit_aggregation::expression::{field, value};
//! use bsonkit_aggregation::operators::accumulators::sum;
//! use bsonkit_aggregation::stages::{Group, Sort};
//! use bson::doc;
//!
//! let pipeline = AggregationPipeline::new()
//!     .match_filters(vec![filters::eq("status", "active")])
//!     .group(Group::by_field("dept").field("headcount", sum(value(1))))
//!     .sort(Sort::new().descending("headcount"));
//!
//! let documents = pipeline.to_documents(&aggregation_registry()).unwrap();
//! assert_eq!(documents, vec![
//!     doc! { "$match": { "status": { "$eq": "active" } } },
//!     doc! { "$group": { "_id": "$dept", "headcount": { "$sum": 1 } } },
//!     doc! { "$sort": { "headcount": -1 } },
//! ]);
//! ```

use bson::{Bson, Document};
use bsonkit_codec::{CodecRegistry, CodecResult, DocumentWriter, Encoder, EncoderContext};
use tracing::{debug, trace};

use crate::error::AggregationResult;
use crate::filters::Filter;
use crate::stages::{
    AddFields, Count, Group, Limit, Lookup, Match, Projection, Skip, Sort, Stage, Unwind,
    encode_stage, write_stages,
};

/// An ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct AggregationPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl AggregationPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn stage<S: Stage>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append an already boxed stage.
    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Append a `$match` stage.
    pub fn match_filters(self, filters: Vec<Filter>) -> Self {
        self.stage(Match::filters(filters))
    }

    /// Append a `$project` stage.
    pub fn project(self, projection: Projection) -> Self {
        self.stage(projection)
    }

    /// Append a `$group` stage.
    pub fn group(self, group: Group) -> Self {
        self.stage(group)
    }

    /// Append a `$sort` stage.
    pub fn sort(self, sort: Sort) -> Self {
        self.stage(sort)
    }

    /// Append a `$limit` stage.
    pub fn limit(self, limit: i64) -> AggregationResult<Self> {
        Ok(self.stage(Limit::new(limit)?))
    }

    /// Append a `$skip` stage.
    pub fn skip(self, skip: u64) -> AggregationResult<Self> {
        Ok(self.stage(Skip::new(skip)?))
    }

    /// Append a `$lookup` stage.
    pub fn lookup(self, lookup: Lookup) -> Self {
        self.stage(lookup)
    }

    /// Append an `$unwind` stage on `path`.
    pub fn unwind(self, path: impl Into<String>) -> Self {
        self.stage(Unwind::new(path))
    }

    /// Append an `$addFields` stage.
    pub fn add_fields(self, fields: AddFields) -> Self {
        self.stage(fields)
    }

    /// Append a `$count` stage.
    pub fn count(self, field: impl Into<String>) -> AggregationResult<Self> {
        Ok(self.stage(Count::new(field)?))
    }

    /// The stages, in order.
    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Encode each stage to one document.
    pub fn to_documents(&self, registry: &CodecRegistry) -> CodecResult<Vec<Document>> {
        let ctx = EncoderContext::new(registry);
        let documents = self
            .stages
            .iter()
            .map(|stage| {
                trace!(stage = stage.stage_name(), "Encoding stage");
                let mut writer = DocumentWriter::new();
                encode_stage(&mut writer, &**stage, &ctx)?;
                writer.finish()
            })
            .collect::<CodecResult<Vec<_>>>()?;
        debug!(stages = documents.len(), "Encoded aggregation pipeline");
        Ok(documents)
    }

    /// Encode the pipeline as an array of stage documents.
    pub fn to_bson(&self, registry: &CodecRegistry) -> CodecResult<Bson> {
        Ok(Bson::Array(
            self.to_documents(registry)?
                .into_iter()
                .map(Bson::Document)
                .collect(),
        ))
    }
}

impl Extend<Box<dyn Stage>> for AggregationPipeline {
    fn extend<I: IntoIterator<Item = Box<dyn Stage>>>(&mut self, iter: I) {
        self.stages.extend(iter);
    }
}

/// Codec writing a pipeline as an array of stage documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineCodec;

impl Encoder<AggregationPipeline> for PipelineCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &AggregationPipeline,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        write_stages(writer, value.stages(), ctx)
    }
}
