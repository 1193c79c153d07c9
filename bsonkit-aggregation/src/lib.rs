//! # bsonkit-aggregation
//!
//! Typed builders for query filters, sort specifications, projections,
//! aggregation expressions and pipeline stages, encoded to BSON through a
//! [`bsonkit_codec::CodecRegistry`].
//!
//! This crate provides:
//! - [`filters`] for query conditions and [`Query`] for find operations
//! - [`Expression`] trees and the [`operators`] that build them
//! - [`stages`] and [`AggregationPipeline`]
//! - [`AggregationCodecProvider`], which registers an encoder for each of
//!   the above
//!
//! Literal values inside filters and expressions are encoded with whatever
//! codec the registry holds for their type, so representation overrides in
//! a [`bsonkit_codec::MappingConfig`] apply to them too.
//!
//! ## Example
//!
//! ```rust
//! use bsonkit_aggregation::prelude::*;
//! use bsonkit_aggregation::operators::accumulators::sum;
//!
//! let pipeline = AggregationPipeline::new()
//!     .match_filters(vec![filters::gte("age", 18)])
//!     .group(Group::by_field("city").field("adults", sum(value(1))))
//!     .sort(stages::Sort::new().descending("adults"))
//!     .limit(3)
//!     .unwrap();
//!
//! let documents = pipeline.to_documents(&aggregation_registry()).unwrap();
//! assert_eq!(documents[0], doc! { "$match": { "age": { "$gte": 18 } } });
//! assert_eq!(documents[3], doc! { "$limit": 3i64 });
//! ```

pub mod error;
pub mod expression;
pub mod filters;
pub mod operators;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod stages;

pub use error::{AggregationError, AggregationResult};
pub use expression::{Expression, ExpressionCodec};
pub use filters::{Filter, FilterCodec, Point};
pub use pipeline::AggregationPipeline;
pub use provider::{AggregationCodecProvider, aggregation_registry, aggregation_registry_with_config};
pub use query::{Direction, Query, QueryDocuments, Sort};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{AggregationError, AggregationResult};
    pub use crate::expression::{Expression, field, literal, value};
    pub use crate::filters::{self, Filter};
    pub use crate::pipeline::AggregationPipeline;
    pub use crate::provider::{AggregationCodecProvider, aggregation_registry};
    pub use crate::query::{Direction, Query, Sort};
    pub use crate::stages::{self, Group, Lookup, Match, Projection, Stage, Unwind};
    pub use bson::{Bson, Document, doc};
}
