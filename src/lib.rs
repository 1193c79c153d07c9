//! # bsonkit
//!
//! Typed BSON document building and encoding for query and aggregation DSLs.
//!
//! bsonkit provides:
//! - An incremental document writer that rejects unbalanced or misplaced
//!   calls as they happen
//! - A codec registry that dispatches on runtime type, with chained providers
//!   and configurable wire representations
//! - Builders for query filters, sorts, projections, aggregation expressions
//!   and pipeline stages, encoded through that registry
//!
//! ## Quick Start
//!
//! ```rust
//! use bsonkit::prelude::*;
//!
//! let registry = aggregation_registry();
//!
//! let query = Query::new()
//!     .filter(filters::eq("status", "active"))
//!     .sort(Sort::ascending("name"))
//!     .sort(Sort::descending("age"));
//! let documents = query.encode(&registry).unwrap();
//! assert_eq!(documents.sort, Some(doc! { "name": 1, "age": -1 }));
//!
//! let pipeline = AggregationPipeline::new()
//!     .match_filters(vec![filters::exists("email", true)])
//!     .unwind("tags");
//! assert_eq!(
//!     pipeline.to_documents(&registry).unwrap(),
//!     vec![
//!         doc! { "$match": { "email": { "$exists": true } } },
//!         doc! { "$unwind": "$tags" },
//!     ]
//! );
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Document writer, codec registry and value codecs.
pub mod codec {
    pub use bsonkit_codec::*;
}

/// Expressions, filters, stages and pipelines.
pub mod aggregation {
    pub use bsonkit_aggregation::*;
}

pub use bsonkit_codec::logging;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use bsonkit_aggregation::prelude::*;
    pub use bsonkit_codec::prelude::*;
}

// Re-export key types at the crate root
pub use bsonkit_aggregation::{
    AggregationCodecProvider, AggregationError, AggregationPipeline, Expression, Filter, Query,
    aggregation_registry,
};
pub use bsonkit_codec::{
    BsonType, CodecError, CodecRegistry, CodecResult, DocumentReader, DocumentWriter,
    MappingConfig,
};
