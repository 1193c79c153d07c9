//! # bsonkit-codec
//!
//! Incremental BSON document building and type-directed encoding.
//!
//! This crate provides:
//! - A write-state stack machine that enforces legal nesting while a document
//!   is built token by token
//! - [`DocumentWriter`], the facade encoders write to, and its decoding dual
//!   [`DocumentReader`]
//! - [`CodecRegistry`], which picks a codec by runtime type, with provider
//!   chaining and a concurrent lookup cache
//! - Leaf codecs whose wire representation can be rebound per type
//! - [`MappingConfig`] for configuring those representations
//!
//! ## Writing documents
//!
//! ```rust
//! use bsonkit_codec::DocumentWriter;
//! use bson::doc;
//!
//! let mut writer = DocumentWriter::new();
//! writer
//!     .write_document(|w| {
//!         w.write_string_named("name", "Alice")?;
//!         w.write_array_named("scores", |w| {
//!             w.write_int32(90)?;
//!             w.write_int32(85)
//!         })
//!     })
//!     .unwrap();
//!
//! assert_eq!(writer.into_document(), Some(doc! { "name": "Alice", "scores": [90, 85] }));
//! ```
//!
//! ## Encoding typed values
//!
//! ```rust
//! use bsonkit_codec::{BsonType, CodecRegistry, MappingConfig};
//! use bson::Bson;
//!
//! let config = MappingConfig::builder()
//!     .integer_representation(BsonType::String)
//!     .build();
//! let registry = CodecRegistry::from_config(&config).unwrap();
//!
//! assert_eq!(registry.encode_to_bson(&7i16).unwrap(), Bson::String("7".into()));
//! assert_eq!(registry.decode_bson::<i16>(Bson::String("7".into())).unwrap(), 7);
//! ```

pub mod codec;
pub mod codecs;
pub mod config;
pub mod decimal;
pub mod error;
pub mod logging;
pub mod reader;
pub mod registry;
pub mod types;
pub mod writer;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use codec::{
    Codec, Decoder, DecoderContext, DynValue, Encoder, EncoderContext, RepresentationConfigurable,
};
pub use codecs::{
    BinaryCodec, BooleanCodec, BsonValueCodec, DateTimeCodec, DecimalCodec, DocumentCodec,
    FloatCodec, IntegerCodec, ObjectIdCodec, SerdeCodec, StringCodec, UuidCodec,
    UuidRepresentation, ValueCodecProvider,
};
pub use config::{MappingConfig, MappingConfigBuilder, RepresentationConfig};
pub use error::{CodecError, CodecResult, ErrorKind, NestingError};
pub use reader::DocumentReader;
pub use registry::{CodecHandle, CodecProvider, CodecRegistry, CodecRegistryBuilder};
pub use types::BsonType;
pub use writer::DocumentWriter;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::codec::{
        Codec, Decoder, DecoderContext, DynValue, Encoder, EncoderContext,
        RepresentationConfigurable,
    };
    pub use crate::codecs::{SerdeCodec, ValueCodecProvider};
    pub use crate::config::MappingConfig;
    pub use crate::error::{CodecError, CodecResult};
    pub use crate::reader::DocumentReader;
    pub use crate::registry::{CodecProvider, CodecRegistry};
    pub use crate::types::BsonType;
    pub use crate::writer::DocumentWriter;
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
