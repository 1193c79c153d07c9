//! Codecs for booleans, strings, identifiers, datetimes, binary data and
//! pass-through BSON values.

use bson::oid::ObjectId;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document};
use chrono::{SecondsFormat, Utc};

use crate::codec::{
    Decoder, DecoderContext, Encoder, EncoderContext, RepresentationConfigurable,
    check_representation,
};
use crate::error::{CodecError, CodecResult};
use crate::reader::DocumentReader;
use crate::types::BsonType;
use crate::writer::DocumentWriter;

const BOOLEAN_REPRESENTATIONS: &[BsonType] =
    &[BsonType::Boolean, BsonType::Int32, BsonType::String];
const STRING_REPRESENTATIONS: &[BsonType] =
    &[BsonType::String, BsonType::ObjectId, BsonType::Symbol];
const OBJECT_ID_REPRESENTATIONS: &[BsonType] = &[BsonType::ObjectId, BsonType::String];
const DATE_TIME_REPRESENTATIONS: &[BsonType] =
    &[BsonType::DateTime, BsonType::Int64, BsonType::String];

/// Implements `new`, `Default` and [`RepresentationConfigurable`] for a
/// codec whose only state is its representation.
macro_rules! representation_codec {
    ($codec:ident, $type_name:literal, $supported:ident, $default:ident) => {
        impl $codec {
            /// Create a codec bound to the default representation.
            pub fn new() -> Self {
                Self {
                    representation: BsonType::$default,
                }
            }
        }

        impl Default for $codec {
            fn default() -> Self {
                Self::new()
            }
        }

        impl RepresentationConfigurable for $codec {
            fn representation(&self) -> BsonType {
                self.representation
            }

            fn supported_representations(&self) -> &'static [BsonType] {
                $supported
            }

            fn with_representation(&self, representation: BsonType) -> CodecResult<Self> {
                check_representation($type_name, $supported, representation)?;
                Ok(Self { representation })
            }
        }
    };
}

fn unsupported_at_encode(type_name: &str, representation: BsonType) -> CodecError {
    CodecError::internal(format!(
        "{} codec is bound to unsupported representation {}",
        type_name, representation
    ))
}

/// Codec for `bool`.
#[derive(Debug, Clone, Copy)]
pub struct BooleanCodec {
    representation: BsonType,
}

representation_codec!(BooleanCodec, "bool", BOOLEAN_REPRESENTATIONS, Boolean);

impl Encoder<bool> for BooleanCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &bool,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match self.representation {
            BsonType::Boolean => writer.write_boolean(*value),
            BsonType::Int32 => writer.write_int32(i32::from(*value)),
            BsonType::String => writer.write_string(if *value { "true" } else { "false" }),
            other => Err(unsupported_at_encode("bool", other)),
        }
    }
}

impl Decoder<bool> for BooleanCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<bool> {
        match reader.read_bson()? {
            Bson::Boolean(v) => Ok(v),
            Bson::Int32(v) => int_to_bool(v.into()),
            Bson::Int64(v) => int_to_bool(v),
            Bson::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(CodecError::invalid_value(format!("'{}' is not a boolean", s))),
            },
            other => Err(CodecError::unexpected("bool", BsonType::of(&other))),
        }
    }
}

fn int_to_bool(value: i64) -> CodecResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::out_of_range(other, "bool")),
    }
}

/// Codec for `String`.
#[derive(Debug, Clone, Copy)]
pub struct StringCodec {
    representation: BsonType,
}

representation_codec!(StringCodec, "String", STRING_REPRESENTATIONS, String);

impl StringCodec {
    fn write(&self, writer: &mut DocumentWriter, value: &str) -> CodecResult<()> {
        match self.representation {
            BsonType::String => writer.write_string(value),
            BsonType::ObjectId => writer.write_object_id(ObjectId::parse_str(value)?),
            BsonType::Symbol => writer.write_symbol(value),
            other => Err(unsupported_at_encode("String", other)),
        }
    }
}

impl Encoder<String> for StringCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &String,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        self.write(writer, value)
    }
}

// String literals embedded in expressions and filters.
impl Encoder<&'static str> for StringCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &&'static str,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        self.write(writer, value)
    }
}

impl Decoder<String> for StringCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<String> {
        match reader.read_bson()? {
            Bson::String(s) | Bson::Symbol(s) => Ok(s),
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            other => Err(CodecError::unexpected("string", BsonType::of(&other))),
        }
    }
}

/// Codec for `ObjectId`.
#[derive(Debug, Clone, Copy)]
pub struct ObjectIdCodec {
    representation: BsonType,
}

representation_codec!(ObjectIdCodec, "ObjectId", OBJECT_ID_REPRESENTATIONS, ObjectId);

impl Encoder<ObjectId> for ObjectIdCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &ObjectId,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match self.representation {
            BsonType::ObjectId => writer.write_object_id(*value),
            BsonType::String => writer.write_string(&value.to_hex()),
            other => Err(unsupported_at_encode("ObjectId", other)),
        }
    }
}

impl Decoder<ObjectId> for ObjectIdCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<ObjectId> {
        match reader.read_bson()? {
            Bson::ObjectId(oid) => Ok(oid),
            Bson::String(s) => Ok(ObjectId::parse_str(&s)?),
            other => Err(CodecError::unexpected("objectId", BsonType::of(&other))),
        }
    }
}

/// Codec for `chrono::DateTime<Utc>`.
///
/// BSON datetimes have millisecond precision; finer parts are dropped.
#[derive(Debug, Clone, Copy)]
pub struct DateTimeCodec {
    representation: BsonType,
}

representation_codec!(DateTimeCodec, "DateTime<Utc>", DATE_TIME_REPRESENTATIONS, DateTime);

impl Encoder<chrono::DateTime<Utc>> for DateTimeCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &chrono::DateTime<Utc>,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match self.representation {
            BsonType::DateTime => writer.write_date_time(bson::DateTime::from_chrono(*value)),
            BsonType::Int64 => writer.write_int64(value.timestamp_millis()),
            BsonType::String => {
                writer.write_string(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            other => Err(unsupported_at_encode("DateTime<Utc>", other)),
        }
    }
}

impl Decoder<chrono::DateTime<Utc>> for DateTimeCodec {
    fn decode(
        &self,
        reader: &mut DocumentReader,
        _ctx: &DecoderContext<'_>,
    ) -> CodecResult<chrono::DateTime<Utc>> {
        match reader.read_bson()? {
            Bson::DateTime(dt) => Ok(dt.to_chrono()),
            Bson::Int64(millis) => Ok(bson::DateTime::from_millis(millis).to_chrono()),
            Bson::Int32(millis) => Ok(bson::DateTime::from_millis(millis.into()).to_chrono()),
            Bson::String(s) => chrono::DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CodecError::invalid_value(format!("'{}' is not a datetime: {}", s, e))),
            other => Err(CodecError::unexpected("date", BsonType::of(&other))),
        }
    }
}

/// Codec for `bson::Binary` and `Vec<u8>`.
///
/// Byte vectors are written with the generic subtype; any subtype is
/// accepted when decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Encoder<Binary> for BinaryCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Binary,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.write_binary(value.clone())
    }
}

impl Decoder<Binary> for BinaryCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<Binary> {
        reader.read_binary()
    }
}

impl Encoder<Vec<u8>> for BinaryCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Vec<u8>,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.write_binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: value.clone(),
        })
    }
}

impl Decoder<Vec<u8>> for BinaryCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<Vec<u8>> {
        reader.read_binary().map(|binary| binary.bytes)
    }
}

/// Pass-through codec for `Document`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCodec;

impl Encoder<Document> for DocumentCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Document,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.pipe_document(value)
    }
}

impl Decoder<Document> for DocumentCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<Document> {
        match reader.read_bson()? {
            Bson::Document(document) => Ok(document),
            other => Err(CodecError::unexpected("object", BsonType::of(&other))),
        }
    }
}

/// Pass-through codec for `Bson`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonValueCodec;

impl Encoder<Bson> for BsonValueCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Bson,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        writer.pipe(value)
    }
}

impl Decoder<Bson> for BsonValueCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<Bson> {
        reader.read_bson()
    }
}
