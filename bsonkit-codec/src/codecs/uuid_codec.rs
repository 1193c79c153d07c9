//! UUID codec and binary layouts.
//!
//! Binary layouts are bson's [`UuidRepresentation`]; the byte shuffling of
//! the legacy layouts is done by [`Binary::from_uuid_with_representation`]
//! and [`Binary::to_uuid_with_representation`].

use bson::spec::BinarySubtype;
use bson::{Binary, Bson};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use bson::uuid::UuidRepresentation;

use crate::codec::{
    Decoder, DecoderContext, Encoder, EncoderContext, RepresentationConfigurable,
    check_representation,
};
use crate::error::{CodecError, CodecResult};
use crate::reader::DocumentReader;
use crate::types::BsonType;
use crate::writer::DocumentWriter;

const UUID_REPRESENTATIONS: &[BsonType] = &[BsonType::Binary, BsonType::String];

/// Configuration name of a [`UuidRepresentation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum UuidLayoutName {
    Standard,
    JavaLegacy,
    CSharpLegacy,
    PythonLegacy,
}

impl From<UuidLayoutName> for UuidRepresentation {
    fn from(name: UuidLayoutName) -> Self {
        match name {
            UuidLayoutName::Standard => Self::Standard,
            UuidLayoutName::JavaLegacy => Self::JavaLegacy,
            UuidLayoutName::CSharpLegacy => Self::CSharpLegacy,
            UuidLayoutName::PythonLegacy => Self::PythonLegacy,
        }
    }
}

impl TryFrom<UuidRepresentation> for UuidLayoutName {
    type Error = CodecError;

    fn try_from(layout: UuidRepresentation) -> CodecResult<Self> {
        match layout {
            UuidRepresentation::Standard => Ok(Self::Standard),
            UuidRepresentation::JavaLegacy => Ok(Self::JavaLegacy),
            UuidRepresentation::CSharpLegacy => Ok(Self::CSharpLegacy),
            UuidRepresentation::PythonLegacy => Ok(Self::PythonLegacy),
            other => Err(CodecError::config(format!(
                "UUID layout {:?} has no configuration name",
                other
            ))),
        }
    }
}

/// Serde adapter writing a [`UuidRepresentation`] as its snake_case name,
/// for use with `#[serde(with = "...")]`.
pub(crate) mod uuid_representation_name {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{UuidLayoutName, UuidRepresentation};

    pub fn serialize<S: Serializer>(
        layout: &UuidRepresentation,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        UuidLayoutName::try_from(*layout)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<UuidRepresentation, D::Error> {
        UuidLayoutName::deserialize(deserializer).map(UuidRepresentation::from)
    }
}

/// Codec for `uuid::Uuid`.
///
/// Writes binary by default; the layout is chosen with
/// [`with_uuid_representation`](Self::with_uuid_representation).
#[derive(Debug, Clone, Copy)]
pub struct UuidCodec {
    representation: BsonType,
    uuid_representation: UuidRepresentation,
}

impl UuidCodec {
    /// Create a codec writing standard binary UUIDs.
    pub fn new() -> Self {
        Self {
            representation: BsonType::Binary,
            uuid_representation: UuidRepresentation::Standard,
        }
    }

    /// Return a copy using `layout` for binary values.
    pub fn with_uuid_representation(&self, layout: UuidRepresentation) -> Self {
        Self {
            uuid_representation: layout,
            ..*self
        }
    }

    /// The binary layout in use.
    pub fn uuid_representation(&self) -> UuidRepresentation {
        self.uuid_representation
    }

    fn from_binary(&self, binary: &Binary) -> CodecResult<Uuid> {
        let layout = match binary.subtype {
            BinarySubtype::Uuid => UuidRepresentation::Standard,
            BinarySubtype::UuidOld if self.uuid_representation == UuidRepresentation::Standard => {
                return Err(CodecError::invalid_value(
                    "UUID stored with legacy subtype 3 cannot be read with the standard layout",
                ));
            }
            BinarySubtype::UuidOld => self.uuid_representation,
            other => {
                return Err(CodecError::invalid_value(format!(
                    "binary subtype {:?} is not a UUID",
                    other
                )));
            }
        };
        binary
            .to_uuid_with_representation(layout)
            .map(Uuid::from)
            .map_err(|e| CodecError::invalid_value(format!("invalid UUID binary: {}", e)))
    }
}

impl Default for UuidCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RepresentationConfigurable for UuidCodec {
    fn representation(&self) -> BsonType {
        self.representation
    }

    fn supported_representations(&self) -> &'static [BsonType] {
        UUID_REPRESENTATIONS
    }

    fn with_representation(&self, representation: BsonType) -> CodecResult<Self> {
        check_representation("Uuid", UUID_REPRESENTATIONS, representation)?;
        Ok(Self {
            representation,
            ..*self
        })
    }
}

impl Encoder<Uuid> for UuidCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Uuid,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match self.representation {
            BsonType::Binary => writer.write_binary(Binary::from_uuid_with_representation(
                bson::Uuid::from(*value),
                self.uuid_representation,
            )),
            BsonType::String => writer.write_string(&value.hyphenated().to_string()),
            other => Err(CodecError::internal(format!(
                "Uuid codec is bound to unsupported representation {}",
                other
            ))),
        }
    }
}

impl Decoder<Uuid> for UuidCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<Uuid> {
        match reader.read_bson()? {
            Bson::Binary(binary) => self.from_binary(&binary),
            Bson::String(s) => Uuid::parse_str(s.trim())
                .map_err(|e| CodecError::invalid_value(format!("'{}' is not a UUID: {}", s, e))),
            other => Err(CodecError::unexpected("binData", BsonType::of(&other))),
        }
    }
}
