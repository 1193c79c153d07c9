//! Provider for the built-in value codecs.

use std::any::TypeId;
use std::collections::HashMap;

use bson::oid::ObjectId;
use bson::{Binary, Bson, Document};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use super::{
    BinaryCodec, BooleanCodec, BsonValueCodec, DateTimeCodec, DecimalCodec, DocumentCodec,
    FloatCodec, IntegerCodec, ObjectIdCodec, StringCodec, UuidCodec,
};
use crate::codec::{Codec, Encoder, RepresentationConfigurable};
use crate::config::MappingConfig;
use crate::error::CodecResult;
use crate::registry::{CodecHandle, CodecProvider, CodecRegistry};
use crate::types::BsonType;

/// Supplies codecs for integers, floats, `bool`, `String` (and an encoder for
/// `&'static str`), `ObjectId`,
/// `chrono::DateTime<Utc>`, `Decimal`, `Uuid`, binary data, `Document` and
/// `Bson`.
#[derive(Debug, Clone)]
pub struct ValueCodecProvider {
    codecs: HashMap<TypeId, CodecHandle>,
}

impl Default for ValueCodecProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueCodecProvider {
    /// Every codec at its default representation.
    pub fn new() -> Self {
        let mut provider = Self {
            codecs: HashMap::new(),
        };
        provider.install::<i8, _>(IntegerCodec::<i8>::new());
        provider.install::<i16, _>(IntegerCodec::<i16>::new());
        provider.install::<i32, _>(IntegerCodec::<i32>::new());
        provider.install::<u8, _>(IntegerCodec::<u8>::new());
        provider.install::<u16, _>(IntegerCodec::<u16>::new());
        provider.install::<i64, _>(IntegerCodec::<i64>::new());
        provider.install::<u32, _>(IntegerCodec::<u32>::new());
        provider.install::<f64, _>(FloatCodec::<f64>::new());
        provider.install::<f32, _>(FloatCodec::<f32>::new());
        provider.install::<bool, _>(BooleanCodec::new());
        provider.install::<String, _>(StringCodec::new());
        provider.install_encoder::<&'static str, _>(StringCodec::new());
        provider.install::<ObjectId, _>(ObjectIdCodec::new());
        provider.install::<chrono::DateTime<Utc>, _>(DateTimeCodec::new());
        provider.install::<Decimal, _>(DecimalCodec::new());
        provider.install::<Uuid, _>(UuidCodec::new());
        provider.install::<Binary, _>(BinaryCodec);
        provider.install::<Vec<u8>, _>(BinaryCodec);
        provider.install::<Document, _>(DocumentCodec);
        provider.install::<Bson, _>(BsonValueCodec);
        provider
    }

    /// Codecs rebound as `config` asks.
    ///
    /// Fails with a configuration error naming the type if an override is
    /// not supported by its codec.
    pub fn from_config(config: &MappingConfig) -> CodecResult<Self> {
        let mut provider = Self::new();
        let reps = &config.representations;

        macro_rules! rebind {
            ($rep:expr, $($ty:ty => $codec:expr),+ $(,)?) => {
                if let Some(representation) = $rep {
                    $( provider.install::<$ty, _>($codec.with_representation(representation)?); )+
                }
            };
        }

        rebind!(
            reps.integer,
            i8 => IntegerCodec::<i8>::new(),
            i16 => IntegerCodec::<i16>::new(),
            i32 => IntegerCodec::<i32>::new(),
            u8 => IntegerCodec::<u8>::new(),
            u16 => IntegerCodec::<u16>::new(),
        );
        rebind!(
            reps.long,
            i64 => IntegerCodec::<i64>::new(),
            u32 => IntegerCodec::<u32>::new(),
        );
        rebind!(
            reps.double,
            f64 => FloatCodec::<f64>::new(),
            f32 => FloatCodec::<f32>::new(),
        );
        rebind!(reps.boolean, bool => BooleanCodec::new());
        rebind!(reps.string, String => StringCodec::new());
        if let Some(representation) = reps.string {
            provider.install_encoder::<&'static str, _>(
                StringCodec::new().with_representation(representation)?,
            );
        }
        rebind!(reps.object_id, ObjectId => ObjectIdCodec::new());
        rebind!(reps.date_time, chrono::DateTime<Utc> => DateTimeCodec::new());
        rebind!(reps.decimal, Decimal => DecimalCodec::new());

        let uuid = UuidCodec::new().with_uuid_representation(config.uuid_representation);
        provider.install::<Uuid, _>(rebound(uuid, reps.uuid)?);

        debug!(
            uuid = ?config.uuid_representation,
            "Configured value codecs"
        );
        Ok(provider)
    }

    /// Replace the codec for `T`.
    pub fn with_codec<T, C>(mut self, codec: C) -> Self
    where
        T: 'static,
        C: Codec<T> + 'static,
    {
        self.install::<T, C>(codec);
        self
    }

    fn install<T, C>(&mut self, codec: C)
    where
        T: 'static,
        C: Codec<T> + 'static,
    {
        self.codecs
            .insert(TypeId::of::<T>(), CodecHandle::of_codec::<T, C>(codec));
    }

    fn install_encoder<T, E>(&mut self, encoder: E)
    where
        T: 'static,
        E: Encoder<T> + 'static,
    {
        self.codecs
            .insert(TypeId::of::<T>(), CodecHandle::of_encoder::<T, E>(encoder));
    }
}

fn rebound<C: RepresentationConfigurable>(
    codec: C,
    representation: Option<BsonType>,
) -> CodecResult<C> {
    match representation {
        Some(representation) => codec.with_representation(representation),
        None => Ok(codec),
    }
}

impl CodecProvider for ValueCodecProvider {
    fn get(&self, type_id: TypeId, _registry: &CodecRegistry) -> Option<CodecHandle> {
        self.codecs.get(&type_id).cloned()
    }

    fn name(&self) -> &'static str {
        "ValueCodecProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::UuidRepresentation;
    use bson::spec::BinarySubtype;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let registry = CodecRegistry::builder()
            .provider(ValueCodecProvider::new())
            .build();
        assert_eq!(registry.encode_to_bson(&7u8).unwrap(), Bson::Int32(7));
        assert_eq!(registry.encode_to_bson(&7u32).unwrap(), Bson::Int64(7));
        assert_eq!(registry.encode_to_bson(&true).unwrap(), Bson::Boolean(true));
        assert_eq!(
            registry.encode_to_bson(&"x".to_string()).unwrap(),
            Bson::String("x".into())
        );
        assert_eq!(registry.encode_to_bson(&"y").unwrap(), Bson::String("y".into()));
        assert!(registry.decoder::<&'static str>().err().unwrap().is_lookup_error());
        assert!(registry.lookup::<char>().unwrap_err().is_lookup_error());
    }

    #[test]
    fn test_configured_representations() {
        let config = MappingConfig::builder()
            .integer_representation(BsonType::String)
            .uuid_representation(UuidRepresentation::JavaLegacy)
            .build();
        let registry = CodecRegistry::from_config(&config).unwrap();

        assert_eq!(
            registry.encode_to_bson(&-3i16).unwrap(),
            Bson::String("-3".into())
        );
        assert_eq!(registry.decode_bson::<i16>(Bson::String("-3".into())).unwrap(), -3);
        // Longs keep their default.
        assert_eq!(registry.encode_to_bson(&3i64).unwrap(), Bson::Int64(3));

        match registry.encode_to_bson(&Uuid::nil()).unwrap() {
            Bson::Binary(binary) => assert_eq!(binary.subtype, BinarySubtype::UuidOld),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_override_names_the_type() {
        let config = MappingConfig::builder()
            .date_time_representation(BsonType::Boolean)
            .build();
        let err = ValueCodecProvider::from_config(&config).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("DateTime<Utc>"));
    }

    #[test]
    fn test_with_codec_overrides() {
        let provider = ValueCodecProvider::new().with_codec::<bool, _>(
            BooleanCodec::new()
                .with_representation(BsonType::Int32)
                .unwrap(),
        );
        let registry = CodecRegistry::builder().provider(provider).build();
        assert_eq!(registry.encode_to_bson(&false).unwrap(), Bson::Int32(0));
    }
}
