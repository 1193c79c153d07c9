//! Built-in codecs.
//!
//! Leaf codecs for primitive-like types, most of them
//! [representation-configurable](crate::RepresentationConfigurable), the
//! serde bridge for records, and the [`ValueCodecProvider`] that supplies
//! them to a registry.

mod numeric;
mod provider;
mod scalar;
mod serde_codec;
mod uuid_codec;

pub use numeric::{DecimalCodec, FloatCodec, FloatType, IntegerCodec, IntegerType};
pub use provider::ValueCodecProvider;
pub use scalar::{
    BinaryCodec, BooleanCodec, BsonValueCodec, DateTimeCodec, DocumentCodec, ObjectIdCodec,
    StringCodec,
};
pub use serde_codec::SerdeCodec;
pub use uuid_codec::{UuidCodec, UuidRepresentation};
pub(crate) use uuid_codec::uuid_representation_name;

#[cfg(test)]
pub(crate) mod testing {
    use bson::Bson;

    use crate::codec::{Decoder, DecoderContext, Encoder, EncoderContext};
    use crate::error::CodecResult;
    use crate::reader::DocumentReader;
    use crate::registry::CodecRegistry;
    use crate::writer::DocumentWriter;

    /// Encode one value with `codec` in value mode.
    pub fn encode_value<T, E: Encoder<T>>(codec: &E, value: &T) -> CodecResult<Bson> {
        let registry = CodecRegistry::builder().build();
        let mut writer = DocumentWriter::for_value();
        codec.encode(&mut writer, value, &EncoderContext::new(&registry))?;
        writer.finish_value()
    }

    /// Decode one value with `codec`.
    pub fn decode_value<T, D: Decoder<T>>(codec: &D, wire: Bson) -> CodecResult<T> {
        let registry = CodecRegistry::builder().build();
        let mut reader = DocumentReader::from_bson(wire);
        codec.decode(&mut reader, &DecoderContext::new(&registry))
    }
}
