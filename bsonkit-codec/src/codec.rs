//! Codec traits and encode/decode contexts.

use std::any::Any;
use std::fmt;

use crate::error::{CodecError, CodecResult};
use crate::reader::DocumentReader;
use crate::registry::CodecRegistry;
use crate::types::BsonType;
use crate::writer::DocumentWriter;

/// Writes values of type `T` to a [`DocumentWriter`].
pub trait Encoder<T>: Send + Sync {
    /// Encode `value` at the writer's current position.
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &T,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()>;
}

/// Reads values of type `T` from a [`DocumentReader`].
pub trait Decoder<T>: Send + Sync {
    /// Decode the next value of the reader.
    fn decode(&self, reader: &mut DocumentReader, ctx: &DecoderContext<'_>) -> CodecResult<T>;
}

/// An encoder and decoder for the same type.
pub trait Codec<T>: Encoder<T> + Decoder<T> {}

impl<T, C> Codec<T> for C where C: Encoder<T> + Decoder<T> {}

/// A codec that can emit more than one wire shape for its type.
///
/// Rebinding never mutates the codec: it returns a new instance, and it fails
/// when the requested representation is outside
/// [`supported_representations`](Self::supported_representations).
pub trait RepresentationConfigurable: Sized {
    /// The representation values are currently encoded as.
    fn representation(&self) -> BsonType;

    /// Every representation this codec accepts.
    fn supported_representations(&self) -> &'static [BsonType];

    /// Return a copy bound to `representation`.
    fn with_representation(&self, representation: BsonType) -> CodecResult<Self>;
}

/// Reject `representation` unless it is in `supported`.
pub fn check_representation(
    type_name: &'static str,
    supported: &[BsonType],
    representation: BsonType,
) -> CodecResult<()> {
    if supported.contains(&representation) {
        Ok(())
    } else {
        Err(CodecError::UnsupportedRepresentation {
            type_name,
            representation,
        })
    }
}

/// A value whose concrete type is only known at runtime.
///
/// Implemented for every `Clone + Debug` type that is `Send + Sync`, so any
/// such value can sit inside an expression tree and be encoded through
/// [`CodecRegistry::encode_dyn`].
pub trait DynValue: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting in type-erased encoders.
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete type, for error messages.
    fn type_name(&self) -> &'static str;

    /// Clone into a new box.
    fn clone_box(&self) -> Box<dyn DynValue>;
}

impl<T> DynValue for T
where
    T: Any + Send + Sync + fmt::Debug + Clone,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn clone_box(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn DynValue> {
    fn clone(&self) -> Self {
        // Dispatch through the vtable; `self.clone_box()` would box the box.
        (**self).clone_box()
    }
}

/// State available to encoders.
#[derive(Clone, Copy)]
pub struct EncoderContext<'a> {
    registry: &'a CodecRegistry,
}

impl<'a> EncoderContext<'a> {
    /// Create a context over `registry`.
    pub fn new(registry: &'a CodecRegistry) -> Self {
        Self { registry }
    }

    /// The registry used for nested values.
    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    /// Encode a nested value with the codec registered for its type.
    pub fn encode_child<T: 'static>(&self, writer: &mut DocumentWriter, value: &T) -> CodecResult<()> {
        self.registry.encode(writer, value, self)
    }

    /// Encode a nested value by its runtime type.
    pub fn encode_dyn(&self, writer: &mut DocumentWriter, value: &dyn DynValue) -> CodecResult<()> {
        self.registry.encode_dyn(writer, value, self)
    }
}

impl fmt::Debug for EncoderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderContext").finish_non_exhaustive()
    }
}

/// State available to decoders.
#[derive(Clone, Copy)]
pub struct DecoderContext<'a> {
    registry: &'a CodecRegistry,
}

impl<'a> DecoderContext<'a> {
    /// Create a context over `registry`.
    pub fn new(registry: &'a CodecRegistry) -> Self {
        Self { registry }
    }

    /// The registry used for nested values.
    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    /// Decode a nested value with the codec registered for `T`.
    pub fn decode_child<T: 'static>(&self, reader: &mut DocumentReader) -> CodecResult<T> {
        self.registry.decode(reader, self)
    }
}

impl fmt::Debug for DecoderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_representation() {
        let supported = [BsonType::Int32, BsonType::String];
        assert!(check_representation("i16", &supported, BsonType::String).is_ok());
        let err = check_representation("i16", &supported, BsonType::Boolean).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_dyn_value_keeps_concrete_type() {
        let boxed: Box<dyn DynValue> = Box::new(42i32);
        let cloned = boxed.clone();
        assert_eq!((*cloned).as_any().downcast_ref::<i32>(), Some(&42));
        assert_eq!((*cloned).type_name(), "i32");
    }
}
