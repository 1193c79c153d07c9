//! Serde bridge for record types.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{Decoder, DecoderContext, Encoder, EncoderContext};
use crate::error::CodecResult;
use crate::reader::DocumentReader;
use crate::writer::DocumentWriter;

/// Codec for any `Serialize + DeserializeOwned` record.
///
/// The value goes through `bson::to_bson` and is piped into the writer, so a
/// record can sit at the root, inside an expression, or as a stage argument.
///
/// ```rust
/// use bsonkit_codec::{CodecRegistry, SerdeCodec, ValueCodecProvider};
/// use bson::doc;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct User {
///     name: String,
///     age: i32,
/// }
///
/// let registry = CodecRegistry::builder()
///     .register_codec::<User, _>(SerdeCodec::<User>::new())
///     .provider(ValueCodecProvider::new())
///     .build();
///
/// let user = User { name: "Alice".into(), age: 30 };
/// let document = registry.encode_to_document(&user).unwrap();
/// assert_eq!(document, doc! { "name": "Alice", "age": 30 });
/// ```
pub struct SerdeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeCodec<T> {
    /// Create the codec.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Serialize> Encoder<T> for SerdeCodec<T> {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &T,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        let value = bson::to_bson(value)?;
        writer.pipe(&value)
    }
}

impl<T: DeserializeOwned> Decoder<T> for SerdeCodec<T> {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<T> {
        Ok(bson::from_bson(reader.read_bson()?)?)
    }
}
