//! Codec registry.
//!
//! The registry maps a runtime type to its codec. It has a two-phase
//! lifecycle: a [`CodecRegistryBuilder`] collects exact registrations and
//! providers, and [`build`](CodecRegistryBuilder::build) freezes them into an
//! immutable [`CodecRegistry`]. Provider results are memoized in a lookup
//! cache guarded by a `parking_lot::RwLock`; the lock is never held while a
//! provider runs or a value is encoded.
//!
//! ```rust
//! use bsonkit_codec::{CodecRegistry, ValueCodecProvider};
//! use bson::Bson;
//!
//! let registry = CodecRegistry::builder()
//!     .provider(ValueCodecProvider::new())
//!     .build();
//!
//! assert_eq!(registry.encode_to_bson(&7i16).unwrap(), Bson::Int32(7));
//! assert_eq!(registry.decode_bson::<i16>(Bson::Int64(7)).unwrap(), 7);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::codec::{Codec, Decoder, DecoderContext, DynValue, Encoder, EncoderContext};
use crate::codecs::ValueCodecProvider;
use crate::config::MappingConfig;
use crate::error::{CodecError, CodecResult};
use crate::reader::DocumentReader;
use crate::writer::DocumentWriter;

type ErasedEncode =
    dyn Fn(&mut DocumentWriter, &dyn Any, &EncoderContext<'_>) -> CodecResult<()> + Send + Sync;

/// Type-erased codec entry for one runtime type.
///
/// Carries an optional encoder and an optional decoder. The encoder is kept
/// both typed, for [`CodecRegistry::encoder`], and erased, for dispatch on a
/// runtime type through [`CodecRegistry::encode_dyn`].
#[derive(Clone)]
pub struct CodecHandle {
    type_id: TypeId,
    type_name: &'static str,
    encoder: Option<Arc<dyn Any + Send + Sync>>,
    erased: Option<Arc<ErasedEncode>>,
    decoder: Option<Arc<dyn Any + Send + Sync>>,
}

impl CodecHandle {
    fn empty<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            encoder: None,
            erased: None,
            decoder: None,
        }
    }

    /// Wrap a codec that both encodes and decodes `T`.
    pub fn of_codec<T, C>(codec: C) -> Self
    where
        T: 'static,
        C: Codec<T> + 'static,
    {
        let codec = Arc::new(codec);
        let encoder: Arc<dyn Encoder<T>> = codec.clone();
        let decoder: Arc<dyn Decoder<T>> = codec;
        Self::empty::<T>()
            .with_encoder_arc(encoder)
            .with_decoder_arc(decoder)
    }

    /// Wrap an encoder for `T`.
    pub fn of_encoder<T, E>(encoder: E) -> Self
    where
        T: 'static,
        E: Encoder<T> + 'static,
    {
        Self::empty::<T>().with_encoder_arc::<T>(Arc::new(encoder))
    }

    /// Wrap a decoder for `T`.
    pub fn of_decoder<T, D>(decoder: D) -> Self
    where
        T: 'static,
        D: Decoder<T> + 'static,
    {
        Self::empty::<T>().with_decoder_arc::<T>(Arc::new(decoder))
    }

    fn with_encoder_arc<T: 'static>(mut self, encoder: Arc<dyn Encoder<T>>) -> Self {
        let target = encoder.clone();
        let type_name = self.type_name;
        let erased: Arc<ErasedEncode> = Arc::new(
            move |writer: &mut DocumentWriter, value: &dyn Any, ctx: &EncoderContext<'_>| {
                let value = value.downcast_ref::<T>().ok_or_else(|| {
                    CodecError::internal(format!(
                        "value handed to the {} encoder has another type",
                        type_name
                    ))
                })?;
                target.encode(writer, value, ctx)
            },
        );
        self.encoder = Some(Arc::new(encoder));
        self.erased = Some(erased);
        self
    }

    fn with_decoder_arc<T: 'static>(mut self, decoder: Arc<dyn Decoder<T>>) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    /// Fill in whichever half is missing from `other`.
    fn merge(mut self, other: CodecHandle) -> Self {
        if other.encoder.is_some() {
            self.encoder = other.encoder;
            self.erased = other.erased;
        }
        if other.decoder.is_some() {
            self.decoder = other.decoder;
        }
        self
    }

    /// The type this handle serves.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the type this handle serves.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether an encoder is present.
    pub fn can_encode(&self) -> bool {
        self.encoder.is_some()
    }

    /// Whether a decoder is present.
    pub fn can_decode(&self) -> bool {
        self.decoder.is_some()
    }

    /// The typed encoder, if this handle serves `T` and has one.
    pub fn encoder<T: 'static>(&self) -> Option<Arc<dyn Encoder<T>>> {
        self.encoder
            .as_ref()?
            .downcast_ref::<Arc<dyn Encoder<T>>>()
            .cloned()
    }

    /// The typed decoder, if this handle serves `T` and has one.
    pub fn decoder<T: 'static>(&self) -> Option<Arc<dyn Decoder<T>>> {
        self.decoder
            .as_ref()?
            .downcast_ref::<Arc<dyn Decoder<T>>>()
            .cloned()
    }

    /// Encode a type-erased value.
    pub fn encode_any(
        &self,
        writer: &mut DocumentWriter,
        value: &dyn Any,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match &self.erased {
            Some(encode) => encode(writer, value, ctx),
            None => Err(CodecError::CodecNotFound {
                type_name: self.type_name,
            }),
        }
    }
}

impl fmt::Debug for CodecHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecHandle")
            .field("type_name", &self.type_name)
            .field("encoder", &self.can_encode())
            .field("decoder", &self.can_decode())
            .finish()
    }
}

/// Contributes codecs for types the registry has no exact entry for.
///
/// Providers are asked in registration order; the first `Some` wins and is
/// cached for the lifetime of the registry.
pub trait CodecProvider: Send + Sync {
    /// Return a codec for `type_id`, or `None` if this provider has none.
    ///
    /// `registry` is the registry doing the lookup, for providers whose
    /// codecs delegate nested values.
    fn get(&self, type_id: TypeId, registry: &CodecRegistry) -> Option<CodecHandle>;

    /// Name used in log output.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Builder for [`CodecRegistry`].
#[derive(Default)]
pub struct CodecRegistryBuilder {
    codecs: HashMap<TypeId, CodecHandle>,
    providers: Vec<Arc<dyn CodecProvider>>,
}

impl CodecRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec for `T`, replacing any earlier entry.
    pub fn register_codec<T, C>(mut self, codec: C) -> Self
    where
        T: 'static,
        C: Codec<T> + 'static,
    {
        self.codecs
            .insert(TypeId::of::<T>(), CodecHandle::of_codec::<T, C>(codec));
        self
    }

    /// Register an encoder for `T`, keeping a previously registered decoder.
    pub fn register_encoder<T, E>(self, encoder: E) -> Self
    where
        T: 'static,
        E: Encoder<T> + 'static,
    {
        self.register_handle(CodecHandle::of_encoder::<T, E>(encoder))
    }

    /// Register a decoder for `T`, keeping a previously registered encoder.
    pub fn register_decoder<T, D>(self, decoder: D) -> Self
    where
        T: 'static,
        D: Decoder<T> + 'static,
    {
        self.register_handle(CodecHandle::of_decoder::<T, D>(decoder))
    }

    /// Register a prebuilt handle, merging with an existing entry.
    pub fn register_handle(mut self, handle: CodecHandle) -> Self {
        let entry = match self.codecs.remove(&handle.type_id) {
            Some(existing) => existing.merge(handle),
            None => handle,
        };
        self.codecs.insert(entry.type_id, entry);
        self
    }

    /// Append a provider to the chain.
    pub fn provider<P: CodecProvider + 'static>(self, provider: P) -> Self {
        self.provider_arc(Arc::new(provider))
    }

    /// Append a shared provider to the chain.
    pub fn provider_arc(mut self, provider: Arc<dyn CodecProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Freeze the registrations.
    pub fn build(self) -> CodecRegistry {
        debug!(
            codecs = self.codecs.len(),
            providers = self.providers.len(),
            "Built codec registry"
        );
        CodecRegistry {
            codecs: self.codecs,
            providers: self.providers,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl fmt::Debug for CodecRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistryBuilder")
            .field("codecs", &self.codecs.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

/// Immutable map from runtime type to codec, with a provider chain.
///
/// `CodecRegistry` is `Send + Sync`; share it with an `Arc`.
pub struct CodecRegistry {
    codecs: HashMap<TypeId, CodecHandle>,
    providers: Vec<Arc<dyn CodecProvider>>,
    cache: RwLock<HashMap<TypeId, CodecHandle>>,
}

impl CodecRegistry {
    /// Start building a registry.
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder::new()
    }

    /// A registry with the value codecs at their default representations.
    pub fn with_defaults() -> Self {
        Self::builder().provider(ValueCodecProvider::new()).build()
    }

    /// A registry with the value codecs configured by `config`.
    pub fn from_config(config: &MappingConfig) -> CodecResult<Self> {
        Ok(Self::builder()
            .provider(ValueCodecProvider::from_config(config)?)
            .build())
    }

    /// Resolve the handle for a type id.
    ///
    /// Checks exact registrations, then the cache, then each provider in
    /// order. Fails with [`CodecError::CodecNotFound`] if nothing matches.
    pub fn get(&self, type_id: TypeId, type_name: &'static str) -> CodecResult<CodecHandle> {
        if let Some(handle) = self.codecs.get(&type_id) {
            return Ok(handle.clone());
        }
        if let Some(handle) = self.cache.read().get(&type_id) {
            trace!(type_name, "Codec cache hit");
            return Ok(handle.clone());
        }
        trace!(type_name, "Codec cache miss");

        // Providers run without the lock; they may resolve other types.
        for provider in &self.providers {
            if let Some(handle) = provider.get(type_id, self) {
                debug!(type_name, provider = provider.name(), "Resolved codec from provider");
                let mut cache = self.cache.write();
                return Ok(cache.entry(type_id).or_insert(handle).clone());
            }
        }
        Err(CodecError::CodecNotFound { type_name })
    }

    /// Resolve the handle for `T`.
    pub fn lookup<T: 'static>(&self) -> CodecResult<CodecHandle> {
        self.get(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Whether a codec for `T` can be resolved.
    pub fn contains<T: 'static>(&self) -> bool {
        self.lookup::<T>().is_ok()
    }

    /// Number of exact registrations.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Whether there are no exact registrations.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Number of provider results cached so far.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// The encoder for `T`.
    pub fn encoder<T: 'static>(&self) -> CodecResult<Arc<dyn Encoder<T>>> {
        self.lookup::<T>()?
            .encoder::<T>()
            .ok_or(CodecError::CodecNotFound {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// The decoder for `T`.
    pub fn decoder<T: 'static>(&self) -> CodecResult<Arc<dyn Decoder<T>>> {
        self.lookup::<T>()?
            .decoder::<T>()
            .ok_or(CodecError::CodecNotFound {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Encode `value` with the codec for its static type.
    pub fn encode<T: 'static>(
        &self,
        writer: &mut DocumentWriter,
        value: &T,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        self.encoder::<T>()?.encode(writer, value, ctx)
    }

    /// Encode `value` with the codec for its runtime type.
    pub fn encode_dyn(
        &self,
        writer: &mut DocumentWriter,
        value: &dyn DynValue,
        ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        let any = value.as_any();
        self.get(Any::type_id(any), value.type_name())?
            .encode_any(writer, any, ctx)
    }

    /// Decode the next value of `reader` as `T`.
    pub fn decode<T: 'static>(
        &self,
        reader: &mut DocumentReader,
        ctx: &DecoderContext<'_>,
    ) -> CodecResult<T> {
        self.decoder::<T>()?.decode(reader, ctx)
    }

    /// Encode `value` as a top-level document.
    pub fn encode_to_document<T: 'static>(&self, value: &T) -> CodecResult<Document> {
        let mut writer = DocumentWriter::new();
        self.encode(&mut writer, value, &EncoderContext::new(self))?;
        writer.finish()
    }

    /// Encode `value` as a single value of any kind.
    pub fn encode_to_bson<T: 'static>(&self, value: &T) -> CodecResult<Bson> {
        let mut writer = DocumentWriter::for_value();
        self.encode(&mut writer, value, &EncoderContext::new(self))?;
        writer.finish_value()
    }

    /// Decode a top-level document as `T`.
    pub fn decode_document<T: 'static>(&self, document: Document) -> CodecResult<T> {
        self.decode_bson(Bson::Document(document))
    }

    /// Decode a single value as `T`.
    pub fn decode_bson<T: 'static>(&self, value: Bson) -> CodecResult<T> {
        let mut reader = DocumentReader::from_bson(value);
        self.decode(&mut reader, &DecoderContext::new(self))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.codecs.len())
            .field("providers", &self.providers.len())
            .field("cached", &self.cached_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RepresentationConfigurable;
    use crate::codecs::IntegerCodec;
    use crate::types::BsonType;
    use bson::doc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    struct PointCodec;

    impl Encoder<Point> for PointCodec {
        fn encode(
            &self,
            writer: &mut DocumentWriter,
            value: &Point,
            ctx: &EncoderContext<'_>,
        ) -> CodecResult<()> {
            writer.write_document(|w| {
                w.write_name("x")?;
                ctx.encode_child(w, &value.x)?;
                w.write_name("y")?;
                ctx.encode_child(w, &value.y)
            })
        }
    }

    impl Decoder<Point> for PointCodec {
        fn decode(&self, reader: &mut DocumentReader, ctx: &DecoderContext<'_>) -> CodecResult<Point> {
            reader.read_start_document()?;
            let x = ctx.decode_child(reader)?;
            let y = ctx.decode_child(reader)?;
            reader.read_end_document()?;
            Ok(Point { x, y })
        }
    }

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    impl CodecProvider for CountingProvider {
        fn get(&self, type_id: TypeId, _registry: &CodecRegistry) -> Option<CodecHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (type_id == TypeId::of::<Point>()).then(|| CodecHandle::of_codec::<Point, _>(PointCodec))
        }
    }

    #[test]
    fn test_exact_registration_delegates_nested_values() {
        let registry = CodecRegistry::builder()
            .register_codec::<Point, _>(PointCodec)
            .provider(ValueCodecProvider::new())
            .build();

        let point = Point { x: 1, y: -2 };
        let document = registry.encode_to_document(&point).unwrap();
        assert_eq!(document, doc! { "x": 1, "y": -2 });
        assert_eq!(registry.decode_document::<Point>(document).unwrap(), point);
    }

    #[test]
    fn test_provider_results_are_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = CodecRegistry::builder()
            .provider(CountingProvider {
                calls: calls.clone(),
            })
            .provider(ValueCodecProvider::new())
            .build();

        registry.lookup::<Point>().unwrap();
        registry.lookup::<Point>().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.cached_len(), 1);
    }

    #[test]
    fn test_concurrent_resolution_through_shared_registry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(
            CodecRegistry::builder()
                .provider(CountingProvider {
                    calls: calls.clone(),
                })
                .provider(ValueCodecProvider::new())
                .build(),
        );

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let point = Point { x: i, y: -i };
                        let document = registry.encode_to_document(&point).unwrap();
                        assert_eq!(document, doc! { "x": i, "y": -i });
                        assert_eq!(
                            registry.lookup::<Point>().unwrap().type_id(),
                            TypeId::of::<Point>()
                        );
                        assert_eq!(
                            registry.lookup::<i64>().unwrap().type_id(),
                            TypeId::of::<i64>()
                        );
                        assert_eq!(
                            registry.encode_to_bson(&true).unwrap(),
                            Bson::Boolean(true)
                        );
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        // Point, i32, i64 and bool each land in the cache exactly once.
        assert_eq!(registry.cached_len(), 4);
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert!(calls.load(Ordering::SeqCst) <= 8 * 4);
    }

    #[test]
    fn test_first_provider_wins() {
        let registry = CodecRegistry::builder()
            .provider(ValueCodecProvider::new())
            .provider(ValueCodecProvider::from_config(
                &MappingConfig::builder().integer_representation(BsonType::String).build(),
            ).unwrap())
            .build();
        assert_eq!(registry.encode_to_bson(&5i32).unwrap(), Bson::Int32(5));
    }

    #[test]
    fn test_exact_registration_beats_provider() {
        let registry = CodecRegistry::builder()
            .register_codec::<i32, _>(
                IntegerCodec::<i32>::new()
                    .with_representation(BsonType::Int64)
                    .unwrap(),
            )
            .provider(ValueCodecProvider::new())
            .build();
        assert_eq!(registry.encode_to_bson(&5i32).unwrap(), Bson::Int64(5));
    }

    #[test]
    fn test_missing_codec_is_lookup_error() {
        let registry = CodecRegistry::builder().build();
        let err = registry.encode_to_bson(&Point { x: 0, y: 0 }).unwrap_err();
        assert!(err.is_lookup_error());
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn test_split_encoder_and_decoder() {
        let registry = CodecRegistry::builder()
            .register_encoder::<Point, _>(PointCodec)
            .provider(ValueCodecProvider::new())
            .build();
        assert!(registry.encoder::<Point>().is_ok());
        assert!(registry.decoder::<Point>().err().unwrap().is_lookup_error());

        let registry = CodecRegistry::builder()
            .register_encoder::<Point, _>(PointCodec)
            .register_decoder::<Point, _>(PointCodec)
            .provider(ValueCodecProvider::new())
            .build();
        let handle = registry.lookup::<Point>().unwrap();
        assert!(handle.can_encode() && handle.can_decode());
    }

    #[test]
    fn test_encode_dyn_uses_runtime_type() {
        let registry = CodecRegistry::with_defaults();
        let values: Vec<Box<dyn DynValue>> = vec![Box::new(1i64), Box::new("s".to_string()), Box::new(true)];

        let mut writer = DocumentWriter::new();
        let ctx = EncoderContext::new(&registry);
        writer
            .write_document(|w| {
                w.write_start_array_named("values")?;
                for value in &values {
                    registry.encode_dyn(w, &**value, &ctx)?;
                }
                w.write_end_array()
            })
            .unwrap();

        assert_eq!(
            writer.into_document().unwrap(),
            doc! { "values": [1i64, "s", true] }
        );
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodecRegistry>();
    }
}
