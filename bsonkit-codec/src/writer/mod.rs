//! Document writer facade.
//!
//! [`DocumentWriter`] is the object encoders talk to. It exposes the
//! primitive write operations of the BSON model and drives a
//! [`StateStack`] underneath, materializing an in-memory [`Document`].
//!
//! ```rust
//! use bsonkit_codec::DocumentWriter;
//! use bson::doc;
//!
//! let mut writer = DocumentWriter::new();
//! writer.write_start_document().unwrap();
//! writer.write_string_named("name", "Alice").unwrap();
//! writer.write_start_array_named("tags").unwrap();
//! writer.write_string("admin").unwrap();
//! writer.write_end_array().unwrap();
//! writer.write_end_document().unwrap();
//!
//! assert_eq!(writer.into_document(), Some(doc! { "name": "Alice", "tags": ["admin"] }));
//! ```

pub mod state;

use std::fmt;

use bson::oid::ObjectId;
use bson::{Binary, Bson, DateTime, Decimal128, Document, Regex, Timestamp};

use crate::error::{CodecError, CodecResult, NestingError};
use state::StateStack;

/// Generates an unnamed and a `_named` writer for one scalar kind.
macro_rules! scalar_writers {
    ($(
        $(#[$doc:meta])*
        $unnamed:ident, $named:ident ($($arg:ident: $ty:ty),*) => $value:expr;
    )*) => {
        $(
            $(#[$doc])*
            pub fn $unnamed(&mut self, $($arg: $ty),*) -> CodecResult<()> {
                self.stack.write_scalar(None, $value)
            }

            $(#[$doc])*
            ///
            /// The field name is written first; only valid inside a document.
            pub fn $named(&mut self, name: &str, $($arg: $ty),*) -> CodecResult<()> {
                self.stack.write_scalar(Some(name), $value)
            }
        )*
    };
}

/// Builds a [`Document`] from a stream of write calls.
///
/// Every `write_start_*` must be paired with the matching `write_end_*`.
/// Named writes are only valid inside a document; unnamed writes are valid
/// inside an array, after [`write_name`](Self::write_name), or as the single
/// value of a writer created with [`for_value`](Self::for_value).
#[derive(Debug)]
pub struct DocumentWriter {
    stack: StateStack,
    value_mode: bool,
}

impl Default for DocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter {
    /// Create a writer that builds one top-level document.
    pub fn new() -> Self {
        Self {
            stack: StateStack::new(None),
            value_mode: false,
        }
    }

    /// Create a writer whose first document augments `seed`.
    pub fn with_seed(seed: Document) -> Self {
        Self {
            stack: StateStack::new(Some(seed)),
            value_mode: false,
        }
    }

    /// Create a writer that accepts exactly one value of any kind.
    pub fn for_value() -> Self {
        Self {
            stack: StateStack::for_value(),
            value_mode: true,
        }
    }

    /// Discard everything written so far and start a new pass.
    pub fn reset(&mut self) {
        self.stack = if self.value_mode {
            StateStack::for_value()
        } else {
            StateStack::new(None)
        };
    }

    /// Number of open levels.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Name of the current state (`root`, `document`, `array` or `value`).
    pub fn state_name(&self) -> &'static str {
        self.stack.state_name()
    }

    /// Whether a complete top-level value has been written.
    pub fn is_complete(&self) -> bool {
        self.stack.is_complete()
    }

    /// Start a document.
    pub fn write_start_document(&mut self) -> CodecResult<()> {
        self.stack.enter_document(None)
    }

    /// Start a document as the value of field `name`.
    pub fn write_start_document_named(&mut self, name: &str) -> CodecResult<()> {
        self.stack.enter_document(Some(name))
    }

    /// End the current document.
    pub fn write_end_document(&mut self) -> CodecResult<()> {
        self.stack.exit_document()
    }

    /// Start an array.
    pub fn write_start_array(&mut self) -> CodecResult<()> {
        self.stack.enter_array(None)
    }

    /// Start an array as the value of field `name`.
    pub fn write_start_array_named(&mut self, name: &str) -> CodecResult<()> {
        self.stack.enter_array(Some(name))
    }

    /// End the current array.
    pub fn write_end_array(&mut self) -> CodecResult<()> {
        self.stack.exit_array()
    }

    /// Set the name of the next field.
    pub fn write_name(&mut self, name: &str) -> CodecResult<()> {
        self.stack.name(name)
    }

    scalar_writers! {
        /// Write a 32-bit integer.
        write_int32, write_int32_named(value: i32) => Bson::Int32(value);
        /// Write a 64-bit integer.
        write_int64, write_int64_named(value: i64) => Bson::Int64(value);
        /// Write a double.
        write_double, write_double_named(value: f64) => Bson::Double(value);
        /// Write a 128-bit decimal.
        write_decimal128, write_decimal128_named(value: Decimal128) => Bson::Decimal128(value);
        /// Write a string.
        write_string, write_string_named(value: &str) => Bson::String(value.to_string());
        /// Write a boolean.
        write_boolean, write_boolean_named(value: bool) => Bson::Boolean(value);
        /// Write a null.
        write_null, write_null_named() => Bson::Null;
        /// Write binary data.
        write_binary, write_binary_named(value: Binary) => Bson::Binary(value);
        /// Write a UTC datetime.
        write_date_time, write_date_time_named(value: DateTime) => Bson::DateTime(value);
        /// Write an ObjectId.
        write_object_id, write_object_id_named(value: ObjectId) => Bson::ObjectId(value);
        /// Write a symbol.
        write_symbol, write_symbol_named(value: &str) => Bson::Symbol(value.to_string());
        /// Write an internal timestamp.
        write_timestamp, write_timestamp_named(value: Timestamp) => Bson::Timestamp(value);
        /// Write a regular expression.
        write_regular_expression, write_regular_expression_named(pattern: &str, options: &str) => Bson::RegularExpression(Regex {
            pattern: pattern.to_string(),
            options: options.to_string(),
        });
        /// Write JavaScript code.
        write_javascript, write_javascript_named(code: &str) => Bson::JavaScriptCode(code.to_string());
        /// Write the min key.
        write_min_key, write_min_key_named() => Bson::MinKey;
        /// Write the max key.
        write_max_key, write_max_key_named() => Bson::MaxKey;
        /// Write a prebuilt value, which may itself be a document or array.
        write_bson, write_bson_named(value: Bson) => value;
    }

    /// Write a prebuilt value, expanding a document into its fields.
    ///
    /// Unlike [`write_bson`](Self::write_bson) this also works at the root
    /// and merges into a seed.
    pub fn pipe(&mut self, value: &Bson) -> CodecResult<()> {
        match value {
            Bson::Document(document) => self.pipe_document(document),
            other => self.write_bson(other.clone()),
        }
    }

    /// Write every field of `document` as a new document.
    pub fn pipe_document(&mut self, document: &Document) -> CodecResult<()> {
        self.write_start_document()?;
        for (name, value) in document {
            self.write_bson_named(name, value.clone())?;
        }
        self.write_end_document()
    }

    /// Write a document, running `body` between its start and end.
    pub fn write_document<F>(&mut self, body: F) -> CodecResult<()>
    where
        F: FnOnce(&mut Self) -> CodecResult<()>,
    {
        self.write_start_document()?;
        body(self)?;
        self.write_end_document()
    }

    /// Write a document as field `name`, running `body` inside it.
    pub fn write_document_named<F>(&mut self, name: &str, body: F) -> CodecResult<()>
    where
        F: FnOnce(&mut Self) -> CodecResult<()>,
    {
        self.write_start_document_named(name)?;
        body(self)?;
        self.write_end_document()
    }

    /// Write an array, running `body` between its start and end.
    pub fn write_array<F>(&mut self, body: F) -> CodecResult<()>
    where
        F: FnOnce(&mut Self) -> CodecResult<()>,
    {
        self.write_start_array()?;
        body(self)?;
        self.write_end_array()
    }

    /// Write an array as field `name`, running `body` inside it.
    pub fn write_array_named<F>(&mut self, name: &str, body: F) -> CodecResult<()>
    where
        F: FnOnce(&mut Self) -> CodecResult<()>,
    {
        self.write_start_array_named(name)?;
        body(self)?;
        self.write_end_array()
    }

    /// The finished document.
    ///
    /// Returns `None` until the writer is back at the root with one completed
    /// top-level document.
    pub fn document(&self) -> Option<&Document> {
        if self.stack.depth() != 0 {
            return None;
        }
        self.stack.finished().and_then(Bson::as_document)
    }

    /// Consume the writer and return the finished document, if any.
    pub fn into_document(mut self) -> Option<Document> {
        match self.stack.take_finished() {
            Some(Bson::Document(document)) => Some(document),
            _ => None,
        }
    }

    /// Consume the writer and return the finished value, if any.
    pub fn into_value(mut self) -> Option<Bson> {
        self.stack.take_finished()
    }

    /// Like [`into_document`](Self::into_document) but reports why the
    /// document is unavailable.
    pub fn finish(self) -> CodecResult<Document> {
        match self.finish_value()? {
            Bson::Document(document) => Ok(document),
            other => Err(CodecError::internal(format!(
                "top-level value is {} rather than a document",
                crate::types::BsonType::of(&other)
            ))),
        }
    }

    /// Like [`into_value`](Self::into_value) but reports why the value is
    /// unavailable.
    pub fn finish_value(mut self) -> CodecResult<Bson> {
        let depth = self.stack.depth();
        if depth != 0 {
            return Err(NestingError::Incomplete { depth }.into());
        }
        self.stack
            .take_finished()
            .ok_or_else(|| NestingError::Incomplete { depth: 0 }.into())
    }
}

impl fmt::Display for DocumentWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document() {
            Some(document) => write!(f, "{}", document),
            None => f.write_str("<<undefined>>"),
        }
    }
}
