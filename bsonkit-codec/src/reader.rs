//! Document reader cursor.
//!
//! [`DocumentReader`] is the decoding dual of
//! [`DocumentWriter`](crate::DocumentWriter): a cursor over an in-memory
//! [`Bson`] tree that decoders consume token by token.

use std::collections::VecDeque;

use bson::oid::ObjectId;
use bson::{Binary, Bson, DateTime, Decimal128, Document, Regex, Timestamp};

use crate::error::{CodecError, CodecResult, NestingError};
use crate::types::BsonType;

/// Generates a typed reader for one scalar kind.
///
/// The kind is checked before the value is taken, so a mismatch leaves the
/// cursor where it was.
macro_rules! scalar_readers {
    ($(
        $(#[$doc:meta])*
        $name:ident -> $ty:ty: $kind:ident, $pat:pat => $out:expr;
    )*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) -> CodecResult<$ty> {
                self.expect_kind(BsonType::$kind)?;
                match self.take_value()? {
                    $pat => Ok($out),
                    other => Err(CodecError::unexpected(
                        BsonType::$kind.as_str(),
                        BsonType::of(&other),
                    )),
                }
            }
        )*
    };
}

#[derive(Debug)]
enum ReadFrame {
    Root(Option<Bson>),
    Document(VecDeque<(String, Bson)>),
    Array(VecDeque<Bson>),
}

impl ReadFrame {
    fn name(&self) -> &'static str {
        match self {
            Self::Root(_) => "root",
            Self::Document(_) => "document",
            Self::Array(_) => "array",
        }
    }

    fn front(&self) -> Option<&Bson> {
        match self {
            Self::Root(value) => value.as_ref(),
            Self::Document(entries) => entries.front().map(|(_, value)| value),
            Self::Array(elements) => elements.front(),
        }
    }

    fn take(&mut self) -> Option<Bson> {
        match self {
            Self::Root(value) => value.take(),
            Self::Document(entries) => entries.pop_front().map(|(_, value)| value),
            Self::Array(elements) => elements.pop_front(),
        }
    }

    fn is_empty(&self) -> bool {
        self.front().is_none()
    }
}

/// Cursor over a BSON value.
#[derive(Debug)]
pub struct DocumentReader {
    frames: Vec<ReadFrame>,
}

impl DocumentReader {
    /// Create a reader over a document.
    pub fn new(document: Document) -> Self {
        Self::from_bson(Bson::Document(document))
    }

    /// Create a reader over any value.
    pub fn from_bson(value: Bson) -> Self {
        Self {
            frames: vec![ReadFrame::Root(Some(value))],
        }
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Name of the current state (`root`, `document` or `array`).
    pub fn state_name(&self) -> &'static str {
        self.current().name()
    }

    fn current(&self) -> &ReadFrame {
        // The root frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    fn current_mut(&mut self) -> &mut ReadFrame {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    /// Whether the current container has another value.
    pub fn has_next(&self) -> bool {
        !self.current().is_empty()
    }

    /// Whether the whole input has been consumed.
    pub fn is_finished(&self) -> bool {
        self.depth() == 0 && !self.has_next()
    }

    /// Kind of the next value, or `None` at the end of the current container.
    pub fn peek_type(&self) -> Option<BsonType> {
        self.current().front().map(BsonType::of)
    }

    /// Borrow the next value without consuming it.
    pub fn peek(&self) -> Option<&Bson> {
        self.current().front()
    }

    /// Name of the next field. Only legal inside a document.
    pub fn read_name(&self) -> CodecResult<&str> {
        match self.current() {
            ReadFrame::Document(entries) => entries
                .front()
                .map(|(name, _)| name.as_str())
                .ok_or_else(|| NestingError::EndOfInput.into()),
            other => Err(NestingError::InvalidState {
                operation: "read a field name",
                state: other.name(),
            }
            .into()),
        }
    }

    /// Enter the next value, which must be a document.
    pub fn read_start_document(&mut self) -> CodecResult<()> {
        self.expect_kind(BsonType::Document)?;
        match self.take_value()? {
            Bson::Document(document) => {
                self.frames
                    .push(ReadFrame::Document(document.into_iter().collect()));
                Ok(())
            }
            other => Err(CodecError::unexpected("object", BsonType::of(&other))),
        }
    }

    /// Leave the current document. Every field must have been consumed.
    pub fn read_end_document(&mut self) -> CodecResult<()> {
        self.leave("end a document", "document")
    }

    /// Enter the next value, which must be an array.
    pub fn read_start_array(&mut self) -> CodecResult<()> {
        self.expect_kind(BsonType::Array)?;
        match self.take_value()? {
            Bson::Array(elements) => {
                self.frames.push(ReadFrame::Array(elements.into()));
                Ok(())
            }
            other => Err(CodecError::unexpected("array", BsonType::of(&other))),
        }
    }

    /// Leave the current array. Every element must have been consumed.
    pub fn read_end_array(&mut self) -> CodecResult<()> {
        self.leave("end an array", "array")
    }

    /// Take the next value whole, whatever its kind.
    pub fn read_bson(&mut self) -> CodecResult<Bson> {
        self.take_value()
    }

    /// Discard the next value.
    pub fn skip_value(&mut self) -> CodecResult<()> {
        self.take_value().map(|_| ())
    }

    scalar_readers! {
        /// Read a 32-bit integer.
        read_int32 -> i32: Int32, Bson::Int32(v) => v;
        /// Read a 64-bit integer.
        read_int64 -> i64: Int64, Bson::Int64(v) => v;
        /// Read a double.
        read_double -> f64: Double, Bson::Double(v) => v;
        /// Read a 128-bit decimal.
        read_decimal128 -> Decimal128: Decimal128, Bson::Decimal128(v) => v;
        /// Read a string.
        read_string -> String: String, Bson::String(v) => v;
        /// Read a boolean.
        read_boolean -> bool: Boolean, Bson::Boolean(v) => v;
        /// Read a null.
        read_null -> (): Null, Bson::Null => ();
        /// Read binary data.
        read_binary -> Binary: Binary, Bson::Binary(v) => v;
        /// Read a UTC datetime.
        read_date_time -> DateTime: DateTime, Bson::DateTime(v) => v;
        /// Read an ObjectId.
        read_object_id -> ObjectId: ObjectId, Bson::ObjectId(v) => v;
        /// Read a symbol.
        read_symbol -> String: Symbol, Bson::Symbol(v) => v;
        /// Read an internal timestamp.
        read_timestamp -> Timestamp: Timestamp, Bson::Timestamp(v) => v;
        /// Read a regular expression.
        read_regular_expression -> Regex: RegularExpression, Bson::RegularExpression(v) => v;
        /// Read JavaScript code.
        read_javascript -> String: JavaScriptCode, Bson::JavaScriptCode(v) => v;
        /// Read the min key.
        read_min_key -> (): MinKey, Bson::MinKey => ();
        /// Read the max key.
        read_max_key -> (): MaxKey, Bson::MaxKey => ();
    }

    fn expect_kind(&self, expected: BsonType) -> CodecResult<()> {
        match self.peek_type() {
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(CodecError::unexpected(expected.as_str(), found)),
            None => Err(NestingError::EndOfInput.into()),
        }
    }

    fn take_value(&mut self) -> CodecResult<Bson> {
        self.current_mut()
            .take()
            .ok_or_else(|| NestingError::EndOfInput.into())
    }

    fn leave(&mut self, operation: &'static str, container: &'static str) -> CodecResult<()> {
        let current = self.current();
        if current.name() != container {
            return Err(NestingError::InvalidState {
                operation,
                state: current.name(),
            }
            .into());
        }
        if !current.is_empty() {
            return Err(NestingError::UnreadElements { container }.into());
        }
        self.frames.pop();
        Ok(())
    }
}
