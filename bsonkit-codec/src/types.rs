//! BSON element kinds.

use std::fmt;
use std::str::FromStr;

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// The closed set of BSON element kinds.
///
/// Used to name wire representations when configuring codecs and in
/// type-mismatch errors. The string form is the MongoDB `$type` alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BsonType {
    /// 64-bit binary floating point.
    #[serde(rename = "double")]
    Double,
    /// UTF-8 string.
    #[serde(rename = "string")]
    String,
    /// Embedded document.
    #[serde(rename = "object", alias = "document")]
    Document,
    /// Array.
    #[serde(rename = "array")]
    Array,
    /// Binary data.
    #[serde(rename = "binData", alias = "binary")]
    Binary,
    /// Deprecated undefined value.
    #[serde(rename = "undefined")]
    Undefined,
    /// ObjectId.
    #[serde(rename = "objectId")]
    ObjectId,
    /// Boolean.
    #[serde(rename = "bool", alias = "boolean")]
    Boolean,
    /// UTC datetime in milliseconds.
    #[serde(rename = "date", alias = "datetime")]
    DateTime,
    /// Null.
    #[serde(rename = "null")]
    Null,
    /// Regular expression.
    #[serde(rename = "regex")]
    RegularExpression,
    /// Deprecated DBPointer.
    #[serde(rename = "dbPointer")]
    DbPointer,
    /// JavaScript code.
    #[serde(rename = "javascript")]
    JavaScriptCode,
    /// Deprecated symbol.
    #[serde(rename = "symbol")]
    Symbol,
    /// JavaScript code with scope.
    #[serde(rename = "javascriptWithScope")]
    JavaScriptCodeWithScope,
    /// 32-bit integer.
    #[serde(rename = "int", alias = "int32")]
    Int32,
    /// Internal timestamp.
    #[serde(rename = "timestamp")]
    Timestamp,
    /// 64-bit integer.
    #[serde(rename = "long", alias = "int64")]
    Int64,
    /// 128-bit decimal floating point.
    #[serde(rename = "decimal", alias = "decimal128")]
    Decimal128,
    /// Min key.
    #[serde(rename = "minKey")]
    MinKey,
    /// Max key.
    #[serde(rename = "maxKey")]
    MaxKey,
}

impl BsonType {
    /// Every element kind, in BSON type-number order.
    pub const ALL: [BsonType; 21] = [
        BsonType::MinKey,
        BsonType::Double,
        BsonType::String,
        BsonType::Document,
        BsonType::Array,
        BsonType::Binary,
        BsonType::Undefined,
        BsonType::ObjectId,
        BsonType::Boolean,
        BsonType::DateTime,
        BsonType::Null,
        BsonType::RegularExpression,
        BsonType::DbPointer,
        BsonType::JavaScriptCode,
        BsonType::Symbol,
        BsonType::JavaScriptCodeWithScope,
        BsonType::Int32,
        BsonType::Timestamp,
        BsonType::Int64,
        BsonType::Decimal128,
        BsonType::MaxKey,
    ];

    /// Get the element kind of a value.
    pub fn of(value: &Bson) -> Self {
        match value {
            Bson::Double(_) => Self::Double,
            Bson::String(_) => Self::String,
            Bson::Array(_) => Self::Array,
            Bson::Document(_) => Self::Document,
            Bson::Boolean(_) => Self::Boolean,
            Bson::Null => Self::Null,
            Bson::RegularExpression(_) => Self::RegularExpression,
            Bson::JavaScriptCode(_) => Self::JavaScriptCode,
            Bson::JavaScriptCodeWithScope(_) => Self::JavaScriptCodeWithScope,
            Bson::Int32(_) => Self::Int32,
            Bson::Int64(_) => Self::Int64,
            Bson::Timestamp(_) => Self::Timestamp,
            Bson::Binary(_) => Self::Binary,
            Bson::ObjectId(_) => Self::ObjectId,
            Bson::DateTime(_) => Self::DateTime,
            Bson::Symbol(_) => Self::Symbol,
            Bson::Decimal128(_) => Self::Decimal128,
            Bson::Undefined => Self::Undefined,
            Bson::MaxKey => Self::MaxKey,
            Bson::MinKey => Self::MinKey,
            Bson::DbPointer(_) => Self::DbPointer,
        }
    }

    /// The `$type` alias, e.g. `"int"` or `"objectId"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::String => "string",
            Self::Document => "object",
            Self::Array => "array",
            Self::Binary => "binData",
            Self::Undefined => "undefined",
            Self::ObjectId => "objectId",
            Self::Boolean => "bool",
            Self::DateTime => "date",
            Self::Null => "null",
            Self::RegularExpression => "regex",
            Self::DbPointer => "dbPointer",
            Self::JavaScriptCode => "javascript",
            Self::Symbol => "symbol",
            Self::JavaScriptCodeWithScope => "javascriptWithScope",
            Self::Int32 => "int",
            Self::Timestamp => "timestamp",
            Self::Int64 => "long",
            Self::Decimal128 => "decimal",
            Self::MinKey => "minKey",
            Self::MaxKey => "maxKey",
        }
    }

    /// The numeric BSON type code.
    pub fn number(&self) -> i32 {
        match self {
            Self::Double => 1,
            Self::String => 2,
            Self::Document => 3,
            Self::Array => 4,
            Self::Binary => 5,
            Self::Undefined => 6,
            Self::ObjectId => 7,
            Self::Boolean => 8,
            Self::DateTime => 9,
            Self::Null => 10,
            Self::RegularExpression => 11,
            Self::DbPointer => 12,
            Self::JavaScriptCode => 13,
            Self::Symbol => 14,
            Self::JavaScriptCodeWithScope => 15,
            Self::Int32 => 16,
            Self::Timestamp => 17,
            Self::Int64 => 18,
            Self::Decimal128 => 19,
            Self::MinKey => -1,
            Self::MaxKey => 127,
        }
    }

    /// Whether this kind holds a number.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int32 | Self::Int64 | Self::Double | Self::Decimal128
        )
    }

    /// Whether this kind is a container.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Document | Self::Array)
    }
}

impl fmt::Display for BsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BsonType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "double" => Self::Double,
            "string" => Self::String,
            "object" | "document" => Self::Document,
            "array" => Self::Array,
            "binData" | "binary" => Self::Binary,
            "undefined" => Self::Undefined,
            "objectId" => Self::ObjectId,
            "bool" | "boolean" => Self::Boolean,
            "date" | "datetime" => Self::DateTime,
            "null" => Self::Null,
            "regex" => Self::RegularExpression,
            "dbPointer" => Self::DbPointer,
            "javascript" => Self::JavaScriptCode,
            "symbol" => Self::Symbol,
            "javascriptWithScope" => Self::JavaScriptCodeWithScope,
            "int" | "int32" => Self::Int32,
            "timestamp" => Self::Timestamp,
            "long" | "int64" => Self::Int64,
            "decimal" | "decimal128" => Self::Decimal128,
            "minKey" => Self::MinKey,
            "maxKey" => Self::MaxKey,
            other => {
                return Err(CodecError::config(format!("unknown BSON type '{}'", other)));
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_of() {
        assert_eq!(BsonType::of(&Bson::Int32(1)), BsonType::Int32);
        assert_eq!(BsonType::of(&Bson::Int64(1)), BsonType::Int64);
        assert_eq!(BsonType::of(&Bson::Document(doc! {})), BsonType::Document);
        assert_eq!(BsonType::of(&Bson::Null), BsonType::Null);
    }

    #[test]
    fn test_aliases_round_trip() {
        for kind in BsonType::ALL {
            assert_eq!(kind.as_str().parse::<BsonType>().unwrap(), kind);
        }
        assert_eq!("int32".parse::<BsonType>().unwrap(), BsonType::Int32);
        assert!("varchar".parse::<BsonType>().is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(BsonType::Int32.number(), 16);
        assert_eq!(BsonType::Decimal128.number(), 19);
        assert_eq!(BsonType::MinKey.number(), -1);
        assert!(BsonType::Int64.is_numeric());
        assert!(!BsonType::String.is_numeric());
    }
}
