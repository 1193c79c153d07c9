//! Decimal128 conversions.
//!
//! Values cross between `bson::Decimal128` and Rust numbers through their
//! canonical string form. Only finite values convert; NaN and the
//! infinities are rejected as invalid values.

use std::str::FromStr;

use bson::Decimal128;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{CodecError, CodecResult};

fn parse(text: &str) -> CodecResult<Decimal128> {
    Decimal128::from_str(text)
        .map_err(|e| CodecError::invalid_value(format!("'{text}' is not a Decimal128: {e}")))
}

/// Encode an integer as Decimal128 with a zero exponent.
pub fn from_i64(value: i64) -> CodecResult<Decimal128> {
    parse(&value.to_string())
}

/// Decode a Decimal128 that must hold an integral value within `i64`.
pub fn to_i64(value: &Decimal128) -> CodecResult<i64> {
    let decimal = to_decimal(value).map_err(|err| match err {
        CodecError::OutOfRange { .. } => CodecError::out_of_range(value, "i64"),
        other => other,
    })?;
    if !decimal.fract().is_zero() {
        return Err(CodecError::invalid_value(format!(
            "Decimal128 {value} is not an integer"
        )));
    }
    decimal
        .to_i64()
        .ok_or_else(|| CodecError::out_of_range(value, "i64"))
}

/// Encode a `rust_decimal::Decimal` without losing digits.
pub fn from_decimal(value: &Decimal) -> CodecResult<Decimal128> {
    parse(&value.to_string())
}

/// Decode a Decimal128 into a `rust_decimal::Decimal`.
pub fn to_decimal(value: &Decimal128) -> CodecResult<Decimal> {
    let text = value.to_string();
    if text.ends_with("NaN") || text.ends_with("Infinity") {
        return Err(CodecError::invalid_value(format!(
            "Decimal128 {text} is not a finite number"
        )));
    }
    let parsed = if text.contains('E') {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str(&text)
    };
    parsed.map_err(|_| CodecError::out_of_range(text, "Decimal"))
}
