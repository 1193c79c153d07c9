//! Integer, floating point and decimal codecs.
//!
//! Every numeric codec decodes from any numeric wire kind and from numeric
//! strings, range-checking into the target type. Narrowing never truncates:
//! a value that does not fit fails with [`CodecError::OutOfRange`].

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use bson::Bson;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::codec::{
    Decoder, DecoderContext, Encoder, EncoderContext, RepresentationConfigurable,
    check_representation,
};
use crate::decimal;
use crate::error::{CodecError, CodecResult};
use crate::reader::DocumentReader;
use crate::types::BsonType;
use crate::writer::DocumentWriter;

const INTEGER_REPRESENTATIONS: &[BsonType] = &[
    BsonType::Int32,
    BsonType::Int64,
    BsonType::Double,
    BsonType::Decimal128,
    BsonType::String,
];

const FLOAT_REPRESENTATIONS: &[BsonType] = &[BsonType::Double, BsonType::String];

const DECIMAL_REPRESENTATIONS: &[BsonType] = &[BsonType::Decimal128, BsonType::String];

/// Largest magnitude a double holds without losing integer precision.
const MAX_EXACT_DOUBLE: u64 = 1 << 53;

/// Integer types handled by [`IntegerCodec`].
pub trait IntegerType:
    Copy + Into<i64> + TryFrom<i64> + fmt::Display + fmt::Debug + Send + Sync + 'static
{
    /// Type name used in errors.
    const NAME: &'static str;
    /// Representation used by [`IntegerCodec::new`].
    const DEFAULT_REPRESENTATION: BsonType;
}

macro_rules! integer_types {
    ($($ty:ty => $default:ident),* $(,)?) => {
        $(
            impl IntegerType for $ty {
                const NAME: &'static str = stringify!($ty);
                const DEFAULT_REPRESENTATION: BsonType = BsonType::$default;
            }
        )*
    };
}

integer_types! {
    i8 => Int32,
    i16 => Int32,
    i32 => Int32,
    u8 => Int32,
    u16 => Int32,
    i64 => Int64,
    u32 => Int64,
}

/// Codec for the integer types.
///
/// ```rust
/// use bsonkit_codec::{BsonType, IntegerCodec, RepresentationConfigurable};
///
/// let codec = IntegerCodec::<i16>::new();
/// assert_eq!(codec.representation(), BsonType::Int32);
///
/// assert!(codec.with_representation(BsonType::String).is_ok());
/// assert!(codec.with_representation(BsonType::Boolean).is_err());
/// ```
pub struct IntegerCodec<T> {
    representation: BsonType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: IntegerType> IntegerCodec<T> {
    /// Create a codec bound to the type's default representation.
    pub fn new() -> Self {
        Self {
            representation: T::DEFAULT_REPRESENTATION,
            _marker: PhantomData,
        }
    }
}

impl<T: IntegerType> Default for IntegerCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for IntegerCodec<T> {
    fn clone(&self) -> Self {
        Self {
            representation: self.representation,
            _marker: PhantomData,
        }
    }
}

impl<T: IntegerType> fmt::Debug for IntegerCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegerCodec")
            .field("type", &T::NAME)
            .field("representation", &self.representation)
            .finish()
    }
}

impl<T: IntegerType> RepresentationConfigurable for IntegerCodec<T> {
    fn representation(&self) -> BsonType {
        self.representation
    }

    fn supported_representations(&self) -> &'static [BsonType] {
        INTEGER_REPRESENTATIONS
    }

    fn with_representation(&self, representation: BsonType) -> CodecResult<Self> {
        check_representation(T::NAME, INTEGER_REPRESENTATIONS, representation)?;
        Ok(Self {
            representation,
            _marker: PhantomData,
        })
    }
}

impl<T: IntegerType> Encoder<T> for IntegerCodec<T> {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &T,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        let wide: i64 = (*value).into();
        match self.representation {
            BsonType::Int32 => {
                let narrow =
                    i32::try_from(wide).map_err(|_| CodecError::out_of_range(wide, "int"))?;
                writer.write_int32(narrow)
            }
            BsonType::Int64 => writer.write_int64(wide),
            BsonType::Double => {
                if wide.unsigned_abs() > MAX_EXACT_DOUBLE {
                    return Err(CodecError::out_of_range(wide, "double"));
                }
                writer.write_double(wide as f64)
            }
            BsonType::Decimal128 => writer.write_decimal128(decimal::from_i64(wide)?),
            BsonType::String => writer.write_string(&wide.to_string()),
            other => Err(unsupported_at_encode(T::NAME, other)),
        }
    }
}

impl<T: IntegerType> Decoder<T> for IntegerCodec<T> {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<T> {
        let wide = read_integer(reader)?;
        T::try_from(wide).map_err(|_| CodecError::out_of_range(wide, T::NAME))
    }
}

/// Read any numeric wire value or numeric string as an `i64`.
pub(crate) fn read_integer(reader: &mut DocumentReader) -> CodecResult<i64> {
    match reader.read_bson()? {
        Bson::Int32(v) => Ok(v.into()),
        Bson::Int64(v) => Ok(v),
        Bson::Double(v) => double_to_i64(v),
        Bson::Decimal128(v) => decimal::to_i64(&v),
        Bson::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CodecError::invalid_value(format!("'{}' is not an integer", s))),
        other => Err(CodecError::unexpected("a number", BsonType::of(&other))),
    }
}

fn double_to_i64(value: f64) -> CodecResult<i64> {
    // i64::MAX is not a double; 2^63 is the first value past it.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(CodecError::out_of_range(value, "an integer"));
    }
    if !(-LIMIT..LIMIT).contains(&value) {
        return Err(CodecError::out_of_range(value, "i64"));
    }
    Ok(value as i64)
}

fn unsupported_at_encode(type_name: &str, representation: BsonType) -> CodecError {
    CodecError::internal(format!(
        "{} codec is bound to unsupported representation {}",
        type_name, representation
    ))
}

/// Floating point types handled by [`FloatCodec`].
pub trait FloatType: Copy + fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Type name used in errors.
    const NAME: &'static str;

    /// Widen to `f64`.
    fn to_f64(self) -> f64;

    /// Narrow from `f64`, or `None` if a finite value is out of range.
    fn from_f64(value: f64) -> Option<Self>;
}

impl FloatType for f64 {
    const NAME: &'static str = "f64";

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Option<Self> {
        Some(value)
    }
}

impl FloatType for f32 {
    const NAME: &'static str = "f32";

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Option<Self> {
        if value.is_finite() && value.abs() > f32::MAX as f64 {
            None
        } else {
            Some(value as f32)
        }
    }
}

/// Codec for `f64` and `f32`.
pub struct FloatCodec<T> {
    representation: BsonType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FloatType> FloatCodec<T> {
    /// Create a codec that writes doubles.
    pub fn new() -> Self {
        Self {
            representation: BsonType::Double,
            _marker: PhantomData,
        }
    }
}

impl<T: FloatType> Default for FloatCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FloatCodec<T> {
    fn clone(&self) -> Self {
        Self {
            representation: self.representation,
            _marker: PhantomData,
        }
    }
}

impl<T: FloatType> fmt::Debug for FloatCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatCodec")
            .field("type", &T::NAME)
            .field("representation", &self.representation)
            .finish()
    }
}

impl<T: FloatType> RepresentationConfigurable for FloatCodec<T> {
    fn representation(&self) -> BsonType {
        self.representation
    }

    fn supported_representations(&self) -> &'static [BsonType] {
        FLOAT_REPRESENTATIONS
    }

    fn with_representation(&self, representation: BsonType) -> CodecResult<Self> {
        check_representation(T::NAME, FLOAT_REPRESENTATIONS, representation)?;
        Ok(Self {
            representation,
            _marker: PhantomData,
        })
    }
}

impl<T: FloatType> Encoder<T> for FloatCodec<T> {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &T,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match self.representation {
            BsonType::Double => writer.write_double(value.to_f64()),
            BsonType::String => writer.write_string(&value.to_string()),
            other => Err(unsupported_at_encode(T::NAME, other)),
        }
    }
}

impl<T: FloatType> Decoder<T> for FloatCodec<T> {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<T> {
        let wide = match reader.read_bson()? {
            Bson::Double(v) => v,
            Bson::Int32(v) => v.into(),
            Bson::Int64(v) => {
                if v.unsigned_abs() > MAX_EXACT_DOUBLE {
                    return Err(CodecError::out_of_range(v, T::NAME));
                }
                v as f64
            }
            Bson::Decimal128(v) => decimal::to_decimal(&v)?
                .to_f64()
                .ok_or_else(|| CodecError::out_of_range(v, T::NAME))?,
            Bson::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CodecError::invalid_value(format!("'{}' is not a number", s)))?,
            other => return Err(CodecError::unexpected("a number", BsonType::of(&other))),
        };
        T::from_f64(wide).ok_or_else(|| CodecError::out_of_range(wide, T::NAME))
    }
}

/// Codec for `rust_decimal::Decimal`.
#[derive(Debug, Clone, Copy)]
pub struct DecimalCodec {
    representation: BsonType,
}

impl DecimalCodec {
    /// Create a codec that writes Decimal128.
    pub fn new() -> Self {
        Self {
            representation: BsonType::Decimal128,
        }
    }
}

impl Default for DecimalCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RepresentationConfigurable for DecimalCodec {
    fn representation(&self) -> BsonType {
        self.representation
    }

    fn supported_representations(&self) -> &'static [BsonType] {
        DECIMAL_REPRESENTATIONS
    }

    fn with_representation(&self, representation: BsonType) -> CodecResult<Self> {
        check_representation("Decimal", DECIMAL_REPRESENTATIONS, representation)?;
        Ok(Self { representation })
    }
}

impl Encoder<Decimal> for DecimalCodec {
    fn encode(
        &self,
        writer: &mut DocumentWriter,
        value: &Decimal,
        _ctx: &EncoderContext<'_>,
    ) -> CodecResult<()> {
        match self.representation {
            BsonType::Decimal128 => writer.write_decimal128(decimal::from_decimal(value)?),
            BsonType::String => writer.write_string(&value.to_string()),
            other => Err(unsupported_at_encode("Decimal", other)),
        }
    }
}

impl Decoder<Decimal> for DecimalCodec {
    fn decode(&self, reader: &mut DocumentReader, _ctx: &DecoderContext<'_>) -> CodecResult<Decimal> {
        match reader.read_bson()? {
            Bson::Decimal128(v) => decimal::to_decimal(&v),
            Bson::Int32(v) => Ok(Decimal::from(v)),
            Bson::Int64(v) => Ok(Decimal::from(v)),
            Bson::Double(v) => {
                Decimal::try_from(v).map_err(|_| CodecError::out_of_range(v, "Decimal"))
            }
            Bson::String(s) => Decimal::from_str(s.trim())
                .map_err(|_| CodecError::invalid_value(format!("'{}' is not a decimal", s))),
            other => Err(CodecError::unexpected("a number", BsonType::of(&other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::testing::{decode_value, encode_value};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_short_round_trips_every_representation() {
        let codec = IntegerCodec::<i16>::new();
        for representation in codec.supported_representations() {
            let bound = codec.with_representation(*representation).unwrap();
            for value in [7i16, 0, i16::MIN, i16::MAX] {
                let wire = encode_value(&bound, &value).unwrap();
                assert_eq!(BsonType::of(&wire), *representation);
                assert_eq!(decode_value::<i16, _>(&bound, wire).unwrap(), value);
            }
        }
    }

    #[test]
    fn test_short_as_string() {
        let codec = IntegerCodec::<i16>::new()
            .with_representation(BsonType::String)
            .unwrap();
        assert_eq!(encode_value(&codec, &7i16).unwrap(), Bson::String("7".into()));
        assert_eq!(decode_value::<i16, _>(&codec, Bson::String("7".into())).unwrap(), 7);
    }

    #[test]
    fn test_unsupported_representation_rejected_at_configuration() {
        let codec = IntegerCodec::<i16>::new();
        for rejected in [BsonType::Boolean, BsonType::Binary] {
            let err = codec.with_representation(rejected).unwrap_err();
            assert_eq!(
                err,
                CodecError::UnsupportedRepresentation {
                    type_name: "i16",
                    representation: rejected,
                }
            );
        }
        // The original codec is untouched.
        assert_eq!(codec.representation(), BsonType::Int32);
    }

    #[test]
    fn test_narrowing_decode_is_range_checked() {
        let codec = IntegerCodec::<i16>::new();
        let err = decode_value::<i16, _>(&codec, Bson::Int32(100000)).unwrap_err();
        assert!(err.is_data_error());
        assert_eq!(err.to_string(), "100000 cannot be represented as i16");

        assert_eq!(decode_value::<i16, _>(&codec, Bson::Int32(100)).unwrap(), 100);
        assert_eq!(decode_value::<i16, _>(&codec, Bson::Int64(-5)).unwrap(), -5);
        assert_eq!(decode_value::<i16, _>(&codec, Bson::Double(12.0)).unwrap(), 12);
        assert!(decode_value::<i16, _>(&codec, Bson::Double(1.5)).is_err());
        assert!(decode_value::<u8, _>(&IntegerCodec::<u8>::new(), Bson::Int32(-1)).is_err());
    }

    #[test]
    fn test_long_defaults_to_int64() {
        let codec = IntegerCodec::<i64>::new();
        assert_eq!(encode_value(&codec, &5i64).unwrap(), Bson::Int64(5));

        let narrow = codec.with_representation(BsonType::Int32).unwrap();
        let err = encode_value(&narrow, &i64::MAX).unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_non_numeric_string_is_invalid() {
        let codec = IntegerCodec::<i32>::new();
        let err = decode_value::<i32, _>(&codec, Bson::String("seven".into())).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue(_)));
        let err = decode_value::<i32, _>(&codec, Bson::Boolean(true)).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedType { .. }));
    }

    #[test]
    fn test_float_codecs() {
        let codec = FloatCodec::<f64>::new();
        assert_eq!(encode_value(&codec, &1.25f64).unwrap(), Bson::Double(1.25));
        assert_eq!(decode_value::<f64, _>(&codec, Bson::Int32(3)).unwrap(), 3.0);

        let codec = FloatCodec::<f32>::new()
            .with_representation(BsonType::String)
            .unwrap();
        let wire = encode_value(&codec, &0.1f32).unwrap();
        assert_eq!(wire, Bson::String("0.1".into()));
        assert_eq!(decode_value::<f32, _>(&codec, wire).unwrap(), 0.1f32);
        assert!(decode_value::<f32, _>(&codec, Bson::Double(1e300)).is_err());
        assert!(codec.with_representation(BsonType::Int32).is_err());
    }

    #[test]
    fn test_decimal_codec() {
        let value = Decimal::from_str("-12.50").unwrap();
        let codec = DecimalCodec::new();
        let wire = encode_value(&codec, &value).unwrap();
        assert_eq!(BsonType::of(&wire), BsonType::Decimal128);
        assert_eq!(decode_value::<Decimal, _>(&codec, wire).unwrap(), value);

        let codec = codec.with_representation(BsonType::String).unwrap();
        let wire = encode_value(&codec, &value).unwrap();
        assert_eq!(wire, Bson::String("-12.50".into()));
        assert_eq!(decode_value::<Decimal, _>(&codec, wire).unwrap(), value);
    }

    #[test]
    fn test_decimal128_in_exponent_form() {
        let wire = Bson::Decimal128(bson::Decimal128::from_str("1.5E+3").unwrap());
        assert_eq!(
            decode_value::<i64, _>(&IntegerCodec::<i64>::new(), wire.clone()).unwrap(),
            1500
        );
        assert_eq!(
            decode_value::<Decimal, _>(&DecimalCodec::new(), wire).unwrap(),
            Decimal::from(1500)
        );

        let codec = IntegerCodec::<i64>::new()
            .with_representation(BsonType::Decimal128)
            .unwrap();
        match encode_value(&codec, &-42i64).unwrap() {
            Bson::Decimal128(d) => assert_eq!(d.to_string(), "-42"),
            other => panic!("expected Decimal128, got {other:?}"),
        }
    }
}
