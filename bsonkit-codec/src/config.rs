//! Mapping configuration.
//!
//! A [`MappingConfig`] selects the UUID binary layout and overrides the wire
//! representation of the value codecs. It can be built in code or loaded
//! from TOML:
//!
//! ```rust
//! use bsonkit_codec::{BsonType, MappingConfig, UuidRepresentation};
//!
//! let config = MappingConfig::from_toml_str(r#"
//!     uuid_representation = "java_legacy"
//!
//!     [representations]
//!     integer = "string"
//!     date_time = "long"
//! "#).unwrap();
//!
//! assert_eq!(config.uuid_representation, UuidRepresentation::JavaLegacy);
//! assert_eq!(config.representations.integer, Some(BsonType::String));
//! ```

use serde::{Deserialize, Serialize};

use crate::codecs::{UuidRepresentation, ValueCodecProvider, uuid_representation_name};
use crate::error::{CodecError, CodecResult};
use crate::types::BsonType;

/// Representation overrides for the value codecs. `None` keeps the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepresentationConfig {
    /// `i8`, `i16`, `i32`, `u8` and `u16`.
    pub integer: Option<BsonType>,
    /// `i64` and `u32`.
    pub long: Option<BsonType>,
    /// `f64` and `f32`.
    pub double: Option<BsonType>,
    /// `bool`.
    pub boolean: Option<BsonType>,
    /// `String`.
    pub string: Option<BsonType>,
    /// `ObjectId`.
    pub object_id: Option<BsonType>,
    /// `chrono::DateTime<Utc>`.
    pub date_time: Option<BsonType>,
    /// `rust_decimal::Decimal`.
    pub decimal: Option<BsonType>,
    /// `uuid::Uuid`.
    pub uuid: Option<BsonType>,
}

/// Configuration of the value codecs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingConfig {
    /// Layout of binary UUIDs, named in snake_case (`java_legacy`).
    #[serde(with = "uuid_representation_name")]
    pub uuid_representation: UuidRepresentation,
    /// Per-type representation overrides.
    pub representations: RepresentationConfig,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            uuid_representation: UuidRepresentation::Standard,
            representations: RepresentationConfig::default(),
        }
    }
}

impl MappingConfig {
    /// Create a builder.
    pub fn builder() -> MappingConfigBuilder {
        MappingConfigBuilder::new()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> CodecResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| CodecError::config(format!("invalid mapping config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every override against the codec it applies to.
    pub fn validate(&self) -> CodecResult<()> {
        ValueCodecProvider::from_config(self).map(|_| ())
    }
}

/// Builder for [`MappingConfig`].
#[derive(Debug, Default)]
pub struct MappingConfigBuilder {
    config: MappingConfig,
}

impl MappingConfigBuilder {
    /// Create a builder with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the UUID binary layout.
    pub fn uuid_representation(mut self, layout: UuidRepresentation) -> Self {
        self.config.uuid_representation = layout;
        self
    }

    /// Set the representation of `i8`, `i16`, `i32`, `u8` and `u16`.
    pub fn integer_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.integer = Some(representation);
        self
    }

    /// Set the representation of `i64` and `u32`.
    pub fn long_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.long = Some(representation);
        self
    }

    /// Set the representation of `f64` and `f32`.
    pub fn double_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.double = Some(representation);
        self
    }

    /// Set the representation of `bool`.
    pub fn boolean_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.boolean = Some(representation);
        self
    }

    /// Set the representation of `String`.
    pub fn string_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.string = Some(representation);
        self
    }

    /// Set the representation of `ObjectId`.
    pub fn object_id_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.object_id = Some(representation);
        self
    }

    /// Set the representation of `chrono::DateTime<Utc>`.
    pub fn date_time_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.date_time = Some(representation);
        self
    }

    /// Set the representation of `rust_decimal::Decimal`.
    pub fn decimal_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.decimal = Some(representation);
        self
    }

    /// Set the representation of `uuid::Uuid`.
    pub fn uuid_value_representation(mut self, representation: BsonType) -> Self {
        self.config.representations.uuid = Some(representation);
        self
    }

    /// Build the configuration. Overrides are checked when it is applied.
    pub fn build(self) -> MappingConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = MappingConfig::default();
        assert_eq!(config.uuid_representation, UuidRepresentation::Standard);
        assert_eq!(config.representations, RepresentationConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = MappingConfig::builder()
            .uuid_representation(UuidRepresentation::CSharpLegacy)
            .long_representation(BsonType::Decimal128)
            .build();
        assert_eq!(config.uuid_representation, UuidRepresentation::CSharpLegacy);
        assert_eq!(config.representations.long, Some(BsonType::Decimal128));
        assert_eq!(config.representations.integer, None);
    }

    #[test]
    fn test_from_toml() {
        let config = MappingConfig::from_toml_str(
            r#"
            [representations]
            long = "string"
            boolean = "int"
            "#,
        )
        .unwrap();
        assert_eq!(config.representations.long, Some(BsonType::String));
        assert_eq!(config.representations.boolean, Some(BsonType::Int32));
    }

    #[test]
    fn test_invalid_representation_rejected() {
        let err = MappingConfig::from_toml_str(
            r#"
            [representations]
            integer = "bool"
            "#,
        )
        .unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("bool"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = MappingConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(err.is_configuration_error());
        assert!(MappingConfig::from_toml_str("[representations]\ninteger = \"varchar\"").is_err());
    }
}
