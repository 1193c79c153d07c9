//! Integration tests for mapping configuration loaded from TOML.

use bsonkit::aggregation::{aggregation_registry_with_config, filters};
use bsonkit::codec::{Bson, BsonType, CodecRegistry, MappingConfig, UuidRepresentation, doc};
use bson::spec::BinarySubtype;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

#[test]
fn test_config_minimal() {
    let config = MappingConfig::from_toml_str("").unwrap();
    assert_eq!(config, MappingConfig::default());
    assert_eq!(config.uuid_representation, UuidRepresentation::Standard);
}

#[test]
fn test_config_full() {
    let config = MappingConfig::from_toml_str(
        r#"
        uuid_representation = "python_legacy"

        [representations]
        integer = "long"
        double = "string"
        date_time = "string"
        "#,
    )
    .unwrap();

    assert_eq!(config.uuid_representation, UuidRepresentation::PythonLegacy);
    assert_eq!(config.representations.integer, Some(BsonType::Int64));
    assert_eq!(config.representations.double, Some(BsonType::String));

    let registry = CodecRegistry::from_config(&config).unwrap();
    assert_eq!(registry.encode_to_bson(&5i32).unwrap(), Bson::Int64(5));
    assert_eq!(
        registry
            .encode_to_bson(&Utc.timestamp_millis_opt(0).unwrap())
            .unwrap(),
        Bson::String("1970-01-01T00:00:00.000Z".into())
    );
    match registry.encode_to_bson(&Uuid::nil()).unwrap() {
        Bson::Binary(binary) => assert_eq!(binary.subtype, BinarySubtype::UuidOld),
        other => panic!("expected binary, got {:?}", other),
    }
}

#[test]
fn test_config_rejects_unknown_keys() {
    let err = MappingConfig::from_toml_str("[representations]\nshort = \"int\"").unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_config_rejects_unsupported_representation() {
    let err = MappingConfig::from_toml_str("[representations]\nboolean = \"date\"").unwrap_err();
    assert!(err.is_configuration_error());
    assert!(err.to_string().contains("bool"));
}

#[test]
fn test_config_applies_to_filters() {
    let config = MappingConfig::from_toml_str("[representations]\ndouble = \"string\"").unwrap();
    let registry = aggregation_registry_with_config(&config).unwrap();
    assert_eq!(
        registry.encode_to_document(&filters::lt("ratio", 0.5)).unwrap(),
        doc! { "ratio": { "$lt": "0.5" } }
    );
}
