//! Fuzz target for mapping configuration parsing.
//!
//! Feeds arbitrary TOML, raw and structured, to `MappingConfig`. Invalid
//! input must come back as a configuration error, and every accepted
//! config must build a registry.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_config_parser
//! ```

#![no_main]

use arbitrary::Arbitrary;
use bsonkit_codec::{CodecRegistry, MappingConfig};
use libfuzzer_sys::fuzz_target;

const LAYOUTS: &[&str] = &["standard", "java_legacy", "c_sharp_legacy", "python_legacy"];
const KEYS: &[&str] = &[
    "integer", "long", "double", "boolean", "string", "object_id", "date_time", "decimal", "uuid",
];
const ALIASES: &[&str] = &[
    "int", "long", "double", "decimal", "string", "bool", "date", "objectId", "binData", "symbol",
    "object", "array", "null",
];

#[derive(Debug, Arbitrary)]
enum FuzzInput {
    Raw(String),
    Structured {
        layout: Option<u8>,
        overrides: Vec<(u8, u8)>,
    },
}

impl FuzzInput {
    fn to_toml(&self) -> String {
        match self {
            Self::Raw(source) => source.clone(),
            Self::Structured { layout, overrides } => {
                let mut toml = String::new();
                if let Some(layout) = layout {
                    let layout = LAYOUTS[*layout as usize % LAYOUTS.len()];
                    toml.push_str(&format!("uuid_representation = \"{}\"\n", layout));
                }
                toml.push_str("[representations]\n");
                let mut seen = Vec::new();
                for (key, alias) in overrides.iter().take(KEYS.len()) {
                    let key = KEYS[*key as usize % KEYS.len()];
                    if seen.contains(&key) {
                        continue;
                    }
                    seen.push(key);
                    let alias = ALIASES[*alias as usize % ALIASES.len()];
                    toml.push_str(&format!("{} = \"{}\"\n", key, alias));
                }
                toml
            }
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    match MappingConfig::from_toml_str(&input.to_toml()) {
        Ok(config) => {
            assert!(CodecRegistry::from_config(&config).is_ok());
        }
        Err(err) => assert!(err.is_configuration_error()),
    }
});
