//! `fpm.toml` validation and projection into the index record.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

/// Manifest file fetched from every package repository.
pub const MANIFEST_FILE: &str = "fpm.toml";

/// Keys that must be present; copied verbatim.
pub const REQUIRED_KEYS: [&str; 6] = [
    "name",
    "version",
    "license",
    "author",
    "maintainer",
    "copyright",
];

/// Keys copied when present, recorded as `null` otherwise.
pub const OPTIONAL_KEYS: [&str; 4] = ["description", "executable", "dependencies", "dev-dependencies"];

/// Keys allowed in a manifest but irrelevant to the index.
pub const OTHER_KEYS: [&str; 2] = ["test", "library"];

/// Reduced manifest stored in the index.
///
/// Optional fields distinguish "absent" (`None`, serialized as `null`) from an
/// empty value such as `{}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ManifestRecord {
    pub name: Value,
    pub version: Value,
    pub license: Value,
    pub author: Value,
    pub maintainer: Value,
    pub copyright: Value,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub executable: Option<Value>,
    #[serde(default)]
    pub dependencies: Option<Value>,
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: Option<Value>,
}

/// A manifest that passed validation, with the warnings it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedManifest {
    pub record: ManifestRecord,
    /// Unrecognized top-level keys, in manifest order.
    pub unexpected_keys: Vec<String>,
}

/// Parses and validates raw `fpm.toml` content.
///
/// Unknown keys are reported through `warn!` and [`ValidatedManifest::unexpected_keys`]
/// but never rejected.
pub fn validate_manifest(raw: &str) -> Result<ValidatedManifest, SchemaError> {
    let table: toml::Table = toml::from_str(raw).map_err(SchemaError::ManifestParse)?;

    for key in REQUIRED_KEYS {
        if !table.contains_key(key) {
            return Err(SchemaError::MissingManifestKey(key));
        }
    }

    let unexpected_keys: Vec<String> = table
        .keys()
        .filter(|k| {
            let k = k.as_str();
            !REQUIRED_KEYS.contains(&k) && !OPTIONAL_KEYS.contains(&k) && !OTHER_KEYS.contains(&k)
        })
        .cloned()
        .collect();
    for key in &unexpected_keys {
        warn!("        (!) Warning: unexpected key '{}' in {}", key, MANIFEST_FILE);
    }

    let required = |key: &'static str| -> Result<Value, SchemaError> {
        match table.get(key) {
            Some(value) => to_json(key, value),
            None => Err(SchemaError::MissingManifestKey(key)),
        }
    };
    let optional = |key: &'static str| -> Result<Option<Value>, SchemaError> {
        table.get(key).map(|v| to_json(key, v)).transpose()
    };

    let record = ManifestRecord {
        name: required("name")?,
        version: required("version")?,
        license: required("license")?,
        author: required("author")?,
        maintainer: required("maintainer")?,
        copyright: required("copyright")?,
        description: optional("description")?,
        executable: optional("executable")?,
        dependencies: optional("dependencies")?,
        dev_dependencies: optional("dev-dependencies")?,
    };

    Ok(ValidatedManifest {
        record,
        unexpected_keys,
    })
}

fn to_json(key: &str, value: &toml::Value) -> Result<Value, SchemaError> {
    serde_json::to_value(value).map_err(|source| SchemaError::ManifestValue {
        key: key.to_string(),
        source,
    })
}
