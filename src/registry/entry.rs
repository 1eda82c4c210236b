//! Structural validation of a single registry entry.

use log::debug;

use super::{EntryId, GitReference, RegistryEntry, VersionLabel};
use crate::error::SchemaError;

/// Registry keys that declare a git reference. Exactly one is required for
/// pinned entries.
pub const REFERENCE_KEYS: &[&str] = &["tag"];

/// Checks one registry entry and turns it into a typed [`RegistryEntry`].
///
/// Pure: no network or filesystem access. Must run before any fetch so that
/// malformed entries do not spend rate-limit budget.
pub fn validate_entry(
    name: &str,
    version: &str,
    value: &toml::Value,
) -> Result<RegistryEntry, SchemaError> {
    let id = EntryId { name, version };

    let Some(table) = value.as_table() else {
        return Err(SchemaError::EntryNotTable {
            package: id.to_string(),
            entry: value.to_string(),
        });
    };

    let location = match table.get("git") {
        None => {
            return Err(SchemaError::MissingRegistryKey {
                package: id.to_string(),
                key: "git",
            });
        }
        Some(value) => string_value(&id, "git", value)?,
    };

    let version = VersionLabel::parse(version);

    let mut references = Vec::new();
    for key in REFERENCE_KEYS {
        if let Some(value) = table.get(*key) {
            references.push(reference_for(&id, key, value)?);
        }
    }

    if !version.is_latest() && references.len() != 1 {
        return Err(SchemaError::ReferenceCount {
            package: id.to_string(),
            found: references.len(),
        });
    }

    debug!("        git: {}", location);
    if let Some(reference) = references.first() {
        debug!("        {}: {}", reference.key(), reference.rev());
    }

    Ok(RegistryEntry {
        name: name.to_string(),
        version,
        location,
        reference: references.into_iter().next(),
    })
}

fn string_value(id: &EntryId<'_>, key: &str, value: &toml::Value) -> Result<String, SchemaError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::InvalidRegistryValue {
            package: id.to_string(),
            key: key.to_string(),
        })
}

fn reference_for(
    id: &EntryId<'_>,
    key: &str,
    value: &toml::Value,
) -> Result<GitReference, SchemaError> {
    let rev = string_value(id, key, value)?;
    match key {
        "tag" => Ok(GitReference::Tag(rev)),
        other => Err(SchemaError::InvalidRegistryValue {
            package: id.to_string(),
            key: other.to_string(),
        }),
    }
}
