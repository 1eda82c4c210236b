//! The package index: validated manifests keyed by name and version label.

mod store;

use chrono::{DateTime, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::manifest::ManifestRecord;
use crate::registry::{GitReference, VersionLabel};

pub use store::IndexStore;

/// `index-date` format, the C locale `%c` rendering.
pub const INDEX_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// One indexed package version: the reduced manifest plus its provenance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexedPackage {
    #[serde(flatten)]
    pub manifest: ManifestRecord,
    /// Location the manifest was fetched from.
    pub git: String,
    /// Reference the manifest was fetched at; `null` for the default branch.
    #[serde(rename = "git-tag", default)]
    pub git_tag: Option<String>,
}

impl IndexedPackage {
    pub fn new(manifest: ManifestRecord, git: &str, reference: Option<&GitReference>) -> Self {
        Self {
            manifest,
            git: git.to_string(),
            git_tag: reference.map(|r| r.rev().to_string()),
        }
    }
}

/// Package name → version label → indexed package.
///
/// Entries are only ever added or overwritten; nothing is removed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PackageIndex {
    #[serde(default)]
    pub packages: IndexMap<String, IndexMap<String, IndexedPackage>>,
    #[serde(
        rename = "index-date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub index_date: Option<String>,
}

impl PackageIndex {
    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.get(name, version).is_some()
    }

    pub fn get(&self, name: &str, version: &str) -> Option<&IndexedPackage> {
        self.packages.get(name)?.get(version)
    }

    /// Whether an entry can be left as it is without fetching.
    ///
    /// Floating entries are always reprocessed. A pinned entry is skipped only
    /// when the index already holds it at the same reference.
    pub fn should_skip(
        &self,
        name: &str,
        version: &VersionLabel,
        reference: Option<&GitReference>,
    ) -> bool {
        if version.is_latest() {
            return false;
        }
        let Some(reference) = reference else {
            return false;
        };
        self.get(name, version.as_str())
            .and_then(|pkg| pkg.git_tag.as_deref())
            .is_some_and(|recorded| reference.matches_recorded(recorded))
    }

    /// Stores `package` under `(name, version)`, replacing any previous value.
    pub fn merge(&mut self, name: &str, version: &str, package: IndexedPackage) {
        self.packages
            .entry(name.to_string())
            .or_default()
            .insert(version.to_string(), package);
    }

    /// Records when the index was built.
    pub fn stamp<Tz: TimeZone>(&mut self, now: &DateTime<Tz>)
    where
        Tz::Offset: std::fmt::Display,
    {
        self.index_date = Some(now.format(INDEX_DATE_FORMAT).to_string());
    }

    /// Number of indexed (name, version) pairs.
    pub fn indexed_count(&self) -> usize {
        self.packages.values().map(IndexMap::len).sum()
    }
}
