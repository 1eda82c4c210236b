//! Registry model: the declared packages and where to find them.
//!
//! `registry.toml` maps package name → version label → entry. The file is kept
//! as a raw TOML table (in stored order) and each entry is turned into a typed
//! [`RegistryEntry`] by [`validate_entry`] right before it is processed, so a
//! malformed entry fails alone instead of failing the whole load.

mod entry;

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::runtime::Runtime;

pub use entry::{REFERENCE_KEYS, validate_entry};

/// Version label of a floating entry.
pub const LATEST: &str = "latest";

/// Version label of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionLabel {
    /// Unpinned entry, always reprocessed.
    Latest,
    /// Pinned entry, requires a git reference.
    Pinned(String),
}

impl VersionLabel {
    pub fn parse(label: &str) -> Self {
        if label == LATEST {
            VersionLabel::Latest
        } else {
            VersionLabel::Pinned(label.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VersionLabel::Latest => LATEST,
            VersionLabel::Pinned(v) => v,
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, VersionLabel::Latest)
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A git reference pinning a registry entry.
///
/// Every variant has a registry key listed in [`REFERENCE_KEYS`]; a new kind
/// must be added to both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitReference {
    Tag(String),
}

impl GitReference {
    /// Registry key this reference is declared under.
    pub fn key(&self) -> &'static str {
        match self {
            GitReference::Tag(_) => "tag",
        }
    }

    /// Revision to hand to a backend (API `ref` parameter or `git show` rev).
    pub fn rev(&self) -> &str {
        match self {
            GitReference::Tag(tag) => tag,
        }
    }

    /// Whether a reference recorded in the index (`git-tag`) is this one.
    pub fn matches_recorded(&self, recorded: &str) -> bool {
        match self {
            GitReference::Tag(tag) => tag == recorded,
        }
    }
}

impl fmt::Display for GitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key(), self.rev())
    }
}

/// One validated registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub name: String,
    pub version: VersionLabel,
    /// Git remote of the package (`git` key).
    pub location: String,
    pub reference: Option<GitReference>,
}

/// Identity of an entry for messages: `name-version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryId<'a> {
    pub name: &'a str,
    pub version: &'a str,
}

impl fmt::Display for EntryId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// An entry as stored in the registry, not yet validated.
#[derive(Debug, Clone, Copy)]
pub struct RawEntry<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub value: &'a toml::Value,
}

impl RawEntry<'_> {
    pub fn id(&self) -> EntryId<'_> {
        EntryId {
            name: self.name,
            version: self.version,
        }
    }
}

/// The loaded registry, in stored order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    packages: toml::Table,
}

impl Registry {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let packages: toml::Table = toml::from_str(content)?;
        Ok(Self { packages })
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        Self::parse(&content).with_context(|| format!("Failed to parse registry {:?}", path))
    }

    /// All entries, packages in stored order then versions in stored order.
    ///
    /// A package whose value is not a table yields a single entry with an empty
    /// version label; it fails validation like any other malformed entry.
    pub fn entries(&self) -> Vec<RawEntry<'_>> {
        let mut entries = Vec::new();
        for (name, versions) in &self.packages {
            match versions.as_table() {
                Some(versions) => {
                    for (version, value) in versions {
                        entries.push(RawEntry {
                            name,
                            version,
                            value,
                        });
                    }
                }
                None => entries.push(RawEntry {
                    name,
                    version: "",
                    value: versions,
                }),
            }
        }
        entries
    }

    /// Number of registered package names.
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    const REGISTRY: &str = r#"
[stdlib]
latest = { git = "https://github.com/fortran-lang/stdlib" }

[M_CLI2]
"1.0.0" = { git = "https://github.com/urbanjost/M_CLI2", tag = "v1.0.0" }
"0.9.0" = { git = "https://github.com/urbanjost/M_CLI2", tag = "v0.9.0" }

[aaa-last-alphabetically]
latest = { git = "https://gitlab.com/x/aaa" }
"#;

    #[test]
    fn test_version_label() {
        assert!(VersionLabel::parse("latest").is_latest());
        assert!(!VersionLabel::parse("Latest").is_latest());
        assert_eq!(VersionLabel::parse("1.2.3").as_str(), "1.2.3");
        assert_eq!(VersionLabel::Latest.to_string(), "latest");
    }

    #[test]
    fn test_git_reference() {
        let reference = GitReference::Tag("v1.0.0".into());
        assert_eq!(reference.key(), "tag");
        assert_eq!(reference.rev(), "v1.0.0");
        assert!(reference.matches_recorded("v1.0.0"));
        assert!(!reference.matches_recorded("v0.9.0"));
        assert_eq!(reference.to_string(), "tag v1.0.0");
        assert!(REFERENCE_KEYS.contains(&reference.key()));
    }

    #[test]
    fn test_entries_keep_stored_order() {
        let registry = Registry::parse(REGISTRY).unwrap();
        let ids: Vec<String> = registry
            .entries()
            .iter()
            .map(|e| e.id().to_string())
            .collect();

        assert_eq!(
            ids,
            vec![
                "stdlib-latest",
                "M_CLI2-1.0.0",
                "M_CLI2-0.9.0",
                "aaa-last-alphabetically-latest",
            ]
        );
        assert_eq!(registry.package_count(), 3);
    }

    #[test]
    fn test_non_table_package_yields_single_entry() {
        let registry = Registry::parse(r#"broken = "https://github.com/x/y""#).unwrap();
        let entries = registry.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "broken");
        assert_eq!(entries[0].version, "");
        assert!(validate_entry(entries[0].name, entries[0].version, entries[0].value).is_err());
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(Registry::parse("[unterminated").is_err());
    }

    #[test]
    fn test_load_through_runtime() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("registry.toml");

        runtime
            .expect_read_to_string()
            .with(eq(path.clone()))
            .returning(|_| Ok(REGISTRY.to_string()));

        let registry = Registry::load(&runtime, &path).unwrap();
        assert_eq!(registry.entries().len(), 4);
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("not = [valid".to_string()));

        let err = Registry::load(&runtime, Path::new("registry.toml")).unwrap_err();
        assert!(err.to_string().contains("registry.toml"));
    }
}
