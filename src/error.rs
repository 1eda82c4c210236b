//! Error taxonomy for the indexer.
//!
//! Per-entry errors ([`SchemaError`], [`FetchError`], wrapped in [`EntryError`])
//! never escape the pipeline; they are turned into counters. Only
//! [`StrictnessViolation`] is raised to the caller, after the whole registry
//! has been processed.

use thiserror::Error;

use crate::backend::{BackendError, BackendKind};

/// A malformed registry entry or manifest.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("registry.toml: unexpected format for package '{package}', entry: {entry}")]
    EntryNotTable { package: String, entry: String },

    #[error("registry.toml: missing required key '{key}' for package '{package}'")]
    MissingRegistryKey { package: String, key: &'static str },

    #[error("registry.toml: key '{key}' for package '{package}' must be a string")]
    InvalidRegistryValue { package: String, key: String },

    #[error(
        "registry.toml: versioned package '{package}' must have exactly one git reference (tag), found {found}"
    )]
    ReferenceCount { package: String, found: usize },

    #[error("fpm.toml is not valid TOML")]
    ManifestParse(#[source] toml::de::Error),

    #[error("Missing required key '{0}' in fpm.toml")]
    MissingManifestKey(&'static str),

    #[error("fpm.toml key '{key}' cannot be stored in the index")]
    ManifestValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to retrieve manifest content from a repository.
#[derive(Debug, Error)]
#[error("failed to fetch fpm.toml from {location}{}", via(.backend))]
pub struct FetchError {
    /// The backend that was attempted, if one was selected.
    pub backend: Option<BackendKind>,
    pub location: String,
    #[source]
    pub source: BackendError,
}

fn via(backend: &Option<BackendKind>) -> String {
    match backend {
        Some(kind) => format!(" via {}", kind),
        None => String::new(),
    }
}

/// Everything that can go wrong while processing one registry entry.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Run-level failure raised after all entries were processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrictnessViolation {
    #[error("There were {0} indexed packages that failed to be re-indexed")]
    BrokenExisting(usize),

    #[error("There were {0} unindexed packages that failed to be indexed")]
    FailedNew(usize),
}

/// Renders an error and all of its sources, one per line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\n    caused by: {}", cause));
        source = cause.source();
    }
    out
}
