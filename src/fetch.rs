//! Manifest fetcher: picks a backend for every call and reads `fpm.toml`.

use std::sync::Arc;

use log::debug;

use crate::backend::{Backend, BackendError, BackendKind, FileRequest, RepoLocation};
use crate::error::FetchError;
use crate::manifest::MANIFEST_FILE;
use crate::registry::GitReference;

/// Remaining budget of one backend, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetReport {
    pub kind: BackendKind,
    /// `None` for unlimited backends.
    pub remaining: Option<u64>,
}

/// Ordered set of backends shared by one run.
///
/// Backends are tried in the order given; the first one that handles the
/// location and still has budget wins. The choice is made again on every call
/// because budgets drain during a run.
pub struct ManifestFetcher {
    backends: Vec<Arc<dyn Backend>>,
}

impl ManifestFetcher {
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Self {
        Self { backends }
    }

    /// The backend that would serve `location` right now.
    pub fn select(&self, location: &RepoLocation) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|backend| {
            backend.handles(location) && backend.budget().is_none_or(|remaining| remaining > 0)
        })
    }

    /// Retrieves the raw manifest text at `reference` (default branch if absent).
    ///
    /// Exactly one backend is attempted; there is no retry and no fallback
    /// after a failure.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(
        &self,
        location: &str,
        reference: Option<&GitReference>,
    ) -> Result<String, FetchError> {
        let parsed = RepoLocation::parse(location).map_err(|source| FetchError {
            backend: None,
            location: location.to_string(),
            source,
        })?;

        let Some(backend) = self.select(&parsed) else {
            return Err(FetchError {
                backend: None,
                location: location.to_string(),
                source: BackendError::NoBackend(location.to_string()),
            });
        };
        debug!("Selected {} backend for {}", backend.kind(), location);

        let request = FileRequest {
            location: parsed,
            path: MANIFEST_FILE.to_string(),
            reference: reference.cloned(),
        };

        backend
            .fetch_file(&request)
            .await
            .map_err(|source| FetchError {
                backend: Some(backend.kind()),
                location: location.to_string(),
                source,
            })
    }

    /// Remaining budget per backend, in priority order.
    pub fn budgets(&self) -> Vec<BudgetReport> {
        self.backends
            .iter()
            .map(|backend| BudgetReport {
                kind: backend.kind(),
                remaining: backend.budget(),
            })
            .collect()
    }
}
