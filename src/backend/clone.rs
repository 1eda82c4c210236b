//! Shallow-clone fallback backend.
//!
//! Repositories are cloned once into `<cache_root>/<host>/<path>` and fetched
//! into on later runs. Each cache path has its own lock, so two callers never
//! clone or fetch into the same directory at once.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::git::{GitError, GitRepo};

use super::{Backend, BackendError, BackendKind, FileRequest, RepoLocation};

/// Directory name used in place of a host for `file://` remotes.
const LOCAL_HOST_DIR: &str = "local";

pub struct CloneBackend {
    cache_root: PathBuf,
    timeout: Option<Duration>,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl CloneBackend {
    pub fn new(cache_root: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            cache_root: cache_root.into(),
            timeout,
            locks: DashMap::new(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Deterministic cache path for a location: `<cache_root>/<host>/<path>`.
    ///
    /// Paths that would escape the cache root are rejected.
    pub fn cache_path(&self, location: &RepoLocation) -> Result<PathBuf, BackendError> {
        let host = if location.host.is_empty() {
            LOCAL_HOST_DIR
        } else {
            location.host.as_str()
        };
        let relative = Path::new(host).join(&location.path);

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(BackendError::InvalidLocation(format!(
                "{}: path is not usable as a cache directory",
                location.url
            )));
        }

        Ok(self.cache_root.join(relative))
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Clones the repository, or fetches into an existing clone.
    ///
    /// Anything at `path` that is not a finished clone is removed first, and a
    /// failed clone leaves nothing behind.
    async fn prepare(&self, location: &RepoLocation, path: &Path) -> Result<GitRepo, BackendError> {
        if GitRepo::is_complete(path, self.timeout).await {
            debug!("Updating cached clone at {:?}", path);
            let repo = GitRepo::open(path, self.timeout);
            repo.fetch_shallow().await?;
            return Ok(repo);
        }

        if path.exists() {
            warn!("Discarding incomplete clone at {:?}", path);
            remove_path(path).await.map_err(|source| BackendError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| BackendError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        debug!("Cloning {} into {:?}", location, path);
        match GitRepo::clone_shallow(&location.url, path, self.timeout).await {
            Ok(repo) => Ok(repo),
            Err(e) => {
                match remove_path(path).await {
                    Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                        warn!("Failed to remove {:?} after a failed clone: {}", path, cleanup);
                    }
                    _ => {}
                }
                Err(e.into())
            }
        }
    }
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

#[async_trait]
impl Backend for CloneBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Clone
    }

    fn handles(&self, _location: &RepoLocation) -> bool {
        true
    }

    fn budget(&self) -> Option<u64> {
        None
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_file(&self, request: &FileRequest) -> Result<String, BackendError> {
        info!("        Retrieving {} via git clone...", request.path);

        let path = self.cache_path(&request.location)?;
        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;

        let repo = self.prepare(&request.location, &path).await?;

        let bytes = match &request.reference {
            Some(reference) => {
                repo.fetch_tags().await?;
                repo.show_file(reference.rev(), &request.path).await?
            }
            None => match repo.show_file("origin/HEAD", &request.path).await {
                Ok(bytes) => bytes,
                Err(GitError::Command { .. }) => repo.show_file("HEAD", &request.path).await?,
                Err(e) => return Err(e.into()),
            },
        };
        Ok(String::from_utf8(bytes)?)
    }
}
