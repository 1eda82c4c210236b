//! Retrieval backends for manifest files.
//!
//! Three backends know how to read a single file out of a remote repository:
//! the GitHub contents API, the GitLab repository files API, and a shallow
//! local clone. The hosted APIs are cheap but rate-limited per credential, so
//! each owns a [`RateBudget`]; the clone backend is unlimited but slow, and is
//! the backend of last resort. Selection lives in [`crate::fetch`].

mod budget;
mod clone;
mod github;
mod gitlab;

use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::git::GitError;
use crate::http::ApiError;
use crate::registry::GitReference;

pub use budget::RateBudget;
pub use clone::CloneBackend;
pub use github::GitHubBackend;
pub use gitlab::GitLabBackend;

/// Backend kind identifier, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    GitHub,
    GitLab,
    Clone,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::GitHub => write!(f, "github"),
            BackendKind::GitLab => write!(f, "gitlab"),
            BackendKind::Clone => write!(f, "clone"),
        }
    }
}

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A parsed git remote location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    /// The location exactly as declared in the registry.
    pub url: String,
    /// Host name, empty for `file://` remotes.
    pub host: String,
    /// Path with leading and trailing slashes stripped.
    pub path: String,
}

impl RepoLocation {
    pub fn parse(location: &str) -> Result<Self, BackendError> {
        let url = Url::parse(location)
            .map_err(|e| BackendError::InvalidLocation(format!("{}: {}", location, e)))?;
        let host = url.host_str().unwrap_or_default().to_string();
        let path = url.path().trim_matches('/').to_string();

        if path.is_empty() {
            return Err(BackendError::InvalidLocation(format!(
                "{}: no repository path",
                location
            )));
        }

        Ok(Self {
            url: location.to_string(),
            host,
            path,
        })
    }

    /// Owner and repository name for hosted APIs.
    ///
    /// Uses the first two path segments, dropping a `.git` suffix.
    pub fn repo_id(&self) -> Result<RepoId, BackendError> {
        let mut parts = self.path.split('/');
        match (parts.next(), parts.next()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                let repo = repo.strip_suffix(".git").unwrap_or(repo);
                Ok(RepoId {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(BackendError::InvalidLocation(format!(
                "{}: expected an 'owner/repo' path",
                self.url
            ))),
        }
    }

    /// Full project path, for hosts that allow nested groups.
    ///
    /// At least two segments, with a trailing `.git` dropped.
    pub fn project_path(&self) -> Result<String, BackendError> {
        self.repo_id()?;
        let path = self.path.strip_suffix(".git").unwrap_or(&self.path);
        Ok(path.to_string())
    }
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// A single file to read from a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRequest {
    pub location: RepoLocation,
    /// Path of the file inside the repository.
    pub path: String,
    /// Reference to read at; the default branch when absent.
    pub reference: Option<GitReference>,
}

/// Errors raised by a single backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unsupported content encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("failed to decode base64 content")]
    Base64(#[from] base64::DecodeError),

    #[error("file content is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("invalid repository location: {0}")]
    InvalidLocation(String),

    #[error("cannot prepare cache directory {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no backend can serve {0}")]
    NoBackend(String),
}

/// A retrieval mechanism for files in remote repositories.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the backend kind.
    fn kind(&self) -> BackendKind;

    /// Whether this backend can serve the location at all.
    fn handles(&self, location: &RepoLocation) -> bool;

    /// Remaining call budget; `None` means unlimited.
    fn budget(&self) -> Option<u64>;

    /// Read one file from the repository as text.
    async fn fetch_file(&self, request: &FileRequest) -> Result<String, BackendError>;
}

/// Decodes API file content (base64 with embedded line breaks) to text.
pub(crate) fn decode_content(content: &str, encoding: &str) -> Result<String, BackendError> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    if !encoding.eq_ignore_ascii_case("base64") {
        return Err(BackendError::UnsupportedEncoding(encoding.to_string()));
    }
    let compact: String = content.split_whitespace().collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}
