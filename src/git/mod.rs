//! Minimal git operations backing the clone fallback.
//!
//! Only what reading one file out of a remote needs: a shallow, checkout-free
//! clone, shallow fetches, and `git show <rev>:<path>`.

mod command;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub use command::{DEFAULT_TIMEOUT, GitCommand};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git {operation} failed: {stderr}")]
    Command { operation: String, stderr: String },

    #[error("git {operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("failed to run git, is it installed?")]
    Spawn(#[source] std::io::Error),
}

/// A local repository created by [`GitRepo::clone_shallow`].
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl GitRepo {
    /// Opens an existing local repository.
    pub fn open(path: impl AsRef<Path>, timeout: Option<Duration>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            timeout,
        }
    }

    /// Whether `path` holds a finished clone of its own.
    ///
    /// False for a leftover directory from an interrupted clone, and for a
    /// directory that merely sits inside some enclosing repository.
    pub async fn is_complete(path: &Path, timeout: Option<Duration>) -> bool {
        if !path.join(".git").is_dir() {
            return false;
        }
        GitCommand::new()
            .current_dir(path)
            .args(["rev-parse", "--verify", "--quiet", "HEAD^{commit}"])
            .with_timeout(timeout)
            .execute()
            .await
            .is_ok()
    }

    fn command(&self) -> GitCommand {
        GitCommand::new()
            .current_dir(&self.path)
            .with_timeout(self.timeout)
    }

    /// `git clone --no-checkout --depth 1 <url> <target>`
    #[tracing::instrument(skip(timeout))]
    pub async fn clone_shallow(
        url: &str,
        target: &Path,
        timeout: Option<Duration>,
    ) -> Result<Self, GitError> {
        GitCommand::new()
            .args(["clone", "--no-checkout", "--depth", "1", "--", url])
            .arg(target.display().to_string())
            .with_timeout(timeout)
            .execute()
            .await?;
        Ok(Self::open(target, timeout))
    }

    /// Updates the default branch: `git fetch --depth 1 origin`
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn fetch_shallow(&self) -> Result<(), GitError> {
        self.command()
            .args(["fetch", "--depth", "1", "origin"])
            .execute()
            .await?;
        Ok(())
    }

    /// Fetches all tags: `git fetch --depth 1 --tags origin`
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn fetch_tags(&self) -> Result<(), GitError> {
        self.command()
            .args(["fetch", "--depth", "1", "--tags", "--force", "origin"])
            .execute()
            .await?;
        Ok(())
    }

    /// Reads a file at a revision straight from the object store.
    ///
    /// Returns the raw blob; `rev` is never parsed as an option.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn show_file(&self, rev: &str, file: &str) -> Result<Vec<u8>, GitError> {
        self.command()
            .args(["show", "--end-of-options"])
            .arg(format!("{}:{}", rev, file))
            .execute_raw()
            .await
    }
}

/// Checks whether a usable git executable is on PATH.
#[cfg(test)]
pub async fn is_git_installed() -> bool {
    GitCommand::new()
        .arg("--version")
        .with_timeout(Some(Duration::from_secs(10)))
        .execute()
        .await
        .is_ok()
}
