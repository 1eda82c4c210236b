//! Builder for running the `git` executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, trace};
use tokio::process::Command;
use tokio::time::timeout;

use super::GitError;

/// Default timeout for network-bound git operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[cfg(windows)]
const GIT: &str = "git.exe";
#[cfg(not(windows))]
const GIT: &str = "git";

/// A git invocation with captured output.
///
/// ```rust,ignore
/// let stdout = GitCommand::new()
///     .current_dir(repo_path)
///     .args(["show", "v1.0.0:fpm.toml"])
///     .execute()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    timeout_duration: Option<Duration>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            timeout_duration: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl GitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run inside `dir` (passed to git as `-C <dir>`).
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `None` disables the timeout.
    pub fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Name of the git subcommand, for error messages.
    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    fn full_args(&self) -> Vec<String> {
        let mut full_args = Vec::with_capacity(self.args.len() + 2);
        if let Some(dir) = &self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        full_args
    }

    /// Runs the command and returns its stdout as text.
    pub async fn execute(self) -> Result<String, GitError> {
        let stdout = self.execute_raw().await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Runs the command and returns its stdout bytes untouched.
    ///
    /// A non-zero exit status becomes [`GitError::Command`] carrying stderr.
    pub async fn execute_raw(self) -> Result<Vec<u8>, GitError> {
        let operation = self.operation();
        let full_args = self.full_args();
        debug!("Executing command: {} {}", GIT, full_args.join(" "));

        let mut cmd = Command::new(GIT);
        cmd.args(&full_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Never block on a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result.map_err(GitError::Spawn)?,
                Err(_) => {
                    return Err(GitError::Timeout {
                        operation,
                        seconds: duration.as_secs(),
                    });
                }
            },
            None => output_future.await.map_err(GitError::Spawn)?,
        };

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            debug!(
                "git {} failed with exit code {:?}: {}",
                operation,
                output.status.code(),
                stderr.trim()
            );
            return Err(GitError::Command {
                operation,
                stderr: stderr.trim().to_string(),
            });
        }

        if !stderr.is_empty() {
            trace!("git {}: {}", operation, stderr.trim());
        }
        Ok(output.stdout)
    }
}
