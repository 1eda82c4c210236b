//! API credentials for the hosted backends.
//!
//! In CI (`CI` set) the GitHub actor and token come from the environment.
//! Elsewhere they are read from `account.toml`:
//!
//! ```toml
//! [github]
//! user = "octocat"
//! token = "ghp_..."
//!
//! [gitlab]
//! token = "glpat-..."
//! ```

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Directory under the user config dir holding the fallback `account.toml`.
pub const CONFIG_DIR_NAME: &str = "fpm-index";
pub const ACCOUNT_FILE: &str = "account.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub github: Option<GitHubCredentials>,
    pub gitlab_token: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct GitHubCredentials {
    pub user: Option<String>,
    pub token: String,
}

impl std::fmt::Debug for GitHubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubCredentials")
            .field("user", &self.user)
            .field("token", &mask_token(&self.token))
            .finish()
    }
}

#[derive(Deserialize, Debug, Default)]
struct AccountFile {
    #[serde(default)]
    github: Option<GitHubAccount>,
    #[serde(default)]
    gitlab: Option<GitLabAccount>,
}

#[derive(Deserialize, Debug)]
struct GitHubAccount {
    user: Option<String>,
    token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GitLabAccount {
    token: Option<String>,
}

impl Credentials {
    /// Resolves credentials from the CI environment or `account_path`.
    ///
    /// Missing credentials only produce a warning; the backends then run
    /// unauthenticated. An unreadable or malformed account file is an error.
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime>(runtime: &R, account_path: &Path) -> Result<Self> {
        if runtime.env_var("CI").is_ok() {
            return Ok(Self::from_ci_env(runtime));
        }

        let Some(path) = account_file(runtime, account_path) else {
            warn!(
                "No {} found, using unauthenticated API access (lower rate limits)",
                ACCOUNT_FILE
            );
            return Ok(Self::default());
        };

        let content = runtime.read_to_string(&path)?;
        let account: AccountFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse credentials file {:?}", path))?;
        debug!("Loaded credentials from {:?}", path);

        let github = match account.github {
            Some(GitHubAccount {
                user,
                token: Some(token),
            }) => Some(GitHubCredentials { user, token }),
            _ => {
                warn!("No [github] token in {:?}, GitHub API is unauthenticated", path);
                None
            }
        };

        Ok(Self {
            github,
            gitlab_token: account.gitlab.and_then(|g| g.token),
        })
    }

    fn from_ci_env<R: Runtime>(runtime: &R) -> Self {
        debug!("CI environment detected, reading GitHub credentials from the environment");
        let user = runtime.env_var("GITHUB_ACTOR").ok();
        let github = match runtime.env_var("GITHUB_TOKEN") {
            Ok(token) if !token.is_empty() => Some(GitHubCredentials { user, token }),
            _ => {
                warn!("GITHUB_TOKEN is not set, GitHub API is unauthenticated");
                None
            }
        };
        Self {
            github,
            gitlab_token: runtime.env_var("GITLAB_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

/// The explicit path if it exists, otherwise `<config_dir>/fpm-index/account.toml`.
fn account_file<R: Runtime>(runtime: &R, account_path: &Path) -> Option<PathBuf> {
    if runtime.exists(account_path) {
        return Some(account_path.to_path_buf());
    }
    let fallback = runtime
        .config_dir()?
        .join(CONFIG_DIR_NAME)
        .join(ACCOUNT_FILE);
    runtime.exists(&fallback).then_some(fallback)
}

/// Token rendering safe for logs: first and last four characters at most.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
