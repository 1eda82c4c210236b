use anyhow::Result;
use log::{debug, info};
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    backend::{Backend, CloneBackend, GitHubBackend, GitLabBackend},
    credentials::{Credentials, mask_token},
    fetch::ManifestFetcher,
    git,
    http::HttpClient,
    pipeline::{Pipeline, Strictness},
    runtime::Runtime,
};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com/api/v4";
const USER_AGENT: &str = "fpm-index";
const GITLAB_TOKEN_HEADER: &str = "private-token";

/// Run options, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub registry: PathBuf,
    pub index: PathBuf,
    pub account: PathBuf,
    pub cache_dir: PathBuf,
    pub github_api_url: String,
    pub gitlab_api_url: String,
    /// HTTP request timeout.
    pub timeout: Option<Duration>,
    pub strictness: Strictness,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            registry: PathBuf::from("registry.toml"),
            index: PathBuf::from("index.json"),
            account: PathBuf::from("account.toml"),
            cache_dir: PathBuf::from("repos"),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            gitlab_api_url: DEFAULT_GITLAB_API_URL.to_string(),
            timeout: Some(Duration::from_secs(60)),
            strictness: Strictness::default(),
        }
    }
}

/// Everything one indexing run needs, wired together.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub registry_path: PathBuf,
    pub index_path: PathBuf,
    pub strictness: Strictness,
    /// Kept separately from the pipeline for the rate-limit probe.
    pub github: Arc<GitHubBackend>,
    pub pipeline: Pipeline,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, options: Options) -> Result<Self> {
        let credentials = Credentials::resolve(&runtime, &options.account)?;

        let github_client = build_client(github_headers(&credentials)?, options.timeout)?;
        let gitlab_client = build_client(gitlab_headers(&credentials)?, options.timeout)?;

        let github = Arc::new(GitHubBackend::new(
            HttpClient::new(github_client),
            &options.github_api_url,
        ));
        let gitlab = Arc::new(GitLabBackend::new(
            HttpClient::new(gitlab_client),
            &options.gitlab_api_url,
        ));
        let clone = Arc::new(CloneBackend::new(&options.cache_dir, Some(git::DEFAULT_TIMEOUT)));
        debug!("Clone cache at {:?}", clone.cache_root());

        let backends: Vec<Arc<dyn Backend>> = vec![github.clone(), gitlab, clone];
        let pipeline = Pipeline::new(ManifestFetcher::new(backends));

        Ok(Self {
            runtime,
            registry_path: options.registry,
            index_path: options.index,
            strictness: options.strictness,
            github,
            pipeline,
        })
    }
}

fn build_client(headers: HeaderMap, timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn github_headers(credentials: &Credentials) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(github) = &credentials.github {
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", github.token))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        info!(
            "Using GitHub token for authentication{}: {}",
            github
                .user
                .as_deref()
                .map(|u| format!(" as {}", u))
                .unwrap_or_default(),
            mask_token(&github.token)
        );
    }
    Ok(headers)
}

fn gitlab_headers(credentials: &Credentials) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = &credentials.gitlab_token {
        let mut value = HeaderValue::from_str(token)?;
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static(GITLAB_TOKEN_HEADER), value);
        info!("Using GitLab token for authentication: {}", mask_token(token));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::runtime::MockRuntime;
    use mockito::{Matcher, Server};

    fn runtime_with_token(token: Option<&'static str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| match (key, token) {
            ("CI", _) => Ok("true".into()),
            ("GITHUB_TOKEN", Some(t)) => Ok(t.into()),
            _ => Err(std::env::VarError::NotPresent),
        });
        runtime
    }

    /// Verifies the Authorization header sent to the GitHub API.
    async fn verify_authorization_header(token: Option<&'static str>) {
        let mut server = Server::new_async().await;
        let expected_header = match token {
            Some(t) => Matcher::Exact(format!("Bearer {}", t)),
            None => Matcher::Missing,
        };
        let mock = server
            .mock("GET", "/rate_limit")
            .match_header("Authorization", expected_header)
            .match_header("User-Agent", "fpm-index")
            .with_status(200)
            .with_body(r#"{"resources": {"core": {"remaining": 4999}}}"#)
            .create_async()
            .await;

        let options = Options {
            github_api_url: server.url(),
            ..Default::default()
        };
        let config = Config::new(runtime_with_token(token), options).unwrap();
        config.github.probe_rate_limit().await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_config_new_with_github_token() {
        verify_authorization_header(Some("ghp_0123456789abcdef")).await;
    }

    #[tokio::test]
    async fn test_config_new_without_github_token() {
        verify_authorization_header(None).await;
    }

    #[test]
    fn test_backend_order() {
        let config = Config::new(runtime_with_token(None), Options::default()).unwrap();
        let kinds: Vec<BackendKind> = config
            .pipeline
            .fetcher()
            .budgets()
            .into_iter()
            .map(|b| b.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![BackendKind::GitHub, BackendKind::GitLab, BackendKind::Clone]
        );
    }

    #[test]
    fn test_gitlab_token_header() {
        let credentials = Credentials {
            github: None,
            gitlab_token: Some("glpat-secret".into()),
        };
        let headers = gitlab_headers(&credentials).unwrap();
        let value = headers.get("PRIVATE-TOKEN").unwrap();
        assert_eq!(value, "glpat-secret");
        assert!(value.is_sensitive());

        assert!(gitlab_headers(&Credentials::default()).unwrap().is_empty());
    }

    #[test]
    fn test_options_defaults() {
        let options = Options::default();
        assert_eq!(options.registry, PathBuf::from("registry.toml"));
        assert_eq!(options.index, PathBuf::from("index.json"));
        assert_eq!(options.github_api_url, DEFAULT_GITHUB_API_URL);
        assert_eq!(options.timeout, Some(Duration::from_secs(60)));
        assert_eq!(options.strictness, Strictness::default());
    }
}
