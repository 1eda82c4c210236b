//! GitHub contents API backend.

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::http::HttpClient;

use super::{Backend, BackendError, BackendKind, FileRequest, RateBudget, RepoLocation, decode_content};

/// Budget assumed before the first response, the unauthenticated hourly limit.
pub const DEFAULT_BUDGET: u64 = 60;

const HOST: &str = "github.com";

const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct FileContent {
        pub content: String,
        pub encoding: String,
    }

    #[derive(Deserialize, Debug)]
    pub struct RateLimit {
        pub resources: Resources,
    }

    #[derive(Deserialize, Debug)]
    pub struct Resources {
        pub core: Core,
    }

    #[derive(Deserialize, Debug)]
    pub struct Core {
        pub remaining: u64,
    }
}

/// Reads files through `GET /repos/{owner}/{repo}/contents/{path}`.
pub struct GitHubBackend {
    http_client: HttpClient,
    api_url: String,
    budget: RateBudget,
}

impl GitHubBackend {
    /// Create a backend serving `github.com` locations through `api_url`.
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            budget: RateBudget::new(DEFAULT_BUDGET, RATE_LIMIT_HEADER),
        }
    }

    /// Initializes the budget from `GET /rate_limit`.
    ///
    /// That endpoint does not count against the limit. On failure the current
    /// budget is kept and a warning is logged.
    #[tracing::instrument(skip(self))]
    pub async fn probe_rate_limit(&self) {
        let url = format!("{}/rate_limit", self.api_url);
        match self
            .http_client
            .get_json_with_query::<api::RateLimit>(&url, &[])
            .await
        {
            Ok(limit) => {
                debug!("GitHub rate limit remaining: {}", limit.resources.core.remaining);
                self.budget.set(limit.resources.core.remaining);
            }
            Err(e) => warn!(
                "Could not query GitHub rate limit ({}), assuming {} remaining requests",
                e,
                self.budget.remaining()
            ),
        }
    }
}

#[async_trait]
impl Backend for GitHubBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::GitHub
    }

    fn handles(&self, location: &RepoLocation) -> bool {
        location.host.eq_ignore_ascii_case(HOST)
    }

    fn budget(&self) -> Option<u64> {
        Some(self.budget.remaining())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_file(&self, request: &FileRequest) -> Result<String, BackendError> {
        info!("        Retrieving {} via github api...", request.path);

        let repo = request.location.repo_id()?;
        let url = format!("{}/repos/{}/contents/{}", self.api_url, repo, request.path);

        let query: Vec<(&str, &str)> = match &request.reference {
            Some(reference) => vec![("ref", reference.rev())],
            None => vec![],
        };

        let response = self.http_client.get(&url, &query).await?;
        self.budget.refresh_from(response.headers());

        let file: api::FileContent = HttpClient::json(response).await?;
        decode_content(&file.content, &file.encoding)
    }
}
