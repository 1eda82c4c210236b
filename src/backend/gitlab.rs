//! GitLab repository files API backend.

use async_trait::async_trait;
use log::info;
use reqwest::Url;

use crate::http::HttpClient;

use super::{Backend, BackendError, BackendKind, FileRequest, RateBudget, RepoLocation, decode_content};

/// Budget assumed until a response reports the real one.
pub const DEFAULT_BUDGET: u64 = 60;

const HOST: &str = "gitlab.com";

const RATE_LIMIT_HEADER: &str = "RateLimit-Remaining";

/// GitLab API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct FileContent {
        pub content: String,
        pub encoding: String,
    }
}

/// Reads files through `GET /projects/{namespace%2Fproject}/repository/files/{path}`.
pub struct GitLabBackend {
    http_client: HttpClient,
    api_url: String,
    budget: RateBudget,
}

impl GitLabBackend {
    /// Create a backend serving `gitlab.com` locations through `api_url`.
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            budget: RateBudget::new(DEFAULT_BUDGET, RATE_LIMIT_HEADER),
        }
    }

    /// Builds the file endpoint, percent-encoding the project path and file
    /// path as single segments.
    fn file_url(&self, project: &str, path: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| BackendError::InvalidLocation(format!("{}: {}", self.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidLocation(self.api_url.clone()))?
            .pop_if_empty()
            .push("projects")
            .push(project)
            .push("repository")
            .push("files")
            .push(path);
        Ok(url)
    }
}

#[async_trait]
impl Backend for GitLabBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::GitLab
    }

    fn handles(&self, location: &RepoLocation) -> bool {
        location.host.eq_ignore_ascii_case(HOST)
    }

    fn budget(&self) -> Option<u64> {
        Some(self.budget.remaining())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_file(&self, request: &FileRequest) -> Result<String, BackendError> {
        info!("        Retrieving {} via gitlab api...", request.path);

        let project = request.location.project_path()?;
        let url = self.file_url(&project, &request.path)?;
        let reference = request
            .reference
            .as_ref()
            .map(|r| r.rev())
            .unwrap_or("HEAD");

        let response = self
            .http_client
            .get(url.as_str(), &[("ref", reference)])
            .await?;
        self.budget.refresh_from(response.headers());

        let file: api::FileContent = HttpClient::json(response).await?;
        decode_content(&file.content, &file.encoding)
    }
}
