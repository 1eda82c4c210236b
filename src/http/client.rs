//! Thin HTTP client shared by the hosted API backends.
//!
//! Requests are sent exactly once. A failed call fails the entry that made it;
//! there is no retry loop here.

use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::status::classify_status;
use crate::backend::BackendError;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sends a GET request and returns the raw response, whatever its status.
    ///
    /// Callers that track rate limits read the headers first and then hand the
    /// response to [`HttpClient::json`].
    #[tracing::instrument(skip(self, query))]
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, BackendError> {
        debug!("GET {} with query {:?}...", url, query);
        let response = self.client.get(url).query(query).send().await?;
        Ok(response)
    }

    /// Checks the status of a response and deserializes its JSON body.
    pub async fn json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let rate_limited = header_u64(response.headers(), "x-ratelimit-remaining") == Some(0)
                || header_u64(response.headers(), "ratelimit-remaining") == Some(0);
            return Err(classify_status(status, &url, rate_limited).into());
        }
        Ok(response.json::<T>().await?)
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, BackendError> {
        let response = self.get(url, query).await?;
        Self::json(response).await
    }
}

/// Reads a numeric header value, e.g. a remaining rate-limit budget.
///
/// Returns `None` when the header is absent or not a non-negative integer.
pub fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiError;
    use reqwest::header::HeaderValue;

    #[tokio::test]
    async fn test_get_json_with_query_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test?ref=v1.0.0")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "test", "value": 42}"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());

        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct TestResponse {
            name: String,
            value: i32,
        }

        let result: TestResponse = client
            .get_json_with_query(&format!("{}/test", url), &[("ref", "v1.0.0")])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "test");
        assert_eq!(result.value, 42);
    }

    #[tokio::test]
    async fn test_get_json_not_found_is_classified() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result: Result<serde_json::Value, _> = client
            .get_json_with_query(&format!("{}/missing", url), &[])
            .await;

        // Sent exactly once, no retry
        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(BackendError::Api(ApiError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_forbidden_with_exhausted_budget_is_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/limited")
            .with_status(403)
            .with_header("x-ratelimit-remaining", "0")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result: Result<serde_json::Value, _> = client
            .get_json_with_query(&format!("{}/limited", url), &[])
            .await;

        assert!(matches!(
            result,
            Err(BackendError::Api(ApiError::RateLimitExceeded(_)))
        ));
    }

    #[tokio::test]
    async fn test_get_returns_headers_of_error_responses() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/gone")
            .with_status(404)
            .with_header("RateLimit-Remaining", "17")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let response = client.get(&format!("{}/gone", url), &[]).await.unwrap();

        assert_eq!(header_u64(response.headers(), "RateLimit-Remaining"), Some(17));
        assert_eq!(response.status().as_u16(), 404);
    }

    #[test]
    fn test_header_u64() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        headers.insert("ratelimit-remaining", HeaderValue::from_static("not-a-number"));

        assert_eq!(header_u64(&headers, "x-ratelimit-remaining"), Some(4999));
        assert_eq!(header_u64(&headers, "X-RateLimit-Remaining"), Some(4999));
        assert_eq!(header_u64(&headers, "ratelimit-remaining"), None);
        assert_eq!(header_u64(&headers, "missing"), None);
    }
}
