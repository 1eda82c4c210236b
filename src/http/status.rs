//! Classification of unsuccessful API responses.
//!
//! The fetcher never retries, so classification only serves diagnostics: a
//! per-entry failure should say whether the file was missing, the budget ran
//! out, or the credentials were rejected.

use reqwest::StatusCode;
use thiserror::Error;

/// An unsuccessful hosted API response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Rate limit exceeded (HTTP 403 with an exhausted budget, or 429)
    #[error("Rate limit exceeded: {0}. Provide an API token to raise the limit.")]
    RateLimitExceeded(String),

    /// Authentication failed (HTTP 401)
    #[error("Authentication failed: {0}. Check the configured token.")]
    AuthenticationFailed(String),

    /// Resource not found (HTTP 404); usually fpm.toml is missing at the reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// Forbidden access (HTTP 403 non-rate-limit)
    #[error("Access forbidden: {0}. You may need authentication.")]
    Forbidden(String),

    /// Other 4xx responses
    #[error("Request error: HTTP {status} from {url}")]
    ClientError { status: u16, url: String },

    /// 5xx responses
    #[error("Server error: HTTP {status} from {url}")]
    ServerError { status: u16, url: String },
}

/// Classifies a non-success status code.
///
/// `rate_limited` reports whether the response carried an exhausted budget
/// header, which turns a plain 403 into a rate-limit error.
pub fn classify_status(status: StatusCode, url: &str, rate_limited: bool) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::AuthenticationFailed(url.to_string()),
        StatusCode::FORBIDDEN if rate_limited => ApiError::RateLimitExceeded(url.to_string()),
        StatusCode::FORBIDDEN => ApiError::Forbidden(url.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimitExceeded(url.to_string()),
        StatusCode::NOT_FOUND => ApiError::NotFound(url.to_string()),
        s if s.is_server_error() => ApiError::ServerError {
            status: s.as_u16(),
            url: url.to_string(),
        },
        s => ApiError::ClientError {
            status: s.as_u16(),
            url: url.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://api.github.com/repos/x/y/contents/fpm.toml";

    #[test]
    fn test_api_error_display() {
        let err = ApiError::RateLimitExceeded("test".to_string());
        assert!(err.to_string().contains("Rate limit"));
        assert!(err.to_string().contains("token"));

        let err = ApiError::AuthenticationFailed("test".to_string());
        assert!(err.to_string().contains("Authentication"));

        let err = ApiError::NotFound("test".to_string());
        assert!(err.to_string().contains("Not found"));

        let err = ApiError::Forbidden("test".to_string());
        assert!(err.to_string().contains("forbidden"));

        let err = ApiError::ClientError {
            status: 400,
            url: "u".into(),
        };
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[test]
    fn test_classify_unauthorized() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, URL, false),
            ApiError::AuthenticationFailed(_)
        ));
    }

    #[test]
    fn test_classify_forbidden() {
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, URL, false),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, URL, true),
            ApiError::RateLimitExceeded(_)
        ));
    }

    #[test]
    fn test_classify_too_many_requests() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, URL, false),
            ApiError::RateLimitExceeded(_)
        ));
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, URL, false),
            ApiError::NotFound(URL.to_string())
        );
    }

    #[test]
    fn test_classify_other_statuses() {
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, URL, false),
            ApiError::ClientError {
                status: 400,
                url: URL.to_string()
            }
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, URL, false),
            ApiError::ServerError {
                status: 503,
                url: URL.to_string()
            }
        );
    }
}
