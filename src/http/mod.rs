//! HTTP client module with API error classification.

mod client;
mod status;

pub use client::{HttpClient, header_u64};
pub use status::{ApiError, classify_status};
