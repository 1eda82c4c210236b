//! Remaining-call budget of a rate-limited backend.

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use reqwest::header::HeaderMap;

use crate::http::header_u64;

/// Remaining API calls for one backend during one run.
///
/// A single atomic value, so the counter stays consistent if entries are ever
/// fetched concurrently.
#[derive(Debug)]
pub struct RateBudget {
    remaining: AtomicU64,
    /// Response header carrying the refreshed budget.
    header: &'static str,
}

impl RateBudget {
    pub fn new(initial: u64, header: &'static str) -> Self {
        Self {
            remaining: AtomicU64::new(initial),
            header,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn set(&self, remaining: u64) {
        self.remaining.store(remaining, Ordering::SeqCst);
    }

    /// Refreshes the budget from a response's headers.
    ///
    /// An absent or malformed header leaves the budget unchanged.
    pub fn refresh_from(&self, headers: &HeaderMap) {
        if let Some(remaining) = header_u64(headers, self.header) {
            debug!("{}: {}", self.header, remaining);
            self.set(remaining);
        }
    }
}
