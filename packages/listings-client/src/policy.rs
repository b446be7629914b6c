//! Per-operation retry policy.
//!
//! Listing fetches re-authenticate and retry once on a 401; contact upserts
//! surface the 401 immediately. The asymmetry lives here as data rather than
//! as separate code paths.

use std::collections::HashMap;
use std::fmt;

/// Provider calls that run under a client token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    FetchListings,
    UpsertContact,
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderOperation::FetchListings => f.write_str("fetch_listings"),
            ProviderOperation::UpsertContact => f.write_str("upsert_contact"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_on_auth_failure: HashMap<ProviderOperation, bool>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
            .retry_on_auth_failure(ProviderOperation::FetchListings, true)
            .retry_on_auth_failure(ProviderOperation::UpsertContact, false)
    }
}

impl RetryPolicy {
    /// Empty table: no operation retries.
    pub fn new() -> Self {
        Self {
            retry_on_auth_failure: HashMap::new(),
        }
    }

    pub fn retry_on_auth_failure(mut self, operation: ProviderOperation, retry: bool) -> Self {
        self.retry_on_auth_failure.insert(operation, retry);
        self
    }

    /// Whether a 401 on `operation` earns one re-authenticated retry.
    pub fn retries_on_auth_failure(&self, operation: ProviderOperation) -> bool {
        self.retry_on_auth_failure
            .get(&operation)
            .copied()
            .unwrap_or(false)
    }
}
