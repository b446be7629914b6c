//! Typed errors for the listings client.
//!
//! Every provider round trip that goes wrong is described by a
//! [`RequestFailure`]; the operation that issued it decides which
//! [`ListingsError`] variant wraps it.

use thiserror::Error;

/// Result type for listings client operations.
pub type Result<T> = std::result::Result<T, ListingsError>;

/// Errors surfaced to callers of the listings client.
#[derive(Debug, Error)]
pub enum ListingsError {
    /// Account username or password not configured
    #[error("account credentials are not configured")]
    CredentialsMissing,

    /// Account-level token issuance rejected or malformed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[source] RequestFailure),

    /// Client-scoped token issuance rejected or malformed
    #[error("client token request failed: {0}")]
    ClientTokenFailed(#[source] RequestFailure),

    /// Listing search failed (after the permitted retry, if any)
    #[error("listing fetch failed: {0}")]
    FetchFailed(#[source] RequestFailure),

    /// Contact upsert failed
    #[error("contact upsert failed: {0}")]
    UpsertFailed(#[source] RequestFailure),

    /// Invalid or unreadable configuration
    #[error("config error: {0}")]
    Config(String),
}

/// Why a single provider request did not produce a usable response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestFailure {
    /// Connection failed, timed out, or the body could not be read
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("unexpected response body: {0}")]
    Parse(String),

    /// Token issuance succeeded but carried no token
    #[error("response did not contain a token")]
    MissingToken,
}

impl RequestFailure {
    /// True when the provider rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RequestFailure::Status { status: 401, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_detection() {
        let failure = RequestFailure::Status {
            status: 401,
            body: "expired".into(),
        };
        assert!(failure.is_unauthorized());

        let failure = RequestFailure::Status {
            status: 403,
            body: String::new(),
        };
        assert!(!failure.is_unauthorized());
        assert!(!RequestFailure::Network("reset".into()).is_unauthorized());
    }

    #[test]
    fn test_error_display_includes_cause() {
        let err = ListingsError::FetchFailed(RequestFailure::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(err.to_string(), "listing fetch failed: HTTP 500: boom");
    }
}
