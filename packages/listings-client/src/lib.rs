//! Real-estate listings provider REST API client.
//!
//! Holds a two-tier bearer-token session (account token, then a client token
//! derived from it), fetches listings either one page at a time or as a fully
//! accumulated de-duplicated set, and upserts contacts.
//!
//! # Example
//!
//! ```rust,ignore
//! use listings_client::{ListingQuery, ListingsClient};
//!
//! let client = ListingsClient::from_env()?;
//!
//! // Eight listings for a homepage teaser
//! let teaser = client.fetch_listings(&ListingQuery::new().page(8, 0)).await?;
//!
//! // Everything for sale, walked page by page
//! let all = client
//!     .fetch_listings(&ListingQuery::new().filter(serde_json::json!({"PurposeIds": [1]})))
//!     .await?;
//! println!("{} of {} listings", teaser.records.len(), all.total_count);
//! ```

pub mod config;
pub mod contacts;
pub mod credentials;
pub mod error;
pub mod listings;
pub mod policy;
pub mod session;
pub mod testing;
pub mod transport;
pub mod types;

pub use config::{Endpoints, ListingsConfig};
pub use credentials::{AccountCredentials, Password};
pub use error::{ListingsError, RequestFailure, Result};
pub use listings::ACCUMULATION_PAGE_SIZE;
pub use policy::{ProviderOperation, RetryPolicy};
pub use session::Session;
pub use transport::{BaseProviderTransport, HttpTransport, ProviderResponse};
pub use types::{ListingQuery, ListingRecord, ListingsPage, PageRequest, RecordId};

use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Listings provider client.
///
/// Owns its token session; share it behind an `Arc` rather than creating one
/// per request, or every request re-authenticates.
pub struct ListingsClient {
    session: Session,
    transport: Arc<dyn BaseProviderTransport>,
    endpoints: Endpoints,
    policy: RetryPolicy,
}

impl ListingsClient {
    /// Create a client that talks to the provider over HTTP.
    pub fn new(config: ListingsConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.base_url.clone(), config.request_timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create from `LISTINGS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ListingsConfig::from_env()?)
    }

    /// Create a client over any transport (tests use [`testing::StubProvider`]).
    pub fn with_transport(
        config: ListingsConfig,
        transport: Arc<dyn BaseProviderTransport>,
    ) -> Result<Self> {
        let session = Session::new(&config, transport.clone())?;
        Ok(Self {
            session,
            transport,
            endpoints: config.endpoints,
            policy: RetryPolicy::default(),
        })
    }

    /// Replace the per-operation retry table.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// A currently valid client-scoped token, for callers making their own
    /// provider requests.
    pub async fn client_token(&self) -> Result<String> {
        self.session.client_token().await
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send `body` under the client token, applying the retry policy of
    /// `operation` when the provider answers 401.
    ///
    /// Only 2xx responses are returned; everything else becomes the
    /// operation's error variant.
    async fn send_authorized(
        &self,
        operation: ProviderOperation,
        path: &str,
        body: &Value,
    ) -> Result<ProviderResponse> {
        let mut retried = false;
        loop {
            let token = self.session.client_token().await?;
            let response = self
                .transport
                .post_json(path, Some(token.as_str()), body)
                .await
                .map_err(|failure| operation_error(operation, failure))?;

            if response.is_success() {
                return Ok(response);
            }

            let failure = RequestFailure::Status {
                status: response.status,
                body: response.body,
            };
            if failure.is_unauthorized() && !retried && self.policy.retries_on_auth_failure(operation)
            {
                warn!(%operation, "Provider rejected client token, re-authenticating once");
                self.session.invalidate_if_current(&token).await;
                retried = true;
                continue;
            }

            return Err(operation_error(operation, failure));
        }
    }
}

fn operation_error(operation: ProviderOperation, failure: RequestFailure) -> ListingsError {
    match operation {
        ProviderOperation::FetchListings => ListingsError::FetchFailed(failure),
        ProviderOperation::UpsertContact => ListingsError::UpsertFailed(failure),
    }
}
