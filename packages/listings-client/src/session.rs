//! Two-tier bearer-token session.
//!
//! The account-level authorization token is obtained with username/password;
//! the client token is derived from it for one client id. Both are held by
//! the session, expire after a fixed lifetime, and are cleared together when
//! the provider rejects a request with 401.
//!
//! State lives behind an async mutex that stays locked across the refresh
//! round trip, so concurrent callers that find the token stale wait for the
//! one refresh in flight and then reuse its result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{Endpoints, ListingsConfig};
use crate::credentials::AccountCredentials;
use crate::error::{ListingsError, RequestFailure, Result};
use crate::transport::BaseProviderTransport;
use crate::types::{AccountTokenRequest, ClientTokenRequest, TokenResponse};

#[derive(Clone)]
struct BearerToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl BearerToken {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct SessionState {
    authorization: Option<BearerToken>,
    client: Option<BearerToken>,
}

pub struct Session {
    transport: Arc<dyn BaseProviderTransport>,
    credentials: AccountCredentials,
    client_id: u64,
    endpoints: Endpoints,
    lifetime: chrono::Duration,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(config: &ListingsConfig, transport: Arc<dyn BaseProviderTransport>) -> Result<Self> {
        Ok(Self {
            transport,
            credentials: config.credentials.clone(),
            client_id: config.client_id,
            endpoints: config.endpoints.clone(),
            lifetime: to_chrono(config.token_lifetime)?,
            state: Mutex::new(SessionState::default()),
        })
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// A currently valid account-level token, refreshing it if needed.
    pub async fn authorization_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        self.ensure_authorization(&mut state).await
    }

    /// A currently valid client-scoped token.
    ///
    /// Refreshes the authorization token first when it is absent or expired.
    pub async fn client_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(token) = state.client.as_ref().filter(|t| t.is_valid(now)) {
            debug!(client_id = self.client_id, "Reusing client token");
            return Ok(token.value.clone());
        }

        let authorization = self.ensure_authorization(&mut state).await?;

        info!(client_id = self.client_id, "Requesting client token");
        let request = ClientTokenRequest {
            client_id: self.client_id,
        };
        let token = self
            .issue(&self.endpoints.client_token, Some(authorization.as_str()), &request)
            .await
            .map_err(ListingsError::ClientTokenFailed)?;

        state.client = Some(token.clone());
        Ok(token.value)
    }

    /// Drop both held tokens; the next call re-authenticates from scratch.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.authorization = None;
        state.client = None;
        debug!(client_id = self.client_id, "Session tokens invalidated");
    }

    /// Drop both tokens only if `rejected` is still the held client token.
    ///
    /// Callers that saw a 401 on the same stale token race here; the first
    /// one clears and refreshes, the rest find a newer token and keep it.
    /// Returns whether anything was cleared.
    pub async fn invalidate_if_current(&self, rejected: &str) -> bool {
        let mut state = self.state.lock().await;
        let current = state
            .client
            .as_ref()
            .is_some_and(|token| token.value == rejected);
        if !current {
            debug!(
                client_id = self.client_id,
                "Rejected client token already replaced"
            );
            return false;
        }

        state.authorization = None;
        state.client = None;
        debug!(client_id = self.client_id, "Session tokens invalidated");
        true
    }

    async fn ensure_authorization(&self, state: &mut SessionState) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = state.authorization.as_ref().filter(|t| t.is_valid(now)) {
            return Ok(token.value.clone());
        }

        // Checked before any network call.
        let (username, password) = self
            .credentials
            .complete()
            .ok_or(ListingsError::CredentialsMissing)?;

        info!("Requesting account authorization token");
        let request = AccountTokenRequest {
            username,
            password: password.expose(),
        };
        let token = self
            .issue(&self.endpoints.account_token, None, &request)
            .await
            .map_err(ListingsError::AuthenticationFailed)?;

        // A new authorization token invalidates whatever client token it backed.
        state.client = None;
        state.authorization = Some(token.clone());
        Ok(token.value)
    }

    async fn issue<T: Serialize + Sync>(
        &self,
        path: &str,
        bearer: Option<&str>,
        request: &T,
    ) -> std::result::Result<BearerToken, RequestFailure> {
        let body =
            serde_json::to_value(request).map_err(|e| RequestFailure::Parse(e.to_string()))?;
        let response = self.transport.post_json(path, bearer, &body).await?;
        let parsed: TokenResponse = response.into_json()?;

        let value = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or(RequestFailure::MissingToken)?;

        let issued_at = Utc::now();
        Ok(BearerToken {
            value,
            expires_at: issued_at
                .checked_add_signed(self.lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }
}

fn to_chrono(lifetime: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(lifetime)
        .map_err(|_| ListingsError::Config(format!("token lifetime {:?} is too large", lifetime)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubProvider;
    use serde_json::json;

    fn session_with(stub: &Arc<StubProvider>, config: ListingsConfig) -> Session {
        Session::new(&config, stub.clone()).unwrap()
    }

    fn config() -> ListingsConfig {
        ListingsConfig::new(AccountCredentials::new("agency", "pw"), 4021)
    }

    #[tokio::test]
    async fn test_client_token_requests_authorization_first() {
        let stub = Arc::new(StubProvider::new());
        let session = session_with(&stub, config());

        let token = session.client_token().await.unwrap();
        assert_eq!(token, "client-token-1");

        let calls = stub.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].path, "/token");
        assert_eq!(calls[0].bearer, None);
        assert_eq!(calls[0].body, json!({"Username": "agency", "Password": "pw"}));
        assert_eq!(calls[1].path, "/v1/admin/clients/token");
        assert_eq!(calls[1].bearer.as_deref(), Some("account-token-1"));
        assert_eq!(calls[1].body, json!({"ClientId": 4021}));
    }

    #[tokio::test]
    async fn test_tokens_reused_while_valid() {
        let stub = Arc::new(StubProvider::new());
        let session = session_with(&stub, config());

        session.client_token().await.unwrap();
        session.client_token().await.unwrap();
        session.authorization_token().await.unwrap();

        assert_eq!(stub.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_tokens_refreshed() {
        let stub = Arc::new(StubProvider::new());
        let session = session_with(&stub, config().with_token_lifetime(Duration::ZERO));

        assert_eq!(session.client_token().await.unwrap(), "client-token-1");
        assert_eq!(session.client_token().await.unwrap(), "client-token-2");

        assert_eq!(stub.count_calls("/token"), 2);
        assert_eq!(stub.count_calls("/v1/admin/clients/token"), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_network() {
        let stub = Arc::new(StubProvider::new());
        let session = session_with(&stub, ListingsConfig::new(AccountCredentials::default(), 1));

        let err = session.client_token().await.unwrap_err();
        assert!(matches!(err, ListingsError::CredentialsMissing));
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let stub = Arc::new(StubProvider::new().reject_account_token(400, "bad credentials"));
        let session = session_with(&stub, config());

        let err = session.authorization_token().await.unwrap_err();
        match err {
            ListingsError::AuthenticationFailed(RequestFailure::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_token_field_required() {
        let stub = Arc::new(StubProvider::new().client_token_body(json!({"expires": 3600})));
        let session = session_with(&stub, config());

        let err = session.client_token().await.unwrap_err();
        assert!(matches!(
            err,
            ListingsError::ClientTokenFailed(RequestFailure::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_invalidate_clears_both_tokens() {
        let stub = Arc::new(StubProvider::new());
        let session = session_with(&stub, config());

        session.client_token().await.unwrap();
        session.invalidate().await;
        assert_eq!(session.client_token().await.unwrap(), "client-token-2");

        assert_eq!(stub.count_calls("/token"), 2);
    }

    #[tokio::test]
    async fn test_stale_rejection_keeps_newer_token() {
        let stub = Arc::new(StubProvider::new());
        let session = session_with(&stub, config());

        let stale = session.client_token().await.unwrap();
        assert!(session.invalidate_if_current(&stale).await);
        let fresh = session.client_token().await.unwrap();
        assert_eq!(fresh, "client-token-2");

        // A second caller reporting the same stale token must not wipe the fresh one.
        assert!(!session.invalidate_if_current(&stale).await);
        assert_eq!(session.client_token().await.unwrap(), fresh);
        assert_eq!(stub.count_calls("/token"), 2);
        assert_eq!(stub.count_calls("/v1/admin/clients/token"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let stub = Arc::new(StubProvider::new());
        let session = Arc::new(session_with(&stub, config()));

        let (a, b, c) = tokio::join!(
            session.client_token(),
            session.client_token(),
            session.client_token()
        );

        assert_eq!(a.unwrap(), "client-token-1");
        assert_eq!(b.unwrap(), "client-token-1");
        assert_eq!(c.unwrap(), "client-token-1");
        assert_eq!(stub.count_calls("/token"), 1);
        assert_eq!(stub.count_calls("/v1/admin/clients/token"), 1);
    }
}
