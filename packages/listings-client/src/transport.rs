//! Transport seam for provider I/O.
//!
//! Everything the client sends is a JSON POST, optionally carrying a bearer
//! token. Keeping that behind a trait lets tests script the provider with
//! [`crate::testing::StubProvider`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::error::{ListingsError, RequestFailure, Result};

/// Status and raw body of one provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn the response into `T`, failing on non-2xx or unparseable bodies.
    pub fn into_json<T: DeserializeOwned>(self) -> std::result::Result<T, RequestFailure> {
        if !self.is_success() {
            return Err(RequestFailure::Status {
                status: self.status,
                body: self.body,
            });
        }
        serde_json::from_str(&self.body).map_err(|e| RequestFailure::Parse(e.to_string()))
    }
}

#[async_trait]
pub trait BaseProviderTransport: Send + Sync {
    /// POST `body` to `path`, with `bearer` as the Authorization token if given.
    ///
    /// Non-2xx statuses are returned as responses, not errors; only failures
    /// to complete the exchange are `Err`.
    async fn post_json(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> std::result::Result<ProviderResponse, RequestFailure>;
}

/// `reqwest`-backed transport against the real provider.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ListingsError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BaseProviderTransport for HttpTransport {
    async fn post_json(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> std::result::Result<ProviderResponse, RequestFailure> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "Listings provider request failed");
            RequestFailure::Network(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RequestFailure::Network(e.to_string()))?;

        Ok(ProviderResponse { status, body })
    }
}
