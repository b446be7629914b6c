//! Testing utilities.
//!
//! [`StubProvider`] stands in for the listings provider so applications and
//! tests can drive [`crate::ListingsClient`] without network access. Token
//! endpoints issue numbered tokens (`account-token-1`, `client-token-1`, ...);
//! listing and contact responses are served from scripted queues. Every
//! request is recorded for assertions.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::config::Endpoints;
use crate::error::RequestFailure;
use crate::transport::{BaseProviderTransport, ProviderResponse};
use crate::types::ListingRecord;

type Scripted = Result<ProviderResponse, RequestFailure>;

/// Record of a request made to the stub.
#[derive(Debug, Clone, PartialEq)]
pub struct StubCall {
    pub path: String,
    pub bearer: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct StubState {
    account_rejection: Option<ProviderResponse>,
    client_rejection: Option<ProviderResponse>,
    client_token_body: Option<Value>,
    rejected_listing_bearers: Vec<String>,
    listing_responses: VecDeque<Scripted>,
    contact_responses: VecDeque<Scripted>,
    account_issued: usize,
    client_issued: usize,
    calls: Vec<StubCall>,
}

/// Scripted in-memory listings provider.
///
/// An exhausted listing queue answers with an empty page; an exhausted
/// contact queue answers `{}`.
#[derive(Default)]
pub struct StubProvider {
    endpoints: Endpoints,
    state: Mutex<StubState>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve on custom endpoint paths.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Queue a listing page with the given records and reported total.
    pub fn listing_page(self, records: Vec<ListingRecord>, total_count: u64) -> Self {
        let body = json!({ "estates": records, "totalCount": total_count });
        self.listing_response(200, body.to_string())
    }

    /// Queue a listing page of generated records with the given ids.
    pub fn listing_page_ids(self, ids: impl IntoIterator<Item = i64>, total_count: u64) -> Self {
        let records = ids
            .into_iter()
            .map(|id| ListingRecord::new(id).with_field("name", json!(format!("Estate {}", id))))
            .collect();
        self.listing_page(records, total_count)
    }

    /// Queue a 401 on the listing endpoint.
    pub fn listing_unauthorized(self) -> Self {
        self.listing_response(401, "Unauthorized")
    }

    /// Answer 401 to every listing request carrying `token`, without
    /// consuming the listing queue.
    pub fn reject_listing_bearer(self, token: impl Into<String>) -> Self {
        self.state().rejected_listing_bearers.push(token.into());
        self
    }

    /// Queue an arbitrary listing response.
    pub fn listing_response(self, status: u16, body: impl Into<String>) -> Self {
        self.state()
            .listing_responses
            .push_back(Ok(ProviderResponse::new(status, body)));
        self
    }

    /// Queue a transport failure on the listing endpoint.
    pub fn listing_network_failure(self, message: impl Into<String>) -> Self {
        self.state()
            .listing_responses
            .push_back(Err(RequestFailure::Network(message.into())));
        self
    }

    /// Queue an arbitrary contact-upsert response.
    pub fn contact_response(self, status: u16, body: impl Into<String>) -> Self {
        self.state()
            .contact_responses
            .push_back(Ok(ProviderResponse::new(status, body)));
        self
    }

    /// Answer every account token request with this status and body.
    pub fn reject_account_token(self, status: u16, body: impl Into<String>) -> Self {
        self.state().account_rejection = Some(ProviderResponse::new(status, body));
        self
    }

    /// Answer every client token request with this status and body.
    pub fn reject_client_token(self, status: u16, body: impl Into<String>) -> Self {
        self.state().client_rejection = Some(ProviderResponse::new(status, body));
        self
    }

    /// Answer client token requests with 200 and this JSON body.
    pub fn client_token_body(self, body: Value) -> Self {
        self.state().client_token_body = Some(body);
        self
    }

    /// All recorded requests, in order.
    pub fn calls(&self) -> Vec<StubCall> {
        self.state().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<StubCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.path == path)
            .cloned()
            .collect()
    }

    pub fn count_calls(&self, path: &str) -> usize {
        self.state().calls.iter().filter(|c| c.path == path).count()
    }

    /// Bodies of every listing search request, in order.
    pub fn listing_bodies(&self) -> Vec<Value> {
        self.calls_to(&self.endpoints.listings)
            .into_iter()
            .map(|c| c.body)
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BaseProviderTransport for StubProvider {
    async fn post_json(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<ProviderResponse, RequestFailure> {
        let mut state = self.state();
        state.calls.push(StubCall {
            path: path.to_string(),
            bearer: bearer.map(str::to_string),
            body: body.clone(),
        });

        let ep = &self.endpoints;
        if path == ep.account_token {
            if let Some(rejection) = state.account_rejection.clone() {
                return Ok(rejection);
            }
            state.account_issued += 1;
            let token = format!("account-token-{}", state.account_issued);
            return Ok(ProviderResponse::new(200, json!({ "token": token }).to_string()));
        }

        if bearer.is_none() {
            return Ok(ProviderResponse::new(401, "Missing bearer token"));
        }

        if path == ep.client_token {
            if let Some(rejection) = state.client_rejection.clone() {
                return Ok(rejection);
            }
            if let Some(body) = state.client_token_body.clone() {
                return Ok(ProviderResponse::new(200, body.to_string()));
            }
            state.client_issued += 1;
            let token = format!("client-token-{}", state.client_issued);
            return Ok(ProviderResponse::new(200, json!({ "token": token }).to_string()));
        }

        if path == ep.listings {
            if bearer.is_some_and(|b| state.rejected_listing_bearers.iter().any(|r| r == b)) {
                return Ok(ProviderResponse::new(401, "Unauthorized"));
            }
            return state.listing_responses.pop_front().unwrap_or_else(|| {
                Ok(ProviderResponse::new(
                    200,
                    json!({ "estates": [], "totalCount": 0 }).to_string(),
                ))
            });
        }

        if path == ep.contact_upsert {
            return state
                .contact_responses
                .pop_front()
                .unwrap_or_else(|| Ok(ProviderResponse::new(200, "{}")));
        }

        Ok(ProviderResponse::new(404, format!("No route for {}", path)))
    }
}
