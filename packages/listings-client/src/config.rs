use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::credentials::{AccountCredentials, Password};
use crate::error::{ListingsError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.whise.eu";

/// Tokens are assumed valid for one hour from issuance.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub account_token: String,
    pub client_token: String,
    pub listings: String,
    pub contact_upsert: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            account_token: "/token".to_string(),
            client_token: "/v1/admin/clients/token".to_string(),
            listings: "/v1/estates/list".to_string(),
            contact_upsert: "/v1/contacts/upsert".to_string(),
        }
    }
}

/// Listings client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ListingsConfig {
    pub base_url: String,
    pub credentials: AccountCredentials,
    pub client_id: u64,
    pub token_lifetime: Duration,
    pub request_timeout: Duration,
    pub endpoints: Endpoints,
}

impl ListingsConfig {
    pub fn new(credentials: AccountCredentials, client_id: u64) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
            client_id,
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            endpoints: Endpoints::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Username and password are optional here; their absence surfaces as
    /// `CredentialsMissing` on first use.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let client_id = lookup("LISTINGS_CLIENT_ID")
            .ok_or_else(|| ListingsError::Config("LISTINGS_CLIENT_ID must be set".into()))?
            .trim()
            .parse()
            .map_err(|_| ListingsError::Config("LISTINGS_CLIENT_ID must be a number".into()))?;

        let credentials = AccountCredentials {
            username: lookup("LISTINGS_API_USERNAME"),
            password: lookup("LISTINGS_API_PASSWORD").map(Password::new),
        };

        let mut config = Self::new(credentials, client_id);
        if let Some(base_url) = lookup("LISTINGS_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(secs) = lookup("LISTINGS_TOKEN_LIFETIME_SECS") {
            config.token_lifetime = parse_secs("LISTINGS_TOKEN_LIFETIME_SECS", &secs)?;
        }
        if let Some(secs) = lookup("LISTINGS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("LISTINGS_REQUEST_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ListingsError::Config(format!("{} must be a whole number of seconds", key)))
}
