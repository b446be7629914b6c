use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{ListingsError, RequestFailure, Result};
use crate::policy::ProviderOperation;
use crate::ListingsClient;

impl ListingsClient {
    /// Create or update a contact at the provider.
    ///
    /// The payload is sent as-is. Under the default retry policy a 401 is
    /// not retried and surfaces as `UpsertFailed`. Any 2xx is a success:
    /// returns the provider's JSON response, `Value::Null` for an empty body,
    /// or the raw text as `Value::String` when the body is not JSON.
    pub async fn upsert_contact<C>(&self, contact: &C) -> Result<Value>
    where
        C: Serialize + ?Sized,
    {
        let body = serde_json::to_value(contact)
            .map_err(|e| ListingsError::UpsertFailed(RequestFailure::Parse(e.to_string())))?;

        info!("Upserting contact");
        let response = self
            .send_authorized(
                ProviderOperation::UpsertContact,
                &self.endpoints.contact_upsert,
                &body,
            )
            .await?;

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body).unwrap_or(Value::String(response.body)))
    }
}
