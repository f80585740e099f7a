//! Call status source
//!
//! Lists the calls belonging to an assistant. The HTTP implementation talks
//! to the call-listing endpoint; tests substitute scripted sources.

use crate::error::{ReportError, Result};
use crate::record::RemoteRecord;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch a fresh snapshot of every call known for `owner_id`
    async fn list_calls(&self, owner_id: &str, auth_token: &str) -> Result<Vec<RemoteRecord>>;
}

pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn list_calls(&self, owner_id: &str, auth_token: &str) -> Result<Vec<RemoteRecord>> {
        let url = format!("{}/call", self.base_url);
        debug!("Listing calls for assistant {}", owner_id);

        let response = self
            .client
            .get(&url)
            .query(&[("assistantId", owner_id)])
            .header("Authorization", format!("Bearer {}", auth_token))
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ReportError::Transport(format!("call listing request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Transport(format!(
                "call listing failed with status {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::Transport(format!("failed to read call listing: {}", e)))?;

        parse_call_listing(&body)
    }
}

/// Decode a call-listing body. Anything other than an array of records is
/// rejected.
pub fn parse_call_listing(body: &str) -> Result<Vec<RemoteRecord>> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ReportError::Malformed(format!("body is not JSON: {}", e)))?;

    if !value.is_array() {
        return Err(ReportError::Malformed("expected a JSON array of calls".to_string()));
    }

    serde_json::from_value(value).map_err(|e| ReportError::Malformed(format!("invalid call record: {}", e)))
}
