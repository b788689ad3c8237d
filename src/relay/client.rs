//! Request/response transport to the relay
//!
//! An HTTP client posting RPC payloads to the generic execution path and
//! employee queries to the dedicated lookup path. Every call is bounded
//! by a timeout; a timeout is a failure with its own reason, not a hang.

use crate::core::config::{AssistantConfig, HEAVY_TIMEOUT, REQUEST_TIMEOUT};
use crate::core::error::{AssistantError, Result};
use crate::relay::protocol::{interpret_reply, EmployeeQuery, RelayReply, RpcPayload};
use reqwest::Client;
use std::time::Duration;
use uuid::Uuid;

/// Transport seam between the executor and the relay
///
/// The production implementation is [`RelayClient`]; tests substitute a
/// recording mock to verify cascade behavior without a network.
pub trait RelayTransport {
    /// Execute a generic RPC payload
    fn call(&self, payload: &RpcPayload) -> impl std::future::Future<Output = Result<RelayReply>> + Send;

    /// Query the dedicated employee lookup path
    fn search_employees(
        &self,
        query: &EmployeeQuery,
    ) -> impl std::future::Future<Output = Result<RelayReply>> + Send;
}

/// HTTP transport against a live relay
pub struct RelayClient {
    client: Client,
    execute_url: String,
    employee_search_url: String,
    api_key: Option<String>,
    database: Option<String>,
}

impl RelayClient {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            client: Client::new(),
            execute_url: config.execute_url(),
            employee_search_url: config.employee_search_url(),
            api_key: config.api_key.clone(),
            database: config.database.clone(),
        }
    }

    /// Timeout budget for a payload: assistant queries get the heavy budget
    fn timeout_for(payload: &RpcPayload) -> Duration {
        if payload.model == "ai.assistant" {
            HEAVY_TIMEOUT
        } else {
            REQUEST_TIMEOUT
        }
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
        what: &str,
    ) -> Result<RelayReply> {
        let call_id = Uuid::new_v4();
        tracing::debug!(%call_id, url, what, "relay call");

        let mut request = self.client.post(url).json(body).timeout(timeout);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }
        if let Some(ref db) = self.database {
            request = request.header("x-relay-database", db);
        }

        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| AssistantError::TimedOut { what: what.into() })?
            .map_err(|e| {
                if e.is_timeout() {
                    AssistantError::TimedOut { what: what.into() }
                } else {
                    AssistantError::RelayError(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AssistantError::RelayError(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(%call_id, %status, "relay returned error status");
            // Error bodies still carry envelopes worth interpreting
            return match interpret_reply(&text) {
                RelayReply::Failure(message) => Ok(RelayReply::Failure(message)),
                _ => Ok(RelayReply::Failure(format!("HTTP {}: {}", status, text))),
            };
        }

        Ok(interpret_reply(&text))
    }
}

impl RelayTransport for RelayClient {
    async fn call(&self, payload: &RpcPayload) -> Result<RelayReply> {
        let body = serde_json::to_value(payload)?;
        let what = format!("{}.{}", payload.model, payload.method);
        self.post_json(&self.execute_url, &body, Self::timeout_for(payload), &what)
            .await
    }

    async fn search_employees(&self, query: &EmployeeQuery) -> Result<RelayReply> {
        let body = serde_json::to_value(query)?;
        self.post_json(
            &self.employee_search_url,
            &body,
            REQUEST_TIMEOUT,
            "employee search",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_selection() {
        let assistant = RpcPayload::new("ai.assistant", "ask");
        assert_eq!(RelayClient::timeout_for(&assistant), HEAVY_TIMEOUT);

        let sales = RpcPayload::new("sale.order", "read_group");
        assert_eq!(RelayClient::timeout_for(&sales), REQUEST_TIMEOUT);
    }

    #[test]
    fn test_client_creation() {
        let config = AssistantConfig::new("https://erp.example.com");
        let client = RelayClient::new(&config);
        assert_eq!(client.execute_url, "https://erp.example.com/api/execute");
        assert!(client.api_key.is_none());
    }
}
