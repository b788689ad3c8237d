//! Assistant configuration with documented constants
//!
//! Connection parameters come from the environment (optionally overridden
//! by a TOML file); timeout constants are collected here with explanations
//! of how they were chosen.

use crate::core::error::{AssistantError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Timeout for ordinary relay calls (generic RPC, dedicated lookups)
///
/// At 15s, a slow-but-alive relay still answers; anything longer is
/// indistinguishable from a hung connection for an interactive user.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for heavyweight calls (assistant queries, summarization service)
///
/// Generative backends routinely take 10-20s for longer answers, so these
/// calls get twice the ordinary budget before being treated as failed.
pub const HEAVY_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the relay connection and optional services
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Base URL of the relay, e.g. `https://erp.example.com`
    pub host: String,

    /// Database name passed to the relay (some deployments require it)
    #[serde(default)]
    pub database: Option<String>,

    /// API key sent with every relay call
    #[serde(default)]
    pub api_key: Option<String>,

    /// Key for the external summarization service; when absent the
    /// deterministic formatter is the only summarization path
    #[serde(default)]
    pub summary_api_key: Option<String>,

    /// Summarization service endpoint
    #[serde(default = "default_summary_url")]
    pub summary_api_url: String,

    /// Model identifier sent to the summarization service
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
}

fn default_summary_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_summary_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

impl AssistantConfig {
    /// Create a config from environment variables
    ///
    /// Required: RELAY_HOST
    /// Optional: RELAY_DATABASE, RELAY_API_KEY, SUMMARY_API_KEY,
    /// SUMMARY_API_URL, SUMMARY_MODEL
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("RELAY_HOST")
            .map_err(|_| AssistantError::ConfigError("RELAY_HOST not set".into()))?;

        Ok(Self {
            host,
            database: std::env::var("RELAY_DATABASE").ok(),
            api_key: std::env::var("RELAY_API_KEY").ok(),
            summary_api_key: std::env::var("SUMMARY_API_KEY").ok(),
            summary_api_url: std::env::var("SUMMARY_API_URL")
                .unwrap_or_else(|_| default_summary_url()),
            summary_model: std::env::var("SUMMARY_MODEL")
                .unwrap_or_else(|_| default_summary_model()),
        })
    }

    /// Load a config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| AssistantError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Construct directly (used by the CLI when flags are given)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: None,
            api_key: None,
            summary_api_key: None,
            summary_api_url: default_summary_url(),
            summary_model: default_summary_model(),
        }
    }

    /// Validate configuration for obvious mistakes
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".into());
        }
        if !self.host.starts_with("http://") && !self.host.starts_with("https://") {
            return Err(format!("host should be an http(s) URL, got '{}'", self.host));
        }
        Ok(())
    }

    /// URL of the generic execution path
    pub fn execute_url(&self) -> String {
        format!("{}/api/execute", self.host.trim_end_matches('/'))
    }

    /// URL of the dedicated employee lookup path
    pub fn employee_search_url(&self) -> String {
        format!("{}/api/employees/search", self.host.trim_end_matches('/'))
    }

    /// WebSocket URL for the persistent connection
    pub fn socket_url(&self) -> String {
        let base = self.host.trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws/chat", ws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bare_host() {
        let config = AssistantConfig::new("erp.example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let config = AssistantConfig::new("https://erp.example.com/");
        assert_eq!(config.execute_url(), "https://erp.example.com/api/execute");
        assert_eq!(
            config.employee_search_url(),
            "https://erp.example.com/api/employees/search"
        );
    }

    #[test]
    fn test_socket_url_scheme_mapping() {
        let https = AssistantConfig::new("https://erp.example.com");
        assert_eq!(https.socket_url(), "wss://erp.example.com/ws/chat");

        let http = AssistantConfig::new("http://localhost:8069");
        assert_eq!(http.socket_url(), "ws://localhost:8069/ws/chat");
    }

    #[test]
    fn test_from_toml() {
        let parsed: AssistantConfig = toml::from_str(
            r#"
            host = "https://erp.example.com"
            api_key = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.host, "https://erp.example.com");
        assert_eq!(parsed.api_key.as_deref(), Some("secret"));
        assert_eq!(parsed.summary_api_url, default_summary_url());
    }
}
