//! Optional summarization-service client
//!
//! A model-agnostic HTTP client used to turn raw result records into a
//! short business summary. Supports both Anthropic and OpenAI-compatible
//! APIs. This path is strictly an enhancement: any failure here reverts
//! to the deterministic formatter, so it can never make the outcome worse
//! than its absence.

use crate::core::config::{AssistantConfig, HEAVY_TIMEOUT};
use crate::core::error::{AssistantError, Result};
use crate::core::types::ChatMessage;
use crate::summary::formatter::{format_records, ITEM_CAP};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// Client for the external summarization service
pub struct SummaryClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

impl SummaryClient {
    /// Create a client when a service key is configured
    pub fn from_config(config: &AssistantConfig) -> Option<Self> {
        let api_key = config.summary_api_key.clone()?;
        let api_url = config.summary_api_url.clone();
        let api_format = Self::detect_api_format(&api_url);
        Some(Self {
            client: Client::new(),
            api_key,
            api_url,
            model: config.summary_model.clone(),
            api_format,
        })
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    /// One-shot summary of result records
    pub async fn summarize_records(
        &self,
        records: &[Value],
        query: &str,
        model_hint: Option<&str>,
    ) -> Result<String> {
        let bounded = &records[..records.len().min(ITEM_CAP)];
        let system = "You summarize business query results. Reply with a short, \
                      factual summary in plain prose. Do not invent numbers.";
        let user = format!(
            "QUERY:\n{}\n\nRESULTS (JSON, first {} records):\n{}\n\nSummarize briefly:",
            query,
            bounded.len(),
            serde_json::to_string_pretty(bounded)?
        );
        self.complete(system, &user, model_hint).await
    }

    /// Answer a free-form question with recent conversation as context
    pub async fn answer_with_context(
        &self,
        query: &str,
        context: &[ChatMessage],
    ) -> Result<String> {
        let system = "You are a helpful business assistant. Answer concisely \
                      using the conversation context when relevant.";
        let mut user = String::new();
        if !context.is_empty() {
            user.push_str("CONVERSATION:\n");
            for message in context {
                user.push_str(&format!("{:?}: {}\n", message.role, message.content));
            }
            user.push('\n');
        }
        user.push_str(&format!("QUESTION:\n{}", query));
        self.complete(system, &user, None).await
    }

    async fn complete(&self, system: &str, user: &str, model_hint: Option<&str>) -> Result<String> {
        let model = model_hint.unwrap_or(&self.model).to_string();
        tokio::time::timeout(HEAVY_TIMEOUT, async {
            match self.api_format {
                ApiFormat::Anthropic => self.complete_anthropic(model, system, user).await,
                ApiFormat::OpenAI => self.complete_openai(model, system, user).await,
            }
        })
        .await
        .map_err(|_| AssistantError::TimedOut {
            what: "summarization service".into(),
        })?
    }

    async fn complete_anthropic(&self, model: String, system: &str, user: &str) -> Result<String> {
        let request = AnthropicRequest {
            model,
            max_tokens: 1024,
            system: system.into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .timeout(HEAVY_TIMEOUT)
            .send()
            .await
            .map_err(|e| AssistantError::SummaryError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::SummaryError(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::SummaryError(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| AssistantError::SummaryError("Empty response".into()))
    }

    async fn complete_openai(&self, model: String, system: &str, user: &str) -> Result<String> {
        let request = OpenAIRequest {
            model,
            max_tokens: 1024,
            messages: vec![
                ApiMessage {
                    role: "system".into(),
                    content: system.into(),
                },
                ApiMessage {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .timeout(HEAVY_TIMEOUT)
            .send()
            .await
            .map_err(|e| AssistantError::SummaryError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::SummaryError(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::SummaryError(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| AssistantError::SummaryError("Empty response".into()))
    }
}

/// Summarize results, preferring the enhancement service when available
///
/// Completes even when the service is missing or failing: the
/// deterministic formatter is always the fallback.
pub async fn summarize(
    records: &[Value],
    query: &str,
    client: Option<&SummaryClient>,
    model_hint: Option<&str>,
) -> String {
    if records.is_empty() {
        return format_records(records, query);
    }

    if let Some(client) = client {
        match client.summarize_records(records, query, model_hint).await {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => tracing::warn!("summarization service returned empty text"),
            Err(e) => tracing::warn!("summarization service failed: {}", e),
        }
    }

    format_records(records, query)
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Shared
#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}
