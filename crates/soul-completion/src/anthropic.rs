//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soul_monitor::UsageCounters;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::CompletionError;
use crate::service::{Completion, CompletionRequest, CompletionService};

const API_VERSION: &str = "2023-06-01";

/// Maximum characters of an error body kept in [`CompletionError::Provider`].
const ERROR_BODY_CHARS: usize = 500;

/// Connection settings and call defaults for [`AnthropicClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    /// API key. Empty means unconfigured; calls fail with `MissingApiKey`.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// API base URL, without the `/v1/messages` suffix.
    pub base_url: String,
    /// Model used when a request does not name one.
    pub default_model: String,
    /// Output token ceiling used when a request does not set one.
    pub default_max_tokens: u32,
    /// Temperature used when a request does not set one.
    pub default_temperature: f32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            default_model: "claude-sonnet-4-5-20250929".to_string(),
            default_max_tokens: 1024,
            default_temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

/// [`CompletionService`] backed by the Anthropic Messages API.
pub struct AnthropicClient {
    settings: AnthropicSettings,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: WireUsage,
}

/// Usage as the API reports it. The cache counters may be absent or `null`.
#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
}

impl From<WireUsage> for UsageCounters {
    fn from(wire: WireUsage) -> Self {
        UsageCounters::new(
            wire.input_tokens.unwrap_or(0),
            wire.output_tokens.unwrap_or(0),
            wire.cache_read_input_tokens.unwrap_or(0),
            wire.cache_creation_input_tokens.unwrap_or(0),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    /// Builds a client with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Request`] if the HTTP client cannot be built.
    pub fn new(settings: AnthropicSettings) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { settings, client })
    }

    /// Returns the client settings.
    pub fn settings(&self) -> &AnthropicSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        if self.settings.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey("anthropic".to_string()));
        }

        let start = Instant::now();
        let model = request
            .model
            .unwrap_or_else(|| self.settings.default_model.clone());

        let body = serde_json::json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(self.settings.default_max_tokens),
            "temperature": request.temperature.unwrap_or(self.settings.default_temperature),
            "system": request.system_prompt,
            "messages": [{
                "role": "user",
                "content": request.user_message
            }]
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %model, "anthropic call rejected");
            return Err(CompletionError::Provider {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let usage = UsageCounters::from(parsed.usage);
        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(CompletionError::EmptyResponse)?;

        debug!(
            %model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "anthropic call complete"
        );

        Ok(Completion { text, usage })
    }
}
