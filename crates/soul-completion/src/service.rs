//! The completion service seam.
//!
//! Everything that talks to a model goes through [`CompletionService`].
//! Implementations only provide [`complete`](CompletionService::complete);
//! structured calls are layered on top with fence stripping and object
//! decoding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use soul_monitor::UsageCounters;

use crate::error::CompletionError;
use crate::sanitize::decode_object;

/// A single prompt to execute.
///
/// Unset `model`, `max_tokens` and `temperature` fall back to the defaults
/// of the service implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt framing the call.
    pub system_prompt: String,
    /// The user turn.
    pub user_message: String,
    /// Model identifier override.
    pub model: Option<String>,
    /// Output token ceiling override.
    pub max_tokens: Option<u32>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Creates a request with service defaults for every tunable.
    pub fn new(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the output token ceiling.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Free-text completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: UsageCounters,
}

/// Completion decoded into a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredCompletion {
    pub data: Map<String, Value>,
    pub usage: UsageCounters,
}

/// Executes prompts against a text-completion backend.
///
/// # Implementors
///
/// - [`AnthropicClient`](crate::AnthropicClient): Anthropic Messages API
/// - [`ScriptedCompletion`](crate::ScriptedCompletion): deterministic double
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Executes a prompt and returns the raw text.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;

    /// Executes a prompt and decodes the answer as a JSON object.
    ///
    /// # Errors
    ///
    /// Any error from [`complete`](Self::complete), or
    /// [`CompletionError::Decode`] if the text is not a JSON object once an
    /// optional code fence is removed. The decode error carries the usage
    /// of the call.
    async fn complete_structured(
        &self,
        request: CompletionRequest,
    ) -> Result<StructuredCompletion, CompletionError> {
        let Completion { text, usage } = self.complete(request).await?;
        let data = decode_object(&text).map_err(|e| e.with_usage(usage))?;
        Ok(StructuredCompletion { data, usage })
    }
}
