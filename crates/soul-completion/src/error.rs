//! Error types for completion calls.

use soul_monitor::UsageCounters;
use thiserror::Error;

/// Errors raised by a [`CompletionService`](crate::CompletionService).
///
/// `Request`, `Provider` and `MissingApiKey` are completion faults: the call
/// itself did not produce text. `Decode` is raised when text came back but
/// could not be read as a structured object.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport failure (connect, timeout, body read).
    #[error("completion request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("provider error ({status}): {body}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// No API key configured for the provider.
    #[error("API key not configured for {0}")]
    MissingApiKey(String),

    /// The provider response had no text content.
    #[error("completion returned no text content")]
    EmptyResponse,

    /// Response text is not a well-formed structured object.
    #[error("structured decode failed: {reason}")]
    Decode {
        /// Why decoding failed.
        reason: String,
        /// Leading excerpt of the offending text.
        excerpt: String,
        /// Tokens spent producing the text.
        usage: UsageCounters,
    },
}

impl CompletionError {
    /// Returns true for faults in the call itself rather than its content.
    pub fn is_completion_fault(&self) -> bool {
        !matches!(self, CompletionError::Decode { .. })
    }

    /// Returns true for structured decode faults.
    pub fn is_decode_fault(&self) -> bool {
        matches!(self, CompletionError::Decode { .. })
    }

    /// Tokens already consumed when the error was raised. Only a decode
    /// fault follows a call that produced text.
    pub fn usage(&self) -> UsageCounters {
        match self {
            CompletionError::Decode { usage, .. } => *usage,
            _ => UsageCounters::zero(),
        }
    }

    /// Attaches the usage of the call whose text failed to decode.
    #[must_use]
    pub fn with_usage(self, spent: UsageCounters) -> Self {
        match self {
            CompletionError::Decode { reason, excerpt, .. } => CompletionError::Decode {
                reason,
                excerpt,
                usage: spent,
            },
            other => other,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Request(err.to_string())
    }
}
