//! # Completion
//!
//! The seam between the soul engine and a text-completion backend.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`CompletionService`] | Async trait: free-text and structured completion |
//! | [`strip_code_fence`] / [`decode_object`] | Structured output recovery |
//! | [`AnthropicClient`] | Anthropic Messages API implementation |
//! | [`ScriptedCompletion`] | Deterministic double for tests and offline runs |
//!
//! ## Error Model
//!
//! [`CompletionError`] separates completion faults (the call failed) from
//! decode faults (text came back but is not a JSON object). Callers decide
//! whether either is recoverable.

pub mod anthropic;
pub mod error;
pub mod sanitize;
pub mod scripted;
pub mod service;

pub use anthropic::{AnthropicClient, AnthropicSettings};
pub use error::CompletionError;
pub use sanitize::{decode_object, strip_code_fence};
pub use scripted::ScriptedCompletion;
pub use service::{Completion, CompletionRequest, CompletionService, StructuredCompletion};
