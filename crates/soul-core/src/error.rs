//! Error types for the soul facade.

use thiserror::Error;

/// Core error type for soul operations.
#[derive(Debug, Error)]
pub enum SoulError {
    /// Configuration could not be loaded, or a patch was out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage failed under the fail-fast policy.
    #[error("Council error: {0}")]
    Council(#[from] soul_council::CouncilError),

    /// Registry error passthrough.
    #[error("Registry error: {0}")]
    Registry(#[from] soul_registry::RegistryError),

    /// Completion client error passthrough.
    #[error("Completion error: {0}")]
    Completion(#[from] soul_completion::CompletionError),

    /// A pipeline task ended without reporting.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SoulError {
    /// The faculty whose call failed, if any.
    pub fn faculty(&self) -> Option<soul_council::Faculty> {
        match self {
            SoulError::Council(err) => err.stage().faculty(),
            _ => None,
        }
    }
}
