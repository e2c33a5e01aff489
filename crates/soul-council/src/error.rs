//! Error types for the council.
//!
//! Every error names the pipeline [`Stage`] it came from, so callers can
//! decide per stage whether to degrade or abort.

use soul_completion::CompletionError;
use soul_monitor::UsageCounters;
use soul_registry::RegistryError;
use std::fmt;
use thiserror::Error;

use crate::faculty::Faculty;

/// Where in the pipeline a fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// One of the three separate faculty calls.
    Faculty(Faculty),
    /// The single combined faculty call.
    Combined,
    Synthesis,
    Escalation,
}

impl Stage {
    /// The faculty involved, if the stage is a single faculty.
    pub fn faculty(&self) -> Option<Faculty> {
        match self {
            Stage::Faculty(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Faculty(faculty) => write!(f, "{faculty} faculty"),
            Stage::Combined => f.write_str("combined faculty call"),
            Stage::Synthesis => f.write_str("synthesis"),
            Stage::Escalation => f.write_str("trainer escalation"),
        }
    }
}

/// Errors that can occur during council operations.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// A completion call failed, or its output could not be decoded.
    #[error("{stage} failed: {source}")]
    Completion {
        stage: Stage,
        #[source]
        source: CompletionError,
        /// Usage already consumed before the fault (non-zero for decode faults).
        usage: UsageCounters,
    },

    /// A retrieval or registration call failed.
    #[error("{stage} failed: {source}")]
    Registry {
        stage: Stage,
        #[source]
        source: RegistryError,
    },
}

impl CouncilError {
    pub(crate) fn completion(stage: Stage, source: CompletionError, usage: UsageCounters) -> Self {
        CouncilError::Completion {
            stage,
            source,
            usage,
        }
    }

    pub(crate) fn registry(stage: Stage, source: RegistryError) -> Self {
        CouncilError::Registry { stage, source }
    }

    pub fn stage(&self) -> Stage {
        match self {
            CouncilError::Completion { stage, .. } | CouncilError::Registry { stage, .. } => *stage,
        }
    }

    /// Usage consumed before the fault.
    pub fn usage(&self) -> UsageCounters {
        match self {
            CouncilError::Completion { usage, .. } => *usage,
            CouncilError::Registry { .. } => UsageCounters::zero(),
        }
    }

    /// Returns true if the completion text came back but was not decodable.
    pub fn is_decode_fault(&self) -> bool {
        matches!(self, CouncilError::Completion { source, .. } if source.is_decode_fault())
    }

    /// Short description of the underlying cause, without the stage prefix.
    pub fn cause(&self) -> String {
        match self {
            CouncilError::Completion { source, .. } => source.to_string(),
            CouncilError::Registry { source, .. } => source.to_string(),
        }
    }
}

/// Result type for council operations.
pub type Result<T> = std::result::Result<T, CouncilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faculty_stage_display() {
        let err = CouncilError::completion(
            Stage::Faculty(Faculty::Buddhi),
            CompletionError::Request("timeout".to_string()),
            UsageCounters::zero(),
        );
        assert_eq!(err.to_string(), "buddhi faculty failed: completion request failed: timeout");
        assert_eq!(err.stage().faculty(), Some(Faculty::Buddhi));
        assert_eq!(err.cause(), "completion request failed: timeout");
    }

    #[test]
    fn test_decode_fault_keeps_usage() {
        let err = CouncilError::completion(
            Stage::Combined,
            CompletionError::Decode {
                reason: "expected value".to_string(),
                excerpt: "Sure!".to_string(),
                usage: UsageCounters::new(100, 20, 0, 0),
            },
            UsageCounters::new(100, 20, 0, 0),
        );
        assert!(err.is_decode_fault());
        assert_eq!(err.usage().total_tokens(), 120);
        assert_eq!(err.stage().faculty(), None);
    }

    #[test]
    fn test_registry_fault_has_no_usage() {
        let err = CouncilError::registry(
            Stage::Escalation,
            RegistryError::NotFound("learning 4".to_string()),
        );
        assert!(err.usage().is_zero());
        assert!(err.to_string().starts_with("trainer escalation failed"));
    }
}
