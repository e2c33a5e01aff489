//! The value a non-streaming request returns.

use serde::{Deserialize, Serialize};
use soul_council::{ConfidenceAssessment, FacultyOutputs, ProcessingMode, SynthesisResult, TrainerEscalation};
use soul_monitor::UsageSummary;

/// Everything one request produced.
///
/// Degraded faculties and apologies appear as ordinary values; under the
/// isolating failure policy a request always yields a complete result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    /// The three faculty outputs, flattened as `manas`, `buddhi`, `sanskaras`.
    #[serde(flatten)]
    pub outputs: FacultyOutputs,

    /// Synthesized answer, or the fixed placeholder when escalating.
    pub synthesis: SynthesisResult,

    pub confidence: ConfidenceAssessment,

    pub mode: ProcessingMode,

    /// Present only when the request was handed to the trainer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainer_needed: Option<TrainerEscalation>,

    pub elapsed_ms: u64,

    pub token_usage: UsageSummary,
}

impl RequestResult {
    /// Returns true if the trainer was consulted.
    pub fn needs_trainer(&self) -> bool {
        self.mode == ProcessingMode::NeedsTrainer
    }

    /// The text to show the user.
    pub fn response(&self) -> &str {
        &self.synthesis.response
    }
}
