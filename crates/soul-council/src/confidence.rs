//! Confidence aggregation and processing-mode selection.
//!
//! The weighted confidence is `Σ weight[f] × confidence[f]` over the three
//! faculties. With non-negative weights summing to 1 and confidences in
//! [0, 1] it stays within [0, 1]; weights are not renormalized when they do
//! not sum to 1.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::faculty::{Faculty, FacultyOutputs};

/// Tolerance when checking that weights sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-faculty influence on confidence and synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacultyWeights {
    pub manas: f64,
    pub buddhi: f64,
    pub sanskaras: f64,
}

impl Default for FacultyWeights {
    fn default() -> Self {
        Self {
            manas: 0.35,
            buddhi: 0.40,
            sanskaras: 0.25,
        }
    }
}

impl FacultyWeights {
    pub fn new(manas: f64, buddhi: f64, sanskaras: f64) -> Self {
        Self {
            manas,
            buddhi,
            sanskaras,
        }
    }

    pub fn get(&self, faculty: Faculty) -> f64 {
        match faculty {
            Faculty::Manas => self.manas,
            Faculty::Buddhi => self.buddhi,
            Faculty::Sanskaras => self.sanskaras,
        }
    }

    pub fn sum(&self) -> f64 {
        self.manas + self.buddhi + self.sanskaras
    }

    /// Returns true if the weights sum to 1 within tolerance.
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }
}

/// Whether the soul answers or defers to its trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    Autonomous,
    NeedsTrainer,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Autonomous => f.write_str("autonomous"),
            ProcessingMode::NeedsTrainer => f.write_str("needs_trainer"),
        }
    }
}

/// Escalation toggle and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationPolicy {
    pub enabled: bool,
    #[serde(alias = "confidence_threshold")]
    pub threshold: f64,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.4,
        }
    }
}

/// Outcome of aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAssessment {
    pub weighted: f64,
    pub threshold: f64,
    pub escalation_enabled: bool,
    pub mode: ProcessingMode,
}

/// Weighted confidence and mode decision.
///
/// # Mode Rules
///
/// - Escalation disabled: always [`ProcessingMode::Autonomous`]
/// - Escalation enabled and `weighted < threshold`: [`ProcessingMode::NeedsTrainer`]
/// - Otherwise: [`ProcessingMode::Autonomous`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfidenceAggregator {
    weights: FacultyWeights,
    policy: EscalationPolicy,
}

impl ConfidenceAggregator {
    pub fn new(weights: FacultyWeights, policy: EscalationPolicy) -> Self {
        Self { weights, policy }
    }

    pub fn weights(&self) -> FacultyWeights {
        self.weights
    }

    /// Weighted sum of the three confidences.
    pub fn weighted(&self, outputs: &FacultyOutputs) -> f64 {
        Faculty::ALL
            .iter()
            .map(|&f| self.weights.get(f) * outputs.confidence(f))
            .sum()
    }

    /// Mode for a given weighted confidence.
    pub fn mode_for(&self, weighted: f64) -> ProcessingMode {
        if self.policy.enabled && weighted < self.policy.threshold {
            ProcessingMode::NeedsTrainer
        } else {
            ProcessingMode::Autonomous
        }
    }

    pub fn assess(&self, outputs: &FacultyOutputs) -> ConfidenceAssessment {
        let weighted = self.weighted(outputs);
        ConfidenceAssessment {
            weighted,
            threshold: self.policy.threshold,
            escalation_enabled: self.policy.enabled,
            mode: self.mode_for(weighted),
        }
    }
}
