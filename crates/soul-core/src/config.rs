//! Configuration types for the soul.
//!
//! A [`SoulConfig`] is an immutable snapshot. Changes go through a
//! [`ConfigPatch`], which validates and produces a new snapshot, and the
//! process-wide [`SharedConfig`] swaps snapshots atomically. Requests take
//! one snapshot when they start and use it for every stage.

use serde::{Deserialize, Serialize};
use soul_completion::AnthropicSettings;
use soul_council::{
    CallSettings, ConfidenceAggregator, EscalationPolicy, FacultySettings, FacultyWeights,
};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::error::SoulError;
use crate::Result;

/// Environment variable consulted when the file carries no API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Temperature used when formulating trainer questions.
const TRAINER_TEMPERATURE: f32 = 0.3;

/// Configuration for the soul.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoulConfig {
    /// Faculty weights; intended to sum to 1.0.
    pub weights: FacultyWeights,

    /// Model identifiers per call type.
    pub models: ModelConfig,

    /// Output token ceilings per call type.
    pub tokens: TokenLimits,

    /// Sampling temperature for faculty and synthesis calls.
    pub generation: GenerationConfig,

    /// Low-confidence escalation.
    pub escalation: EscalationPolicy,

    /// Context retrieval limits.
    pub retrieval: RetrievalLimits,

    /// Pipeline-wide settings.
    pub pipeline: PipelineConfig,

    /// Completion provider connection.
    pub anthropic: AnthropicSettings,
}

/// Model identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Fallback model for calls that name none.
    pub default: String,
    /// Faculty, combined and trainer-question calls.
    pub faculty: String,
    /// Synthesis call.
    pub synthesis: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: "claude-sonnet-4-5-20250929".to_string(),
            faculty: "claude-haiku-4-5-20251001".to_string(),
            synthesis: "claude-sonnet-4-5-20250929".to_string(),
        }
    }
}

/// Output token ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenLimits {
    pub default: u32,
    pub faculty: u32,
    pub synthesis: u32,
    pub combined: u32,
    pub trainer: u32,
}

impl Default for TokenLimits {
    fn default() -> Self {
        Self {
            default: 1024,
            faculty: 300,
            synthesis: 512,
            combined: 800,
            trainer: 256,
        }
    }
}

/// Sampling settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { temperature: 0.7 }
    }
}

/// How many records are appended to prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalLimits {
    pub habits: usize,
    pub learnings: usize,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            habits: 5,
            learnings: 5,
        }
    }
}

/// What a fault inside the pipeline does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Degrade the faulting stage and keep going.
    #[default]
    Isolate,
    /// End the request on the first fault.
    FailFast,
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// One call for all three faculties instead of three.
    pub combined_mode: bool,
    pub failure_policy: FailurePolicy,
}

impl SoulConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Missing sections and fields take their defaults. The API key falls
    /// back to `ANTHROPIC_API_KEY` when the file does not set one.
    ///
    /// # Errors
    ///
    /// Returns [`SoulError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SoulError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_toml(&raw)?.with_env_api_key();
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: SoulConfig =
            toml::from_str(raw).map_err(|e| SoulError::Config(format!("invalid TOML: {e}")))?;
        config.warn_if_unnormalized();
        Ok(config)
    }

    /// Renders configuration as TOML. The API key is never written.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SoulError::Config(e.to_string()))
    }

    /// Fills an empty API key from the environment.
    pub fn with_env_api_key(mut self) -> Self {
        if self.anthropic.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.anthropic.api_key = key;
            }
        }
        self
    }

    /// Returns a new snapshot with `patch` applied.
    ///
    /// # Errors
    ///
    /// Returns [`SoulError::Config`] if any patched value is out of range;
    /// `self` is left untouched.
    pub fn apply(&self, patch: &ConfigPatch) -> Result<Self> {
        patch.validate()?;

        let mut next = self.clone();
        if let Some(w) = patch.weight_manas {
            next.weights.manas = w;
        }
        if let Some(w) = patch.weight_buddhi {
            next.weights.buddhi = w;
        }
        if let Some(w) = patch.weight_sanskaras {
            next.weights.sanskaras = w;
        }
        if let Some(model) = &patch.model {
            next.models.default = model.clone();
            next.models.faculty = model.clone();
            next.models.synthesis = model.clone();
        }
        if let Some(t) = patch.temperature {
            next.generation.temperature = t;
        }
        if let Some(max) = patch.max_tokens {
            next.tokens.default = max;
            next.tokens.faculty = max;
            next.tokens.combined = max;
            next.tokens.synthesis = max;
        }
        if let Some(combined) = patch.combined_mode {
            next.pipeline.combined_mode = combined;
        }
        if let Some(enabled) = patch.escalation_enabled {
            next.escalation.enabled = enabled;
        }
        if let Some(threshold) = patch.confidence_threshold {
            next.escalation.threshold = threshold;
        }
        if let Some(policy) = patch.failure_policy {
            next.pipeline.failure_policy = policy;
        }

        next.warn_if_unnormalized();
        Ok(next)
    }

    fn warn_if_unnormalized(&self) {
        if !self.weights.is_normalized() {
            warn!(
                manas = self.weights.manas,
                buddhi = self.weights.buddhi,
                sanskaras = self.weights.sanskaras,
                sum = self.weights.sum(),
                "faculty weights do not sum to 1.0"
            );
        }
    }

    /// Settings for the three separate faculty calls.
    pub fn faculty_settings(&self) -> FacultySettings {
        self.faculty_settings_with(self.tokens.faculty)
    }

    /// Settings for the single combined faculty call.
    pub fn combined_settings(&self) -> FacultySettings {
        self.faculty_settings_with(self.tokens.combined)
    }

    fn faculty_settings_with(&self, max_tokens: u32) -> FacultySettings {
        FacultySettings {
            call: CallSettings {
                model: self.models.faculty.clone(),
                max_tokens,
                temperature: self.generation.temperature,
            },
            habit_limit: self.retrieval.habits,
            learning_limit: self.retrieval.learnings,
        }
    }

    pub fn synthesis_call(&self) -> CallSettings {
        CallSettings {
            model: self.models.synthesis.clone(),
            max_tokens: self.tokens.synthesis,
            temperature: self.generation.temperature,
        }
    }

    pub fn trainer_call(&self) -> CallSettings {
        CallSettings {
            model: self.models.faculty.clone(),
            max_tokens: self.tokens.trainer,
            temperature: TRAINER_TEMPERATURE,
        }
    }

    pub fn aggregator(&self) -> ConfidenceAggregator {
        ConfidenceAggregator::new(self.weights, self.escalation)
    }

    /// Provider settings with call defaults taken from this snapshot.
    pub fn anthropic_settings(&self) -> AnthropicSettings {
        AnthropicSettings {
            default_model: self.models.default.clone(),
            default_max_tokens: self.tokens.default,
            default_temperature: self.generation.temperature,
            ..self.anthropic.clone()
        }
    }
}

/// Partial update of a [`SoulConfig`]. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub weight_manas: Option<f64>,
    pub weight_buddhi: Option<f64>,
    pub weight_sanskaras: Option<f64>,
    /// Model for every faculty, combined, trainer and synthesis call.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Ceiling for faculty, combined and synthesis calls. The trainer
    /// question keeps its own short ceiling.
    pub max_tokens: Option<u32>,
    pub combined_mode: Option<bool>,
    pub escalation_enabled: Option<bool>,
    pub confidence_threshold: Option<f64>,
    pub failure_policy: Option<FailurePolicy>,
}

impl ConfigPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("weight_manas", self.weight_manas),
            ("weight_buddhi", self.weight_buddhi),
            ("weight_sanskaras", self.weight_sanskaras),
        ] {
            if let Some(w) = weight {
                check_range(name, w, 0.0, 1.0)?;
            }
        }
        if let Some(t) = self.temperature {
            check_range("temperature", f64::from(t), 0.0, 2.0)?;
        }
        if let Some(max) = self.max_tokens {
            if !(100..=4096).contains(&max) {
                return Err(SoulError::Config(format!(
                    "max_tokens must be within [100, 4096], got {max}"
                )));
            }
        }
        if let Some(threshold) = self.confidence_threshold {
            check_range("confidence_threshold", threshold, 0.0, 1.0)?;
        }
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(SoulError::Config("model must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(SoulError::Config(format!(
            "{name} must be within [{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

/// Process-wide configuration holder.
///
/// Cloning shares the same underlying snapshot slot.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    current: Arc<RwLock<Arc<SoulConfig>>>,
}

impl SharedConfig {
    pub fn new(config: SoulConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<SoulConfig> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Applies `patch` and swaps in the resulting snapshot.
    ///
    /// Requests already running keep the snapshot they started with.
    pub fn update(&self, patch: &ConfigPatch) -> Result<Arc<SoulConfig>> {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        let next = Arc::new(guard.apply(patch)?);
        *guard = Arc::clone(&next);
        info!("configuration updated");
        Ok(next)
    }

    /// Replaces the snapshot wholesale.
    pub fn replace(&self, config: SoulConfig) {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = Arc::new(config);
    }
}
