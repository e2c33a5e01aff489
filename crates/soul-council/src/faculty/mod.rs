//! Faculty framework.
//!
//! Defines the [`FacultyRunner`] trait, the three output shapes and the
//! shared context-enrichment helpers the runners compose.

pub mod combined;
pub mod decode;
pub mod triad;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use soul_completion::{CompletionRequest, CompletionService};
use soul_monitor::UsageCounters;
use soul_registry::LearningStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{CouncilError, Result, Stage};

/// Confidence assigned to an output produced after a fault.
pub const DEGRADED_CONFIDENCE: f64 = 0.1;

/// One of the three evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faculty {
    /// Mind: emotional reading, carries a valence.
    Manas,
    /// Intellect: reasoning, carries a reasoning chain.
    Buddhi,
    /// Habits: conditioned tendencies, carries activated habits.
    Sanskaras,
}

impl Faculty {
    /// All faculties in their fixed reporting order.
    pub const ALL: [Faculty; 3] = [Faculty::Manas, Faculty::Buddhi, Faculty::Sanskaras];

    pub const fn name(&self) -> &'static str {
        match self {
            Faculty::Manas => "manas",
            Faculty::Buddhi => "buddhi",
            Faculty::Sanskaras => "sanskaras",
        }
    }

    fn failure_note(&self) -> &'static str {
        match self {
            Faculty::Manas => "Manas encountered turbulence",
            Faculty::Buddhi => "Buddhi encountered confusion",
            Faculty::Sanskaras => "Sanskaras encountered static",
        }
    }
}

impl fmt::Display for Faculty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mind output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManasOutput {
    pub response: String,
    pub confidence: f64,
    /// Emotional tone in [-1, 1].
    pub valence: f64,
}

/// Intellect output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuddhiOutput {
    pub response: String,
    pub confidence: f64,
    pub reasoning_chain: Vec<String>,
}

/// A habit the habit faculty reports as having shaped its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivatedHabit {
    pub name: String,
    /// Any further fields the model attached, e.g. `influence`.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ActivatedHabit {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            details: Map::new(),
        }
    }
}

/// Habit faculty output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanskarasOutput {
    pub response: String,
    pub confidence: f64,
    pub activated_habits: Vec<ActivatedHabit>,
}

/// Output of any single faculty.
///
/// Serializes as the inner output, without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FacultyOutput {
    Manas(ManasOutput),
    Buddhi(BuddhiOutput),
    Sanskaras(SanskarasOutput),
}

impl FacultyOutput {
    pub fn faculty(&self) -> Faculty {
        match self {
            FacultyOutput::Manas(_) => Faculty::Manas,
            FacultyOutput::Buddhi(_) => Faculty::Buddhi,
            FacultyOutput::Sanskaras(_) => Faculty::Sanskaras,
        }
    }

    pub fn response(&self) -> &str {
        match self {
            FacultyOutput::Manas(o) => &o.response,
            FacultyOutput::Buddhi(o) => &o.response,
            FacultyOutput::Sanskaras(o) => &o.response,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            FacultyOutput::Manas(o) => o.confidence,
            FacultyOutput::Buddhi(o) => o.confidence,
            FacultyOutput::Sanskaras(o) => o.confidence,
        }
    }

    /// Output standing in for a faculty whose evaluation failed: confidence
    /// 0.1, empty variant field, and a short failure note as the response.
    pub fn degraded(faculty: Faculty, cause: &str) -> Self {
        match faculty {
            Faculty::Manas => FacultyOutput::Manas(ManasOutput::degraded(cause)),
            Faculty::Buddhi => FacultyOutput::Buddhi(BuddhiOutput::degraded(cause)),
            Faculty::Sanskaras => FacultyOutput::Sanskaras(SanskarasOutput::degraded(cause)),
        }
    }
}

fn failure_response(faculty: Faculty, cause: &str) -> String {
    format!("{}: {cause}", faculty.failure_note())
}

impl ManasOutput {
    pub fn degraded(cause: &str) -> Self {
        Self {
            response: failure_response(Faculty::Manas, cause),
            confidence: DEGRADED_CONFIDENCE,
            valence: 0.0,
        }
    }
}

impl BuddhiOutput {
    pub fn degraded(cause: &str) -> Self {
        Self {
            response: failure_response(Faculty::Buddhi, cause),
            confidence: DEGRADED_CONFIDENCE,
            reasoning_chain: Vec::new(),
        }
    }
}

impl SanskarasOutput {
    pub fn degraded(cause: &str) -> Self {
        Self {
            response: failure_response(Faculty::Sanskaras, cause),
            confidence: DEGRADED_CONFIDENCE,
            activated_habits: Vec::new(),
        }
    }
}

/// The three faculty outputs of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyOutputs {
    pub manas: ManasOutput,
    pub buddhi: BuddhiOutput,
    pub sanskaras: SanskarasOutput,
}

impl FacultyOutputs {
    /// Assembles outputs arriving in any order.
    ///
    /// Returns `None` unless each faculty appears exactly once.
    pub fn collect(outputs: impl IntoIterator<Item = FacultyOutput>) -> Option<Self> {
        let (mut manas, mut buddhi, mut sanskaras) = (None, None, None);
        for output in outputs {
            let duplicate = match output {
                FacultyOutput::Manas(o) => manas.replace(o).is_some(),
                FacultyOutput::Buddhi(o) => buddhi.replace(o).is_some(),
                FacultyOutput::Sanskaras(o) => sanskaras.replace(o).is_some(),
            };
            if duplicate {
                return None;
            }
        }
        Some(Self {
            manas: manas?,
            buddhi: buddhi?,
            sanskaras: sanskaras?,
        })
    }

    /// Degraded outputs for all three faculties.
    pub fn degraded(cause: &str) -> Self {
        Self {
            manas: ManasOutput::degraded(cause),
            buddhi: BuddhiOutput::degraded(cause),
            sanskaras: SanskarasOutput::degraded(cause),
        }
    }

    pub fn get(&self, faculty: Faculty) -> FacultyOutput {
        match faculty {
            Faculty::Manas => FacultyOutput::Manas(self.manas.clone()),
            Faculty::Buddhi => FacultyOutput::Buddhi(self.buddhi.clone()),
            Faculty::Sanskaras => FacultyOutput::Sanskaras(self.sanskaras.clone()),
        }
    }

    pub fn confidence(&self, faculty: Faculty) -> f64 {
        match faculty {
            Faculty::Manas => self.manas.confidence,
            Faculty::Buddhi => self.buddhi.confidence,
            Faculty::Sanskaras => self.sanskaras.confidence,
        }
    }

    /// Outputs in the fixed order manas, buddhi, sanskaras.
    pub fn in_order(&self) -> [FacultyOutput; 3] {
        Faculty::ALL.map(|f| self.get(f))
    }
}

/// Model parameters for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CallSettings {
    pub(crate) fn request(
        &self,
        system_prompt: &str,
        user_message: impl Into<String>,
    ) -> CompletionRequest {
        CompletionRequest::new(system_prompt, user_message)
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

/// Per-request settings for faculty evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultySettings {
    pub call: CallSettings,
    /// Habits appended to the habit faculty's prompt; 0 skips retrieval.
    pub habit_limit: usize,
    /// Learnings appended to each prompt; 0 skips retrieval.
    pub learning_limit: usize,
}

/// A single faculty evaluator.
#[async_trait]
pub trait FacultyRunner: Send + Sync {
    fn faculty(&self) -> Faculty;

    /// Evaluates `message`, surfacing any fault.
    async fn evaluate(
        &self,
        message: &str,
        settings: &FacultySettings,
    ) -> Result<(FacultyOutput, UsageCounters)>;

    /// Evaluates `message`, converting any fault into a degraded output.
    async fn process(&self, message: &str, settings: &FacultySettings) -> (FacultyOutput, UsageCounters) {
        match self.evaluate(message, settings).await {
            Ok(result) => result,
            Err(err) => {
                warn!(faculty = %self.faculty(), error = %err, "faculty degraded");
                (FacultyOutput::degraded(self.faculty(), &err.cause()), err.usage())
            }
        }
    }
}

/// Collaborators shared by every faculty runner.
#[derive(Clone)]
pub struct FacultyContext {
    completion: Arc<dyn CompletionService>,
    learnings: Arc<dyn LearningStore>,
}

impl FacultyContext {
    pub fn new(completion: Arc<dyn CompletionService>, learnings: Arc<dyn LearningStore>) -> Self {
        Self {
            completion,
            learnings,
        }
    }

    /// Trainer guidance relevant to `message`, formatted for a prompt.
    ///
    /// Each consulted learning's applied counter is incremented.
    pub async fn learning_context(
        &self,
        message: &str,
        faculty: Option<Faculty>,
        limit: usize,
        stage: Stage,
    ) -> Result<String> {
        if limit == 0 {
            return Ok(String::new());
        }

        let learnings = self
            .learnings
            .find_relevant_learnings(message, faculty.map(|f| f.name()), limit)
            .await
            .map_err(|e| CouncilError::registry(stage, e))?;
        if learnings.is_empty() {
            return Ok(String::new());
        }

        let mut lines = Vec::with_capacity(learnings.len());
        for learning in &learnings {
            self.learnings
                .increment_applied(learning.id)
                .await
                .map_err(|e| CouncilError::registry(stage, e))?;

            let mut line = format!("- {}: {}", learning.trigger_summary, learning.guidance);
            if !learning.application_note.is_empty() {
                line.push_str(&format!(" ({})", learning.application_note));
            }
            lines.push(line);
        }
        debug!(%stage, count = lines.len(), "trainer guidance applied");
        Ok(format!("\n\nGuidance from your trainer:\n{}", lines.join("\n")))
    }

    /// Runs a structured completion, keeping the usage of a call whose text
    /// fails to decode.
    pub async fn call_structured(
        &self,
        system_prompt: &str,
        user_message: String,
        call: &CallSettings,
        stage: Stage,
    ) -> Result<(Map<String, Value>, UsageCounters)> {
        let structured = self
            .completion
            .complete_structured(call.request(system_prompt, user_message))
            .await
            .map_err(|e| {
                let spent = e.usage();
                CouncilError::completion(stage, e, spent)
            })?;
        Ok((structured.data, structured.usage))
    }
}

impl fmt::Debug for FacultyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacultyContext").finish_non_exhaustive()
    }
}
