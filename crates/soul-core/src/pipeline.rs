//! Stages shared by the blocking and streaming orchestrators.
//!
//! Each stage applies the [`FailurePolicy`] the same way in both paths:
//! under `Isolate` a fault degrades the stage, under `FailFast` it is
//! returned to the orchestrator, which ends the request.

use soul_completion::CompletionService;
use soul_council::{
    BuddhiRunner, CombinedFacultyRunner, ConfidenceAssessment, CouncilError, FacultyContext,
    FacultyOutput, FacultyOutputs, FacultyRunner, FacultySettings, ManasRunner, ProcessingMode,
    SanskarasRunner, SynthesisResult, Synthesizer, TrainerEscalation, TrainerEscalator,
};
use soul_monitor::{UsageAccumulator, UsageCounters};
use soul_registry::{HabitRetrieval, LearningStore, SoulRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{FailurePolicy, SoulConfig};

/// The external services a request talks to.
#[derive(Clone)]
pub struct Collaborators {
    completion: Arc<dyn CompletionService>,
    habits: Arc<dyn HabitRetrieval>,
    learnings: Arc<dyn LearningStore>,
}

impl Collaborators {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        habits: Arc<dyn HabitRetrieval>,
        learnings: Arc<dyn LearningStore>,
    ) -> Self {
        Self {
            completion,
            habits,
            learnings,
        }
    }

    /// Uses one registry for both habit retrieval and learnings.
    pub fn with_registry(completion: Arc<dyn CompletionService>, registry: Arc<SoulRegistry>) -> Self {
        Self::new(completion, registry.clone(), registry)
    }

    fn context(&self) -> FacultyContext {
        FacultyContext::new(self.completion.clone(), self.learnings.clone())
    }

    /// The three faculty runners in fixed order.
    pub(crate) fn runners(&self) -> [Arc<dyn FacultyRunner>; 3] {
        let ctx = self.context();
        [
            Arc::new(ManasRunner::new(ctx.clone())),
            Arc::new(BuddhiRunner::new(ctx.clone())),
            Arc::new(SanskarasRunner::new(ctx, self.habits.clone())),
        ]
    }

    pub(crate) fn combined(&self) -> CombinedFacultyRunner {
        CombinedFacultyRunner::new(self.context(), self.habits.clone())
    }

    pub(crate) fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(self.completion.clone())
    }

    pub(crate) fn escalator(&self) -> TrainerEscalator {
        TrainerEscalator::new(self.completion.clone(), self.learnings.clone())
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Evaluates one faculty under `policy`.
pub(crate) async fn run_faculty(
    runner: &dyn FacultyRunner,
    message: &str,
    settings: &FacultySettings,
    policy: FailurePolicy,
) -> Result<(FacultyOutput, UsageCounters), CouncilError> {
    match policy {
        FailurePolicy::Isolate => Ok(runner.process(message, settings).await),
        FailurePolicy::FailFast => runner.evaluate(message, settings).await,
    }
}

/// Evaluates all three faculties with one call under `policy`.
pub(crate) async fn run_combined(
    runner: &CombinedFacultyRunner,
    message: &str,
    settings: &FacultySettings,
    policy: FailurePolicy,
) -> Result<(FacultyOutputs, UsageCounters), CouncilError> {
    match policy {
        FailurePolicy::Isolate => Ok(runner.process(message, settings).await),
        FailurePolicy::FailFast => runner.evaluate(message, settings).await,
    }
}

/// What the request ended with after confidence was assessed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Conclusion {
    Escalated(TrainerEscalation),
    Synthesized(SynthesisResult),
}

/// Escalates or synthesizes according to `assessment`.
pub(crate) async fn conclude(
    collaborators: &Collaborators,
    config: &SoulConfig,
    message: &str,
    outputs: &FacultyOutputs,
    assessment: &ConfidenceAssessment,
    usage: &mut UsageAccumulator,
) -> Result<Conclusion, CouncilError> {
    let policy = config.pipeline.failure_policy;

    match assessment.mode {
        ProcessingMode::NeedsTrainer => {
            debug!(weighted = assessment.weighted, "confidence below threshold, escalating");
            let (registered, formulation) = collaborators
                .escalator()
                .escalate(message, outputs, &config.trainer_call())
                .await;
            usage.record(formulation);

            let escalation = match (registered, policy) {
                (Ok(escalation), _) => escalation,
                (Err((err, question)), FailurePolicy::Isolate) => {
                    warn!(error = %err, "trainer question not registered");
                    TrainerEscalation::unregistered(message, question)
                }
                (Err((err, _)), FailurePolicy::FailFast) => return Err(err),
            };
            Ok(Conclusion::Escalated(escalation))
        }
        ProcessingMode::Autonomous => {
            let synthesizer = collaborators.synthesizer();
            let call = config.synthesis_call();
            let (synthesis, synth_usage) = match policy {
                FailurePolicy::Isolate => {
                    synthesizer
                        .synthesize_or_apologize(message, outputs, config.weights, &call)
                        .await
                }
                FailurePolicy::FailFast => {
                    synthesizer
                        .synthesize(message, outputs, config.weights, &call)
                        .await?
                }
            };
            usage.record(synth_usage);
            Ok(Conclusion::Synthesized(synthesis))
        }
    }
}
