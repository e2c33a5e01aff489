//! Single-call evaluation of all three faculties.

use soul_monitor::UsageCounters;
use soul_registry::HabitRetrieval;
use std::sync::Arc;
use tracing::{debug, warn};

use super::decode::nested;
use super::triad::retrieve_habits;
use super::{
    BuddhiOutput, Faculty, FacultyContext, FacultyOutputs, FacultySettings, ManasOutput,
    SanskarasOutput,
};
use crate::error::{Result, Stage};
use crate::prompts;

/// Replaces the three separate faculty calls with one.
///
/// The answer holds a `manas`, `buddhi` and `sanskaras` sub-object, each
/// decoded with the same defaults and clamping as a single faculty. A
/// missing sub-object yields that faculty's defaults.
#[derive(Clone)]
pub struct CombinedFacultyRunner {
    ctx: FacultyContext,
    habits: Arc<dyn HabitRetrieval>,
}

impl CombinedFacultyRunner {
    pub fn new(ctx: FacultyContext, habits: Arc<dyn HabitRetrieval>) -> Self {
        Self { ctx, habits }
    }

    /// Evaluates `message`, surfacing any fault.
    pub async fn evaluate(
        &self,
        message: &str,
        settings: &FacultySettings,
    ) -> Result<(FacultyOutputs, UsageCounters)> {
        let stage = Stage::Combined;
        let habits = retrieve_habits(self.habits.as_ref(), message, settings.habit_limit, stage).await?;
        let learnings = self
            .ctx
            .learning_context(message, None, settings.learning_limit, stage)
            .await?;

        let augmented = format!("{message}{habits}{learnings}");
        let (data, usage) = self
            .ctx
            .call_structured(prompts::COMBINED, augmented, &settings.call, stage)
            .await?;

        let outputs = FacultyOutputs {
            manas: ManasOutput::decode(&nested(&data, Faculty::Manas)),
            buddhi: BuddhiOutput::decode(&nested(&data, Faculty::Buddhi)),
            sanskaras: SanskarasOutput::decode(&nested(&data, Faculty::Sanskaras)),
        };
        debug!(
            manas = outputs.manas.confidence,
            buddhi = outputs.buddhi.confidence,
            sanskaras = outputs.sanskaras.confidence,
            "combined faculties evaluated"
        );
        Ok((outputs, usage))
    }

    /// Evaluates `message`, degrading all three faculties on a fault.
    pub async fn process(
        &self,
        message: &str,
        settings: &FacultySettings,
    ) -> (FacultyOutputs, UsageCounters) {
        match self.evaluate(message, settings).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "combined faculties degraded");
                (FacultyOutputs::degraded(&err.cause()), err.usage())
            }
        }
    }
}

impl std::fmt::Debug for CombinedFacultyRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedFacultyRunner").finish_non_exhaustive()
    }
}
