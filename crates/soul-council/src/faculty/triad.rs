//! The faculty triad: Manas, Buddhi and Sanskaras.
//!
//! Each runner augments the message with retrieved context, makes one
//! structured completion call and decodes the answer leniently.

use async_trait::async_trait;
use soul_monitor::UsageCounters;
use soul_registry::{Habit, HabitRetrieval};
use std::sync::Arc;
use tracing::debug;

use super::decode::decode;
use super::{Faculty, FacultyContext, FacultyOutput, FacultyRunner, FacultySettings};
use crate::error::{CouncilError, Result, Stage};
use crate::prompts;

/// Learnings, one call, decode. Shared by all three runners.
async fn run(
    ctx: &FacultyContext,
    faculty: Faculty,
    system_prompt: &str,
    message: &str,
    extra_context: String,
    settings: &FacultySettings,
) -> Result<(FacultyOutput, UsageCounters)> {
    let stage = Stage::Faculty(faculty);
    let learnings = ctx
        .learning_context(message, Some(faculty), settings.learning_limit, stage)
        .await?;

    let augmented = format!("{message}{extra_context}{learnings}");
    let (data, usage) = ctx
        .call_structured(system_prompt, augmented, &settings.call, stage)
        .await?;

    let output = decode(faculty, &data);
    debug!(%faculty, confidence = output.confidence(), "faculty evaluated");
    Ok((output, usage))
}

/// Mind: emotional reading and valence.
#[derive(Debug, Clone)]
pub struct ManasRunner {
    ctx: FacultyContext,
}

impl ManasRunner {
    pub fn new(ctx: FacultyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FacultyRunner for ManasRunner {
    fn faculty(&self) -> Faculty {
        Faculty::Manas
    }

    async fn evaluate(
        &self,
        message: &str,
        settings: &FacultySettings,
    ) -> Result<(FacultyOutput, UsageCounters)> {
        run(&self.ctx, Faculty::Manas, prompts::MANAS, message, String::new(), settings).await
    }
}

/// Intellect: reasoning chain.
#[derive(Debug, Clone)]
pub struct BuddhiRunner {
    ctx: FacultyContext,
}

impl BuddhiRunner {
    pub fn new(ctx: FacultyContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FacultyRunner for BuddhiRunner {
    fn faculty(&self) -> Faculty {
        Faculty::Buddhi
    }

    async fn evaluate(
        &self,
        message: &str,
        settings: &FacultySettings,
    ) -> Result<(FacultyOutput, UsageCounters)> {
        run(&self.ctx, Faculty::Buddhi, prompts::BUDDHI, message, String::new(), settings).await
    }
}

/// Habits: conditioned tendencies, consulting the habit registry.
#[derive(Clone)]
pub struct SanskarasRunner {
    ctx: FacultyContext,
    habits: Arc<dyn HabitRetrieval>,
}

impl SanskarasRunner {
    pub fn new(ctx: FacultyContext, habits: Arc<dyn HabitRetrieval>) -> Self {
        Self { ctx, habits }
    }
}

/// Formats retrieved habits as prompt bullet lines.
pub fn habit_context(habits: &[Habit]) -> String {
    if habits.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = habits
        .iter()
        .map(|h| {
            format!(
                "- {} (category: {}, weight: {:.1}, valence: {:+.1}): {}",
                h.name,
                h.category,
                h.effective_weight(),
                h.valence,
                h.description
            )
        })
        .collect();
    format!("\n\nActivated habits from experience:\n{}", lines.join("\n"))
}

pub(crate) async fn retrieve_habits(
    habits: &dyn HabitRetrieval,
    message: &str,
    limit: usize,
    stage: Stage,
) -> Result<String> {
    if limit == 0 {
        return Ok(String::new());
    }
    let found = habits
        .find_relevant_habits(message, None, limit)
        .await
        .map_err(|e| CouncilError::registry(stage, e))?;
    Ok(habit_context(&found))
}

#[async_trait]
impl FacultyRunner for SanskarasRunner {
    fn faculty(&self) -> Faculty {
        Faculty::Sanskaras
    }

    async fn evaluate(
        &self,
        message: &str,
        settings: &FacultySettings,
    ) -> Result<(FacultyOutput, UsageCounters)> {
        let stage = Stage::Faculty(Faculty::Sanskaras);
        let habits = retrieve_habits(self.habits.as_ref(), message, settings.habit_limit, stage).await?;
        run(&self.ctx, Faculty::Sanskaras, prompts::SANSKARAS, message, habits, settings).await
    }
}

impl std::fmt::Debug for SanskarasRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanskarasRunner").finish_non_exhaustive()
    }
}
