//! Collaborator traits consumed by the faculties and the trainer escalator.

use async_trait::async_trait;

use crate::models::{Habit, Learning, RecordId, Result};

/// Keyword-ranked habit lookup.
#[async_trait]
pub trait HabitRetrieval: Send + Sync {
    /// Habits whose keywords overlap `message`, best first, at most `limit`.
    ///
    /// `category` restricts the candidates before ranking.
    async fn find_relevant_habits(
        &self,
        message: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Habit>>;
}

/// Trainer guidance lookup and pending-question registration.
#[async_trait]
pub trait LearningStore: Send + Sync {
    /// Active learnings whose keywords overlap `message`, best first.
    ///
    /// With `faculty` set, learnings scoped to other faculties are skipped.
    async fn find_relevant_learnings(
        &self,
        message: &str,
        faculty: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Learning>>;

    /// Registers a pending question for the trainer.
    async fn create_pending(
        &self,
        question_context: &str,
        trigger_summary: &str,
        keywords: &str,
    ) -> Result<Learning>;

    /// Counts one more application of a learning.
    ///
    /// # Errors
    ///
    /// `RegistryError::NotFound` if no learning has this id.
    async fn increment_applied(&self, id: RecordId) -> Result<()>;
}
