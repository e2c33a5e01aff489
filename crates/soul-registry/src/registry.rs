//! # Soul Registry - Main Facade
//!
//! [`SoulRegistry`] owns the habit and learning records and implements both
//! collaborator traits, [`HabitRetrieval`] and [`LearningStore`]. It also
//! carries the trainer-facing operations the engine itself never calls:
//! activation, proactive teaching, supersession, habit reinforcement and
//! seeding.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────────┐
//!                 │    SoulRegistry    │
//!                 │      (Facade)      │
//!                 └─────────┬──────────┘
//!                           │
//!          ┌────────────────┼────────────────┐
//!          ▼                ▼                ▼
//!    ┌──────────┐     ┌──────────┐     ┌──────────┐
//!    │ Ranking  │     │ Storage  │     │   Seed   │
//!    │(keywords)│     │  (Sled)  │     │ (habits) │
//!    └──────────┘     └──────────┘     └──────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};

use crate::models::{
    Activation, Habit, Learning, LearningScope, LearningStatus, NewHabit, RecordId,
    RegistryError, Result,
};
use crate::ranking::rank;
use crate::retrieval::{HabitRetrieval, LearningStore};
use crate::seed::default_habits;
use crate::storage::Storage;

/// Habit and learning registry.
///
/// # Example
///
/// ```rust
/// use soul_registry::{Activation, SoulRegistry};
///
/// let registry = SoulRegistry::temporary().unwrap();
/// registry.seed_if_empty(false).unwrap();
///
/// let pending = registry
///     .create_pending("my friend lied to me", "How should I respond to: my friend lied to me", "friend,lied")
///     .unwrap();
/// registry
///     .activate(pending.id, Activation::new("Acknowledge the hurt before judging."))
///     .unwrap();
///
/// let found = registry.relevant_learnings("a friend lied", None, 5).unwrap();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SoulRegistry {
    storage: Storage,
}

impl SoulRegistry {
    /// Opens or creates a registry at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path)?,
        })
    }

    /// Creates a registry backed by a temporary database.
    pub fn temporary() -> Result<Self> {
        Ok(Self {
            storage: Storage::temporary()?,
        })
    }

    // ---- habits ---------------------------------------------------------

    /// Creates a habit.
    ///
    /// # Errors
    ///
    /// `RegistryError::AlreadyExists` if a habit with this name exists.
    pub fn create_habit(&self, new: NewHabit) -> Result<Habit> {
        if self.storage.habits()?.iter().any(|h| h.name == new.name) {
            return Err(RegistryError::AlreadyExists(new.name));
        }

        let now = Utc::now();
        let habit = Habit {
            id: self.storage.next_id()?,
            name: new.name,
            description: new.description,
            category: new.category,
            keywords: new.keywords,
            base_weight: new.base_weight,
            repetition_count: new.repetition_count,
            valence: new.valence.clamp(-1.0, 1.0),
            created_at: now,
            updated_at: now,
        };
        self.storage.store_habit(&habit)?;
        debug!(id = habit.id, name = %habit.name, "habit created");
        Ok(habit)
    }

    /// Looks up a habit by id.
    pub fn habit(&self, id: RecordId) -> Result<Habit> {
        self.storage
            .load_habit(id)?
            .ok_or_else(|| RegistryError::NotFound(format!("habit {id}")))
    }

    /// Lists habits, optionally restricted to a category, keeping those whose
    /// effective weight is at least `min_weight`.
    pub fn habits(&self, category: Option<&str>, min_weight: f64) -> Result<Vec<Habit>> {
        Ok(self
            .storage
            .habits()?
            .into_iter()
            .filter(|h| category.map_or(true, |c| h.category == c))
            .filter(|h| h.effective_weight() >= min_weight)
            .collect())
    }

    /// Records one more repetition of a habit.
    pub fn reinforce(&self, id: RecordId) -> Result<Habit> {
        let habit = self
            .storage
            .update_habit(id, |h| {
                h.repetition_count = h.repetition_count.saturating_add(1);
                h.updated_at = Utc::now();
            })?
            .ok_or_else(|| RegistryError::NotFound(format!("habit {id}")))?;
        debug!(id, repetitions = habit.repetition_count, "habit reinforced");
        Ok(habit)
    }

    pub fn habit_count(&self) -> usize {
        self.storage.habit_count()
    }

    /// Seeds the default habit set.
    ///
    /// Does nothing when habits already exist unless `force` is set; a forced
    /// re-seed skips names already present. Returns the number created.
    pub fn seed_if_empty(&self, force: bool) -> Result<usize> {
        if self.habit_count() > 0 && !force {
            return Ok(0);
        }

        let mut created = 0;
        for habit in default_habits() {
            match self.create_habit(habit) {
                Ok(_) => created += 1,
                Err(RegistryError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        info!(created, "seeded default habits");
        Ok(created)
    }

    /// Habits ranked against `message` by keyword overlap × effective weight.
    pub fn relevant_habits(
        &self,
        message: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Habit>> {
        let candidates = self.habits(category, 0.0)?;
        Ok(rank(
            candidates,
            message,
            limit,
            |h| h.keywords.as_str(),
            Habit::effective_weight,
        ))
    }

    // ---- learnings ------------------------------------------------------

    /// Registers a pending trainer question.
    pub fn create_pending(
        &self,
        question_context: &str,
        trigger_summary: &str,
        keywords: &str,
    ) -> Result<Learning> {
        let learning = self.new_learning(
            question_context,
            trigger_summary,
            keywords,
            Activation::default(),
            LearningStatus::Pending,
        )?;
        info!(id = learning.id, summary = %learning.trigger_summary, "trainer question registered");
        Ok(learning)
    }

    /// Creates an already-active learning (proactive teaching).
    pub fn create_active(
        &self,
        question_context: &str,
        trigger_summary: &str,
        keywords: &str,
        activation: Activation,
    ) -> Result<Learning> {
        let learning = self.new_learning(
            question_context,
            trigger_summary,
            keywords,
            activation,
            LearningStatus::Active,
        )?;
        info!(id = learning.id, scope = %learning.scope, "learning taught");
        Ok(learning)
    }

    fn new_learning(
        &self,
        question_context: &str,
        trigger_summary: &str,
        keywords: &str,
        activation: Activation,
        status: LearningStatus,
    ) -> Result<Learning> {
        let now = Utc::now();
        let learning = Learning {
            id: self.storage.next_id()?,
            trigger_summary: trigger_summary.to_string(),
            question_context: question_context.to_string(),
            guidance: activation.guidance,
            application_note: activation.application_note,
            scope: activation.scope,
            keywords: keywords.to_string(),
            confidence_boost: activation.confidence_boost,
            times_applied: 0,
            status,
            created_at: now,
            updated_at: now,
        };
        self.storage.store_learning(&learning)?;
        Ok(learning)
    }

    /// Answers a pending question, making the learning active.
    ///
    /// # Errors
    ///
    /// - `RegistryError::NotFound` if no learning has this id
    /// - `RegistryError::NotPending` if it is already active or superseded
    pub fn activate(&self, id: RecordId, activation: Activation) -> Result<Learning> {
        let current = self.learning(id)?;
        if current.status != LearningStatus::Pending {
            return Err(RegistryError::NotPending {
                id,
                status: current.status,
            });
        }

        let learning = self
            .storage
            .update_learning(id, |l| {
                l.guidance = activation.guidance.clone();
                l.application_note = activation.application_note.clone();
                l.scope = activation.scope.clone();
                l.confidence_boost = activation.confidence_boost;
                l.status = LearningStatus::Active;
                l.updated_at = Utc::now();
            })?
            .ok_or_else(|| RegistryError::NotFound(format!("learning {id}")))?;
        info!(id, scope = %learning.scope, "learning activated");
        Ok(learning)
    }

    /// Soft-deletes a learning.
    pub fn supersede(&self, id: RecordId) -> Result<Learning> {
        let learning = self
            .storage
            .update_learning(id, |l| {
                l.status = LearningStatus::Superseded;
                l.updated_at = Utc::now();
            })?
            .ok_or_else(|| RegistryError::NotFound(format!("learning {id}")))?;
        info!(id, "learning superseded");
        Ok(learning)
    }

    /// Looks up a learning by id.
    pub fn learning(&self, id: RecordId) -> Result<Learning> {
        self.storage
            .load_learning(id)?
            .ok_or_else(|| RegistryError::NotFound(format!("learning {id}")))
    }

    /// Questions awaiting the trainer, oldest first.
    pub fn pending(&self) -> Result<Vec<Learning>> {
        self.with_status(LearningStatus::Pending)
    }

    /// Learnings currently informing prompts.
    pub fn active(&self) -> Result<Vec<Learning>> {
        self.with_status(LearningStatus::Active)
    }

    fn with_status(&self, status: LearningStatus) -> Result<Vec<Learning>> {
        Ok(self
            .storage
            .learnings()?
            .into_iter()
            .filter(|l| l.status == status)
            .collect())
    }

    /// Active learnings ranked against `message` by overlap × confidence boost.
    pub fn relevant_learnings(
        &self,
        message: &str,
        faculty: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Learning>> {
        let candidates = self
            .active()?
            .into_iter()
            .filter(|l| faculty.map_or(true, |f| l.scope.informs(f)));
        Ok(rank(
            candidates,
            message,
            limit,
            |l| l.keywords.as_str(),
            |l| l.confidence_boost,
        ))
    }

    /// Counts one more application of a learning.
    pub fn record_applied(&self, id: RecordId) -> Result<Learning> {
        self.storage
            .update_learning(id, |l| l.times_applied = l.times_applied.saturating_add(1))?
            .ok_or_else(|| RegistryError::NotFound(format!("learning {id}")))
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<usize> {
        self.storage.flush()
    }
}

#[async_trait]
impl HabitRetrieval for SoulRegistry {
    async fn find_relevant_habits(
        &self,
        message: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Habit>> {
        self.relevant_habits(message, category, limit)
    }
}

#[async_trait]
impl LearningStore for SoulRegistry {
    async fn find_relevant_learnings(
        &self,
        message: &str,
        faculty: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Learning>> {
        self.relevant_learnings(message, faculty, limit)
    }

    async fn create_pending(
        &self,
        question_context: &str,
        trigger_summary: &str,
        keywords: &str,
    ) -> Result<Learning> {
        SoulRegistry::create_pending(self, question_context, trigger_summary, keywords)
    }

    async fn increment_applied(&self, id: RecordId) -> Result<()> {
        self.record_applied(id).map(|_| ())
    }
}

/// Scope helper for trainer tooling: parses `all` or a faculty list.
pub fn parse_scope(raw: &str) -> LearningScope {
    raw.parse().unwrap_or_default()
}
