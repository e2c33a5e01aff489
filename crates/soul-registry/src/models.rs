//! # Registry Data Models
//!
//! Habits are the soul's conditioned tendencies; learnings are guidance a
//! human trainer gave in answer to a low-confidence question. Both carry a
//! comma-separated keyword list used for retrieval.
//!
//! ## Learning Lifecycle
//!
//! ```text
//!  create_pending ──▶ Pending ──activate──▶ Active ──supersede──▶ Superseded
//!                                             ▲
//!  create_active ─────────────────────────────┘
//! ```
//!
//! Only `Active` learnings are ever retrieved for prompts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Record identifier, allocated by the database.
pub type RecordId = u64;

/// A conditioned tendency that colours the habit faculty's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: RecordId,
    /// Unique name, e.g. `inner_peace`.
    pub name: String,
    pub description: String,
    pub category: String,
    /// Comma-separated keywords.
    pub keywords: String,
    pub base_weight: f64,
    pub repetition_count: u32,
    /// Emotional tone in [-1, 1].
    pub valence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Weight grown by repetition: `base_weight × log2(repetition_count + 1)`.
    ///
    /// A habit seen once keeps its base weight; each doubling of
    /// repetitions adds one more unit of base weight.
    pub fn effective_weight(&self) -> f64 {
        self.base_weight * (f64::from(self.repetition_count) + 1.0).log2()
    }
}

/// Fields for creating a habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewHabit {
    pub name: String,
    pub description: String,
    pub category: String,
    pub keywords: String,
    pub base_weight: f64,
    pub repetition_count: u32,
    pub valence: f64,
}

impl Default for NewHabit {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            category: String::new(),
            keywords: String::new(),
            base_weight: 1.0,
            repetition_count: 1,
            valence: 0.0,
        }
    }
}

/// Learning lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStatus {
    /// Waiting for trainer guidance.
    Pending,
    /// Guidance given; retrieved for prompts.
    Active,
    /// Soft-deleted.
    Superseded,
}

impl fmt::Display for LearningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LearningStatus::Pending => "pending",
            LearningStatus::Active => "active",
            LearningStatus::Superseded => "superseded",
        };
        f.write_str(s)
    }
}

/// Which faculties a learning informs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningScope {
    #[default]
    All,
    /// Faculty names, e.g. `["manas", "sanskaras"]`.
    Faculties(Vec<String>),
}

impl LearningScope {
    /// Returns true if this learning applies to `faculty`.
    pub fn informs(&self, faculty: &str) -> bool {
        match self {
            LearningScope::All => true,
            LearningScope::Faculties(names) => names.iter().any(|n| n == faculty),
        }
    }
}

impl FromStr for LearningScope {
    type Err = Infallible;

    /// Parses `all` or a comma-separated faculty list.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(LearningScope::All);
        }
        Ok(LearningScope::Faculties(
            trimmed
                .split(',')
                .map(|n| n.trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        ))
    }
}

impl fmt::Display for LearningScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningScope::All => f.write_str("all"),
            LearningScope::Faculties(names) => f.write_str(&names.join(",")),
        }
    }
}

/// Trainer guidance attached to a situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learning {
    pub id: RecordId,
    /// The question put to the trainer.
    pub trigger_summary: String,
    /// The user message that prompted the question.
    pub question_context: String,
    pub guidance: String,
    pub application_note: String,
    pub scope: LearningScope,
    /// Comma-separated keywords.
    pub keywords: String,
    /// Ranking weight for retrieval.
    pub confidence_boost: f64,
    pub times_applied: u64,
    pub status: LearningStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trainer answer turning a pending learning active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activation {
    pub guidance: String,
    pub application_note: String,
    pub scope: LearningScope,
    pub confidence_boost: f64,
}

impl Default for Activation {
    fn default() -> Self {
        Self {
            guidance: String::new(),
            application_note: String::new(),
            scope: LearningScope::All,
            confidence_boost: 0.5,
        }
    }
}

impl Activation {
    /// Activation with the given guidance and default scope and boost.
    pub fn new(guidance: impl Into<String>) -> Self {
        Self {
            guidance: guidance.into(),
            ..Self::default()
        }
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to open or access the database.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize a record.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No record with this identifier or name.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A habit with this name already exists.
    #[error("Habit already exists: {0}")]
    AlreadyExists(String),

    /// Activation requested for a learning that is not pending.
    #[error("Learning {id} is {status}, not pending")]
    NotPending { id: RecordId, status: LearningStatus },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
