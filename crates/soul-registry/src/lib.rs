//! # Soul Registry
//!
//! Persistent habit and learning records, and the keyword-ranked retrieval
//! the faculties use to enrich their prompts.
//!
//! ## Purpose
//!
//! 1. **Habit retrieval** - the habit faculty looks up conditioned
//!    tendencies relevant to a message ([`HabitRetrieval`]).
//! 2. **Learning retrieval** - every faculty appends active trainer guidance
//!    relevant to a message, scoped per faculty ([`LearningStore`]).
//! 3. **Trainer escalation** - low-confidence requests register a pending
//!    question that a human trainer later answers ([`SoulRegistry::activate`]).
//!
//! ## Ranking
//!
//! Score = (keywords present among the message's lowercase whitespace
//! tokens) × weight. Habits weigh by [`Habit::effective_weight`], learnings
//! by their confidence boost. Zero-overlap records are dropped, ties keep
//! creation order, and at most `limit` records are returned.
//!
//! ## Example
//!
//! ```rust
//! use soul_registry::SoulRegistry;
//!
//! let registry = SoulRegistry::temporary().unwrap();
//! registry.seed_if_empty(false).unwrap();
//!
//! let habits = registry.relevant_habits("i need some peace and calm", None, 5).unwrap();
//! assert_eq!(habits[0].name, "inner_peace");
//! ```

pub mod models;
pub mod ranking;
pub mod registry;
pub mod retrieval;
pub mod seed;
pub mod storage;

pub use models::{
    Activation, Habit, Learning, LearningScope, LearningStatus, NewHabit, RecordId,
    RegistryError, Result,
};
pub use registry::{parse_scope, SoulRegistry};
pub use retrieval::{HabitRetrieval, LearningStore};
