//! # Soul Council
//!
//! Three inner faculties evaluate every message, their confidences are
//! weighed, and the soul either synthesizes one answer or asks its trainer.
//!
//! ## Overview
//!
//! Each faculty reads the message through its own lens and answers with a
//! response and a confidence in [0, 1]:
//! - **Manas** (mind): emotional reading, plus a valence in [-1, 1]
//! - **Buddhi** (intellect): discernment, plus a reasoning chain
//! - **Sanskaras** (habits): conditioned tendencies drawn from the habit
//!   registry, plus the habits it activated
//!
//! All three prompts are augmented with active trainer guidance relevant to
//! the message. A combined mode replaces the three calls with one.
//!
//! ## Failure Model
//!
//! Every fallible step has two forms. The raw form (`evaluate`,
//! `synthesize`, `register`) returns a [`CouncilError`] naming its
//! [`Stage`]. The degrading form (`process`, `synthesize_or_apologize`)
//! never fails: a faculty drops to confidence 0.1 with a failure note, and
//! synthesis becomes an apology. Usage consumed before a fault, such as a
//! completion whose text did not decode, is kept in both forms.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  ┌──────────┐  ┌───────────┐
//! │  Manas   │  │  Buddhi  │  │ Sanskaras │
//! └────┬─────┘  └────┬─────┘  └─────┬─────┘
//!      └─────────────┼──────────────┘
//!                    ▼
//!            ┌──────────────┐
//!            │  CONFIDENCE  │
//!            └──────┬───────┘
//!          ┌────────┴──────────┐
//!          ▼                   ▼
//!    ┌───────────┐      ┌────────────┐
//!    │ SYNTHESIS │      │ ESCALATION │
//!    └───────────┘      └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use soul_council::{ConfidenceAggregator, FacultyContext, ManasRunner, FacultyRunner};
//!
//! let ctx = FacultyContext::new(completion, registry);
//! let (output, usage) = ManasRunner::new(ctx).process("hello", &settings).await;
//! ```

pub mod confidence;
pub mod error;
pub mod escalation;
pub mod faculty;
pub mod prompts;
pub mod synthesis;

pub use confidence::{
    ConfidenceAggregator, ConfidenceAssessment, EscalationPolicy, FacultyWeights, ProcessingMode,
};
pub use error::{CouncilError, Result, Stage};
pub use escalation::{TrainerEscalation, TrainerEscalator, TrainerQuestion};
pub use faculty::combined::CombinedFacultyRunner;
pub use faculty::triad::{habit_context, BuddhiRunner, ManasRunner, SanskarasRunner};
pub use faculty::{
    ActivatedHabit, BuddhiOutput, CallSettings, Faculty, FacultyContext, FacultyOutput,
    FacultyOutputs, FacultyRunner, FacultySettings, ManasOutput, SanskarasOutput,
    DEGRADED_CONFIDENCE,
};
pub use synthesis::{SynthesisResult, Synthesizer, AWAITING_TRAINER_RESPONSE};
