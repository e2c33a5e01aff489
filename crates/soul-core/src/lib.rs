//! # Soul Core
//!
//! Orchestration facade for the soul.
//! Runs the faculty council for each message and either answers or asks
//! the trainer, blocking or as a stream of events.
//!
//! ## Pipeline
//!
//! | Stage | Component | Happens after |
//! |-------|-----------|---------------|
//! | Faculties | Manas, Buddhi, Sanskaras (or one combined call) | request start |
//! | Confidence | weighted sum of faculty confidences | all three faculties |
//! | Escalation | trainer question + pending record | confidence, when below threshold |
//! | Synthesis | one answer honoring all three voices | confidence, otherwise |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         SOUL CORE                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │                    │      Soul       │  ← Unified Facade        │
//! │                    └────────┬────────┘                          │
//! │                             │                                   │
//! │              ┌──────────────┴──────────────┐                    │
//! │              ▼                             ▼                    │
//! │      ┌──────────────┐             ┌─────────────────┐           │
//! │      │ Orchestrator │             │    Streaming    │           │
//! │      │  (join!)     │             │  Orchestrator   │           │
//! │      └──────┬───────┘             └────────┬────────┘           │
//! │             └──────────────┬───────────────┘                    │
//! │                            ▼                                    │
//! │        ┌──────────────┬─────────────┬─────────────┐             │
//! │        │  Completion  │   Registry  │   Council   │             │
//! │        └──────────────┴─────────────┴─────────────┘             │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use soul_core::{Soul, SoulConfig};
//! use futures::StreamExt;
//!
//! let soul = Soul::open(SoulConfig::default().with_env_api_key(), "./soul.db")?;
//!
//! let result = soul.ask("What is courage?").await?;
//! println!("{} ({})", result.response(), result.mode);
//!
//! let mut events = soul.stream("What is courage?");
//! while let Some(event) = events.next().await {
//!     print!("{}", event.to_sse());
//! }
//! ```
//!
//! ## Failure Policy
//!
//! - `isolate` (default): a faulting faculty degrades to confidence 0.1, a
//!   faulting synthesis becomes an apology, and an unregistered trainer
//!   question leaves `record_id` empty. Both paths always finish.
//! - `fail_fast`: the first fault ends the request. Blocking calls return
//!   the error; streams emit `error`, cancel sibling faculty calls and send
//!   no `done`.
//!
//! Trainer-question formulation falls back locally under either policy.

mod config;
mod engine;
mod error;
mod pipeline;
mod result;
mod soul;
mod stream;

pub use config::{
    ConfigPatch, FailurePolicy, GenerationConfig, ModelConfig, PipelineConfig, RetrievalLimits,
    SharedConfig, SoulConfig, TokenLimits, API_KEY_ENV,
};
pub use engine::Orchestrator;
pub use error::SoulError;
pub use pipeline::Collaborators;
pub use result::RequestResult;
pub use soul::Soul;
pub use stream::{SoulEvent, SoulEventStream, StreamingOrchestrator};

// Re-export component types for convenience
pub use soul_completion::{AnthropicClient, AnthropicSettings, CompletionService, ScriptedCompletion};
pub use soul_council::{
    ConfidenceAssessment, EscalationPolicy, Faculty, FacultyOutput, FacultyOutputs,
    FacultyWeights, ProcessingMode, SynthesisResult, TrainerEscalation,
};
pub use soul_monitor::{UsageCounters, UsageSummary};
pub use soul_registry::{Activation, Learning, LearningScope, RecordId, SoulRegistry};

/// Core result type for soul operations.
pub type Result<T> = std::result::Result<T, SoulError>;
