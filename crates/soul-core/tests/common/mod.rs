//! Shared fixtures for the soul-core integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use soul_core::{
    Collaborators, FailurePolicy, Orchestrator, ScriptedCompletion, SharedConfig, Soul,
    SoulConfig, SoulRegistry, StreamingOrchestrator,
};
use soul_registry::{Learning, LearningStore, RecordId, RegistryError};
use std::sync::Arc;
use std::time::Duration;

pub const MANAS: &str = r#"{"response": "Warmth rises.", "confidence": 0.8, "valence": 0.5}"#;
pub const BUDDHI: &str =
    r#"{"response": "It follows.", "confidence": 0.9, "reasoning_chain": ["seen", "judged"]}"#;
pub const SANSKARAS: &str =
    r#"{"response": "Familiar ground.", "confidence": 0.7, "activated_habits": ["curiosity"]}"#;
pub const SYNTHESIS: &str = "Stay curious and kind.";

pub const UNSURE: &str = r#"{"response": "I am not sure.", "confidence": 0.3}"#;
pub const QUESTION: &str =
    r#"{"trigger_summary": "How do I answer riddles?", "keywords": "riddle,answer"}"#;

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Confident faculties and a synthesis reply.
pub fn confident() -> ScriptedCompletion {
    ScriptedCompletion::new()
        .on("You are Manas", MANAS)
        .on("You are Buddhi", BUDDHI)
        .on("You are Sanskaras", SANSKARAS)
        .on("You are the Atman", SYNTHESIS)
}

/// Faculties at confidence 0.3 and a trainer question.
pub fn unsure() -> ScriptedCompletion {
    ScriptedCompletion::new()
        .on("You are Manas", UNSURE)
        .on("You are Buddhi", UNSURE)
        .on("You are Sanskaras", UNSURE)
        .on("You help a young soul formulate", QUESTION)
        .on("You are the Atman", SYNTHESIS)
}

pub fn escalating(mut config: SoulConfig) -> SoulConfig {
    config.escalation.enabled = true;
    config.escalation.threshold = 0.4;
    config
}

pub fn fail_fast(mut config: SoulConfig) -> SoulConfig {
    config.pipeline.failure_policy = FailurePolicy::FailFast;
    config
}

pub struct Fixture {
    pub svc: Arc<ScriptedCompletion>,
    pub registry: Arc<SoulRegistry>,
    pub soul: Soul,
}

pub fn fixture(svc: ScriptedCompletion, config: SoulConfig) -> Fixture {
    let svc = Arc::new(svc);
    let registry = Arc::new(SoulRegistry::temporary().unwrap());
    let soul = Soul::new(config, registry.clone(), svc.clone());
    Fixture { svc, registry, soul }
}

/// Learning store that serves guidance but cannot register questions.
pub struct ReadOnlyLearnings(pub Arc<SoulRegistry>);

#[async_trait]
impl LearningStore for ReadOnlyLearnings {
    async fn find_relevant_learnings(
        &self,
        message: &str,
        faculty: Option<&str>,
        limit: usize,
    ) -> soul_registry::Result<Vec<Learning>> {
        self.0.find_relevant_learnings(message, faculty, limit).await
    }

    async fn create_pending(
        &self,
        _question_context: &str,
        _trigger_summary: &str,
        _keywords: &str,
    ) -> soul_registry::Result<Learning> {
        Err(RegistryError::NotFound("learnings tree is read-only".to_string()))
    }

    async fn increment_applied(&self, id: RecordId) -> soul_registry::Result<()> {
        self.0.increment_applied(id).await
    }
}

/// Orchestrators whose pending-question registration always fails.
pub fn read_only(
    svc: ScriptedCompletion,
    config: SoulConfig,
) -> (Arc<ScriptedCompletion>, Orchestrator, StreamingOrchestrator) {
    let svc = Arc::new(svc);
    let registry = Arc::new(SoulRegistry::temporary().unwrap());
    let collaborators = Collaborators::new(
        svc.clone(),
        registry.clone(),
        Arc::new(ReadOnlyLearnings(registry)),
    );
    let shared = SharedConfig::new(config);
    (
        svc,
        Orchestrator::new(collaborators.clone(), shared.clone()),
        StreamingOrchestrator::new(collaborators, shared),
    )
}
