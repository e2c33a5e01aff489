//! Low-confidence escalation to the trainer.
//!
//! Formulating the question never fails: any completion or decode fault
//! falls back to a question and keywords derived from the message itself.
//! Registering the pending record can fail, and the caller decides whether
//! that aborts the request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use soul_completion::CompletionService;
use soul_monitor::UsageCounters;
use soul_registry::{LearningStore, RecordId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{CouncilError, Result, Stage};
use crate::faculty::{CallSettings, FacultyContext, FacultyOutputs};
use crate::prompts;

/// Number of message tokens used as fallback keywords.
const FALLBACK_KEYWORDS: usize = 5;

/// The question the soul wants to ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerQuestion {
    pub trigger_summary: String,
    pub keywords: String,
}

impl TrainerQuestion {
    /// Question derived from the message alone.
    pub fn fallback(message: &str) -> Self {
        Self {
            trigger_summary: fallback_summary(message),
            keywords: fallback_keywords(message),
        }
    }

    fn from_object(data: &Map<String, Value>, message: &str) -> Self {
        let trigger_summary = match data.get("trigger_summary") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => fallback_summary(message),
        };
        let keywords = match data.get("keywords") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
            _ => fallback_keywords(message),
        };
        Self {
            trigger_summary,
            keywords,
        }
    }
}

fn fallback_summary(message: &str) -> String {
    format!("How should I respond to: {message}")
}

fn fallback_keywords(message: &str) -> String {
    message
        .to_lowercase()
        .split_whitespace()
        .take(FALLBACK_KEYWORDS)
        .collect::<Vec<_>>()
        .join(",")
}

/// Record of a low-confidence request handed to the trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerEscalation {
    /// Pending learning id; `None` when registration failed and was isolated.
    pub record_id: Option<RecordId>,
    pub trigger_summary: String,
    pub question_context: String,
}

impl TrainerEscalation {
    /// Escalation whose pending record could not be stored.
    pub fn unregistered(message: &str, question: TrainerQuestion) -> Self {
        Self {
            record_id: None,
            trigger_summary: question.trigger_summary,
            question_context: message.to_string(),
        }
    }
}

/// Formulates trainer questions and registers them as pending learnings.
#[derive(Clone)]
pub struct TrainerEscalator {
    ctx: FacultyContext,
    learnings: Arc<dyn LearningStore>,
}

impl TrainerEscalator {
    pub fn new(completion: Arc<dyn CompletionService>, learnings: Arc<dyn LearningStore>) -> Self {
        Self {
            ctx: FacultyContext::new(completion, learnings.clone()),
            learnings,
        }
    }

    fn prompt(message: &str, outputs: &FacultyOutputs) -> String {
        format!(
            "User said: \"{message}\"\n\
             Manas felt: {}\n\
             Buddhi thought: {}\n\
             Sanskaras recalled: {}\n\
             The soul is uncertain. What should it ask the trainer?",
            outputs.manas.response, outputs.buddhi.response, outputs.sanskaras.response
        )
    }

    /// Asks the completion service for a question, falling back locally.
    pub async fn formulate(
        &self,
        message: &str,
        outputs: &FacultyOutputs,
        call: &CallSettings,
    ) -> (TrainerQuestion, UsageCounters) {
        let result = self
            .ctx
            .call_structured(prompts::TRAINER, Self::prompt(message, outputs), call, Stage::Escalation)
            .await;

        match result {
            Ok((data, usage)) => (TrainerQuestion::from_object(&data, message), usage),
            Err(err) => {
                warn!(error = %err, "trainer question fell back to message");
                (TrainerQuestion::fallback(message), err.usage())
            }
        }
    }

    /// Stores `question` as a pending learning.
    pub async fn register(&self, message: &str, question: &TrainerQuestion) -> Result<TrainerEscalation> {
        let learning = self
            .learnings
            .create_pending(message, &question.trigger_summary, &question.keywords)
            .await
            .map_err(|e| CouncilError::registry(Stage::Escalation, e))?;

        info!(record_id = learning.id, "trainer question registered");
        Ok(TrainerEscalation {
            record_id: Some(learning.id),
            trigger_summary: question.trigger_summary.clone(),
            question_context: message.to_string(),
        })
    }

    /// Formulates and registers.
    ///
    /// On a registration fault the error is returned along with the usage
    /// of the formulation call and the question that was not stored.
    pub async fn escalate(
        &self,
        message: &str,
        outputs: &FacultyOutputs,
        call: &CallSettings,
    ) -> (std::result::Result<TrainerEscalation, (CouncilError, TrainerQuestion)>, UsageCounters) {
        let (question, usage) = self.formulate(message, outputs, call).await;
        let registered = match self.register(message, &question).await {
            Ok(escalation) => Ok(escalation),
            Err(err) => Err((err, question)),
        };
        (registered, usage)
    }
}

impl std::fmt::Debug for TrainerEscalator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainerEscalator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_completion::ScriptedCompletion;
    use soul_registry::{LearningStatus, SoulRegistry};

    fn call() -> CallSettings {
        CallSettings {
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 256,
            temperature: 0.3,
        }
    }

    fn setup(svc: ScriptedCompletion) -> (Arc<ScriptedCompletion>, Arc<SoulRegistry>, TrainerEscalator) {
        let svc = Arc::new(svc);
        let registry = Arc::new(SoulRegistry::temporary().unwrap());
        let escalator = TrainerEscalator::new(svc.clone(), registry.clone());
        (svc, registry, escalator)
    }

    #[test]
    fn test_fallback_question() {
        let q = TrainerQuestion::fallback("What Should I Do About My Brother Today");
        assert_eq!(
            q.trigger_summary,
            "How should I respond to: What Should I Do About My Brother Today"
        );
        assert_eq!(q.keywords, "what,should,i,do,about");
    }

    #[test]
    fn test_partial_object_falls_back_per_field() {
        let data: Map<String, Value> =
            serde_json::from_str(r#"{"trigger_summary": "How do I comfort grief?"}"#).unwrap();
        let q = TrainerQuestion::from_object(&data, "my friend is grieving");
        assert_eq!(q.trigger_summary, "How do I comfort grief?");
        assert_eq!(q.keywords, "my,friend,is,grieving");

        let data: Map<String, Value> =
            serde_json::from_str(r#"{"keywords": ["grief", "comfort"]}"#).unwrap();
        let q = TrainerQuestion::from_object(&data, "hi");
        assert_eq!(q.trigger_summary, "How should I respond to: hi");
        assert_eq!(q.keywords, "grief,comfort");
    }

    #[tokio::test]
    async fn test_escalate_registers_pending() {
        let (svc, registry, escalator) = setup(ScriptedCompletion::new().on(
            "You help a young soul formulate",
            r#"{"trigger_summary": "How should I handle betrayal?", "keywords": "betrayal,trust"}"#,
        ));
        let outputs = FacultyOutputs::degraded("unsure");

        let (result, usage) = escalator.escalate("a friend betrayed me", &outputs, &call()).await;
        let escalation = result.unwrap();
        assert!(!usage.is_zero());
        assert_eq!(escalation.trigger_summary, "How should I handle betrayal?");
        assert_eq!(escalation.question_context, "a friend betrayed me");

        let stored = registry.learning(escalation.record_id.unwrap()).unwrap();
        assert_eq!(stored.status, LearningStatus::Pending);
        assert_eq!(stored.keywords, "betrayal,trust");

        let req = &svc.requests()[0];
        assert_eq!(req.temperature, Some(0.3));
        assert!(req.user_message.contains("Buddhi thought:"));
    }

    #[tokio::test]
    async fn test_formulation_fault_still_registers() {
        let (_, registry, escalator) =
            setup(ScriptedCompletion::new().fail_on("You help a young soul formulate", "timeout"));
        let outputs = FacultyOutputs::degraded("unsure");

        let (result, usage) = escalator.escalate("why is the sky blue", &outputs, &call()).await;
        let escalation = result.unwrap();
        assert!(usage.is_zero());
        assert_eq!(escalation.trigger_summary, "How should I respond to: why is the sky blue");
        assert_eq!(registry.pending().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_formulation_keeps_usage() {
        let (_, _, escalator) = setup(
            ScriptedCompletion::new().on("You help a young soul formulate", "Ask them about it."),
        );
        let outputs = FacultyOutputs::degraded("unsure");
        let (question, usage) = escalator.formulate("hello there", &outputs, &call()).await;
        assert_eq!(question, TrainerQuestion::fallback("hello there"));
        assert!(!usage.is_zero());
    }

    #[test]
    fn test_unregistered_has_no_id() {
        let escalation = TrainerEscalation::unregistered("hi", TrainerQuestion::fallback("hi"));
        assert_eq!(escalation.record_id, None);
        assert_eq!(escalation.question_context, "hi");
    }
}
