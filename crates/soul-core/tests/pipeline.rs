//! # Pipeline Tests
//!
//! Non-streaming requests end to end against a scripted completion
//! service and a temporary registry.

mod common;

use common::*;
use soul_core::{
    ConfigPatch, Faculty, LearningScope, ProcessingMode, ScriptedCompletion, SoulConfig,
    SoulError, SynthesisResult,
};
use soul_registry::LearningStatus;

#[tokio::test]
async fn test_autonomous_request() {
    let fx = fixture(confident(), SoulConfig::default());

    let result = fx.soul.ask("tell me something new").await.unwrap();

    assert_eq!(result.mode, ProcessingMode::Autonomous);
    assert!((result.confidence.weighted - 0.815).abs() < 1e-9);
    assert_eq!(result.response(), SYNTHESIS);
    assert_eq!(result.synthesis.weights, fx.soul.config().weights);
    assert!(result.trainer_needed.is_none());

    assert_eq!(fx.svc.calls(), 4);
    assert_eq!(result.token_usage.counters.input_tokens, 40);
    assert_eq!(result.token_usage.total_tokens, 60);
}

#[tokio::test]
async fn test_low_confidence_hands_to_trainer() {
    let fx = fixture(unsure(), escalating(SoulConfig::default()));

    let result = fx.soul.ask("answer my riddle").await.unwrap();

    assert_eq!(result.mode, ProcessingMode::NeedsTrainer);
    assert!(result.needs_trainer());
    assert!((result.confidence.weighted - 0.3).abs() < 1e-9);
    assert_eq!(
        result.synthesis,
        SynthesisResult::awaiting_trainer(fx.soul.config().weights)
    );

    let escalation = result.trainer_needed.unwrap();
    assert_eq!(escalation.trigger_summary, "How do I answer riddles?");
    assert_eq!(escalation.question_context, "answer my riddle");

    let pending = fx.registry.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(Some(pending[0].id), escalation.record_id);
    assert_eq!(pending[0].status, LearningStatus::Pending);

    let synthesized = fx
        .svc
        .requests()
        .iter()
        .any(|r| r.system_prompt.contains("You are the Atman"));
    assert!(!synthesized);
    // three faculties plus the question formulation
    assert_eq!(result.token_usage.counters.input_tokens, 40);
}

#[tokio::test]
async fn test_escalation_disabled_never_consults_trainer() {
    let fx = fixture(unsure(), SoulConfig::default());
    let result = fx.soul.ask("answer my riddle").await.unwrap();

    assert_eq!(result.mode, ProcessingMode::Autonomous);
    assert_eq!(result.response(), SYNTHESIS);
    assert!(fx.registry.pending().unwrap().is_empty());
}

#[tokio::test]
async fn test_combined_mode_makes_one_faculty_call() {
    let combined = format!(r#"{{"manas": {MANAS}, "buddhi": {BUDDHI}, "sanskaras": {SANSKARAS}}}"#);
    let svc = ScriptedCompletion::new()
        .on("You are the three inner faculties", combined)
        .on("You are the Atman", SYNTHESIS);
    let mut config = SoulConfig::default();
    config.pipeline.combined_mode = true;
    let fx = fixture(svc, config);

    let result = fx.soul.ask("tell me something new").await.unwrap();

    assert_eq!(fx.svc.calls(), 2);
    assert!((result.confidence.weighted - 0.815).abs() < 1e-9);
    let faculty_calls = fx
        .svc
        .requests()
        .iter()
        .filter(|r| !r.system_prompt.contains("You are the Atman"))
        .count();
    assert_eq!(faculty_calls, 1);
    assert_eq!(fx.svc.requests()[0].max_tokens, Some(800));
}

#[tokio::test]
async fn test_faculty_fault_isolated() {
    let svc = ScriptedCompletion::new()
        .on("You are Manas", MANAS)
        .fail_on("You are Buddhi", "connection reset")
        .on("You are Sanskaras", SANSKARAS)
        .on("You are the Atman", SYNTHESIS);
    let fx = fixture(svc, SoulConfig::default());

    let result = fx.soul.ask("hello").await.unwrap();

    assert_eq!(result.outputs.confidence(Faculty::Buddhi), 0.1);
    assert!(result.outputs.buddhi.response.starts_with("Buddhi encountered confusion"));
    assert_eq!(result.outputs.manas.confidence, 0.8);
    assert_eq!(result.outputs.manas.valence, 0.5);
    assert_eq!(result.outputs.sanskaras.confidence, 0.7);
    assert_eq!(result.response(), SYNTHESIS);
}

#[tokio::test]
async fn test_synthesis_fault_becomes_apology() {
    let svc = ScriptedCompletion::new()
        .on("You are Manas", MANAS)
        .on("You are Buddhi", BUDDHI)
        .on("You are Sanskaras", SANSKARAS)
        .fail_on("You are the Atman", "overloaded");
    let fx = fixture(svc, SoulConfig::default());

    let result = fx.soul.ask("hello").await.unwrap();
    assert!(result.response().starts_with("The soul struggles to integrate"));
    assert_eq!(result.mode, ProcessingMode::Autonomous);
}

#[tokio::test]
async fn test_fail_fast_returns_faculty_error() {
    let svc = ScriptedCompletion::new()
        .on("You are Manas", MANAS)
        .fail_on("You are Buddhi", "connection reset")
        .on("You are Sanskaras", SANSKARAS)
        .on("You are the Atman", SYNTHESIS);
    let fx = fixture(svc, fail_fast(SoulConfig::default()));

    let err = fx.soul.ask("hello").await.unwrap_err();
    assert!(matches!(err, SoulError::Council(_)));
    assert_eq!(err.faculty(), Some(Faculty::Buddhi));
    assert!(err.to_string().contains("connection reset"));

    let synthesized = fx
        .svc
        .requests()
        .iter()
        .any(|r| r.system_prompt.contains("You are the Atman"));
    assert!(!synthesized);
}

#[tokio::test]
async fn test_fail_fast_synthesis_error() {
    let svc = ScriptedCompletion::new()
        .on("You are Manas", MANAS)
        .on("You are Buddhi", BUDDHI)
        .on("You are Sanskaras", SANSKARAS)
        .fail_on("You are the Atman", "overloaded");
    let fx = fixture(svc, fail_fast(SoulConfig::default()));

    let err = fx.soul.ask("hello").await.unwrap_err();
    assert_eq!(err.faculty(), None);
    assert!(err.to_string().contains("synthesis"));
}

#[tokio::test]
async fn test_unregistered_question_isolated() {
    let (_, orchestrator, _) = read_only(unsure(), escalating(SoulConfig::default()));

    let result = orchestrator.process("answer my riddle").await.unwrap();
    let escalation = result.trainer_needed.unwrap();
    assert_eq!(escalation.record_id, None);
    assert_eq!(escalation.trigger_summary, "How do I answer riddles?");
}

#[tokio::test]
async fn test_unregistered_question_fail_fast() {
    let (_, orchestrator, _) = read_only(unsure(), fail_fast(escalating(SoulConfig::default())));

    let err = orchestrator.process("answer my riddle").await.unwrap_err();
    assert!(err.to_string().contains("read-only"));
}

#[tokio::test]
async fn test_formulation_fault_falls_back() {
    let svc = ScriptedCompletion::new()
        .on("You are Manas", UNSURE)
        .on("You are Buddhi", UNSURE)
        .on("You are Sanskaras", UNSURE)
        .fail_on("You help a young soul formulate", "timeout");
    let fx = fixture(svc, fail_fast(escalating(SoulConfig::default())));

    let result = fx.soul.ask("Why Do Cats Purr So Loudly Tonight").await.unwrap();
    let pending = fx.registry.pending().unwrap();
    assert_eq!(
        result.trainer_needed.unwrap().trigger_summary,
        "How should I respond to: Why Do Cats Purr So Loudly Tonight"
    );
    assert_eq!(pending[0].keywords, "why,do,cats,purr,so");
}

#[tokio::test]
async fn test_trainer_guidance_reaches_next_request() {
    let fx = fixture(unsure(), escalating(SoulConfig::default()));
    let first = fx.soul.ask("answer my riddle").await.unwrap();
    let id = first.trainer_needed.unwrap().record_id.unwrap();

    fx.registry
        .activate(
            id,
            soul_core::Activation {
                scope: LearningScope::All,
                ..soul_core::Activation::new("Riddles are play; answer with a riddle.")
            },
        )
        .unwrap();

    fx.soul.ask("another riddle for you").await.unwrap();
    let guided = fx
        .svc
        .requests()
        .iter()
        .filter(|r| r.user_message.contains("Riddles are play"))
        .count();
    assert_eq!(guided, 3);
    assert_eq!(fx.registry.learning(id).unwrap().times_applied, 3);
}

#[tokio::test(start_paused = true)]
async fn test_request_keeps_its_config_snapshot() {
    let svc = ScriptedCompletion::new()
        .on_delayed("You are Manas", MANAS, ms(50))
        .on_delayed("You are Buddhi", BUDDHI, ms(50))
        .on_delayed("You are Sanskaras", SANSKARAS, ms(50))
        .on("You are the Atman", SYNTHESIS);
    let fx = std::sync::Arc::new(fixture(svc, SoulConfig::default()));

    let running = {
        let fx = fx.clone();
        tokio::spawn(async move { fx.soul.ask("hello").await })
    };
    tokio::time::sleep(ms(10)).await;

    fx.soul
        .update_config(&ConfigPatch {
            weight_manas: Some(0.2),
            weight_buddhi: Some(0.6),
            weight_sanskaras: Some(0.2),
            ..ConfigPatch::default()
        })
        .unwrap();

    let result = running.await.unwrap().unwrap();
    assert_eq!(result.synthesis.weights.manas, 0.35);
    assert!((result.confidence.weighted - 0.815).abs() < 1e-9);
    assert_eq!(fx.soul.config().weights.buddhi, 0.6);
}

#[tokio::test]
async fn test_patched_model_and_ceiling_reach_every_call() {
    let fx = fixture(confident(), SoulConfig::default());
    fx.soul
        .update_config(&ConfigPatch {
            model: Some("claude-opus-4-1".to_string()),
            max_tokens: Some(2000),
            ..ConfigPatch::default()
        })
        .unwrap();

    fx.soul.ask("tell me something new").await.unwrap();

    let requests = fx.svc.requests();
    assert_eq!(requests.len(), 4);
    for request in &requests {
        assert_eq!(request.model.as_deref(), Some("claude-opus-4-1"));
        assert_eq!(request.max_tokens, Some(2000));
    }
}

#[tokio::test]
async fn test_result_json_shape() {
    let fx = fixture(confident(), SoulConfig::default());
    let result = fx.soul.ask("hello").await.unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["manas"]["valence"], 0.5);
    assert_eq!(json["buddhi"]["reasoning_chain"][1], "judged");
    assert_eq!(json["sanskaras"]["activated_habits"][0]["name"], "curiosity");
    assert_eq!(json["mode"], "autonomous");
    assert_eq!(json["token_usage"]["total_tokens"], 60);
    assert!(json.get("trainer_needed").is_none());
    assert!(json["elapsed_ms"].is_u64());
}
