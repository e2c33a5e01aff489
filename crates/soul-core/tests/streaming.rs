//! # Streaming Tests
//!
//! Event order, fail-fast cancellation and consumer disconnects. Timing
//! scenarios run on paused time so arrival order is deterministic.

mod common;

use common::*;
use futures::StreamExt;
use soul_core::{Faculty, ScriptedCompletion, SoulConfig, SoulEvent};

async fn collect(stream: soul_core::SoulEventStream) -> Vec<SoulEvent> {
    stream.collect().await
}

fn names(events: &[SoulEvent]) -> Vec<&'static str> {
    events.iter().map(SoulEvent::name).collect()
}

#[tokio::test(start_paused = true)]
async fn test_faculty_events_in_arrival_order() {
    let svc = ScriptedCompletion::new()
        .on_delayed("You are Sanskaras", SANSKARAS, ms(10))
        .on_delayed("You are Manas", MANAS, ms(20))
        .on_delayed("You are Buddhi", BUDDHI, ms(30))
        .on("You are the Atman", SYNTHESIS);
    let fx = fixture(svc, SoulConfig::default());

    let events = collect(fx.soul.stream("tell me something new")).await;

    assert_eq!(
        names(&events),
        ["start", "sanskaras", "manas", "buddhi", "confidence", "synthesis", "done"]
    );
    match &events[4] {
        SoulEvent::Confidence { weighted, escalation_enabled, .. } => {
            assert!((weighted - 0.815).abs() < 1e-9);
            assert!(!escalation_enabled);
        }
        other => panic!("expected confidence, got {other:?}"),
    }
    match &events[6] {
        SoulEvent::Done { token_usage, .. } => assert_eq!(token_usage.total_tokens, 60),
        other => panic!("expected done, got {other:?}"),
    }
}

#[tokio::test]
async fn test_start_echoes_message() {
    let fx = fixture(confident(), SoulConfig::default());
    let events = collect(fx.soul.stream("hello there")).await;

    let payload = events[0].payload();
    assert_eq!(payload["message"], "hello there");
    assert!(payload["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_cancels_siblings() {
    let svc = ScriptedCompletion::new()
        .on_delayed("You are Manas", MANAS, ms(100))
        .fail_on_delayed("You are Buddhi", "provider returned 529", ms(10))
        .on_delayed("You are Sanskaras", SANSKARAS, ms(100))
        .on("You are the Atman", SYNTHESIS);
    let fx = fixture(svc, fail_fast(SoulConfig::default()));

    let events = collect(fx.soul.stream("hello")).await;

    assert_eq!(names(&events), ["start", "error"]);
    match &events[1] {
        SoulEvent::Error { module, error } => {
            assert_eq!(*module, Some(Faculty::Buddhi));
            assert!(error.contains("529"));
        }
        other => panic!("expected error, got {other:?}"),
    }

    tokio::time::sleep(ms(500)).await;
    assert_eq!(fx.svc.started(), 3);
    assert_eq!(fx.svc.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_isolated_fault_keeps_streaming() {
    let svc = ScriptedCompletion::new()
        .on_delayed("You are Manas", MANAS, ms(20))
        .fail_on_delayed("You are Buddhi", "provider returned 529", ms(10))
        .on_delayed("You are Sanskaras", SANSKARAS, ms(30))
        .on("You are the Atman", SYNTHESIS);
    let fx = fixture(svc, SoulConfig::default());

    let events = collect(fx.soul.stream("hello")).await;

    assert_eq!(
        names(&events),
        ["start", "buddhi", "manas", "sanskaras", "confidence", "synthesis", "done"]
    );
    assert_eq!(events[1].payload()["confidence"], 0.1);
}

#[tokio::test]
async fn test_combined_events_in_fixed_order() {
    let combined = format!(r#"{{"manas": {MANAS}, "buddhi": {BUDDHI}, "sanskaras": {SANSKARAS}}}"#);
    let svc = ScriptedCompletion::new()
        .on("You are the three inner faculties", combined)
        .on("You are the Atman", SYNTHESIS);
    let mut config = SoulConfig::default();
    config.pipeline.combined_mode = true;
    let fx = fixture(svc, config);

    let events = collect(fx.soul.stream("tell me something new")).await;

    assert_eq!(
        names(&events),
        ["start", "manas", "buddhi", "sanskaras", "confidence", "synthesis", "done"]
    );
    assert_eq!(fx.svc.calls(), 2);
}

#[tokio::test]
async fn test_combined_fault_fail_fast() {
    let svc = ScriptedCompletion::new().fail_on("You are the three inner faculties", "overloaded");
    let mut config = fail_fast(SoulConfig::default());
    config.pipeline.combined_mode = true;
    let fx = fixture(svc, config);

    let events = collect(fx.soul.stream("hello")).await;
    assert_eq!(names(&events), ["start", "error"]);
    assert!(events[1].payload().get("module").is_none());
}

#[tokio::test]
async fn test_escalation_event_then_done() {
    let fx = fixture(unsure(), escalating(SoulConfig::default()));

    let events = collect(fx.soul.stream("answer my riddle")).await;

    assert_eq!(
        &names(&events)[4..],
        ["confidence", "needs_trainer", "done"]
    );
    let payload = events[5].payload();
    let pending = fx.registry.pending().unwrap();
    assert_eq!(payload["record_id"], pending[0].id);
    assert_eq!(payload["trigger_summary"], "How do I answer riddles?");
    assert_eq!(payload["question_context"], "answer my riddle");
}

#[tokio::test]
async fn test_unregistered_question_streams_null_record() {
    let (_, _, streaming) = read_only(unsure(), escalating(SoulConfig::default()));

    let events = collect(streaming.stream("answer my riddle")).await;
    assert_eq!(names(&events).last(), Some(&"done"));
    assert!(events[5].payload()["record_id"].is_null());
}

#[tokio::test]
async fn test_synthesis_fault_fail_fast_has_no_done() {
    let svc = ScriptedCompletion::new()
        .on("You are Manas", MANAS)
        .on("You are Buddhi", BUDDHI)
        .on("You are Sanskaras", SANSKARAS)
        .fail_on("You are the Atman", "overloaded");
    let fx = fixture(svc, fail_fast(SoulConfig::default()));

    let events = collect(fx.soul.stream("hello")).await;
    assert_eq!(names(&events).last(), Some(&"error"));
    assert!(!events.iter().any(|e| matches!(e, SoulEvent::Done { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_stream_cancels_faculties() {
    let svc = ScriptedCompletion::new()
        .on_delayed("You are Manas", MANAS, ms(100))
        .on_delayed("You are Buddhi", BUDDHI, ms(100))
        .on_delayed("You are Sanskaras", SANSKARAS, ms(100))
        .on("You are the Atman", SYNTHESIS);
    let fx = fixture(svc, SoulConfig::default());

    let mut stream = fx.soul.stream("hello");
    let first = stream.next().await.unwrap();
    assert_eq!(first.name(), "start");
    drop(stream);

    tokio::time::sleep(ms(500)).await;
    assert_eq!(fx.svc.calls(), 0);
}

#[tokio::test]
async fn test_sse_frames() {
    let fx = fixture(confident(), SoulConfig::default());
    let events = collect(fx.soul.stream("hello")).await;

    for event in &events {
        let frame = event.to_sse();
        assert!(frame.starts_with(&format!("event: {}\ndata: {{", event.name())));
        assert!(frame.ends_with("}\n\n"));
    }
}
