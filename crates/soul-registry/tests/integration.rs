//! # Integration Tests
//!
//! On-disk registry behaviour: persistence across reopen, and the full
//! trainer loop from pending question to retrieved guidance.

use soul_registry::{
    Activation, HabitRetrieval, LearningStatus, LearningStore, NewHabit, SoulRegistry,
};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("soul.db");

    let pending_id = {
        let registry = SoulRegistry::open(&path).unwrap();
        registry.seed_if_empty(false).unwrap();
        let pending = registry
            .create_pending("why is the sky blue", "How should I respond to: why is the sky blue", "sky,blue")
            .unwrap();
        registry.flush().unwrap();
        pending.id
    };

    let registry = SoulRegistry::open(&path).unwrap();
    assert_eq!(registry.habit_count(), 7);
    assert_eq!(registry.seed_if_empty(false).unwrap(), 0);

    let pending = registry.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, pending_id);
}

#[tokio::test]
async fn test_trainer_loop() {
    let registry = SoulRegistry::temporary().unwrap();

    let question = LearningStore::create_pending(
        &registry,
        "my dog died yesterday",
        "How should I respond to: my dog died yesterday",
        "my,dog,died,yesterday",
    )
    .await
    .unwrap();
    assert_eq!(question.status, LearningStatus::Pending);

    assert!(registry
        .find_relevant_learnings("the dog died", None, 5)
        .await
        .unwrap()
        .is_empty());

    registry
        .activate(
            question.id,
            Activation {
                guidance: "Grief needs presence before perspective.".to_string(),
                application_note: "Name the loss.".to_string(),
                scope: "manas,sanskaras".parse().unwrap(),
                confidence_boost: 0.9,
            },
        )
        .unwrap();

    let for_manas = registry
        .find_relevant_learnings("the dog died", Some("manas"), 5)
        .await
        .unwrap();
    assert_eq!(for_manas.len(), 1);
    assert_eq!(for_manas[0].guidance, "Grief needs presence before perspective.");

    let for_buddhi = registry
        .find_relevant_learnings("the dog died", Some("buddhi"), 5)
        .await
        .unwrap();
    assert!(for_buddhi.is_empty());
}

#[tokio::test]
async fn test_learnings_ranked_by_boost() {
    let registry = SoulRegistry::temporary().unwrap();
    let weak = registry
        .create_active("c", "weak", "rain,storm", Activation { confidence_boost: 0.2, ..Activation::new("a") })
        .unwrap();
    let strong = registry
        .create_active("c", "strong", "rain", Activation { confidence_boost: 0.9, ..Activation::new("b") })
        .unwrap();

    // weak: 2 × 0.2 = 0.4, strong: 1 × 0.9 = 0.9
    let ranked = registry
        .find_relevant_learnings("rain and storm", None, 5)
        .await
        .unwrap();
    let ids: Vec<_> = ranked.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![strong.id, weak.id]);

    let top = registry.find_relevant_learnings("rain and storm", None, 1).await.unwrap();
    assert_eq!(top.len(), 1);
}

#[tokio::test]
async fn test_concurrent_increments_not_lost() {
    let registry = Arc::new(SoulRegistry::temporary().unwrap());
    let learning = registry
        .create_active("c", "q", "calm", Activation::new("breathe"))
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..3 {
        let registry = registry.clone();
        let id = learning.id;
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                registry.increment_applied(id).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.learning(learning.id).unwrap().times_applied, 60);
}

#[tokio::test]
async fn test_habit_retrieval_trait_object() {
    let registry = SoulRegistry::temporary().unwrap();
    registry
        .create_habit(NewHabit {
            name: "patience".to_string(),
            category: "learned".to_string(),
            keywords: "wait,patience,slow".to_string(),
            base_weight: 1.5,
            ..NewHabit::default()
        })
        .unwrap();

    let retrieval: Arc<dyn HabitRetrieval> = Arc::new(registry);
    let found = retrieval
        .find_relevant_habits("i cannot wait any longer", None, 5)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "patience");
    assert!(retrieval
        .find_relevant_habits("i cannot wait any longer", Some("essence"), 5)
        .await
        .unwrap()
        .is_empty());
}
