//! Integration tests for batch dispatch outcomes

use crate::integration::support::{Harness, PLAN};
use draftline::demand::{DispatchRequest, HistoryOutcome, ItemOutcome};
use draftline::store::{DraftStore, HistoryLog, PlanStore};
use draftline::types::{EntityType, QueueStatus};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_mixed_scores_split_between_accepted_and_review() {
    let h = Harness::new();
    h.seed("c1", EntityType::Challenge, 3.0, json!({"title": "Flood sensors", "score": 85}));
    h.seed("c2", EntityType::Challenge, 2.0, json!({"title": "Night buses", "score": 60}));
    h.seed("c3", EntityType::Challenge, 1.0, json!({"title": "Green roofs", "score": 95}));

    let request = DispatchRequest::new(PLAN)
        .with_batch_size(5)
        .with_auto_approve(true, 70);
    let response = h.dispatcher().dispatch(&request).await;

    assert!(response.success);
    assert_eq!(response.processed, 3);
    assert_eq!(response.succeeded, 3);
    assert_eq!(response.failed, 0);
    let outcomes: Vec<ItemOutcome> = response.results.iter().map(|r| r.status).collect();
    assert_eq!(
        outcomes,
        vec![ItemOutcome::Accepted, ItemOutcome::Review, ItemOutcome::Accepted]
    );
    assert_eq!(h.item("c1").status, QueueStatus::Accepted);
    assert_eq!(h.item("c2").status, QueueStatus::Review);
    assert_eq!(h.item("c3").status, QueueStatus::Accepted);
    assert_eq!(h.item("c2").quality_score, Some(60.0));
}

#[tokio::test]
async fn test_failed_generation_reverts_item_and_batch_continues() {
    let h = Harness::new();
    h.seed("ok-1", EntityType::Pilot, 3.0, json!({"score": 80}));
    h.seed("broken", EntityType::Pilot, 2.0, json!({"script": "fail"}));
    h.seed("ok-2", EntityType::Pilot, 1.0, json!({"score": 40}));

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_auto_approve(true, 70))
        .await;

    assert!(response.success);
    assert_eq!(response.processed, 3);
    assert_eq!(response.succeeded, 2);
    assert_eq!(response.failed, 1);

    let failed = &response.results[1];
    assert_eq!(failed.queue_item_id, "broken");
    assert_eq!(failed.status, ItemOutcome::Error);
    assert!(failed.error.as_deref().unwrap().contains("empty draft"));

    let broken = h.item("broken");
    assert_eq!(broken.status, QueueStatus::Pending);
    assert_eq!(broken.attempts, 1);
    assert_eq!(broken.batch_id.as_deref(), Some(response.batch_id.as_str()));
    assert_eq!(
        broken.quality_feedback.error_tag.as_deref(),
        Some("generation_failed")
    );
    assert_eq!(h.item("ok-1").status, QueueStatus::Accepted);
    assert_eq!(h.item("ok-2").status, QueueStatus::Review);
}

#[tokio::test]
async fn test_generator_timeout_is_an_item_failure() {
    let h = Harness::new();
    h.seed("slow", EntityType::Event, 1.0, json!({"script": "slow"}));

    let dispatcher = h.dispatcher().with_call_timeout(Duration::from_millis(100));
    let response = dispatcher.dispatch(&DispatchRequest::new(PLAN)).await;

    assert!(response.success);
    assert_eq!(response.failed, 1);
    assert_eq!(response.results[0].status, ItemOutcome::Error);
    let slow = h.item("slow");
    assert_eq!(slow.status, QueueStatus::Pending);
    assert_eq!(slow.attempts, 1);
    assert_eq!(slow.quality_feedback.error_tag.as_deref(), Some("timeout"));
    assert_eq!(h.gate.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_queue_invokes_no_generator() {
    let h = Harness::new();
    let response = h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;

    assert!(response.success);
    assert_eq!(response.processed, 0);
    assert!(response.results.is_empty());
    assert!(!response.batch_id.is_empty());
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn test_threshold_is_inclusive_and_requires_auto_approve() {
    let h = Harness::new();
    h.seed("edge", EntityType::Policy, 2.0, json!({"score": 70}));
    h.seed("high", EntityType::Policy, 1.0, json!({"score": 99}));

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_auto_approve(true, 70).with_batch_size(1))
        .await;
    assert_eq!(response.results[0].status, ItemOutcome::Accepted);
    assert_eq!(h.item("edge").status, QueueStatus::Accepted);

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_auto_approve(false, 70))
        .await;
    assert_eq!(response.results[0].status, ItemOutcome::Review);
    assert_eq!(h.item("high").status, QueueStatus::Review);
}

#[tokio::test]
async fn test_every_attempt_leaves_one_history_record() {
    let h = Harness::new();
    h.seed("a", EntityType::Campaign, 3.0, json!({"score": 90}));
    h.seed("b", EntityType::Campaign, 2.0, json!({"score": 10}));
    h.seed("c", EntityType::Campaign, 1.0, json!({"script": "fail"}));

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_auto_approve(true, 70))
        .await;

    let expected = [
        ("a", HistoryOutcome::Accepted),
        ("b", HistoryOutcome::ManualEdit),
        ("c", HistoryOutcome::Error),
    ];
    for (id, outcome) in expected {
        let records = h.store.history_for_item(id).unwrap();
        assert_eq!(records.len(), 1, "item {} should have one record", id);
        assert_eq!(records[0].outcome, outcome);
        assert_eq!(records[0].attempt_number, 1);
        assert_eq!(records[0].batch_id, response.batch_id);
    }
    assert_eq!(h.store.history_for_plan(PLAN).unwrap().len(), 3);

    // No silent loss: every selected item is settled or back in the pool.
    for id in ["a", "b", "c"] {
        let item = h.item(id);
        assert_ne!(item.status, QueueStatus::InProgress);
        assert!(item.outcome_is_accounted());
    }
}

#[tokio::test]
async fn test_drafts_are_persisted_and_linked() {
    let h = Harness::new();
    h.seed("d1", EntityType::Solution, 1.0, json!({"title": "Heat map", "score": 75}));

    let response = h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;
    let generated_id = response.results[0].generated_id.clone().unwrap();

    let item = h.item("d1");
    assert_eq!(item.generated_entity_id.as_deref(), Some(generated_id.as_str()));
    assert_eq!(item.generated_entity_type, Some(EntityType::Solution));
    let draft = h.store.get_draft(&generated_id).unwrap().unwrap();
    assert_eq!(draft.title(), Some("Heat map"));
}

#[tokio::test]
async fn test_stored_plan_context_reaches_generator() {
    let h = Harness::new();
    h.store
        .put_plan(PLAN, &json!({"id": "stored-plan", "goals": ["clean air"]}))
        .unwrap();
    h.seed("p1", EntityType::LivingLab, 1.0, json!({}));

    let response = h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;
    let draft = h
        .store
        .get_draft(response.results[0].generated_id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(draft.fields["plan"], json!("stored-plan"));
}

#[tokio::test]
async fn test_entity_type_filter_limits_selection() {
    let h = Harness::new();
    h.seed("pilot", EntityType::Pilot, 1.0, json!({}));
    h.seed("event", EntityType::Event, 9.0, json!({}));

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_entity_type("pilot"))
        .await;
    assert_eq!(response.processed, 1);
    assert_eq!(response.results[0].queue_item_id, "pilot");
    assert_eq!(h.item("event").status, QueueStatus::Pending);

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_entity_type("all"))
        .await;
    assert_eq!(response.processed, 1);
    assert_eq!(response.results[0].queue_item_id, "event");
}

#[tokio::test]
async fn test_other_plans_are_untouched() {
    let h = Harness::new();
    h.seed("mine", EntityType::Event, 1.0, json!({}));
    let other = draftline::demand::QueueItem::new(
        "theirs".to_string(),
        draftline::demand::NewQueueItem {
            strategic_plan_id: "other-plan".to_string(),
            entity_type: EntityType::Event,
            prefilled_spec: json!({}),
            priority_score: 100.0,
        },
        chrono::Utc::now(),
    );
    draftline::store::QueueStore::insert(h.store.as_ref(), &other).unwrap();

    let response = h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;
    assert_eq!(response.processed, 1);
    assert_eq!(h.item("theirs").status, QueueStatus::Pending);
}

#[tokio::test]
async fn test_gate_failure_reverts_item_and_keeps_draft() {
    let h = Harness::new();
    h.seed("graded", EntityType::Policy, 2.0, json!({"score": 90}));
    h.seed("ungradable", EntityType::Policy, 1.0, json!({"script": "gate_fail"}));

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_auto_approve(true, 70))
        .await;

    assert!(response.success);
    assert_eq!(response.succeeded, 1);
    assert_eq!(response.failed, 1);
    let failed = &response.results[1];
    assert_eq!(failed.queue_item_id, "ungradable");
    assert_eq!(failed.status, ItemOutcome::Error);

    let item = h.item("ungradable");
    assert_eq!(item.status, QueueStatus::Pending);
    assert_eq!(item.attempts, 1);
    assert_eq!(
        item.quality_feedback.error_tag.as_deref(),
        Some("quality_gate_failed")
    );
    assert!(item.generated_entity_id.is_none());
    assert!(item.quality_score.is_none());

    let draft = h.store.get_draft("ungradable-draft-2").unwrap().unwrap();
    assert_eq!(draft.entity_type, EntityType::Policy);

    let history = h.store.history_for_item("ungradable").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, HistoryOutcome::Error);
    assert_eq!(history[0].attempt_number, 1);
    assert!(history[0].quality_assessment.is_none());
    let output = history[0].output_entity.as_ref().unwrap();
    assert_eq!(output["id"], json!("ungradable-draft-2"));
    assert!(history[0]
        .error
        .as_deref()
        .unwrap()
        .contains("no overall_score"));
}
