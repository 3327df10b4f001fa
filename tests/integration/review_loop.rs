//! Integration tests for review decisions feeding the next attempt

use crate::integration::support::{Harness, PLAN};
use draftline::demand::{DispatchRequest, ReviewService};
use draftline::error::ApiError;
use draftline::quality::RubricQualityGate;
use draftline::store::{HistoryLog, PipelineStore, QueueStore};
use draftline::types::{AssessmentMode, EntityType, QueueStatus};
use serde_json::json;
use std::sync::Arc;

fn review(h: &Harness) -> ReviewService {
    ReviewService::new(h.store.clone() as Arc<dyn PipelineStore>)
}

#[tokio::test]
async fn test_rejection_shows_up_in_patterns() {
    let h = Harness::new();
    h.seed(
        "policy-1",
        EntityType::Policy,
        1.0,
        json!({"title": "Curb-side parking reform", "score": 55}),
    );
    h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;
    assert_eq!(h.item("policy-1").status, QueueStatus::Review);

    let service = review(&h);
    let rejected = service
        .reject_item_with_feedback("policy-1", "missing_legal_basis", "add regulatory citation")
        .unwrap();
    assert_eq!(rejected.status, QueueStatus::Rejected);
    assert_eq!(rejected.quality_score, Some(55.0));

    let patterns = service.rejection_patterns(Some(PLAN)).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].reason, "missing_legal_basis");
    assert_eq!(patterns[0].count, 1);
    assert!(patterns[0]
        .examples
        .contains(&"Curb-side parking reform".to_string()));
}

#[tokio::test]
async fn test_regeneration_cycle_produces_new_draft_with_feedback() {
    let h = Harness::new();
    h.seed("event-1", EntityType::Event, 1.0, json!({"title": "Open data day", "score": 40}));
    let dispatcher = h.dispatcher();
    let service = review(&h);

    let first = dispatcher.dispatch(&DispatchRequest::new(PLAN)).await;
    let first_draft = first.results[0].generated_id.clone().unwrap();

    service
        .reject_item_with_feedback("event-1", "too_vague", "name the venue")
        .unwrap();
    let requeued = service
        .request_regeneration("event-1", "add venue and agenda")
        .unwrap();
    assert_eq!(requeued.status, QueueStatus::Pending);
    assert!(requeued.generated_entity_id.is_none());
    assert!(requeued.quality_score.is_none());
    assert_eq!(requeued.attempts, 1);

    let second = dispatcher.dispatch(&DispatchRequest::new(PLAN)).await;
    let second_draft = second.results[0].generated_id.clone().unwrap();
    assert_ne!(first_draft, second_draft);

    let item = h.item("event-1");
    assert_eq!(item.status, QueueStatus::Review);
    assert_eq!(item.attempts, 2);
    assert_eq!(item.generated_entity_id.as_deref(), Some(second_draft.as_str()));

    let hints = h.generator.hints.lock().unwrap().clone();
    assert_eq!(hints, vec![None, Some("add venue and agenda".to_string())]);

    let history = h.store.history_for_item("event-1").unwrap();
    let attempts: Vec<u32> = history.iter().map(|r| r.attempt_number).collect();
    assert_eq!(attempts, vec![1, 2]);
}

#[tokio::test]
async fn test_manual_approval_ignores_score() {
    let h = Harness::new();
    h.seed("low", EntityType::Partnership, 1.0, json!({"score": 12}));
    h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;

    let approved = review(&h).approve_item("low").unwrap();
    assert_eq!(approved.status, QueueStatus::Accepted);
    assert!(approved.quality_feedback.manually_approved);
    assert_eq!(approved.quality_score, Some(12.0));
}

#[test]
fn test_decisions_refused_while_in_progress() {
    let h = Harness::new();
    h.seed("busy", EntityType::RdCall, 1.0, json!({}));
    h.store
        .transition("busy", &mut |row| row.claim("batch-x", chrono::Utc::now()))
        .unwrap();

    let service = review(&h);
    let err = service.approve_item("busy").unwrap_err();
    assert!(matches!(
        err,
        ApiError::TransitionRefused {
            actual: QueueStatus::InProgress,
            ..
        }
    ));
    assert!(service.reject_item_with_feedback("busy", "x", "").is_err());
    assert!(service.request_regeneration("busy", "").is_err());
    assert_eq!(h.item("busy").status, QueueStatus::InProgress);
}

#[test]
fn test_unknown_item_is_not_found() {
    let h = Harness::new();
    let err = review(&h).approve_item("ghost").unwrap_err();
    assert!(matches!(err, ApiError::ItemNotFound(_)));
}

#[tokio::test]
async fn test_full_assessment_is_read_only() {
    let h = Harness::new();
    h.seed(
        "sol",
        EntityType::Solution,
        1.0,
        json!({"title": "Air quality kiosks", "score": 66}),
    );
    h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;

    let service = review(&h);
    let assessment = service
        .full_assessment(&RubricQualityGate::new(), "sol")
        .await
        .unwrap();
    assert_eq!(assessment.mode, AssessmentMode::Full);
    assert!(assessment.overall_score >= 0.0 && assessment.overall_score <= 100.0);

    let item = h.item("sol");
    assert_eq!(item.quality_score, Some(66.0));
    assert_eq!(
        item.quality_feedback.assessment.as_ref().unwrap().mode,
        AssessmentMode::Quick
    );
}

#[test]
fn test_review_list_orders_lowest_score_first() {
    let h = Harness::new();
    let rt = tokio::runtime::Runtime::new().unwrap();
    h.seed("r1", EntityType::Campaign, 3.0, json!({"score": 65}));
    h.seed("r2", EntityType::Campaign, 2.0, json!({"score": 20}));
    h.seed("r3", EntityType::Campaign, 1.0, json!({"score": 45}));
    rt.block_on(h.dispatcher().dispatch(&DispatchRequest::new(PLAN)));

    let service = review(&h);
    let ids: Vec<String> = service
        .review_items(PLAN)
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(ids, vec!["r2", "r3", "r1"]);

    let stats = service.queue_stats(Some(PLAN)).unwrap();
    assert_eq!(stats.review, 3);
    assert_eq!(stats.total(), 3);
}
