//! Integration tests for reclaiming abandoned claims

use crate::integration::support::{Harness, PLAN};
use chrono::{Duration, Utc};
use draftline::demand::{reclaim_stale, DispatchRequest, HistoryOutcome};
use draftline::store::{HistoryLog, QueueStore};
use draftline::types::{EntityType, QueueStatus};
use serde_json::json;

#[tokio::test]
async fn test_reclaimed_item_is_dispatched_again() {
    let h = Harness::new();
    h.seed("stuck", EntityType::Challenge, 1.0, json!({"score": 90}));
    let crashed_at = Utc::now() - Duration::hours(1);
    h.store
        .transition("stuck", &mut |row| row.claim("batch-crashed", crashed_at))
        .unwrap();

    // A fresh batch cannot see the claimed item.
    let response = h.dispatcher().dispatch(&DispatchRequest::new(PLAN)).await;
    assert_eq!(response.processed, 0);

    let reclaimed = reclaim_stale(h.store.as_ref(), Duration::minutes(30), Utc::now()).unwrap();
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(h.item("stuck").status, QueueStatus::Pending);
    assert_eq!(h.item("stuck").attempts, 1);

    let response = h
        .dispatcher()
        .dispatch(&DispatchRequest::new(PLAN).with_auto_approve(true, 70))
        .await;
    assert_eq!(response.succeeded, 1);
    let item = h.item("stuck");
    assert_eq!(item.status, QueueStatus::Accepted);
    assert_eq!(item.attempts, 2);

    let history = h.store.history_for_item("stuck").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].outcome, HistoryOutcome::Error);
    assert_eq!(history[0].batch_id, "batch-crashed");
    assert_eq!(history[1].outcome, HistoryOutcome::Accepted);
    assert_eq!(history[1].attempt_number, 2);
}

#[test]
fn test_crashed_batch_cannot_complete_after_reclaim() {
    let h = Harness::new();
    h.seed("late", EntityType::Pilot, 1.0, json!({}));
    let crashed_at = Utc::now() - Duration::hours(2);
    h.store
        .transition("late", &mut |row| row.claim("batch-old", crashed_at))
        .unwrap();
    reclaim_stale(h.store.as_ref(), Duration::minutes(30), Utc::now()).unwrap();

    let late_revert = h
        .store
        .transition("late", &mut |row| {
            row.revert("batch-old", 1, "late failure", "generation_failed", Utc::now())
        })
        .unwrap();
    assert!(matches!(late_revert, draftline::store::Transition::Refused(_)));
    assert_eq!(h.item("late").status, QueueStatus::Pending);
}
