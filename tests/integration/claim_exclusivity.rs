//! Integration tests for the optimistic claim under concurrent batches

use crate::integration::support::{Harness, PLAN};
use draftline::demand::DispatchRequest;
use draftline::store::{HistoryLog, QueueFilter, QueueStore, Transition};
use draftline::types::{EntityType, QueueStatus};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

const ITEMS: usize = 24;
const RUNS: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_never_double_process() {
    let h = Harness::new();
    for i in 0..ITEMS {
        h.seed(
            &format!("item-{:02}", i),
            EntityType::Challenge,
            (i % 5) as f64,
            json!({"score": 80}),
        );
    }

    let dispatcher = Arc::new(h.dispatcher());
    let mut handles = Vec::new();
    for _ in 0..RUNS {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(tokio::spawn(async move {
            dispatcher
                .dispatch(
                    &DispatchRequest::new(PLAN)
                        .with_batch_size(ITEMS)
                        .with_auto_approve(true, 70),
                )
                .await
        }));
    }

    let mut processed_ids = HashSet::new();
    let mut succeeded = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.success);
        assert_eq!(response.processed, response.succeeded + response.failed);
        succeeded += response.succeeded;
        for result in &response.results {
            assert!(
                processed_ids.insert(result.queue_item_id.clone()),
                "{} was processed by two batches",
                result.queue_item_id
            );
        }
    }

    assert_eq!(succeeded, ITEMS);
    assert_eq!(processed_ids.len(), ITEMS);
    assert_eq!(h.generator.calls(), ITEMS);

    for item in h.store.list(&QueueFilter::for_plan(PLAN)).unwrap() {
        assert_eq!(item.status, QueueStatus::Accepted);
        assert_eq!(item.attempts, 1);
        let records = h.store.history_for_item(&item.id).unwrap();
        assert_eq!(records.len(), 1, "{} should have exactly one attempt", item.id);
    }
}

#[test]
fn test_second_claim_is_refused() {
    let h = Harness::new();
    h.seed("solo", EntityType::Pilot, 1.0, json!({}));
    let now = chrono::Utc::now();

    let first = h
        .store
        .transition("solo", &mut |row| row.claim("batch-a", now))
        .unwrap();
    assert!(matches!(first, Transition::Applied(_)));

    let second = h
        .store
        .transition("solo", &mut |row| row.claim("batch-b", now))
        .unwrap();
    match second {
        Transition::Refused(current) => {
            assert_eq!(current.status, QueueStatus::InProgress);
            assert_eq!(current.batch_id.as_deref(), Some("batch-a"));
        }
        other => panic!("expected refusal, got {:?}", other),
    }
}
