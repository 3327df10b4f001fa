//! Property-based tests for rejection-pattern mining

use chrono::Utc;
use draftline::demand::{rejection_patterns, NewQueueItem, QueueItem};
use draftline::types::{EntityType, QueueStatus};
use proptest::prelude::*;
use serde_json::json;

const REASONS: [&str; 4] = ["missing_legal_basis", "too_vague", "off_strategy", ""];

fn item(index: usize, reason_index: usize, rejected: bool) -> QueueItem {
    let mut item = QueueItem::new(
        format!("item-{}", index),
        NewQueueItem {
            strategic_plan_id: "plan".to_string(),
            entity_type: EntityType::ALL[index % EntityType::ALL.len()],
            prefilled_spec: json!({"title": format!("Draft {}", index)}),
            priority_score: 0.0,
        },
        Utc::now(),
    );
    if rejected {
        item.status = QueueStatus::Rejected;
        item.quality_feedback.rejection_reason = Some(REASONS[reason_index].to_string());
    }
    item
}

proptest! {
    /// Every rejected item lands in exactly one bucket, largest bucket first
    #[test]
    fn test_patterns_partition_rejected_items(
        spec in proptest::collection::vec((0usize..4, any::<bool>()), 0..40),
    ) {
        let items: Vec<QueueItem> = spec
            .iter()
            .enumerate()
            .map(|(i, (reason, rejected))| item(i, *reason, *rejected))
            .collect();
        let rejected = items.iter().filter(|i| i.status == QueueStatus::Rejected).count();

        let patterns = rejection_patterns(&items);
        let total: usize = patterns.iter().map(|p| p.count).sum();
        prop_assert_eq!(total, rejected);
        for pair in patterns.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
        for pattern in &patterns {
            prop_assert!(!pattern.reason.is_empty());
            prop_assert!(pattern.examples.len() <= pattern.count);
        }
    }
}
