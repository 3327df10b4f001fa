//! Rejection-pattern mining over the current set of rejected items.
//!
//! Pure and recomputed on demand; nothing here is stored.

use crate::demand::item::QueueItem;
use crate::types::{EntityType, QueueStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionPattern {
    pub reason: String,
    pub count: usize,
    pub examples: Vec<String>,
    pub entity_types: BTreeSet<EntityType>,
}

/// Group rejected items by reason, largest bucket first.
///
/// Items not in `rejected` status are ignored. Ties are ordered by reason so
/// the output is stable.
pub fn rejection_patterns(items: &[QueueItem]) -> Vec<RejectionPattern> {
    let mut buckets: BTreeMap<&str, RejectionPattern> = BTreeMap::new();
    for item in items.iter().filter(|i| i.status == QueueStatus::Rejected) {
        let reason = item.rejection_reason();
        let bucket = buckets.entry(reason).or_insert_with(|| RejectionPattern {
            reason: reason.to_string(),
            count: 0,
            examples: Vec::new(),
            entity_types: BTreeSet::new(),
        });
        bucket.count += 1;
        bucket.entity_types.insert(item.entity_type);
        if bucket.examples.len() < MAX_EXAMPLES {
            if let Some(title) = item.title() {
                bucket.examples.push(title.to_string());
            }
        }
    }

    let mut patterns: Vec<RejectionPattern> = buckets.into_values().collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    patterns
}
