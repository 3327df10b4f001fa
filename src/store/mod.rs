//! Pipeline Store
//!
//! Durable storage for queue items, the generation history log, generated
//! drafts and strategic-plan context. Each concern is a small trait so the
//! dispatcher and review loop depend only on what they touch; [`SledStore`]
//! implements all of them over one sled database.

pub mod persistence;

pub use persistence::SledStore;

use crate::demand::{GenerationHistoryRecord, QueueItem};
use crate::error::StorageError;
use crate::generator::GeneratedEntity;
use crate::types::{EntityType, QueueStatus};
use serde_json::Value;

/// Row filter for [`QueueStore::list`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub strategic_plan_id: Option<String>,
    pub entity_type: Option<EntityType>,
    pub statuses: Vec<QueueStatus>,
}

impl QueueFilter {
    pub fn for_plan(plan_id: &str) -> Self {
        Self {
            strategic_plan_id: Some(plan_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: QueueStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_entity_type(mut self, entity_type: Option<EntityType>) -> Self {
        self.entity_type = entity_type;
        self
    }

    pub fn matches(&self, item: &QueueItem) -> bool {
        self.strategic_plan_id
            .as_deref()
            .map_or(true, |plan| item.strategic_plan_id == plan)
            && self.entity_type.map_or(true, |t| item.entity_type == t)
            && (self.statuses.is_empty() || self.statuses.contains(&item.status))
    }
}

/// Result of a conditional update.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The replacement row was written.
    Applied(QueueItem),
    /// The row was not in an acceptable state; carries the row as observed.
    Refused(QueueItem),
    Missing,
}

/// Queue table. `transition` is the only way rows change after insert.
pub trait QueueStore: Send + Sync {
    fn insert(&self, item: &QueueItem) -> Result<(), StorageError>;
    fn get(&self, id: &str) -> Result<Option<QueueItem>, StorageError>;
    fn list(&self, filter: &QueueFilter) -> Result<Vec<QueueItem>, StorageError>;

    /// Atomically replace the row with `apply(current)`.
    ///
    /// `apply` returns `None` to refuse. If another writer changes the row
    /// between read and write, the row is re-read and `apply` runs again, so
    /// it may be called more than once.
    fn transition(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&QueueItem) -> Option<QueueItem>,
    ) -> Result<Transition, StorageError>;
}

/// Append-only attempt log.
pub trait HistoryLog: Send + Sync {
    fn append(&self, record: &GenerationHistoryRecord) -> Result<(), StorageError>;
    /// Records for one item ordered by attempt number.
    fn history_for_item(&self, queue_item_id: &str) -> Result<Vec<GenerationHistoryRecord>, StorageError>;
    fn history_for_plan(&self, strategic_plan_id: &str) -> Result<Vec<GenerationHistoryRecord>, StorageError>;
}

pub trait DraftStore: Send + Sync {
    fn put_draft(&self, entity: &GeneratedEntity) -> Result<(), StorageError>;
    fn get_draft(&self, id: &str) -> Result<Option<GeneratedEntity>, StorageError>;
}

/// Strategic-plan context handed to generators.
pub trait PlanStore: Send + Sync {
    fn put_plan(&self, plan_id: &str, context: &Value) -> Result<(), StorageError>;
    fn get_plan(&self, plan_id: &str) -> Result<Option<Value>, StorageError>;
}

/// Everything the pipeline needs from storage.
pub trait PipelineStore: QueueStore + HistoryLog + DraftStore + PlanStore {}

impl<T: QueueStore + HistoryLog + DraftStore + PlanStore> PipelineStore for T {}
