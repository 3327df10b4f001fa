//! Sled-backed persistence for the pipeline store.

use crate::demand::{GenerationHistoryRecord, QueueItem};
use crate::error::StorageError;
use crate::generator::GeneratedEntity;
use crate::store::{DraftStore, HistoryLog, PlanStore, QueueFilter, QueueStore, Transition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sled::{Db, IVec, Tree};
use std::io;
use std::path::Path;
use tracing::trace;

const TREE_QUEUE: &str = "demand_queue";
const TREE_HISTORY: &str = "generation_history";
const TREE_DRAFTS: &str = "draft_entities";
const TREE_PLANS: &str = "strategic_plans";
const ATTEMPT_KEY_PAD: usize = 10;

/// One sled database holding every pipeline tree.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    queue: Tree,
    history: Tree,
    drafts: Tree,
    plans: Tree,
}

impl SledStore {
    /// Open (or create) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database at {}: {}", path.display(), e),
            ))
        })?;
        Self::new(db)
    }

    /// In-memory store removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(to_storage_io)?;
        Self::new(db)
    }

    pub fn new(db: Db) -> Result<Self, StorageError> {
        let queue = db.open_tree(TREE_QUEUE).map_err(to_storage_io)?;
        let history = db.open_tree(TREE_HISTORY).map_err(to_storage_io)?;
        let drafts = db.open_tree(TREE_DRAFTS).map_err(to_storage_io)?;
        let plans = db.open_tree(TREE_PLANS).map_err(to_storage_io)?;
        Ok(Self {
            db,
            queue,
            history,
            drafts,
            plans,
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    pub fn encode_history_key(queue_item_id: &str, attempt_number: u32, record_id: &str) -> String {
        format!(
            "{}:{:0width$}:{}",
            queue_item_id,
            attempt_number,
            record_id,
            width = ATTEMPT_KEY_PAD
        )
    }
}

impl QueueStore for SledStore {
    fn insert(&self, item: &QueueItem) -> Result<(), StorageError> {
        let value = encode(item)?;
        let outcome = self
            .queue
            .compare_and_swap(item.id.as_bytes(), None as Option<&[u8]>, Some(value))
            .map_err(to_storage_io)?;
        if outcome.is_err() {
            return Err(StorageError::DuplicateItem(item.id.clone()));
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<QueueItem>, StorageError> {
        let Some(raw) = self.queue.get(id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        Ok(Some(decode(id, &raw)?))
    }

    fn list(&self, filter: &QueueFilter) -> Result<Vec<QueueItem>, StorageError> {
        let mut out = Vec::new();
        for result in self.queue.iter() {
            let (key, value) = result.map_err(to_storage_io)?;
            let item: QueueItem = decode(&String::from_utf8_lossy(&key), &value)?;
            if filter.matches(&item) {
                out.push(item);
            }
        }
        Ok(out)
    }

    fn transition(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&QueueItem) -> Option<QueueItem>,
    ) -> Result<Transition, StorageError> {
        let key = id.as_bytes();
        let mut current: Option<IVec> = self.queue.get(key).map_err(to_storage_io)?;
        loop {
            let Some(raw) = current else {
                return Ok(Transition::Missing);
            };
            let item: QueueItem = decode(id, &raw)?;
            let Some(next) = apply(&item) else {
                return Ok(Transition::Refused(item));
            };
            let encoded = encode(&next)?;
            match self
                .queue
                .compare_and_swap(key, Some(&raw), Some(encoded))
                .map_err(to_storage_io)?
            {
                Ok(()) => return Ok(Transition::Applied(next)),
                Err(conflict) => {
                    trace!(queue_item_id = %id, "Conditional update raced, re-reading row");
                    current = conflict.current;
                }
            }
        }
    }
}

impl HistoryLog for SledStore {
    fn append(&self, record: &GenerationHistoryRecord) -> Result<(), StorageError> {
        let key = Self::encode_history_key(&record.queue_item_id, record.attempt_number, &record.id);
        let value = encode(record)?;
        self.history
            .insert(key.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn history_for_item(&self, queue_item_id: &str) -> Result<Vec<GenerationHistoryRecord>, StorageError> {
        let prefix = format!("{queue_item_id}:");
        let mut out: Vec<GenerationHistoryRecord> = Vec::new();
        for result in self.history.scan_prefix(prefix.as_bytes()) {
            let (key, value) = result.map_err(to_storage_io)?;
            let record: GenerationHistoryRecord = decode(&String::from_utf8_lossy(&key), &value)?;
            // Ids may contain ':', so "a:" also prefixes the keys of item "a:b".
            if record.queue_item_id == queue_item_id {
                out.push(record);
            }
        }
        out.sort_by(|a, b| {
            a.attempt_number
                .cmp(&b.attempt_number)
                .then(a.recorded_at.cmp(&b.recorded_at))
        });
        Ok(out)
    }

    fn history_for_plan(&self, strategic_plan_id: &str) -> Result<Vec<GenerationHistoryRecord>, StorageError> {
        let mut out: Vec<GenerationHistoryRecord> = Vec::new();
        for result in self.history.iter() {
            let (key, value) = result.map_err(to_storage_io)?;
            let record: GenerationHistoryRecord = decode(&String::from_utf8_lossy(&key), &value)?;
            if record.strategic_plan_id == strategic_plan_id {
                out.push(record);
            }
        }
        out.sort_by_key(|r| r.recorded_at);
        Ok(out)
    }
}

impl DraftStore for SledStore {
    fn put_draft(&self, entity: &GeneratedEntity) -> Result<(), StorageError> {
        let value = encode(entity)?;
        self.drafts
            .insert(entity.id.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn get_draft(&self, id: &str) -> Result<Option<GeneratedEntity>, StorageError> {
        let Some(raw) = self.drafts.get(id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        Ok(Some(decode(id, &raw)?))
    }
}

impl PlanStore for SledStore {
    fn put_plan(&self, plan_id: &str, context: &Value) -> Result<(), StorageError> {
        let value = encode(context)?;
        self.plans
            .insert(plan_id.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    fn get_plan(&self, plan_id: &str) -> Result<Option<Value>, StorageError> {
        let Some(raw) = self.plans.get(plan_id.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        Ok(Some(decode(plan_id, &raw)?))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(to_storage_data)
}

fn decode<T: DeserializeOwned>(key: &str, raw: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(raw).map_err(|e| StorageError::CorruptRecord {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
