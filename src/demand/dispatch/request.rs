//! Batch trigger request and response shapes.

use crate::config::DispatchConfig;
use crate::error::ApiError;
use crate::types::{EntityType, QueueStatus};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_MIN_QUALITY_SCORE: u8 = 70;

/// Entity-type filter value meaning "no filter".
const ALL_TYPES: &str = "all";

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_min_quality_score() -> u8 {
    DEFAULT_MIN_QUALITY_SCORE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub strategic_plan_id: String,
    /// Entity type name, or `"all"` / absent for every type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: u8,
    /// Skip items that already used this many attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl DispatchRequest {
    pub fn new(strategic_plan_id: impl Into<String>) -> Self {
        Self {
            strategic_plan_id: strategic_plan_id.into(),
            entity_type: None,
            batch_size: DEFAULT_BATCH_SIZE,
            auto_approve: false,
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
            max_attempts: None,
        }
    }

    /// Request seeded from the configured dispatch defaults.
    pub fn from_config(strategic_plan_id: impl Into<String>, config: &DispatchConfig) -> Self {
        Self {
            strategic_plan_id: strategic_plan_id.into(),
            entity_type: None,
            batch_size: config.batch_size,
            auto_approve: config.auto_approve,
            min_quality_score: config.min_quality_score,
            max_attempts: config.max_attempts,
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_auto_approve(mut self, auto_approve: bool, min_quality_score: u8) -> Self {
        self.auto_approve = auto_approve;
        self.min_quality_score = min_quality_score;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Parsed entity-type filter; `None` means all types.
    pub fn entity_filter(&self) -> Result<Option<EntityType>, ApiError> {
        match self.entity_type.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) if raw.eq_ignore_ascii_case(ALL_TYPES) => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(ApiError::InvalidRequest),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.strategic_plan_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "strategicPlanId is required".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ApiError::InvalidRequest(
                "batchSize must be at least 1".to_string(),
            ));
        }
        if self.min_quality_score > 100 {
            return Err(ApiError::InvalidRequest(format!(
                "minQualityScore {} is above 100",
                self.min_quality_score
            )));
        }
        self.entity_filter()?;
        Ok(())
    }
}

/// Per-item status reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Accepted,
    Review,
    Error,
}

impl ItemOutcome {
    pub fn from_status(status: QueueStatus) -> Self {
        match status {
            QueueStatus::Accepted => ItemOutcome::Accepted,
            QueueStatus::Review => ItemOutcome::Review,
            _ => ItemOutcome::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub queue_item_id: String,
    pub entity_type: EntityType,
    pub status: ItemOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    pub fn failed(queue_item_id: &str, entity_type: EntityType, error: &ApiError) -> Self {
        Self {
            queue_item_id: queue_item_id.to_string(),
            entity_type,
            status: ItemOutcome::Error,
            quality_score: None,
            generated_id: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success: bool,
    pub batch_id: String,
    /// Items this run attempted (`succeeded + failed`).
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Selected items another run claimed first.
    #[serde(default)]
    pub skipped: usize,
    pub results: Vec<ItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResponse {
    pub fn empty(batch_id: String) -> Self {
        Self {
            success: true,
            batch_id,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            results: Vec::new(),
            error: None,
        }
    }

    pub fn aborted(batch_id: String, error: &ApiError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::empty(batch_id)
        }
    }

    pub fn push(&mut self, result: ItemResult) {
        self.processed += 1;
        match result.status {
            ItemOutcome::Error => self.failed += 1,
            ItemOutcome::Accepted | ItemOutcome::Review => self.succeeded += 1,
        }
        self.results.push(result);
    }
}
