//! Review / Feedback Loop
//!
//! Human decisions on drafted items plus the read-side queries that feed
//! them. Every mutation is one conditional update on one row, so it is safe
//! to run alongside a dispatch batch.

use crate::demand::history::GenerationHistoryRecord;
use crate::demand::item::{NewQueueItem, QueueItem};
use crate::demand::patterns::{rejection_patterns, RejectionPattern};
use crate::error::ApiError;
use crate::quality::{QualityAssessment, QualityGate};
use crate::store::{PipelineStore, QueueFilter, Transition};
use crate::types::{AssessmentMode, QueueStatus};
use chrono::Utc;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

/// Statuses a review decision may start from.
const REVIEWABLE: &str = "pending, accepted, review, rejected";

/// Item counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub in_progress: usize,
    pub accepted: usize,
    pub review: usize,
    pub rejected: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.accepted + self.review + self.rejected
    }

    pub fn count(&self, status: QueueStatus) -> usize {
        match status {
            QueueStatus::Pending => self.pending,
            QueueStatus::InProgress => self.in_progress,
            QueueStatus::Accepted => self.accepted,
            QueueStatus::Review => self.review,
            QueueStatus::Rejected => self.rejected,
        }
    }

    fn record(&mut self, status: QueueStatus) {
        let slot = match status {
            QueueStatus::Pending => &mut self.pending,
            QueueStatus::InProgress => &mut self.in_progress,
            QueueStatus::Accepted => &mut self.accepted,
            QueueStatus::Review => &mut self.review,
            QueueStatus::Rejected => &mut self.rejected,
        };
        *slot += 1;
    }
}

pub struct ReviewService {
    store: Arc<dyn PipelineStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }

    /// Create a pending item. This is the upstream producer surface.
    pub fn enqueue(&self, new: NewQueueItem) -> Result<QueueItem, ApiError> {
        if new.strategic_plan_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "strategic plan id is required".to_string(),
            ));
        }
        if !new.priority_score.is_finite() {
            return Err(ApiError::InvalidRequest(
                "priority score must be a finite number".to_string(),
            ));
        }
        let item = QueueItem::new(uuid::Uuid::new_v4().to_string(), new, Utc::now());
        self.store.insert(&item)?;
        info!(
            queue_item_id = %item.id,
            strategic_plan_id = %item.strategic_plan_id,
            entity_type = %item.entity_type,
            priority_score = item.priority_score,
            "Queue item enqueued"
        );
        Ok(item)
    }

    pub fn get_item(&self, item_id: &str) -> Result<QueueItem, ApiError> {
        self.store
            .get(item_id)?
            .ok_or_else(|| ApiError::ItemNotFound(item_id.to_string()))
    }

    pub fn approve_item(&self, item_id: &str) -> Result<QueueItem, ApiError> {
        let item = self.apply(item_id, |row| row.approve(Utc::now()))?;
        info!(queue_item_id = %item_id, quality_score = ?item.quality_score, "Queue item approved");
        Ok(item)
    }

    pub fn reject_item_with_feedback(
        &self,
        item_id: &str,
        reason: &str,
        improvement_notes: &str,
    ) -> Result<QueueItem, ApiError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApiError::InvalidRequest(
                "a rejection reason is required".to_string(),
            ));
        }
        let item = self.apply(item_id, |row| {
            row.reject(reason, improvement_notes, Utc::now())
        })?;
        info!(queue_item_id = %item_id, rejection_reason = %reason, "Queue item rejected");
        Ok(item)
    }

    pub fn request_regeneration(
        &self,
        item_id: &str,
        feedback_notes: &str,
    ) -> Result<QueueItem, ApiError> {
        let item = self.apply(item_id, |row| {
            row.request_regeneration(feedback_notes, Utc::now())
        })?;
        info!(queue_item_id = %item_id, attempts = item.attempts, "Queue item sent back for regeneration");
        Ok(item)
    }

    /// Items awaiting a decision, lowest score first.
    pub fn review_items(&self, strategic_plan_id: &str) -> Result<Vec<QueueItem>, ApiError> {
        let mut items = self.store.list(
            &QueueFilter::for_plan(strategic_plan_id).with_status(QueueStatus::Review),
        )?;
        items.sort_by(|a, b| {
            let a_score = a.quality_score.unwrap_or(f64::NEG_INFINITY);
            let b_score = b.quality_score.unwrap_or(f64::NEG_INFINITY);
            a_score
                .partial_cmp(&b_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.updated_at.cmp(&b.updated_at))
        });
        Ok(items)
    }

    /// Rejected items, most recently updated first. `None` covers every plan.
    pub fn rejected_items(&self, strategic_plan_id: Option<&str>) -> Result<Vec<QueueItem>, ApiError> {
        let filter = match strategic_plan_id {
            Some(plan) => QueueFilter::for_plan(plan),
            None => QueueFilter::default(),
        };
        let mut items = self.store.list(&filter.with_status(QueueStatus::Rejected))?;
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(items)
    }

    pub fn rejection_patterns(
        &self,
        strategic_plan_id: Option<&str>,
    ) -> Result<Vec<RejectionPattern>, ApiError> {
        Ok(rejection_patterns(&self.rejected_items(strategic_plan_id)?))
    }

    pub fn queue_stats(&self, strategic_plan_id: Option<&str>) -> Result<QueueStats, ApiError> {
        let filter = match strategic_plan_id {
            Some(plan) => QueueFilter::for_plan(plan),
            None => QueueFilter::default(),
        };
        let mut stats = QueueStats::default();
        for item in self.store.list(&filter)? {
            stats.record(item.status);
        }
        Ok(stats)
    }

    pub fn history(&self, item_id: &str) -> Result<Vec<GenerationHistoryRecord>, ApiError> {
        Ok(self.store.history_for_item(item_id)?)
    }

    /// Re-grade an item's current draft in full mode for a reviewer.
    /// Read-only: the stored quick assessment is left as is.
    pub async fn full_assessment(
        &self,
        gate: &dyn QualityGate,
        item_id: &str,
    ) -> Result<QualityAssessment, ApiError> {
        let item = self.get_item(item_id)?;
        let draft_id = item.generated_entity_id.as_deref().ok_or_else(|| {
            ApiError::InvalidRequest(format!("queue item {} has no generated draft", item_id))
        })?;
        let draft = self
            .store
            .get_draft(draft_id)?
            .ok_or_else(|| ApiError::ItemNotFound(format!("draft {}", draft_id)))?;
        gate.assess(item.entity_type, &draft, &item, AssessmentMode::Full)
            .await
    }

    fn apply(
        &self,
        item_id: &str,
        mut change: impl FnMut(&QueueItem) -> Option<QueueItem>,
    ) -> Result<QueueItem, ApiError> {
        match self.store.transition(item_id, &mut change)? {
            Transition::Applied(item) => Ok(item),
            Transition::Refused(current) => Err(ApiError::TransitionRefused {
                id: item_id.to_string(),
                actual: current.status,
                expected: REVIEWABLE.to_string(),
            }),
            Transition::Missing => Err(ApiError::ItemNotFound(item_id.to_string())),
        }
    }
}
