//! Queue item model and its pure state transitions.
//!
//! Every transition here is a function from the current row to an optional
//! replacement row. `None` means the row is not in the state the transition
//! expects; the store applies the replacement atomically (see
//! [`crate::store::QueueStore::transition`]).

use crate::generator::GeneratedEntity;
use crate::quality::QualityAssessment;
use crate::types::{EntityType, QueueStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys tried, in order, when a display title is needed from a spec.
const TITLE_KEYS: [&str; 4] = ["title", "title_en", "titleEn", "name"];

/// One unit of generation demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub strategic_plan_id: String,
    pub entity_type: EntityType,
    /// Draft seed from upstream gap analysis. Opaque to the pipeline.
    pub prefilled_spec: Value,
    pub status: QueueStatus,
    pub attempts: u32,
    pub priority_score: f64,
    pub batch_id: Option<String>,
    pub generated_entity_id: Option<String>,
    pub generated_entity_type: Option<EntityType>,
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub quality_feedback: QualityFeedback,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Reviewer and dispatcher annotations on a queue item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<QualityAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub manually_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub regeneration_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regeneration_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regeneration_requested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_at: Option<DateTime<Utc>>,
}

/// Input for creating a queue item (the upstream producer surface).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQueueItem {
    pub strategic_plan_id: String,
    pub entity_type: EntityType,
    #[serde(default)]
    pub prefilled_spec: Value,
    #[serde(default)]
    pub priority_score: f64,
}

/// Result of one successful generation + assessment, ready to be written back.
#[derive(Debug, Clone)]
pub struct Completion<'a> {
    pub entity: &'a GeneratedEntity,
    pub assessment: &'a QualityAssessment,
    pub status: QueueStatus,
    pub attempt_number: u32,
}

impl QueueItem {
    pub fn new(id: String, new: NewQueueItem, now: DateTime<Utc>) -> Self {
        Self {
            id,
            strategic_plan_id: new.strategic_plan_id,
            entity_type: new.entity_type,
            prefilled_spec: new.prefilled_spec,
            status: QueueStatus::Pending,
            attempts: 0,
            priority_score: new.priority_score,
            batch_id: None,
            generated_entity_id: None,
            generated_entity_type: None,
            quality_score: None,
            quality_feedback: QualityFeedback::default(),
            created_at: now,
            updated_at: now,
            last_attempt_at: None,
        }
    }

    /// Display title drawn from the prefilled spec, if any.
    pub fn title(&self) -> Option<&str> {
        TITLE_KEYS
            .iter()
            .find_map(|key| self.prefilled_spec.get(*key))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Rejection bucket key; `"unspecified"` when no reason was recorded.
    pub fn rejection_reason(&self) -> &str {
        self.quality_feedback
            .rejection_reason
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("unspecified")
    }

    /// Terminal outcomes carry a score unless a human force-approved the item.
    pub fn outcome_is_accounted(&self) -> bool {
        match self.status {
            QueueStatus::Accepted => {
                self.quality_score.is_some() || self.quality_feedback.manually_approved
            }
            QueueStatus::Rejected => {
                self.quality_score.is_some()
                    || self.quality_feedback.manually_approved
                    || self.quality_feedback.rejection_reason.is_some()
            }
            _ => true,
        }
    }

    /// pending -> in_progress, stamping the claiming batch.
    pub fn claim(&self, batch_id: &str, now: DateTime<Utc>) -> Option<QueueItem> {
        if self.status != QueueStatus::Pending {
            return None;
        }
        let mut next = self.clone();
        next.status = QueueStatus::InProgress;
        next.batch_id = Some(batch_id.to_string());
        next.last_attempt_at = Some(now);
        next.updated_at = now;
        Some(next)
    }

    /// in_progress -> accepted | review for the batch holding the claim.
    pub fn complete(&self, batch_id: &str, done: &Completion<'_>, now: DateTime<Utc>) -> Option<QueueItem> {
        if self.status != QueueStatus::InProgress || self.batch_id.as_deref() != Some(batch_id) {
            return None;
        }
        let mut next = self.clone();
        next.status = done.status;
        next.generated_entity_id = Some(done.entity.id.clone());
        next.generated_entity_type = Some(done.entity.entity_type);
        next.quality_score = Some(done.assessment.overall_score);
        next.quality_feedback = QualityFeedback {
            assessment: Some(done.assessment.clone()),
            ..QualityFeedback::default()
        };
        next.attempts = done.attempt_number;
        next.updated_at = now;
        Some(next)
    }

    /// Back to pending after a failed attempt; the error is recorded and
    /// earlier feedback (e.g. regeneration notes) is kept for the next try.
    /// A row the batch already completed loses that attempt's output.
    pub fn revert(
        &self,
        batch_id: &str,
        attempt_number: u32,
        error: &str,
        error_tag: &str,
        now: DateTime<Utc>,
    ) -> Option<QueueItem> {
        let held = matches!(
            self.status,
            QueueStatus::InProgress | QueueStatus::Accepted | QueueStatus::Review
        );
        if !held || self.batch_id.as_deref() != Some(batch_id) {
            return None;
        }
        let mut next = self.clone();
        if self.status != QueueStatus::InProgress {
            next.generated_entity_id = None;
            next.generated_entity_type = None;
            next.quality_score = None;
            next.quality_feedback.assessment = None;
        }
        next.status = QueueStatus::Pending;
        next.attempts = attempt_number;
        next.quality_feedback.error = Some(error.to_string());
        next.quality_feedback.error_tag = Some(error_tag.to_string());
        next.quality_feedback.error_at = Some(now);
        next.updated_at = now;
        Some(next)
    }

    /// Human approval; no score requirement.
    pub fn approve(&self, now: DateTime<Utc>) -> Option<QueueItem> {
        if self.status == QueueStatus::InProgress {
            return None;
        }
        let mut next = self.clone();
        next.status = QueueStatus::Accepted;
        next.quality_feedback.manually_approved = true;
        next.quality_feedback.approved_at = Some(now);
        next.updated_at = now;
        Some(next)
    }

    /// Human rejection; prior assessment fields are preserved.
    pub fn reject(&self, reason: &str, improvement_notes: &str, now: DateTime<Utc>) -> Option<QueueItem> {
        if self.status == QueueStatus::InProgress {
            return None;
        }
        let mut next = self.clone();
        next.status = QueueStatus::Rejected;
        next.quality_feedback.rejection_reason = Some(reason.to_string());
        next.quality_feedback.improvement_notes = Some(improvement_notes.to_string());
        next.quality_feedback.rejected_at = Some(now);
        next.updated_at = now;
        Some(next)
    }

    /// Any settled state -> pending with prior output cleared.
    pub fn request_regeneration(&self, feedback_notes: &str, now: DateTime<Utc>) -> Option<QueueItem> {
        if self.status == QueueStatus::InProgress {
            return None;
        }
        let mut next = self.clone();
        next.status = QueueStatus::Pending;
        next.generated_entity_id = None;
        next.generated_entity_type = None;
        next.quality_score = None;
        next.batch_id = None;
        next.quality_feedback.regeneration_requested = true;
        next.quality_feedback.regeneration_notes = Some(feedback_notes.to_string());
        next.quality_feedback.regeneration_requested_at = Some(now);
        next.updated_at = now;
        Some(next)
    }

    /// Stale in_progress -> pending, only if the same batch still holds it.
    /// The abandoned attempt is counted.
    pub fn reclaim(&self, batch_id: Option<&str>, now: DateTime<Utc>) -> Option<QueueItem> {
        if self.status != QueueStatus::InProgress || self.batch_id.as_deref() != batch_id {
            return None;
        }
        let mut next = self.clone();
        next.status = QueueStatus::Pending;
        next.attempts = self.attempts + 1;
        next.quality_feedback.error = Some("reclaimed: stale in-progress claim".to_string());
        next.quality_feedback.error_tag = Some("stale_claim".to_string());
        next.quality_feedback.error_at = Some(now);
        next.updated_at = now;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssessmentMode;
    use serde_json::json;

    fn item() -> QueueItem {
        QueueItem::new(
            "item-1".to_string(),
            NewQueueItem {
                strategic_plan_id: "plan-1".to_string(),
                entity_type: EntityType::Challenge,
                prefilled_spec: json!({"title_en": "Flood sensors"}),
                priority_score: 4.0,
            },
            Utc::now(),
        )
    }

    fn entity(id: &str) -> GeneratedEntity {
        GeneratedEntity::new(id.to_string(), EntityType::Challenge, serde_json::Map::new())
    }

    #[test]
    fn claim_only_from_pending() {
        let claimed = item().claim("b1", Utc::now()).unwrap();
        assert_eq!(claimed.status, QueueStatus::InProgress);
        assert_eq!(claimed.batch_id.as_deref(), Some("b1"));
        assert!(claimed.last_attempt_at.is_some());
        assert!(claimed.claim("b2", Utc::now()).is_none());
    }

    #[test]
    fn complete_requires_matching_batch() {
        let claimed = item().claim("b1", Utc::now()).unwrap();
        let entity = entity("e1");
        let assessment = QualityAssessment::new(81.0, AssessmentMode::Quick);
        let done = Completion {
            entity: &entity,
            assessment: &assessment,
            status: QueueStatus::Accepted,
            attempt_number: 1,
        };
        assert!(claimed.complete("other", &done, Utc::now()).is_none());
        let finished = claimed.complete("b1", &done, Utc::now()).unwrap();
        assert_eq!(finished.status, QueueStatus::Accepted);
        assert_eq!(finished.quality_score, Some(81.0));
        assert_eq!(finished.generated_entity_id.as_deref(), Some("e1"));
        assert_eq!(finished.attempts, 1);
        assert!(finished.outcome_is_accounted());
    }

    #[test]
    fn revert_keeps_regeneration_notes() {
        let mut pending = item();
        pending.quality_feedback.regeneration_notes = Some("shorter".to_string());
        let claimed = pending.claim("b1", Utc::now()).unwrap();
        let reverted = claimed.revert("b1", 1, "timeout", "timeout", Utc::now()).unwrap();
        assert_eq!(reverted.status, QueueStatus::Pending);
        assert_eq!(reverted.attempts, 1);
        assert_eq!(reverted.quality_feedback.error.as_deref(), Some("timeout"));
        assert_eq!(
            reverted.quality_feedback.regeneration_notes.as_deref(),
            Some("shorter")
        );
    }

    #[test]
    fn revert_after_completion_drops_output() {
        let claimed = item().claim("b1", Utc::now()).unwrap();
        let entity = entity("e1");
        let assessment = QualityAssessment::new(64.0, AssessmentMode::Quick);
        let done = Completion {
            entity: &entity,
            assessment: &assessment,
            status: QueueStatus::Review,
            attempt_number: 1,
        };
        let finished = claimed.complete("b1", &done, Utc::now()).unwrap();
        let reverted = finished
            .revert("b1", 1, "history write failed", "storage_error", Utc::now())
            .unwrap();
        assert_eq!(reverted.status, QueueStatus::Pending);
        assert!(reverted.generated_entity_id.is_none());
        assert!(reverted.generated_entity_type.is_none());
        assert!(reverted.quality_score.is_none());
        assert!(reverted.quality_feedback.assessment.is_none());
        assert_eq!(reverted.quality_feedback.error_tag.as_deref(), Some("storage_error"));
    }

    #[test]
    fn reject_preserves_assessment() {
        let mut reviewed = item();
        reviewed.status = QueueStatus::Review;
        reviewed.quality_score = Some(55.0);
        reviewed.quality_feedback.assessment =
            Some(QualityAssessment::new(55.0, AssessmentMode::Quick));
        let rejected = reviewed
            .reject("missing_legal_basis", "cite the bylaw", Utc::now())
            .unwrap();
        assert_eq!(rejected.status, QueueStatus::Rejected);
        assert!(rejected.quality_feedback.assessment.is_some());
        assert_eq!(rejected.rejection_reason(), "missing_legal_basis");
    }

    #[test]
    fn review_transitions_refuse_in_progress() {
        let claimed = item().claim("b1", Utc::now()).unwrap();
        assert!(claimed.approve(Utc::now()).is_none());
        assert!(claimed.reject("r", "n", Utc::now()).is_none());
        assert!(claimed.request_regeneration("n", Utc::now()).is_none());
    }

    #[test]
    fn regeneration_clears_output() {
        let mut accepted = item();
        accepted.status = QueueStatus::Accepted;
        accepted.generated_entity_id = Some("e1".to_string());
        accepted.quality_score = Some(90.0);
        let pending = accepted.request_regeneration("more detail", Utc::now()).unwrap();
        assert_eq!(pending.status, QueueStatus::Pending);
        assert!(pending.generated_entity_id.is_none());
        assert!(pending.quality_score.is_none());
        assert!(pending.quality_feedback.regeneration_requested);
    }

    #[test]
    fn reclaim_counts_abandoned_attempt() {
        let claimed = item().claim("b1", Utc::now()).unwrap();
        assert!(claimed.reclaim(Some("b2"), Utc::now()).is_none());
        let reclaimed = claimed.reclaim(Some("b1"), Utc::now()).unwrap();
        assert_eq!(reclaimed.status, QueueStatus::Pending);
        assert_eq!(reclaimed.attempts, 1);
        assert_eq!(reclaimed.quality_feedback.error_tag.as_deref(), Some("stale_claim"));
    }

    #[test]
    fn title_falls_back_through_keys() {
        assert_eq!(item().title(), Some("Flood sensors"));
        let mut untitled = item();
        untitled.prefilled_spec = json!({});
        assert_eq!(untitled.title(), None);
        assert_eq!(untitled.rejection_reason(), "unspecified");
    }
}
