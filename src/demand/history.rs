//! Generation history: one immutable record per dispatch attempt.

use crate::demand::item::QueueItem;
use crate::generator::GeneratedEntity;
use crate::quality::QualityAssessment;
use crate::types::EntityType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOutcome {
    Accepted,
    /// Landed in review and needs a human decision.
    ManualEdit,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationHistoryRecord {
    pub id: String,
    pub queue_item_id: String,
    pub strategic_plan_id: String,
    pub entity_type: EntityType,
    pub batch_id: String,
    /// Equals the item's `attempts` after this attempt was counted.
    pub attempt_number: u32,
    pub input_spec: Value,
    pub output_entity: Option<Value>,
    pub quality_assessment: Option<QualityAssessment>,
    pub overall_score: Option<f64>,
    pub outcome: HistoryOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl GenerationHistoryRecord {
    pub fn success(
        item: &QueueItem,
        batch_id: &str,
        attempt_number: u32,
        entity: &GeneratedEntity,
        assessment: &QualityAssessment,
        accepted: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            queue_item_id: item.id.clone(),
            strategic_plan_id: item.strategic_plan_id.clone(),
            entity_type: item.entity_type,
            batch_id: batch_id.to_string(),
            attempt_number,
            input_spec: item.prefilled_spec.clone(),
            output_entity: Some(entity.to_value()),
            quality_assessment: Some(assessment.clone()),
            overall_score: Some(assessment.overall_score),
            outcome: if accepted {
                HistoryOutcome::Accepted
            } else {
                HistoryOutcome::ManualEdit
            },
            error: None,
            recorded_at: Utc::now(),
        }
    }

    /// Failed attempt; keeps whatever was produced before the failure.
    pub fn failure(
        item: &QueueItem,
        batch_id: &str,
        attempt_number: u32,
        entity: Option<&GeneratedEntity>,
        assessment: Option<&QualityAssessment>,
        error: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            queue_item_id: item.id.clone(),
            strategic_plan_id: item.strategic_plan_id.clone(),
            entity_type: item.entity_type,
            batch_id: batch_id.to_string(),
            attempt_number,
            input_spec: item.prefilled_spec.clone(),
            output_entity: entity.map(GeneratedEntity::to_value),
            quality_assessment: assessment.cloned(),
            overall_score: assessment.map(|a| a.overall_score),
            outcome: HistoryOutcome::Error,
            error: Some(error.to_string()),
            recorded_at: Utc::now(),
        }
    }
}
