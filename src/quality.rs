//! Quality Gate
//!
//! Grades a generated entity and returns a numeric score with generic feedback
//! (strengths and gaps). All entity-type-specific interpretation of a draft
//! lives behind the [`QualityGate`] trait; callers only ever see
//! [`QualityAssessment`].

use crate::demand::QueueItem;
use crate::error::ApiError;
use crate::generator::GeneratedEntity;
use crate::types::{AssessmentMode, EntityType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod provider_backed;
pub mod rubric;

pub use provider_backed::ProviderQualityGate;
pub use rubric::RubricQualityGate;

pub const MAX_SCORE: f64 = 100.0;

/// Outcome of grading one generated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAssessment {
    /// Score in `0..=100`.
    pub overall_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub mode: AssessmentMode,
    /// Free-form extras a gate may attach (per-field notes, model name, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    pub assessed_at: DateTime<Utc>,
}

impl QualityAssessment {
    pub fn new(overall_score: f64, mode: AssessmentMode) -> Self {
        Self {
            overall_score: clamp_score(overall_score),
            strengths: Vec::new(),
            gaps: Vec::new(),
            mode,
            details: Map::new(),
            assessed_at: Utc::now(),
        }
    }

    pub fn with_strengths(mut self, strengths: Vec<String>) -> Self {
        self.strengths = strengths;
        self
    }

    pub fn with_gaps(mut self, gaps: Vec<String>) -> Self {
        self.gaps = gaps;
        self
    }

    pub fn passes(&self, min_quality_score: u8) -> bool {
        self.overall_score >= f64::from(min_quality_score)
    }
}

/// Clamp a raw score into `0..=100`; NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, MAX_SCORE)
    }
}

/// Scoring capability consumed by the dispatcher (quick) and review tooling (full).
#[async_trait]
pub trait QualityGate: Send + Sync {
    async fn assess(
        &self,
        entity_type: EntityType,
        entity: &GeneratedEntity,
        item: &QueueItem,
        mode: AssessmentMode,
    ) -> Result<QualityAssessment, ApiError>;

    /// Short name used in logs and assessment details.
    fn name(&self) -> &str;
}

/// Pull `{overall_score|overallScore|score, strengths, gaps}` out of a gate reply.
pub(crate) fn assessment_from_json(
    value: &Value,
    mode: AssessmentMode,
) -> Result<QualityAssessment, ApiError> {
    let object = value.as_object().ok_or_else(|| {
        ApiError::MalformedOutput("quality assessment is not a JSON object".to_string())
    })?;

    let score = ["overall_score", "overallScore", "score"]
        .iter()
        .find_map(|key| object.get(*key))
        .and_then(|raw| match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .ok_or_else(|| {
            ApiError::MalformedOutput("quality assessment has no numeric overall score".to_string())
        })?;

    let strings = |key: &str| -> Vec<String> {
        object
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut assessment = QualityAssessment::new(score, mode)
        .with_strengths(strings("strengths"))
        .with_gaps(strings("gaps"));
    for (key, extra) in object {
        if !matches!(
            key.as_str(),
            "overall_score" | "overallScore" | "score" | "strengths" | "gaps"
        ) {
            assessment.details.insert(key.clone(), extra.clone());
        }
    }
    Ok(assessment)
}
