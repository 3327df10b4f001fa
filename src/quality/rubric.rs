//! Deterministic completeness rubric.
//!
//! Scores a draft by which expected fields it fills in. Needs no network and
//! always returns the same score for the same entity.

use crate::demand::QueueItem;
use crate::error::ApiError;
use crate::generator::GeneratedEntity;
use crate::quality::{QualityAssessment, QualityGate};
use crate::types::{AssessmentMode, EntityType};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Description length at which the substance component is saturated.
const SUBSTANTIAL_DESCRIPTION_CHARS: usize = 240;

struct Rubric {
    required: &'static [&'static str],
    optional: &'static [&'static str],
}

fn rubric_for(entity_type: EntityType) -> Rubric {
    match entity_type {
        EntityType::Challenge => Rubric {
            required: &["title", "description", "problem_statement"],
            optional: &["affected_population", "kpis", "root_causes"],
        },
        EntityType::Pilot => Rubric {
            required: &["title", "description", "objectives", "success_criteria"],
            optional: &["duration_months", "budget", "risks"],
        },
        EntityType::Campaign => Rubric {
            required: &["title", "description", "target_audience"],
            optional: &["channels", "timeline", "kpis"],
        },
        EntityType::Event => Rubric {
            required: &["title", "description", "event_type"],
            optional: &["agenda", "target_participants", "location"],
        },
        EntityType::Policy => Rubric {
            required: &["title", "description", "legal_basis", "recommendations"],
            optional: &["impact_assessment", "stakeholders"],
        },
        EntityType::RdCall => Rubric {
            required: &["title", "description", "research_themes", "eligibility"],
            optional: &["budget", "deadline", "evaluation_criteria"],
        },
        EntityType::Partnership => Rubric {
            required: &["title", "description", "shared_objectives"],
            optional: &["partner_profile", "governance", "duration_months"],
        },
        EntityType::LivingLab => Rubric {
            required: &["title", "description", "research_focus"],
            optional: &["location", "stakeholders", "equipment"],
        },
        EntityType::Solution => Rubric {
            required: &["title", "description", "use_cases"],
            optional: &["provider", "maturity_level", "pricing"],
        },
    }
}

fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

/// Completeness-based gate; the default when no provider gate is configured.
#[derive(Debug, Clone, Default)]
pub struct RubricQualityGate;

impl RubricQualityGate {
    pub fn new() -> Self {
        Self
    }

    /// Score an entity's fields against the rubric for `entity_type`.
    pub fn score(&self, entity_type: EntityType, fields: &Map<String, Value>, mode: AssessmentMode) -> QualityAssessment {
        let rubric = rubric_for(entity_type);
        let mut strengths = Vec::new();
        let mut gaps = Vec::new();
        let mut field_detail = Map::new();

        let required_filled = rubric
            .required
            .iter()
            .filter(|field| {
                let filled = is_filled(fields.get(**field));
                if filled {
                    strengths.push(format!("has {}", field));
                } else {
                    gaps.push(format!("missing required field '{}'", field));
                }
                field_detail.insert((**field).to_string(), json!({"required": true, "filled": filled}));
                filled
            })
            .count();
        let required_ratio = required_filled as f64 / rubric.required.len() as f64;

        let description_chars = fields
            .get("description")
            .and_then(Value::as_str)
            .map(|d| d.trim().chars().count())
            .unwrap_or(0);
        let substance_ratio =
            (description_chars as f64 / SUBSTANTIAL_DESCRIPTION_CHARS as f64).min(1.0);
        if description_chars > 0 && substance_ratio < 1.0 {
            gaps.push(format!(
                "description is brief ({} of {} characters)",
                description_chars, SUBSTANTIAL_DESCRIPTION_CHARS
            ));
        }

        let score = match mode {
            AssessmentMode::Quick => 80.0 * required_ratio + 20.0 * substance_ratio,
            AssessmentMode::Full => {
                let optional_filled = rubric
                    .optional
                    .iter()
                    .filter(|field| {
                        let filled = is_filled(fields.get(**field));
                        if filled {
                            strengths.push(format!("has {}", field));
                        } else {
                            gaps.push(format!("could add '{}'", field));
                        }
                        field_detail
                            .insert((**field).to_string(), json!({"required": false, "filled": filled}));
                        filled
                    })
                    .count();
                let optional_ratio = optional_filled as f64 / rubric.optional.len().max(1) as f64;
                60.0 * required_ratio + 20.0 * optional_ratio + 20.0 * substance_ratio
            }
        };

        let mut assessment = QualityAssessment::new(score.round(), mode)
            .with_strengths(strengths)
            .with_gaps(gaps);
        assessment
            .details
            .insert("gate".to_string(), Value::String("rubric".to_string()));
        if mode == AssessmentMode::Full {
            assessment
                .details
                .insert("fields".to_string(), Value::Object(field_detail));
        }
        assessment
    }
}

#[async_trait]
impl QualityGate for RubricQualityGate {
    async fn assess(
        &self,
        entity_type: EntityType,
        entity: &GeneratedEntity,
        _item: &QueueItem,
        mode: AssessmentMode,
    ) -> Result<QualityAssessment, ApiError> {
        Ok(self.score(entity_type, &entity.fields, mode))
    }

    fn name(&self) -> &str {
        "rubric"
    }
}
