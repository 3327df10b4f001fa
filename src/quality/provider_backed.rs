//! Quality gate that asks a language model to grade a draft.

use crate::demand::QueueItem;
use crate::error::ApiError;
use crate::generator::prompt::entity_brief;
use crate::generator::GeneratedEntity;
use crate::provider::{extract_json_object, ChatMessage, CompletionOptions, MessageRole, ModelProviderClient};
use crate::quality::{assessment_from_json, QualityAssessment, QualityGate};
use crate::types::{AssessmentMode, EntityType};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const QUICK_MAX_TOKENS: u32 = 400;
const FULL_MAX_TOKENS: u32 = 1500;

const GRADER_PROMPT: &str = "You review draft entities for a municipal innovation portal. \
Reply with a single JSON object: {\"overall_score\": <0-100>, \"strengths\": [..], \"gaps\": [..]}.";

pub struct ProviderQualityGate {
    client: Arc<dyn ModelProviderClient>,
    options: CompletionOptions,
}

impl ProviderQualityGate {
    pub fn new(client: Arc<dyn ModelProviderClient>, options: CompletionOptions) -> Self {
        Self { client, options }
    }

    fn messages(
        &self,
        entity_type: EntityType,
        entity: &GeneratedEntity,
        item: &QueueItem,
        mode: AssessmentMode,
    ) -> Vec<ChatMessage> {
        let (brief, fields) = entity_brief(entity_type);
        let depth = match mode {
            AssessmentMode::Quick => "Give a quick score with at most three gaps.",
            AssessmentMode::Full => {
                "Give a thorough review. Add a \"fields\" object with a note per expected field."
            }
        };
        let draft = serde_json::to_string_pretty(&entity.to_value())
            .unwrap_or_else(|_| entity.to_value().to_string());
        let seed = serde_json::to_string_pretty(&item.prefilled_spec)
            .unwrap_or_else(|_| item.prefilled_spec.to_string());
        vec![
            ChatMessage {
                role: MessageRole::System,
                content: GRADER_PROMPT.to_string(),
            },
            ChatMessage {
                role: MessageRole::User,
                content: format!(
                    "Grade {brief}. Expected fields: {}.\n{depth}\n\nDraft seed:\n{seed}\n\nDraft:\n{draft}",
                    fields.join(", ")
                ),
            },
        ]
    }
}

#[async_trait]
impl QualityGate for ProviderQualityGate {
    async fn assess(
        &self,
        entity_type: EntityType,
        entity: &GeneratedEntity,
        item: &QueueItem,
        mode: AssessmentMode,
    ) -> Result<QualityAssessment, ApiError> {
        let mut options = self.options.clone();
        options.max_tokens = Some(match mode {
            AssessmentMode::Quick => QUICK_MAX_TOKENS,
            AssessmentMode::Full => FULL_MAX_TOKENS,
        });
        // Grading wants stable scores.
        options.temperature = Some(0.0);

        let response = self
            .client
            .complete(self.messages(entity_type, entity, item, mode), options)
            .await
            .map_err(|e| ApiError::QualityGateFailed(e.to_string()))?;
        debug!(
            queue_item_id = %item.id,
            entity_id = %entity.id,
            model = %response.model,
            "Quality gate response received"
        );

        let value = extract_json_object(&response.content)?;
        let mut assessment = assessment_from_json(&value, mode)?;
        assessment
            .details
            .insert("gate".to_string(), Value::String(self.client.provider_name().to_string()));
        assessment
            .details
            .insert("model".to_string(), Value::String(response.model));
        Ok(assessment)
    }

    fn name(&self) -> &str {
        self.client.provider_name()
    }
}
