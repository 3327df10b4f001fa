//! Generator backed by a language-model provider.

use crate::error::ApiError;
use crate::generator::prompt::build_messages;
use crate::generator::{GeneratedEntity, GenerationInput, Generator};
use crate::provider::{extract_json_object, CompletionOptions, ModelProviderClient};
use crate::types::EntityType;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Drafts one entity type through a provider client.
pub struct ProviderGenerator {
    entity_type: EntityType,
    client: Arc<dyn ModelProviderClient>,
    options: CompletionOptions,
}

impl ProviderGenerator {
    pub fn new(
        entity_type: EntityType,
        client: Arc<dyn ModelProviderClient>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            entity_type,
            client,
            options,
        }
    }
}

#[async_trait]
impl Generator for ProviderGenerator {
    async fn generate(&self, input: GenerationInput<'_>) -> Result<GeneratedEntity, ApiError> {
        let messages = build_messages(self.entity_type, &input);
        debug!(
            queue_item_id = %input.queue_item_id,
            entity_type = %self.entity_type,
            provider_name = %self.client.provider_name(),
            message_count = messages.len(),
            "Provider generation request sent"
        );

        let started = Instant::now();
        let response = self.client.complete(messages, self.options.clone()).await?;
        info!(
            queue_item_id = %input.queue_item_id,
            entity_type = %self.entity_type,
            model = %response.model,
            duration_ms = started.elapsed().as_millis(),
            completion_tokens = response.usage.completion_tokens,
            "Provider generation response received"
        );

        let fields = match extract_json_object(&response.content)? {
            Value::Object(fields) => fields,
            _ => {
                return Err(ApiError::MalformedOutput(
                    "generator reply is not a JSON object".to_string(),
                ))
            }
        };
        let has_title = fields
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|t| !t.trim().is_empty());
        if !has_title {
            return Err(ApiError::MalformedOutput(format!(
                "generated {} has no title",
                self.entity_type
            )));
        }

        Ok(GeneratedEntity::new(
            uuid::Uuid::new_v4().to_string(),
            self.entity_type,
            fields,
        ))
    }
}
