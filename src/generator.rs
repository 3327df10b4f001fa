//! Generator Registry
//!
//! Fixed mapping from [`EntityType`] to a generation capability. Each
//! capability turns a partially specified draft plus strategic-plan context
//! into a complete entity, or fails. The registry never retries; callers own
//! failure handling.

use crate::error::ApiError;
use crate::types::EntityType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub mod prompt;
pub mod provider_backed;

pub use provider_backed::ProviderGenerator;

/// A fully formed draft entity returned by a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedEntity {
    pub id: String,
    pub entity_type: EntityType,
    pub fields: Map<String, Value>,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedEntity {
    pub fn new(id: String, entity_type: EntityType, fields: Map<String, Value>) -> Self {
        Self {
            id,
            entity_type,
            fields,
            generated_at: Utc::now(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        ["title", "title_en", "name"]
            .iter()
            .find_map(|key| self.fields.get(*key))
            .and_then(Value::as_str)
    }

    /// Flat JSON view: the entity fields plus `id` and `entity_type`.
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        object.insert(
            "entity_type".to_string(),
            Value::String(self.entity_type.as_str().to_string()),
        );
        Value::Object(object)
    }
}

/// Reviewer feedback carried into a regeneration attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegenerationHint {
    pub notes: Option<String>,
    pub previous_rejection_reason: Option<String>,
    pub previous_improvement_notes: Option<String>,
}

/// Everything a generator receives for one queue item.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub entity_type: EntityType,
    pub queue_item_id: &'a str,
    pub prefilled_spec: &'a Value,
    pub plan_context: &'a Value,
    pub regeneration: Option<&'a RegenerationHint>,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, input: GenerationInput<'_>) -> Result<GeneratedEntity, ApiError>;
}

/// Static lookup table from entity type to generator.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: HashMap<EntityType, Arc<dyn Generator>>,
    fallback: Option<(EntityType, Arc<dyn Generator>)>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, entity_type: EntityType, generator: Arc<dyn Generator>) -> Self {
        self.generators.insert(entity_type, generator);
        self
    }

    /// Designate the generator registered for `entity_type` as the stand-in for
    /// any type without its own entry.
    pub fn with_fallback(mut self, entity_type: EntityType) -> Result<Self, ApiError> {
        let generator = self
            .generators
            .get(&entity_type)
            .cloned()
            .ok_or(ApiError::GeneratorNotRegistered(entity_type))?;
        self.fallback = Some((entity_type, generator));
        Ok(self)
    }

    pub fn registered_types(&self) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self.generators.keys().copied().collect();
        types.sort();
        types
    }

    pub fn fallback_type(&self) -> Option<EntityType> {
        self.fallback.as_ref().map(|(t, _)| *t)
    }

    /// Resolve the generator for a type. Unregistered types fail fast unless a
    /// fallback was designated.
    pub fn resolve(&self, entity_type: EntityType) -> Result<Arc<dyn Generator>, ApiError> {
        if let Some(generator) = self.generators.get(&entity_type) {
            return Ok(Arc::clone(generator));
        }
        match &self.fallback {
            Some((fallback_type, generator)) => {
                warn!(
                    entity_type = %entity_type,
                    fallback_type = %fallback_type,
                    "No generator registered for entity type, using designated fallback"
                );
                Ok(Arc::clone(generator))
            }
            None => Err(ApiError::GeneratorNotRegistered(entity_type)),
        }
    }

    pub async fn generate(&self, input: GenerationInput<'_>) -> Result<GeneratedEntity, ApiError> {
        let generator = self.resolve(input.entity_type)?;
        generator.generate(input).await
    }
}
