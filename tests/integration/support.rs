//! Shared doubles and seeding helpers for integration tests.
//!
//! Behavior is driven by the item's prefilled spec so results do not depend
//! on processing order:
//! - `score`: what the scripted gate returns
//! - `script`: `"fail"` makes generation fail, `"slow"` makes it sleep,
//!   `"gate_fail"` makes the gate fail after a draft was generated

use async_trait::async_trait;
use chrono::Utc;
use draftline::demand::{BatchDispatcher, NewQueueItem, QueueItem};
use draftline::error::ApiError;
use draftline::generator::{GeneratedEntity, GenerationInput, Generator, GeneratorRegistry};
use draftline::quality::{QualityAssessment, QualityGate};
use draftline::store::{PipelineStore, QueueStore, SledStore};
use draftline::types::{AssessmentMode, EntityType};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PLAN: &str = "plan-city-2030";

#[derive(Default)]
pub struct ScriptedGenerator {
    pub calls: AtomicUsize,
    /// Regeneration notes seen on each call, in call order.
    pub hints: Mutex<Vec<Option<String>>>,
}

impl ScriptedGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, input: GenerationInput<'_>) -> Result<GeneratedEntity, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.hints
            .lock()
            .unwrap()
            .push(input.regeneration.and_then(|hint| hint.notes.clone()));
        tokio::task::yield_now().await;

        match input.prefilled_spec.get("script").and_then(Value::as_str) {
            Some("fail") => {
                return Err(ApiError::GenerationFailed(
                    "model returned an empty draft".to_string(),
                ))
            }
            Some("slow") => tokio::time::sleep(Duration::from_secs(5)).await,
            _ => {}
        }

        let mut fields = Map::new();
        let title = input
            .prefilled_spec
            .get("title")
            .cloned()
            .unwrap_or_else(|| json!(input.queue_item_id));
        fields.insert("title".to_string(), title);
        fields.insert(
            "plan".to_string(),
            input.plan_context.get("id").cloned().unwrap_or(Value::Null),
        );
        Ok(GeneratedEntity::new(
            format!("{}-draft-{}", input.queue_item_id, call),
            input.entity_type,
            fields,
        ))
    }
}

/// Gate returning the `score` from the item's prefilled spec (default 50).
#[derive(Default)]
pub struct ScriptedGate {
    pub calls: AtomicUsize,
}

#[async_trait]
impl QualityGate for ScriptedGate {
    async fn assess(
        &self,
        _entity_type: EntityType,
        _entity: &GeneratedEntity,
        item: &QueueItem,
        mode: AssessmentMode,
    ) -> Result<QualityAssessment, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if item.prefilled_spec.get("script").and_then(Value::as_str) == Some("gate_fail") {
            return Err(ApiError::QualityGateFailed(
                "grader reply had no overall_score".to_string(),
            ));
        }
        let score = item
            .prefilled_spec
            .get("score")
            .and_then(Value::as_f64)
            .unwrap_or(50.0);
        Ok(QualityAssessment::new(score, mode).with_strengths(vec!["scripted".to_string()]))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub struct Harness {
    pub store: Arc<SledStore>,
    pub generator: Arc<ScriptedGenerator>,
    pub gate: Arc<ScriptedGate>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(SledStore::temporary().unwrap()),
            generator: Arc::new(ScriptedGenerator::default()),
            gate: Arc::new(ScriptedGate::default()),
        }
    }

    /// Dispatcher with the scripted generator registered for every entity type.
    pub fn dispatcher(&self) -> BatchDispatcher {
        let mut registry = GeneratorRegistry::new();
        for entity_type in EntityType::ALL {
            registry = registry.register(entity_type, self.generator.clone());
        }
        BatchDispatcher::new(
            self.store.clone() as Arc<dyn PipelineStore>,
            registry,
            self.gate.clone(),
        )
    }

    pub fn seed(&self, id: &str, entity_type: EntityType, priority: f64, spec: Value) -> QueueItem {
        seed_item(&self.store, id, entity_type, priority, spec)
    }

    pub fn item(&self, id: &str) -> QueueItem {
        self.store.get(id).unwrap().unwrap()
    }
}

pub fn seed_item(
    store: &SledStore,
    id: &str,
    entity_type: EntityType,
    priority: f64,
    spec: Value,
) -> QueueItem {
    let item = QueueItem::new(
        id.to_string(),
        NewQueueItem {
            strategic_plan_id: PLAN.to_string(),
            entity_type,
            prefilled_spec: spec,
            priority_score: priority,
        },
        Utc::now(),
    );
    store.insert(&item).unwrap();
    item
}
