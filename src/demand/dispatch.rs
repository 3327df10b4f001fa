//! Batch Dispatcher
//!
//! Pulls up to `batch_size` pending items for a plan in priority order and
//! processes them one at a time: claim, generate, assess, write back, log.
//! A failure on one item reverts that item to pending and the batch moves on.

mod request;

pub use request::{
    BatchResponse, DispatchRequest, ItemOutcome, ItemResult, DEFAULT_BATCH_SIZE,
    DEFAULT_MIN_QUALITY_SCORE,
};

use crate::demand::history::GenerationHistoryRecord;
use crate::demand::item::{Completion, QueueItem};
use crate::error::ApiError;
use crate::generator::{GeneratedEntity, GenerationInput, GeneratorRegistry, RegenerationHint};
use crate::quality::{QualityAssessment, QualityGate};
use crate::store::{PipelineStore, QueueFilter, Transition};
use crate::types::{AssessmentMode, EntityType, QueueStatus};
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Running totals across every batch this dispatcher has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchStats {
    pub batches: u64,
    pub aborted_batches: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// What went wrong in one attempt, with whatever was produced before it.
struct AttemptFailure {
    error: ApiError,
    entity: Option<GeneratedEntity>,
    assessment: Option<QualityAssessment>,
}

impl AttemptFailure {
    fn new(error: ApiError) -> Self {
        Self {
            error,
            entity: None,
            assessment: None,
        }
    }
}

enum ItemRun {
    Finished(ItemResult),
    /// Another run claimed the item between selection and claim.
    Lost,
}

pub struct BatchDispatcher {
    store: Arc<dyn PipelineStore>,
    registry: GeneratorRegistry,
    gate: Arc<dyn QualityGate>,
    call_timeout: Duration,
    stats: Arc<RwLock<DispatchStats>>,
}

impl BatchDispatcher {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        registry: GeneratorRegistry,
        gate: Arc<dyn QualityGate>,
    ) -> Self {
        Self {
            store,
            registry,
            gate,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            stats: Arc::new(RwLock::new(DispatchStats::default())),
        }
    }

    /// Bound on each generator and quality-gate call.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats.read().clone()
    }

    /// Run one batch. Never fails as a call: whole-batch errors come back as
    /// `success: false` with the error text.
    pub async fn dispatch(&self, request: &DispatchRequest) -> BatchResponse {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(
            batch_id = %batch_id,
            strategic_plan_id = %request.strategic_plan_id,
            entity_type = request.entity_type.as_deref().unwrap_or("all"),
            batch_size = request.batch_size,
            auto_approve = request.auto_approve,
            min_quality_score = request.min_quality_score,
            "Dispatch batch started"
        );

        let response = match self.run_batch(&batch_id, request).await {
            Ok(response) => response,
            Err(e) => {
                error!(batch_id = %batch_id, error = %e, "Dispatch batch aborted");
                self.stats.write().aborted_batches += 1;
                return BatchResponse::aborted(batch_id, &e);
            }
        };

        {
            let mut stats = self.stats.write();
            stats.batches += 1;
            stats.processed += response.processed as u64;
            stats.succeeded += response.succeeded as u64;
            stats.failed += response.failed as u64;
            stats.skipped += response.skipped as u64;
        }
        info!(
            batch_id = %batch_id,
            processed = response.processed,
            succeeded = response.succeeded,
            failed = response.failed,
            skipped = response.skipped,
            duration_ms = started.elapsed().as_millis(),
            "Dispatch batch finished"
        );
        response
    }

    async fn run_batch(
        &self,
        batch_id: &str,
        request: &DispatchRequest,
    ) -> Result<BatchResponse, ApiError> {
        request.validate()?;
        let entity_filter = request.entity_filter()?;
        let selected = self.select_pending(request, entity_filter)?;
        let mut response = BatchResponse::empty(batch_id.to_string());
        if selected.is_empty() {
            debug!(batch_id = %batch_id, "No pending items to dispatch");
            return Ok(response);
        }
        let plan_context = self.plan_context(&request.strategic_plan_id)?;

        for item in selected {
            match self.process_item(item, batch_id, &plan_context, request).await {
                ItemRun::Finished(result) => response.push(result),
                ItemRun::Lost => response.skipped += 1,
            }
        }
        Ok(response)
    }

    /// Pending items for the plan, highest priority first, oldest first on ties.
    fn select_pending(
        &self,
        request: &DispatchRequest,
        entity_filter: Option<EntityType>,
    ) -> Result<Vec<QueueItem>, ApiError> {
        let filter = QueueFilter::for_plan(&request.strategic_plan_id)
            .with_status(QueueStatus::Pending)
            .with_entity_type(entity_filter);
        let mut items = self.store.list(&filter)?;
        if let Some(cap) = request.max_attempts {
            let before = items.len();
            items.retain(|item| item.attempts < cap);
            if items.len() < before {
                debug!(
                    max_attempts = cap,
                    excluded = before - items.len(),
                    "Skipping items at the attempt cap"
                );
            }
        }
        items.sort_by(|a, b| {
            b.priority_score
                .partial_cmp(&a.priority_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        items.truncate(request.batch_size);
        Ok(items)
    }

    fn plan_context(&self, strategic_plan_id: &str) -> Result<Value, ApiError> {
        match self.store.get_plan(strategic_plan_id)? {
            Some(context) => Ok(context),
            None => {
                debug!(
                    strategic_plan_id = %strategic_plan_id,
                    "No stored plan context, using plan id only"
                );
                Ok(json!({ "id": strategic_plan_id }))
            }
        }
    }

    async fn process_item(
        &self,
        item: QueueItem,
        batch_id: &str,
        plan_context: &Value,
        request: &DispatchRequest,
    ) -> ItemRun {
        let claimed = match self
            .store
            .transition(&item.id, &mut |row| row.claim(batch_id, Utc::now()))
        {
            Ok(Transition::Applied(claimed)) => claimed,
            Ok(Transition::Refused(current)) => {
                debug!(
                    queue_item_id = %item.id,
                    batch_id = %batch_id,
                    status = %current.status,
                    holder = current.batch_id.as_deref().unwrap_or(""),
                    "Claim lost to another run"
                );
                return ItemRun::Lost;
            }
            Ok(Transition::Missing) => return ItemRun::Lost,
            Err(e) => {
                let e = ApiError::from(e);
                error!(queue_item_id = %item.id, batch_id = %batch_id, error = %e, "Claim write failed");
                return ItemRun::Finished(ItemResult::failed(&item.id, item.entity_type, &e));
            }
        };
        let attempt_number = claimed.attempts + 1;
        debug!(
            queue_item_id = %claimed.id,
            batch_id = %batch_id,
            entity_type = %claimed.entity_type,
            attempt = attempt_number,
            "Claimed queue item"
        );

        let result = match self
            .attempt(&claimed, batch_id, attempt_number, plan_context, request)
            .await
        {
            Ok(result) => result,
            Err(failure) => self.fail_item(&claimed, batch_id, attempt_number, failure),
        };
        ItemRun::Finished(result)
    }

    async fn attempt(
        &self,
        claimed: &QueueItem,
        batch_id: &str,
        attempt_number: u32,
        plan_context: &Value,
        request: &DispatchRequest,
    ) -> Result<ItemResult, AttemptFailure> {
        let hint = regeneration_hint(claimed);
        let input = GenerationInput {
            entity_type: claimed.entity_type,
            queue_item_id: &claimed.id,
            prefilled_spec: &claimed.prefilled_spec,
            plan_context,
            regeneration: hint.as_ref(),
        };

        let started = Instant::now();
        let entity = self
            .bounded("generation", self.registry.generate(input))
            .await
            .map_err(AttemptFailure::new)?;
        debug!(
            queue_item_id = %claimed.id,
            generated_id = %entity.id,
            duration_ms = started.elapsed().as_millis(),
            "Generator returned entity"
        );

        if let Err(e) = self.store.put_draft(&entity) {
            return Err(AttemptFailure {
                error: e.into(),
                entity: Some(entity),
                assessment: None,
            });
        }

        let assessed = self
            .bounded(
                "quality assessment",
                self.gate
                    .assess(claimed.entity_type, &entity, claimed, AssessmentMode::Quick),
            )
            .await;
        let assessment = match assessed {
            Ok(assessment) => assessment,
            Err(error) => {
                return Err(AttemptFailure {
                    error,
                    entity: Some(entity),
                    assessment: None,
                })
            }
        };

        let status = if request.auto_approve && assessment.passes(request.min_quality_score) {
            QueueStatus::Accepted
        } else {
            QueueStatus::Review
        };
        debug!(
            queue_item_id = %claimed.id,
            gate = %self.gate.name(),
            quality_score = assessment.overall_score,
            status = %status,
            "Quality gate scored entity"
        );

        let completion = Completion {
            entity: &entity,
            assessment: &assessment,
            status,
            attempt_number,
        };
        let written = self
            .store
            .transition(&claimed.id, &mut |row| {
                row.complete(batch_id, &completion, Utc::now())
            });
        match written {
            Ok(Transition::Applied(_)) => {}
            Ok(Transition::Refused(current)) => {
                return Err(AttemptFailure {
                    error: ApiError::TransitionRefused {
                        id: claimed.id.clone(),
                        actual: current.status,
                        expected: format!("in_progress held by batch {}", batch_id),
                    },
                    entity: Some(entity),
                    assessment: Some(assessment),
                })
            }
            Ok(Transition::Missing) => {
                return Err(AttemptFailure {
                    error: ApiError::ItemNotFound(claimed.id.clone()),
                    entity: Some(entity),
                    assessment: Some(assessment),
                })
            }
            Err(e) => {
                return Err(AttemptFailure {
                    error: e.into(),
                    entity: Some(entity),
                    assessment: Some(assessment),
                })
            }
        }

        let record = GenerationHistoryRecord::success(
            claimed,
            batch_id,
            attempt_number,
            &entity,
            &assessment,
            status == QueueStatus::Accepted,
        );
        if let Err(e) = self.store.append(&record) {
            return Err(AttemptFailure {
                error: e.into(),
                entity: Some(entity),
                assessment: Some(assessment),
            });
        }

        info!(
            queue_item_id = %claimed.id,
            batch_id = %batch_id,
            attempt = attempt_number,
            quality_score = assessment.overall_score,
            status = %status,
            "Queue item generated"
        );
        Ok(ItemResult {
            queue_item_id: claimed.id.clone(),
            entity_type: claimed.entity_type,
            status: ItemOutcome::from_status(status),
            quality_score: Some(assessment.overall_score),
            generated_id: Some(entity.id),
            error: None,
        })
    }

    /// Return the item to the pool and log the failed attempt.
    fn fail_item(
        &self,
        claimed: &QueueItem,
        batch_id: &str,
        attempt_number: u32,
        failure: AttemptFailure,
    ) -> ItemResult {
        let message = failure.error.to_string();
        let tag = failure.error.tag();
        warn!(
            queue_item_id = %claimed.id,
            batch_id = %batch_id,
            attempt = attempt_number,
            error_tag = tag,
            error = %message,
            "Queue item attempt failed, reverting to pending"
        );

        match self.store.transition(&claimed.id, &mut |row| {
            row.revert(batch_id, attempt_number, &message, tag, Utc::now())
        }) {
            Ok(Transition::Applied(_)) => {}
            Ok(Transition::Refused(current)) => warn!(
                queue_item_id = %claimed.id,
                status = %current.status,
                "Revert refused, item no longer held by this batch"
            ),
            Ok(Transition::Missing) => warn!(queue_item_id = %claimed.id, "Revert found no item"),
            Err(e) => error!(queue_item_id = %claimed.id, error = %e, "Revert write failed"),
        }

        let record = GenerationHistoryRecord::failure(
            claimed,
            batch_id,
            attempt_number,
            failure.entity.as_ref(),
            failure.assessment.as_ref(),
            &message,
        );
        if let Err(e) = self.store.append(&record) {
            error!(queue_item_id = %claimed.id, error = %e, "Failed to append error history record");
        }

        ItemResult::failed(&claimed.id, claimed.entity_type, &failure.error)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                operation: operation.to_string(),
                seconds: self.call_timeout.as_secs(),
            }),
        }
    }
}

/// Reviewer feedback to pass along when the item was sent back for another try.
fn regeneration_hint(item: &QueueItem) -> Option<RegenerationHint> {
    let feedback = &item.quality_feedback;
    if !feedback.regeneration_requested {
        return None;
    }
    Some(RegenerationHint {
        notes: feedback.regeneration_notes.clone(),
        previous_rejection_reason: feedback.rejection_reason.clone(),
        previous_improvement_notes: feedback.improvement_notes.clone(),
    })
}
