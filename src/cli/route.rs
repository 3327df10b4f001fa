//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::help::command_name;
use crate::cli::parse::{Commands, ConfigCommands, PlanCommands, ReviewCommands};
use crate::cli::presentation::{
    format_batch_response_text, format_history_text, format_item_detail_text, format_item_line,
    format_item_table, format_patterns_text, format_queue_stats_text, format_section_heading,
    to_json,
};
use crate::config::{ConfigLoader, GateKind, PipelineConfig};
use crate::demand::{reclaim_stale, BatchDispatcher, DispatchRequest, NewQueueItem, ReviewService};
use crate::error::ApiError;
use crate::generator::{GeneratorRegistry, ProviderGenerator};
use crate::provider::ProviderFactory;
use crate::quality::{ProviderQualityGate, QualityGate, RubricQualityGate};
use crate::store::{DraftStore, PipelineStore, PlanStore, SledStore};
use crate::types::EntityType;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace, loaded config, and domain facades.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: PipelineConfig,
    store: Arc<SledStore>,
    review: ReviewService,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    ///
    /// The configuration is loaded but not validated here, so `config validate`
    /// can still report what is wrong. Every other command validates first.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };

        let store_path = config.storage.resolve(&workspace_root);
        let store = Arc::new(SledStore::open(&store_path)?);
        let review = ReviewService::new(Arc::clone(&store) as Arc<dyn PipelineStore>);

        Ok(Self {
            workspace_root,
            config,
            store,
            review,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let name = command_name(command);
        let started = Instant::now();
        let result = self.execute_inner(command);
        match &result {
            Ok(_) => info!(
                command = %name,
                duration_ms = started.elapsed().as_millis(),
                "Command finished"
            ),
            Err(e) => warn!(
                command = %name,
                duration_ms = started.elapsed().as_millis(),
                error_tag = e.tag(),
                error = %e,
                "Command failed"
            ),
        }
        if let Err(e) = self.store.flush() {
            warn!(error = %e, "Failed to flush store");
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        if !matches!(command, Commands::Config { .. }) {
            self.config.ensure_valid()?;
        }

        match command {
            Commands::Dispatch {
                plan,
                entity_type,
                batch_size,
                auto_approve,
                min_score,
                max_attempts,
                format,
            } => {
                let mut request = DispatchRequest::from_config(plan.clone(), &self.config.dispatch);
                if let Some(entity_type) = entity_type {
                    request = request.with_entity_type(entity_type.clone());
                }
                if let Some(batch_size) = batch_size {
                    request = request.with_batch_size(*batch_size);
                }
                let approve = auto_approve.unwrap_or(request.auto_approve);
                let min_quality_score = min_score.unwrap_or(request.min_quality_score);
                request = request.with_auto_approve(approve, min_quality_score);
                if max_attempts.is_some() {
                    request = request.with_max_attempts(*max_attempts);
                }
                self.handle_dispatch(&request, format)
            }
            Commands::Enqueue {
                plan,
                entity_type,
                priority,
                spec_file,
                title,
                format,
            } => self.handle_enqueue(
                plan,
                entity_type,
                *priority,
                spec_file.as_deref(),
                title.as_deref(),
                format,
            ),
            Commands::Status { plan, format } => {
                let stats = self.review.queue_stats(plan.as_deref())?;
                if format == "json" {
                    to_json(&stats)
                } else {
                    Ok(format_queue_stats_text(&stats, plan.as_deref()))
                }
            }
            Commands::History { item_id, format } => {
                self.review.get_item(item_id)?;
                let records = self.review.history(item_id)?;
                if format == "json" {
                    to_json(&records)
                } else {
                    Ok(format_history_text(&records))
                }
            }
            Commands::Review { command } => self.handle_review_command(command),
            Commands::Rejected { plan, format } => {
                let items = self.review.rejected_items(plan.as_deref())?;
                if format == "json" {
                    to_json(&items)
                } else {
                    Ok(format_item_table(&items, "Rejected items"))
                }
            }
            Commands::Patterns { plan, format } => {
                let patterns = self.review.rejection_patterns(plan.as_deref())?;
                if format == "json" {
                    to_json(&patterns)
                } else {
                    Ok(format_patterns_text(&patterns))
                }
            }
            Commands::Recover {
                older_than_minutes,
                format,
            } => {
                let minutes = older_than_minutes.unwrap_or(self.config.dispatch.stale_after_minutes);
                let older_than = i64::try_from(minutes)
                    .ok()
                    .and_then(chrono::Duration::try_minutes)
                    .ok_or_else(|| {
                        ApiError::InvalidRequest(format!(
                            "older-than value {} is too large",
                            minutes
                        ))
                    })?;
                let reclaimed =
                    reclaim_stale(self.store.as_ref(), older_than, chrono::Utc::now())?;
                if format == "json" {
                    to_json(&reclaimed)
                } else {
                    Ok(format_item_table(
                        &reclaimed,
                        &format!("Reclaimed items (stale for {}+ minutes)", minutes),
                    ))
                }
            }
            Commands::Plan { command } => self.handle_plan_command(command),
            Commands::Config { command } => self.handle_config_command(command),
        }
    }

    fn handle_dispatch(&self, request: &DispatchRequest, format: &str) -> Result<String, ApiError> {
        let dispatcher = self.dispatcher()?;
        let runtime = new_runtime()?;
        let response = runtime.block_on(dispatcher.dispatch(request));
        if format == "json" {
            to_json(&response)
        } else {
            Ok(format_batch_response_text(&response))
        }
    }

    fn handle_enqueue(
        &self,
        plan: &str,
        entity_type: &str,
        priority: f64,
        spec_file: Option<&Path>,
        title: Option<&str>,
        format: &str,
    ) -> Result<String, ApiError> {
        let entity_type: EntityType = entity_type.parse().map_err(ApiError::InvalidRequest)?;
        let mut prefilled_spec = match spec_file {
            Some(path) => read_json_file(path)?,
            None => json!({}),
        };
        if let Some(title) = title {
            match prefilled_spec.as_object_mut() {
                Some(fields) => {
                    fields.insert("title".to_string(), Value::String(title.to_string()));
                }
                None => {
                    return Err(ApiError::InvalidRequest(
                        "prefilled spec must be a JSON object to carry a title".to_string(),
                    ))
                }
            }
        }
        let item = self.review.enqueue(NewQueueItem {
            strategic_plan_id: plan.to_string(),
            entity_type,
            prefilled_spec,
            priority_score: priority,
        })?;
        if format == "json" {
            to_json(&item)
        } else {
            Ok(format_item_line(&item, "Enqueued"))
        }
    }

    fn handle_review_command(&self, command: &ReviewCommands) -> Result<String, ApiError> {
        match command {
            ReviewCommands::List { plan, format } => {
                let items = self.review.review_items(plan)?;
                if format == "json" {
                    to_json(&items)
                } else {
                    Ok(format_item_table(&items, &format!("Awaiting review: {}", plan)))
                }
            }
            ReviewCommands::Show {
                item_id,
                no_assess,
                format,
            } => self.handle_review_show(item_id, *no_assess, format),
            ReviewCommands::Approve { item_id, format } => {
                let item = self.review.approve_item(item_id)?;
                if format == "json" {
                    to_json(&item)
                } else {
                    Ok(format_item_line(&item, "Approved"))
                }
            }
            ReviewCommands::Reject {
                item_id,
                reason,
                notes,
                format,
            } => {
                let reason = match reason {
                    Some(reason) => reason.clone(),
                    None => prompt_rejection_reason()?,
                };
                let item = self.review.reject_item_with_feedback(item_id, &reason, notes)?;
                if format == "json" {
                    to_json(&item)
                } else {
                    Ok(format_item_line(&item, "Rejected"))
                }
            }
            ReviewCommands::Regenerate {
                item_id,
                notes,
                format,
            } => {
                let item = self.review.request_regeneration(item_id, notes)?;
                if format == "json" {
                    to_json(&item)
                } else {
                    Ok(format_item_line(&item, "Requeued"))
                }
            }
        }
    }

    fn handle_review_show(
        &self,
        item_id: &str,
        no_assess: bool,
        format: &str,
    ) -> Result<String, ApiError> {
        let item = self.review.get_item(item_id)?;
        let draft = match item.generated_entity_id.as_deref() {
            Some(draft_id) => self.store.get_draft(draft_id)?,
            None => None,
        };
        let assessment = if no_assess || draft.is_none() {
            None
        } else {
            let gate = self.quality_gate()?;
            let runtime = new_runtime()?;
            let timeout = Duration::from_secs(self.config.dispatch.call_timeout_secs);
            let assessed = runtime.block_on(async {
                tokio::time::timeout(timeout, self.review.full_assessment(gate.as_ref(), item_id))
                    .await
            });
            match assessed {
                Ok(result) => Some(result?),
                Err(_) => {
                    return Err(ApiError::Timeout {
                        operation: "full quality assessment".to_string(),
                        seconds: timeout.as_secs(),
                    })
                }
            }
        };

        if format == "json" {
            to_json(&json!({
                "item": item,
                "draft": draft,
                "assessment": assessment,
            }))
        } else {
            Ok(format_item_detail_text(
                &item,
                draft.as_ref(),
                assessment.as_ref(),
            ))
        }
    }

    fn handle_plan_command(&self, command: &PlanCommands) -> Result<String, ApiError> {
        match command {
            PlanCommands::Put { plan_id, file } => {
                let context = read_json_file(file)?;
                self.store.put_plan(plan_id, &context)?;
                info!(strategic_plan_id = %plan_id, "Strategic plan context stored");
                Ok(format!("Stored plan context for {}\n", plan_id))
            }
            PlanCommands::Show { plan_id } => match self.store.get_plan(plan_id)? {
                Some(context) => to_json(&context),
                None => Err(ApiError::ItemNotFound(format!("plan {}", plan_id))),
            },
        }
    }

    fn handle_config_command(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show => self.config.redacted().to_toml(),
            ConfigCommands::Validate => match self.config.validate() {
                Ok(()) => Ok(format!(
                    "{}\n\n  Configuration is valid ({} provider(s)).\n",
                    format_section_heading("Configuration"),
                    self.config.providers.len()
                )),
                Err(errors) => {
                    let error_msgs: Vec<String> =
                        errors.iter().map(|e| format!("  - {}", e)).collect();
                    Err(ApiError::ConfigError(format!(
                        "Configuration validation failed:\n{}",
                        error_msgs.join("\n")
                    )))
                }
            },
        }
    }

    /// Build the dispatcher from configuration: one provider-backed generator
    /// per registered entity type, plus the configured quality gate.
    fn dispatcher(&self) -> Result<BatchDispatcher, ApiError> {
        let generation = &self.config.generation;
        let provider_name = generation.provider.as_deref().ok_or_else(|| {
            ApiError::ProviderNotConfigured(
                "generation.provider is not set; add a [providers.<name>] section and point generation.provider at it"
                    .to_string(),
            )
        })?;
        let provider = self.config.provider(provider_name)?;
        let client = ProviderFactory::create_client(provider_name, provider)?;

        let mut registry = GeneratorRegistry::new();
        for entity_type in generation.registered_types() {
            registry = registry.register(
                entity_type,
                Arc::new(ProviderGenerator::new(
                    entity_type,
                    Arc::clone(&client),
                    provider.default_options.clone(),
                )),
            );
        }
        if let Some(fallback) = generation.fallback_entity_type {
            registry = registry.with_fallback(fallback)?;
        }

        Ok(BatchDispatcher::new(
            Arc::clone(&self.store) as Arc<dyn PipelineStore>,
            registry,
            self.quality_gate()?,
        )
        .with_call_timeout(Duration::from_secs(self.config.dispatch.call_timeout_secs)))
    }

    fn quality_gate(&self) -> Result<Arc<dyn QualityGate>, ApiError> {
        match self.config.quality.gate {
            GateKind::Rubric => Ok(Arc::new(RubricQualityGate::new())),
            GateKind::Provider => {
                let name = self.config.quality_provider().ok_or_else(|| {
                    ApiError::ProviderNotConfigured(
                        "quality.gate = \"provider\" needs quality.provider".to_string(),
                    )
                })?;
                let provider = self.config.provider(name)?;
                let client = ProviderFactory::create_client(name, provider)?;
                Ok(Arc::new(ProviderQualityGate::new(
                    client,
                    provider.default_options.clone(),
                )))
            }
        }
    }
}

fn new_runtime() -> Result<tokio::runtime::Runtime, ApiError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create async runtime: {}", e)))
}

fn read_json_file(path: &Path) -> Result<Value, ApiError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ApiError::InvalidRequest(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        ApiError::InvalidRequest(format!("{} is not valid JSON: {}", path.display(), e))
    })
}

fn prompt_rejection_reason() -> Result<String, ApiError> {
    use dialoguer::Input;

    Input::new()
        .with_prompt("Rejection reason (e.g. missing_legal_basis)")
        .interact_text()
        .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))
}
