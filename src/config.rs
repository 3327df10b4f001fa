//! Configuration System
//!
//! Layered configuration for providers, generators, the quality gate, dispatch
//! defaults, storage and logging. Sources are merged by the `config` crate
//! (see [`ConfigLoader`]) and checked as a whole by
//! [`PipelineConfig::validate`].

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::types::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::workspace_file::ENV_VAR;

const REDACTED: &str = "********";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model provider configurations, by name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which provider backs the generators and which entity types get one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider name from `providers`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Entity types to register; every type when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Vec<EntityType>>,

    /// Registered type whose generator stands in for unregistered types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_entity_type: Option<EntityType>,
}

impl GenerationConfig {
    pub fn registered_types(&self) -> Vec<EntityType> {
        self.entity_types
            .clone()
            .unwrap_or_else(|| EntityType::ALL.to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Offline field-completeness rubric
    #[default]
    Rubric,
    /// Model-graded assessment
    Provider,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default)]
    pub gate: GateKind,

    /// Provider for `gate = "provider"`; defaults to the generation provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Defaults for dispatch requests and the recovery sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub auto_approve: bool,

    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: u8,

    /// Timeout applied to each generator and quality-gate call
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Age after which an in-progress claim counts as abandoned
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

fn default_batch_size() -> usize {
    5
}

fn default_min_quality_score() -> u8 {
    70
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_stale_after_minutes() -> u64 {
    30
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            auto_approve: false,
            min_quality_score: default_min_quality_score(),
            call_timeout_secs: default_call_timeout_secs(),
            stale_after_minutes: default_stale_after_minutes(),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Sled database directory; relative paths resolve against the workspace
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".draftline/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

impl StorageConfig {
    pub fn resolve(&self, workspace_root: &Path) -> PathBuf {
        if self.store_path.is_absolute() {
            self.store_path.clone()
        } else {
            workspace_root.join(&self.store_path)
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String, String),
    Generation(String),
    Quality(String),
    Dispatch(String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(name, msg) => write!(f, "Provider '{}': {}", name, msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Quality(msg) => write!(f, "Quality: {}", msg),
            ValidationError::Dispatch(msg) => write!(f, "Dispatch: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PipelineConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, provider) in &self.providers {
            if let Err(e) = provider.validate() {
                errors.push(ValidationError::Provider(name.clone(), e));
            }
        }

        if let Some(name) = &self.generation.provider {
            if !self.providers.contains_key(name) {
                errors.push(ValidationError::Generation(format!(
                    "unknown provider '{}'",
                    name
                )));
            }
        }
        if let Some(types) = &self.generation.entity_types {
            if types.is_empty() {
                errors.push(ValidationError::Generation(
                    "entity_types cannot be empty".to_string(),
                ));
            }
        }
        if let Some(fallback) = self.generation.fallback_entity_type {
            if !self.generation.registered_types().contains(&fallback) {
                errors.push(ValidationError::Generation(format!(
                    "fallback entity type '{}' is not registered",
                    fallback
                )));
            }
        }

        if self.quality.gate == GateKind::Provider {
            match self.quality_provider() {
                None => errors.push(ValidationError::Quality(
                    "provider gate needs quality.provider or generation.provider".to_string(),
                )),
                Some(name) if !self.providers.contains_key(name) => errors.push(
                    ValidationError::Quality(format!("unknown provider '{}'", name)),
                ),
                Some(_) => {}
            }
        }

        let dispatch = &self.dispatch;
        if dispatch.batch_size == 0 {
            errors.push(ValidationError::Dispatch(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if dispatch.min_quality_score > 100 {
            errors.push(ValidationError::Dispatch(format!(
                "min_quality_score {} is above 100",
                dispatch.min_quality_score
            )));
        }
        if dispatch.call_timeout_secs == 0 {
            errors.push(ValidationError::Dispatch(
                "call_timeout_secs must be at least 1".to_string(),
            ));
        }
        if dispatch.stale_after_minutes == 0 {
            errors.push(ValidationError::Dispatch(
                "stale_after_minutes must be at least 1".to_string(),
            ));
        }
        if dispatch.max_attempts == Some(0) {
            errors.push(ValidationError::Dispatch(
                "max_attempts must be at least 1 when set".to_string(),
            ));
        }

        if self.storage.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "store_path cannot be empty".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `validate` folded into a single `ApiError::ConfigError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }

    /// Provider name backing the provider quality gate.
    pub fn quality_provider(&self) -> Option<&str> {
        self.quality
            .provider
            .as_deref()
            .or(self.generation.provider.as_deref())
    }

    pub fn provider(&self, name: &str) -> Result<&ProviderConfig, ApiError> {
        self.providers
            .get(name)
            .ok_or_else(|| ApiError::ProviderNotConfigured(name.to_string()))
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for provider in copy.providers.values_mut() {
            if provider.api_key.is_some() {
                provider.api_key = Some(REDACTED.to_string());
            }
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ApiError> {
        toml::to_string_pretty(self)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render configuration: {}", e)))
    }
}
