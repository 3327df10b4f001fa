//! Error types for the draftline generation pipeline.

use crate::types::{EntityType, QueueStatus};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Queue item already exists: {0}")]
    DuplicateItem(String),

    #[error("Corrupt record under key {key}: {message}")]
    CorruptRecord { key: String, message: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors surfaced by pipeline operations
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("Queue item not found: {0}")]
    ItemNotFound(String),

    #[error("Queue item {id} is {actual}; expected one of: {expected}")]
    TransitionRefused {
        id: String,
        actual: QueueStatus,
        expected: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No generator registered for entity type '{0}'")]
    GeneratorNotRegistered(EntityType),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Quality gate failed: {0}")]
    QualityGateFailed(String),

    #[error("Timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::StorageError(err.to_string())
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl ApiError {
    /// Short machine-readable tag recorded alongside per-item failures.
    pub fn tag(&self) -> &'static str {
        match self {
            ApiError::ItemNotFound(_) => "item_not_found",
            ApiError::TransitionRefused { .. } => "transition_refused",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::GeneratorNotRegistered(_) => "generator_not_registered",
            ApiError::GenerationFailed(_) => "generation_failed",
            ApiError::MalformedOutput(_) => "malformed_output",
            ApiError::QualityGateFailed(_) => "quality_gate_failed",
            ApiError::Timeout { .. } => "timeout",
            ApiError::ProviderError(_)
            | ApiError::ProviderNotConfigured(_)
            | ApiError::ProviderRequestFailed(_)
            | ApiError::ProviderAuthFailed(_)
            | ApiError::ProviderRateLimit(_) => "provider_error",
            ApiError::StorageError(_) => "storage_error",
            ApiError::ConfigError(_) => "config_error",
        }
    }
}
