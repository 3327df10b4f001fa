//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key; tables merge, scalars and
/// arrays replace.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("dispatch.batch_size", 5)?
        .set_default("dispatch.auto_approve", false)?
        .set_default("dispatch.min_quality_score", 70)?
        .set_default("dispatch.call_timeout_secs", 120)?
        .set_default("dispatch.stale_after_minutes", 30)?
        .set_default("quality.gate", "rubric")?
        .set_default("storage.store_path", ".draftline/store")
}
