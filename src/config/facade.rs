//! Config loading entry points.

use crate::config::merge::builder_with_defaults;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::PipelineConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for a workspace.
    ///
    /// Precedence, lowest first: built-in defaults, global file, workspace
    /// `config/config.toml`, workspace `config/{DRAFTLINE_ENV}.toml`,
    /// `DRAFTLINE__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<PipelineConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace_root = %workspace_root.display(),
            providers = config.providers.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single file over the built-in defaults, skipping every other source.
    pub fn load_from_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
