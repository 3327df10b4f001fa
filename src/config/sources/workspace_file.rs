//! Workspace config file source: `config/config.toml`, then `config/{env}.toml`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_VAR: &str = "DRAFTLINE_ENV";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";

/// Active environment name from `DRAFTLINE_ENV`, `development` when unset or blank.
pub fn environment_name() -> String {
    std::env::var(ENV_VAR)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

/// Candidate files for a workspace, lowest precedence first.
pub fn workspace_config_paths(workspace_root: &Path, env_name: &str) -> [PathBuf; 2] {
    let dir = workspace_root.join(CONFIG_DIR);
    [dir.join("config.toml"), dir.join(format!("{env_name}.toml"))]
}

/// Layer whichever workspace files exist onto the builder.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let env_name = environment_name();
    let builder = workspace_config_paths(workspace_root, &env_name)
        .into_iter()
        .filter(|path| path.is_file())
        .fold(builder, |builder, path| {
            debug!(config_path = %path.display(), env = %env_name, "Workspace configuration file");
            builder.add_source(File::from(path.as_path()).required(false))
        });
    Ok(builder)
}
