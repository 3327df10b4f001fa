//! Integration tests for configuration loading and validation

use draftline::config::{ConfigLoader, GateKind, ProviderType};
use draftline::types::EntityType;
use tempfile::TempDir;

#[test]
fn test_workspace_config_file_is_layered_over_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        r#"
[providers.local]
provider_type = "ollama"
model = "llama3"
endpoint = "http://localhost:11434/v1"

[generation]
provider = "local"
entity_types = ["challenge", "pilot"]
fallback_entity_type = "challenge"

[dispatch]
batch_size = 12
auto_approve = true
"#,
    )
    .unwrap();

    let config = ConfigLoader::load(temp_dir.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.dispatch.batch_size, 12);
    assert!(config.dispatch.auto_approve);
    // Untouched keys keep their defaults
    assert_eq!(config.dispatch.min_quality_score, 70);
    assert_eq!(config.quality.gate, GateKind::Rubric);
    assert_eq!(
        config.generation.registered_types(),
        vec![EntityType::Challenge, EntityType::Pilot]
    );
    assert_eq!(config.providers["local"].provider_type, ProviderType::Ollama);
}

#[test]
fn test_load_from_file_reports_every_problem() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("draftline.toml");
    std::fs::write(
        &config_file,
        r#"
[generation]
provider = "missing"
fallback_entity_type = "policy"
entity_types = ["pilot"]

[quality]
gate = "provider"

[dispatch]
batch_size = 0
min_quality_score = 140
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert!(messages.iter().any(|m| m.contains("unknown provider 'missing'")));
    assert!(messages.iter().any(|m| m.contains("fallback entity type")));
    assert!(messages.iter().any(|m| m.contains("batch_size")));
    assert!(messages.iter().any(|m| m.contains("min_quality_score")));
    assert!(config.ensure_valid().is_err());
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_redacted_config_masks_api_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("draftline.toml");
    std::fs::write(
        &config_file,
        r#"
[providers.cloud]
provider_type = "openai"
model = "gpt-4o-mini"
api_key = "sk-very-secret"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let rendered = config.redacted().to_toml().unwrap();
    assert!(!rendered.contains("sk-very-secret"));
    assert!(rendered.contains("gpt-4o-mini"));
}
