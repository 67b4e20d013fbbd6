//! Tests for configuration resolution and graceful degradation
//!
//! Covers:
//! - Missing TOML files fall back to defaults without failing
//! - Priority order: command line, environment, TOML, compiled default
//! - Base URL validation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that touch WEBTAROT_* variables are marked with #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use webtarot_common::config::{
    load_toml_config, ClientConfig, ConfigOverrides, Strategy, TomlConfig,
    DEFAULT_BASE_URL, ENV_BASE_URL, ENV_CONFIG, ENV_DATA_DIR, ENV_STRATEGY,
};

fn clear_env() {
    env::remove_var(ENV_BASE_URL);
    env::remove_var(ENV_STRATEGY);
    env::remove_var(ENV_DATA_DIR);
    env::remove_var(ENV_CONFIG);
}

#[test]
fn test_missing_toml_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_toml_config(&dir.path().join("absent.toml")).unwrap();
    assert!(config.base_url.is_none());
    assert!(config.strategy.is_none());
    assert_eq!(config.polling.interval_ms, 1000);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
base_url = "https://tarot.example.com/"
strategy = "hybrid"

[polling]
timeout_ms = 5000
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.base_url.as_deref(), Some("https://tarot.example.com/"));
    assert_eq!(config.strategy, Some(Strategy::Hybrid));
    assert_eq!(config.polling.timeout_ms, 5000);
    // Unspecified values keep their defaults
    assert_eq!(config.polling.interval_ms, 1000);
    assert_eq!(config.polling.hybrid_interval_ms, 5000);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "strategy = \"carrier-pigeon\"").unwrap();
    assert!(load_toml_config(&path).is_err());
}

#[test]
#[serial]
fn test_resolve_with_no_overrides_uses_defaults() {
    clear_env();
    let config = ClientConfig::resolve_with(&ConfigOverrides::default(), TomlConfig::default())
        .unwrap();
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.strategy, Strategy::Push);
    assert!(!config.data_dir.as_os_str().is_empty());
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var(ENV_BASE_URL, "https://env.example.com");
    env::set_var(ENV_STRATEGY, "poll");
    env::set_var(ENV_DATA_DIR, "/tmp/webtarot-env");

    let toml = TomlConfig {
        base_url: Some("https://toml.example.com".to_string()),
        strategy: Some(Strategy::Hybrid),
        data_dir: Some(PathBuf::from("/tmp/webtarot-toml")),
        ..Default::default()
    };
    let config = ClientConfig::resolve_with(&ConfigOverrides::default(), toml).unwrap();
    assert_eq!(config.base_url, "https://env.example.com");
    assert_eq!(config.strategy, Strategy::Poll);
    assert_eq!(config.data_dir, PathBuf::from("/tmp/webtarot-env"));

    clear_env();
}

#[test]
#[serial]
fn test_command_line_overrides_env() {
    clear_env();
    env::set_var(ENV_BASE_URL, "https://env.example.com");
    env::set_var(ENV_STRATEGY, "poll");

    let overrides = ConfigOverrides {
        base_url: Some("http://cli.example.com/".to_string()),
        strategy: Some(Strategy::Hybrid),
        data_dir: Some(PathBuf::from("/tmp/webtarot-cli")),
        config_path: None,
    };
    let config = ClientConfig::resolve_with(&overrides, TomlConfig::default()).unwrap();
    assert_eq!(config.base_url, "http://cli.example.com");
    assert_eq!(config.strategy, Strategy::Hybrid);
    assert_eq!(config.data_dir, PathBuf::from("/tmp/webtarot-cli"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_strategy_is_error() {
    clear_env();
    env::set_var(ENV_STRATEGY, "sse");
    let result = ClientConfig::resolve_with(&ConfigOverrides::default(), TomlConfig::default());
    assert!(result.is_err());
    clear_env();
}

#[test]
#[serial]
fn test_zero_poll_interval_is_rejected() {
    clear_env();
    let mut toml = TomlConfig::default();
    toml.polling.interval_ms = 0;
    assert!(ClientConfig::resolve_with(&ConfigOverrides::default(), toml).is_err());
}

#[test]
#[serial]
fn test_zero_hybrid_interval_is_rejected() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[polling]\nhybrid_interval_ms = 0\n").unwrap();

    let toml = load_toml_config(&path).unwrap();
    let err = ClientConfig::resolve_with(&ConfigOverrides::default(), toml).unwrap_err();
    assert!(err.to_string().contains("hybrid_interval_ms"));
}

#[test]
#[serial]
fn test_resolve_reads_config_file_from_env() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "base_url = \"http://file.example.com:8080\"\n").unwrap();
    env::set_var(ENV_CONFIG, &path);

    let config = ClientConfig::resolve(&ConfigOverrides::default()).unwrap();
    assert_eq!(config.base_url, "http://file.example.com:8080");

    clear_env();
}
