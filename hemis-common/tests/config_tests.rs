//! Unit tests for configuration loading and graceful degradation
//!
//! Tests cover:
//! - Compiled defaults for every section
//! - Partial TOML files (omitted fields fall back to defaults)
//! - Environment variable overrides
//! - Validation of unusable values
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate HEMIS_* variables are marked with #[serial].

use hemis_common::config::{
    ConfigSource, TomlConfig, ENV_BASE_URL, ENV_LOG_LEVEL, ENV_PORT, ENV_TOKEN, MAX_CACHE_TTL_SECS,
};
use hemis_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;

fn clear_env() {
    env::remove_var(ENV_BASE_URL);
    env::remove_var(ENV_TOKEN);
    env::remove_var(ENV_PORT);
    env::remove_var(ENV_LOG_LEVEL);
}

#[test]
fn test_compiled_defaults() {
    let config = TomlConfig::default();

    assert_eq!(config.server.port, 5740);
    assert_eq!(config.aggregation.max_workers, 10);
    assert_eq!(config.aggregation.active_status_code, 11);
    assert_eq!(config.aggregation.cache_ttl_secs, 3600);
    assert_eq!(config.aggregation.max_attempts, 3);
    assert_eq!(config.upstream.timeout_secs, 15);
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        [upstream]
        base_url = "https://hemis.example.uz/rest"

        [aggregation]
        max_workers = 4
        "#,
    )
    .expect("partial config should parse");

    assert_eq!(config.upstream.base_url, "https://hemis.example.uz/rest");
    assert_eq!(config.upstream.timeout_secs, 15);
    assert_eq!(config.aggregation.max_workers, 4);
    assert_eq!(config.aggregation.max_attempts, 3);
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn test_malformed_toml_is_error() {
    let result = TomlConfig::from_toml_str("[aggregation\nmax_workers = ");
    assert!(matches!(result, Err(Error::Toml(_))));
}

#[test]
#[serial]
fn test_explicit_file_is_loaded() {
    clear_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[server]\nport = 6001\n\n[logging]\nlevel = \"debug\"\nfile = \"/tmp/hemis-stats.log\""
    )
    .unwrap();

    let (config, source) = TomlConfig::load(Some(file.path())).expect("explicit config should load");
    assert_eq!(source, ConfigSource::Explicit(file.path().to_path_buf()));
    assert_eq!(source.to_string(), file.path().display().to_string());
    assert_eq!(config.server.port, 6001);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.file.as_deref(),
        Some(std::path::Path::new("/tmp/hemis-stats.log"))
    );
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    clear_env();

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = TomlConfig::load(Some(&missing));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var(ENV_BASE_URL, "https://env.example.uz/rest");
    env::set_var(ENV_TOKEN, "secret-token");
    env::set_var(ENV_PORT, "7000");
    env::set_var(ENV_LOG_LEVEL, "trace");

    let mut config = TomlConfig::from_toml_str("[server]\nport = 6001").unwrap();
    config.apply_env_overrides();

    assert_eq!(config.upstream.base_url, "https://env.example.uz/rest");
    assert_eq!(config.upstream.token, "secret-token");
    assert_eq!(config.server.port, 7000);
    assert_eq!(config.logging.level, "trace");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_port_is_ignored() {
    clear_env();
    env::set_var(ENV_PORT, "not-a-port");

    let mut config = TomlConfig::default();
    config.apply_env_overrides();
    assert_eq!(config.server.port, 5740);

    clear_env();
}

#[test]
fn test_validation_rejects_zero_workers() {
    let mut config = TomlConfig::default();
    config.aggregation.max_workers = 0;
    assert!(matches!(config.validate(), Err(Error::Config(_))));

    let mut config = TomlConfig::default();
    config.aggregation.max_attempts = 0;
    assert!(config.validate().is_err());

    let mut config = TomlConfig::default();
    config.upstream.base_url = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_bounds_cache_ttl() {
    let mut config = TomlConfig::default();
    config.aggregation.cache_ttl_secs = MAX_CACHE_TTL_SECS;
    assert!(config.validate().is_ok());

    config.aggregation.cache_ttl_secs = u64::MAX;
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_oversized_ttl_file_is_rejected_on_load() {
    clear_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[aggregation]\ncache_ttl_secs = 9999999999").unwrap();

    let result = TomlConfig::load(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_compiled_defaults_source_display() {
    assert_eq!(ConfigSource::CompiledDefaults.to_string(), "compiled defaults");
}
