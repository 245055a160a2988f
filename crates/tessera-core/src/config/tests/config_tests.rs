use std::path::Path;

use tempfile::tempdir;

use crate::config::error::ConfigError;
use crate::config::{ConfigFormat, LoaderConfig, StopStrategy};

#[test]
fn test_default_config() {
    let config = LoaderConfig::default();
    assert_eq!(config.anonymous_prefix, "anonymous");
    assert_eq!(config.stop_strategy, StopStrategy::Sequential);
    assert!(config.validate().is_ok());
}

#[test]
fn test_format_from_path() {
    assert_eq!(ConfigFormat::from_path(Path::new("loader.json")), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_path(Path::new("LOADER.JSON")), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_path(Path::new("loader.yml")), Some(ConfigFormat::Yaml));
    assert_eq!(ConfigFormat::from_path(Path::new("loader.yaml")), Some(ConfigFormat::Yaml));
    assert_eq!(ConfigFormat::from_path(Path::new("loader.toml")), Some(ConfigFormat::Toml));
    assert_eq!(ConfigFormat::from_path(Path::new("loader.ini")), None);
    assert_eq!(ConfigFormat::from_path(Path::new("loader")), None);
}

#[test]
fn test_parse_json_with_missing_keys_uses_defaults() {
    let config = LoaderConfig::parse(r#"{ "stop_strategy": "tiered" }"#, ConfigFormat::Json)
        .expect("partial config should parse");
    assert_eq!(config.stop_strategy, StopStrategy::Tiered);
    assert_eq!(config.anonymous_prefix, "anonymous");
}

#[test]
fn test_parse_toml_and_yaml() {
    let toml = "anonymous_prefix = \"anon\"\nstop_strategy = \"tiered\"\n";
    let config = LoaderConfig::parse(toml, ConfigFormat::Toml).expect("TOML config should parse");
    assert_eq!(config.anonymous_prefix, "anon");
    assert_eq!(config.stop_strategy, StopStrategy::Tiered);

    let yaml = "anonymous_prefix: unnamed\nstop_strategy: sequential\n";
    let config = LoaderConfig::parse(yaml, ConfigFormat::Yaml).expect("YAML config should parse");
    assert_eq!(config.anonymous_prefix, "unnamed");
    assert_eq!(config.stop_strategy, StopStrategy::Sequential);
}

#[test]
fn test_parse_rejects_unknown_strategy() {
    let result = LoaderConfig::parse(r#"{ "stop_strategy": "random" }"#, ConfigFormat::Json);
    assert!(matches!(result, Err(ConfigError::DeserializationError { .. })));
}

#[test]
fn test_parse_rejects_invalid_prefix() {
    let result = LoaderConfig::parse(r#"{ "anonymous_prefix": "no spaces" }"#, ConfigFormat::Json);
    match result {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "anonymous_prefix"),
        other => panic!("Expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_serialize_then_parse_keeps_settings() {
    let config = LoaderConfig {
        anonymous_prefix: "worker".to_string(),
        stop_strategy: StopStrategy::Tiered,
    };
    for format in [ConfigFormat::Json, ConfigFormat::Toml, ConfigFormat::Yaml] {
        let text = config.to_string_as(format).expect("serialization should succeed");
        let parsed = LoaderConfig::parse(&text, format).expect("serialized config should parse");
        assert_eq!(parsed, config, "{} output should parse back", format.name());
    }
}

#[test]
fn test_from_path() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("loader.toml");
    std::fs::write(&path, "stop_strategy = \"tiered\"\n").expect("Failed to write config");

    let config = LoaderConfig::from_path(&path).expect("config file should load");
    assert_eq!(config.stop_strategy, StopStrategy::Tiered);
}

#[test]
fn test_from_path_errors() {
    let dir = tempdir().expect("Failed to create temp directory");

    let missing = LoaderConfig::from_path(&dir.path().join("absent.json"));
    assert!(matches!(missing, Err(ConfigError::Io { .. })));

    let unsupported = dir.path().join("loader.ini");
    std::fs::write(&unsupported, "x=1").expect("Failed to write config");
    assert!(matches!(
        LoaderConfig::from_path(&unsupported),
        Err(ConfigError::UnsupportedConfigFormat(_))
    ));
}
