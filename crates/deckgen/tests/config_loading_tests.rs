//! Table-driven tests for configuration loading and validation.

mod common;

use std::path::Path;

use common::{ConfigBuilder, TestHarness};

use deckgen::config::{load_config, load_config_from_str, load_config_or_default};
use deckgen::ConfigError;

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    config_json: &'static str,
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object_uses_defaults",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "data_directory": "/srv/deckgen",
            "output_directory": "/srv/decks",
            "completion": {
                "api_base": "http://localhost:8080/v1",
                "api_key_env": null,
                "model": "local-model",
                "timeout_secs": 120
            },
            "research": {
                "sources": ["wikipedia", "arxiv"],
                "max_results": 5,
                "rate_limit_ms": 250,
                "request_timeout_secs": 5,
                "cache_ttl_hours": 12
            },
            "images": { "enabled": false },
            "translation": { "endpoint": "https://translate.test", "cache_ttl_hours": 48 },
            "speech": { "model": "tts-1-hd" },
            "generation": { "stale_after_hours": 3, "recent_log_limit": 5, "max_slides": 20 }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "wrong_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_top_level_field",
        config_json: r#"{ "workers": 4 }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_research_source",
        config_json: r#"{ "research": { "sources": ["bing"] } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "empty_sources",
        config_json: r#"{ "research": { "sources": [] } }"#,
        should_succeed: false,
        expected_error: Some("At least one research source"),
    },
    ConfigTestCase {
        name: "log_limit_above_ten",
        config_json: r#"{ "generation": { "recent_log_limit": 11 } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "completion_base_not_http",
        config_json: r#"{ "completion": { "api_base": "ftp://example.test" } }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "version": "1.0""#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
];

#[test]
fn test_config_loading() {
    for test_case in CONFIG_TESTS {
        let result = load_config_from_str(test_case.config_json);

        if test_case.should_succeed {
            assert!(
                result.is_ok(),
                "Test '{}' should succeed but failed: {:?}",
                test_case.name,
                result.err()
            );
        } else {
            let err = result.expect_err(&format!("Test '{}' should fail", test_case.name));
            if let Some(expected) = test_case.expected_error {
                let message = err.to_string();
                assert!(
                    message.contains(expected),
                    "Test '{}': expected error containing '{}', got '{}'",
                    test_case.name,
                    expected,
                    message
                );
            }
        }
    }
}

#[test]
fn test_full_config_values() {
    let full = CONFIG_TESTS
        .iter()
        .find(|t| t.name == "valid_full")
        .unwrap();
    let config = load_config_from_str(full.config_json).unwrap();

    assert_eq!(config.research.sources, vec!["wikipedia", "arxiv"]);
    assert_eq!(config.research.max_results, 5);
    assert!(!config.images.enabled);
    assert_eq!(config.generation.max_slides, 20);
    assert!(config.completion.api_key_env.is_none());
    assert_eq!(
        config.database_file(),
        Path::new("/srv/deckgen").join("data").join("deckgen.db")
    );
    assert_eq!(config.output_dir(), Path::new("/srv/decks"));
}

#[test]
fn test_written_config_loads_back() {
    let harness = TestHarness::new();
    let data_dir = harness.temp_path().join("data-root");
    let builder = ConfigBuilder::new()
        .data_directory(&data_dir.to_string_lossy())
        .sources(&["duckduckgo"])
        .max_slides(12)
        .recent_log_limit(3);
    let path = harness.write_config("deckgen.json", &builder.to_json());

    let config = load_config(&path).unwrap();
    assert_eq!(config.research.sources, vec!["duckduckgo"]);
    assert_eq!(config.generation.max_slides, 12);
    assert_eq!(config.generation.recent_log_limit, 3);
    assert!(config.database_file().starts_with(&data_dir));
}

#[test]
fn test_missing_file_and_default_fallback() {
    let harness = TestHarness::new();
    let missing = harness.config_dir.join("absent.json");

    assert!(matches!(
        load_config(&missing),
        Err(ConfigError::ReadFile { .. })
    ));
    assert!(load_config_or_default(Some(&missing)).is_err());

    let config = load_config_or_default(None).unwrap();
    assert_eq!(config.version, "1.0");
    assert!(!config.research.sources.is_empty());
}

#[test]
fn test_translation_key_requires_endpoint() {
    let json = r#"{ "translation": { "api_key_env": "TRANSLATE_KEY" } }"#;
    let err = load_config_from_str(json).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }), "{}", err);

    let with_endpoint = ConfigBuilder::new()
        .translation_endpoint("https://translate.test")
        .to_json();
    assert!(load_config_from_str(&with_endpoint).is_ok());
}
