use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Loads `path` if given, else the defaults.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.research.sources.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one research source is required".to_string(),
        });
    }

    if config.generation.recent_log_limit == 0 || config.generation.recent_log_limit > 10 {
        return Err(ConfigError::Validation {
            message: format!(
                "recent_log_limit must be between 1 and 10, got {}",
                config.generation.recent_log_limit
            ),
        });
    }

    if config.translation.api_key_env.is_some() && config.translation.endpoint.is_none() {
        return Err(ConfigError::Validation {
            message: "translation.api_key_env is set but translation.endpoint is missing"
                .to_string(),
        });
    }

    for (name, ttl) in [
        ("research", config.research.cache_ttl_hours),
        ("images", config.images.cache_ttl_hours),
        ("translation", config.translation.cache_ttl_hours),
    ] {
        if ttl < 0 {
            return Err(ConfigError::Validation {
                message: format!("{}.cache_ttl_hours must not be negative", name),
            });
        }
    }

    Ok(())
}
