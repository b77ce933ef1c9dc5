//! API key resolution.
//!
//! Keys never live in the config file. The config names where to find them:
//!
//! 1. **File reference** for the Docker secrets pattern (`api_key_file: /run/secrets/openai`)
//! 2. **Env var reference** (`api_key_env: OPENAI_API_KEY`)

use secrecy::SecretString;
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need a file path or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a file first, then from an environment variable.
/// Surrounding whitespace is trimmed.
pub fn resolve_secret(file_path: Option<&str>, env_var: Option<&str>) -> Result<SecretString> {
    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return match fs::read_to_string(&expanded) {
            Ok(content) => Ok(SecretString::from(content.trim().to_string())),
            Err(e) => Err(SecretError::FileReadError {
                path: expanded,
                source: e,
            }),
        };
    }

    if let Some(var_name) = env_var.filter(|v| !v.is_empty()) {
        return match std::env::var(var_name) {
            Ok(value) => Ok(SecretString::from(value.trim())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but a missing source or unset variable yields
/// `None`. Unreadable files are still errors.
pub fn resolve_secret_optional(
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) | Err(SecretError::EnvVarNotSet { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Expands a leading `~` to the home directory. `~user/path` is not supported.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  file_value  ").unwrap();
        std::env::set_var("DECKGEN_TEST_SECRET_1", "env_value");

        let secret = resolve_secret(
            Some(file.path().to_str().unwrap()),
            Some("DECKGEN_TEST_SECRET_1"),
        )
        .unwrap();
        assert_eq!(secret.expose_secret(), "file_value");

        std::env::remove_var("DECKGEN_TEST_SECRET_1");
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("DECKGEN_TEST_SECRET_2", "env_value\n");
        let secret = resolve_secret(None, Some("DECKGEN_TEST_SECRET_2")).unwrap();
        assert_eq!(secret.expose_secret(), "env_value");
        std::env::remove_var("DECKGEN_TEST_SECRET_2");
    }

    #[test]
    fn test_no_source_error() {
        assert!(matches!(
            resolve_secret(None, Some("")),
            Err(SecretError::NoSourceProvided)
        ));
    }

    #[test]
    #[serial]
    fn test_optional_tolerates_unset_var() {
        std::env::remove_var("DECKGEN_TEST_SECRET_UNSET");
        let secret = resolve_secret_optional(None, Some("DECKGEN_TEST_SECRET_UNSET")).unwrap();
        assert!(secret.is_none());
    }

    #[test]
    fn test_optional_still_reports_unreadable_file() {
        let result = resolve_secret_optional(Some("/nonexistent/deckgen/key"), None);
        assert!(matches!(result, Err(SecretError::FileReadError { .. })));
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home("~/keys/openai");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("keys/openai"));
        assert_eq!(expand_home("/abs/path"), "/abs/path");
    }
}
