//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{GuestbookConfig, Network};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV_VAR: &str = "GUESTBOOK_CONFIG";

/// Environment variable overriding `app.network`.
pub const NETWORK_ENV_VAR: &str = "GUESTBOOK_NETWORK";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML string, without validation.
pub fn parse_config(content: &str) -> Result<GuestbookConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuestbookConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the configuration for the service binary.
///
/// The file comes from `explicit`, else `GUESTBOOK_CONFIG`, else defaults.
/// `GUESTBOOK_NETWORK` then overrides the network and the result is validated.
pub fn load_effective_config(explicit: Option<&Path>) -> Result<GuestbookConfig, ConfigError> {
    let from_env = std::env::var_os(CONFIG_PATH_ENV_VAR).map(PathBuf::from);
    let path = explicit.map(Path::to_path_buf).or(from_env);

    let mut config = match &path {
        Some(p) => {
            let content = fs::read_to_string(p).map_err(|source| ConfigError::Io {
                path: p.clone(),
                source,
            })?;
            parse_config(&content)?
        }
        None => GuestbookConfig::default(),
    };

    if let Ok(value) = std::env::var(NETWORK_ENV_VAR) {
        config.app.network = value.parse::<Network>().map_err(|message| ConfigError::Env {
            var: NETWORK_ENV_VAR,
            message,
        })?;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        path = ?path,
        network = %config.app.network,
        "Configuration resolved"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/guestbook.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/guestbook.toml"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[app\nname = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_and_validate_file() {
        let path = std::env::temp_dir().join(format!("guestbook-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"
            [app]
            message_max_length = 0

            [listener]
            bind_address = "127.0.0.1:0"
            "#,
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).unwrap_or_default();

        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "app.message_max_length");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
