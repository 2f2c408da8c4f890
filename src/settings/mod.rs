//! Settings module - layered configuration management.
//!
//! Provides:
//! - Typed config schema with serde defaults (TOML)
//! - Layered loading: defaults, config file, `RPLY__`-prefixed env vars
//! - Startup validation, including the fail-fast credential check

mod schema;

pub use schema::{
    AppConfig, BackendConfig, GeneratorConfig, GeneratorStrategy, LoggingConfig, RetryConfig,
    ServerConfig,
};

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use thiserror::Error;

const APP_NAME: &str = "rply";
const ENV_PREFIX: &str = "RPLY";

/// Environment variables consulted for the backend credential, in order.
const CREDENTIAL_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Configuration errors. All of these are fatal at startup; none of them is
/// ever produced per-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API credential: set GEMINI_API_KEY or GOOGLE_API_KEY, or backend.api_key")]
    MissingCredential,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Load the effective configuration: serde defaults, then the TOML file at
/// `path` (if present), then `RPLY__SECTION__KEY` environment overrides.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let built = Config::builder()
        .add_source(
            File::from(path)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let config: AppConfig = built.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Resolve the backend API credential.
///
/// The environment wins over the config file; an absent or empty credential
/// is a startup-time `ConfigError`, never a per-request failure.
pub fn resolve_api_key(config: &AppConfig) -> Result<String, ConfigError> {
    for var in CREDENTIAL_VARS {
        if let Ok(value) = env::var(var) {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }
    }

    match config.backend.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(ConfigError::MissingCredential),
    }
}

/// Resolve the config file path: explicit override, else the XDG config dir.
pub fn config_file_path(override_path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match override_path {
        Some(path) => {
            let expanded = expand_path(&path)?;
            if expanded.is_dir() {
                Ok(expanded.join("config.toml"))
            } else {
                Ok(expanded)
            }
        }
        None => Ok(default_config_dir()?.join("config.toml")),
    }
}

/// Write the default configuration file, creating parent directories.
pub fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = String::new();
    body.push_str("# Configuration for ");
    body.push_str(APP_NAME);
    body.push('\n');
    body.push_str("# File: ");
    body.push_str(&path.display().to_string());
    body.push_str("\n\n");
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn expand_path(path: &Path) -> anyhow::Result<PathBuf> {
    if let Some(text) = path.to_str() {
        let expanded = shellexpand::full(text).context("expanding path")?;
        Ok(PathBuf::from(expanded.to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn default_config_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow::anyhow!("unable to determine configuration directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_load_defaults_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.generator.strategy, GeneratorStrategy::Pipeline);
        assert_eq!(config.retry.attempts, 5);
    }

    #[test]
    fn test_load_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\n\n[generator]\nstrategy = \"single\"\nmodel = \"gemini-2.0-flash\"\n"
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.generator.strategy, GeneratorStrategy::Single);
        assert_eq!(config.generator.model, "gemini-2.0-flash");
        // Untouched sections keep their defaults
        assert_eq!(config.retry.retryable_status, vec![429, 500, 503, 504]);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[retry]\nattempts = 0\n").unwrap();
        assert!(matches!(load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[generator]\nmodel = \"\"\n").unwrap();
        assert!(matches!(load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_resolve_api_key_from_config() {
        let mut config = AppConfig::default();
        config.backend.api_key = Some("cfg-key".to_string());
        // Env vars may be set on developer machines; only assert the config
        // fallback when neither credential var is present.
        if CREDENTIAL_VARS.iter().all(|v| env::var(v).is_err()) {
            assert_eq!(resolve_api_key(&config).unwrap(), "cfg-key");
        }
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = AppConfig::default();
        if CREDENTIAL_VARS.iter().all(|v| env::var(v).is_err()) {
            assert!(matches!(
                resolve_api_key(&config),
                Err(ConfigError::MissingCredential)
            ));
        }
    }

    #[test]
    fn test_write_default_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_default_config(&path).unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.server.host, AppConfig::default().server.host);
    }
}
