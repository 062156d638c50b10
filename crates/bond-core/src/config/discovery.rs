//! Configuration discovery and resolution

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use super::types::AgentConfig;

/// Config file picked up from the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "bond.toml";

/// Environment variable overriding the agent name.
pub const ENV_AGENT_NAME: &str = "BOND_AGENT_NAME";

/// Environment variable overriding the NDK endpoint.
pub const ENV_NDK_ENDPOINT: &str = "BOND_NDK_ENDPOINT";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Resolved configuration is unusable
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Path to config file override
    pub config_path: Option<PathBuf>,
    /// Override agent name
    pub name: Option<String>,
    /// Override NDK endpoint
    pub endpoint: Option<String>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables
/// 3. Config file: `overrides.config_path`, or `bond.toml` in `current_dir`
/// 4. Defaults
///
/// An explicit config path must load. The implicit `bond.toml` is skipped
/// with a warning when it cannot be parsed.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    current_dir: &Path,
) -> Result<AgentConfig, ConfigError> {
    // 3. Config file
    let mut config = match &overrides.config_path {
        Some(path) => load_config_file(path)?,
        None => {
            let local = current_dir.join(CONFIG_FILE_NAME);
            if local.exists() {
                load_config_file(&local).unwrap_or_else(|e| {
                    warn!("Failed to parse config at {local:?}: {e}");
                    AgentConfig::default()
                })
            } else {
                AgentConfig::default()
            }
        }
    };

    // 2. Environment variables
    apply_env_overrides(&mut config);

    // 1. Command-line overrides
    apply_cli_overrides(&mut config, overrides);

    validate(&config)?;
    Ok(config)
}

/// Load config from a TOML file
pub fn load_config_file(path: &Path) -> Result<AgentConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AgentConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Apply environment variable overrides
fn apply_env_overrides(config: &mut AgentConfig) {
    if let Ok(name) = std::env::var(ENV_AGENT_NAME) {
        config.name = name;
    }

    if let Ok(endpoint) = std::env::var(ENV_NDK_ENDPOINT) {
        config.endpoint = endpoint;
    }
}

/// Apply command-line overrides
fn apply_cli_overrides(config: &mut AgentConfig, overrides: &ConfigOverrides) {
    if let Some(ref name) = overrides.name {
        config.name = name.clone();
    }

    if let Some(ref endpoint) = overrides.endpoint {
        config.endpoint = endpoint.clone();
    }
}

fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(format!(
            "agent name is required (set `name`, {ENV_AGENT_NAME} or --name)"
        )));
    }
    if config.retry_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "retry_interval_secs must be greater than zero".to_string(),
        ));
    }
    if let Some(keepalive) = config.keepalive {
        if keepalive.interval_secs == 0 || keepalive.threshold == 0 {
            return Err(ConfigError::Validation(
                "keepalive interval_secs and threshold must both be greater than zero".to_string(),
            ));
        }
    }
    Ok(())
}
