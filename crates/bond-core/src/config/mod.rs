//! Configuration resolution
//!
//! Resolves agent configuration from multiple sources with priority:
//! 1. Command-line flags (passed as parameters)
//! 2. Environment variables (`BOND_AGENT_NAME`, `BOND_NDK_ENDPOINT`)
//! 3. Config file (`--config <PATH>`, or `bond.toml` in the working directory)
//! 4. Defaults

mod discovery;
mod types;

pub use discovery::{
    CONFIG_FILE_NAME, ConfigError, ConfigOverrides, ENV_AGENT_NAME, ENV_NDK_ENDPOINT,
    load_config_file, resolve_config,
};
pub use types::{AgentConfig, KeepAliveConfig, NotificationsConfig};
