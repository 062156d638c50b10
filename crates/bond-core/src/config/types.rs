//! Configuration types

use serde::{Deserialize, Serialize};

use crate::notification::Category;
use crate::registration::DEFAULT_RETRY_INTERVAL;
use crate::transport::DEFAULT_ENDPOINT;

/// Complete agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent name registered with `sdk_mgr`
    pub name: String,
    /// NDK service manager endpoint
    pub endpoint: String,
    /// Seconds between registration attempts
    pub retry_interval_secs: u64,
    /// Ask `sdk_mgr` to wait for configuration acknowledgements
    pub wait_config_ack: bool,
    /// Ask `sdk_mgr` to publish configuration as state
    pub auto_telemetry_state: bool,
    /// Ask `sdk_mgr` to cache notifications
    pub enable_cache: bool,
    /// Heartbeat settings; absent disables the watchdog
    pub keepalive: Option<KeepAliveConfig>,
    /// Notification categories to start
    pub notifications: NotificationsConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            retry_interval_secs: DEFAULT_RETRY_INTERVAL.as_secs(),
            wait_config_ack: false,
            auto_telemetry_state: false,
            enable_cache: false,
            keepalive: None,
            notifications: NotificationsConfig::default(),
        }
    }
}

/// `[keepalive]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAliveConfig {
    pub interval_secs: u64,
    pub threshold: u32,
}

/// `[notifications]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Categories started in addition to configuration
    pub categories: Vec<Category>,
}
