// Path: crates/types/src/config.rs

//! Shared configuration structures for the access and account components.

use serde::{Deserialize, Serialize};

/// Configuration of the account client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    /// Base URL of the account server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Whether a successful login may auto-enable the relay subsystem when
    /// the user's plan permits it.
    #[serde(default)]
    pub enable_after_login: bool,
}

fn default_base_url() -> String {
    "https://account.veil.network".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            enable_after_login: false,
        }
    }
}

/// Configuration of the access subsystem.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Whether the relay subsystem is enabled
    /// (mirrors the `spn/enable` configuration key).
    #[serde(default)]
    pub enabled: bool,
    /// Zones whose inventories are persisted across restarts. Defaults to
    /// the primary expand/connect zones.
    #[serde(default = "default_persist_zones")]
    pub persist_zones: Vec<String>,
}

fn default_persist_zones() -> Vec<String> {
    vec!["pblind1".to_string(), "alpha2".to_string()]
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            persist_zones: default_persist_zones(),
        }
    }
}
