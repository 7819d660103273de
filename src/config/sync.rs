use serde::{Deserialize, Serialize};
use crate::service::RefreshTiming;
use std::time::Duration;

/// Settings for change notification and registry refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Name of the broadcast channel sessions use to announce changes.
    /// TOML: `sync.channel_name`. Default: `patient-db-sync`.
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Delay before a requested registry refresh runs; triggers arriving
    /// within the window collapse into one fetch.
    /// TOML: `sync.refresh_debounce_ms`. Default: `50`.
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,

    /// How long a registry read waits for an in-flight refresh before answering
    /// with the current snapshot.
    /// TOML: `sync.settle_timeout_ms`. Default: `5000`.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,

    /// Number of raw SQL statements remembered by the console.
    /// TOML: `sync.history_limit`. Default: `10`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Capacity of the in-process broadcast buffer.
    /// TOML: `sync.bus_capacity`. Default: `64`.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl SyncConfig {
    pub fn refresh_timing(&self) -> RefreshTiming {
        RefreshTiming {
            debounce: Duration::from_millis(self.refresh_debounce_ms),
            settle_timeout: Duration::from_millis(self.settle_timeout_ms),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            refresh_debounce_ms: default_refresh_debounce_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
            history_limit: default_history_limit(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

fn default_channel_name() -> String {
    "patient-db-sync".to_string()
}

fn default_refresh_debounce_ms() -> u64 {
    50
}

fn default_settle_timeout_ms() -> u64 {
    5000
}

fn default_history_limit() -> usize {
    10
}

fn default_bus_capacity() -> usize {
    64
}
