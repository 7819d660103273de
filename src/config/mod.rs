mod basic;
mod sync;

pub use basic::BasicConfig;
pub use sync::SyncConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Change propagation and view refresh settings (see `sync` table in config.toml).
    #[serde(default)]
    pub sync: SyncConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }

    /// Clamp values that would make the runtime misbehave.
    fn normalized(mut self) -> Self {
        if self.sync.channel_name.trim().is_empty() {
            self.sync.channel_name = SyncConfig::default().channel_name;
        }
        self.sync.history_limit = self.sync.history_limit.max(1);
        self.sync.bus_capacity = self.sync.bus_capacity.max(1);
        self
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::from_optional_toml().normalized());
