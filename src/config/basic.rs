use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Listen address of the local presentation adapter.
    /// TOML: `basic.listen_addr`. Default: `127.0.0.1`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// Listen port of the local presentation adapter.
    /// TOML: `basic.listen_port`. Default: `8188`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// SQLite database URL shared by every session.
    /// TOML: `basic.database_url`. Default: `sqlite://patient-db.sqlite`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: default_database_url(),
            loglevel: default_loglevel(),
        }
    }
}

fn default_listen_ip() -> IpAddr {
    Ipv4Addr::LOCALHOST.into()
}

fn default_listen_port() -> u16 {
    8188
}

fn default_database_url() -> String {
    "sqlite://patient-db.sqlite".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}
