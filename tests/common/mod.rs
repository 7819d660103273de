#![allow(dead_code)]

use patient_registry::config::Config;
use patient_registry::service::{RegistryState, RegistryViewModel};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Temporary SQLite file, removed (with its WAL/SHM siblings) on drop.
pub struct TempDb {
    pub path: PathBuf,
    pub url: String,
}

impl TempDb {
    pub fn new(tag: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();

        let mut path = std::env::temp_dir();
        path.push(format!(
            "patient-registry-{tag}-{}-{nanos}.sqlite",
            std::process::id()
        ));
        let url = format!("sqlite:{}", path.display());
        Self { path, url }
    }

    pub fn config(&self) -> Config {
        let mut cfg = Config::default();
        cfg.basic.database_url = self.url.clone();
        cfg.sync.refresh_debounce_ms = 5;
        cfg.sync.settle_timeout_ms = 500;
        cfg
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

pub const WAIT: Duration = Duration::from_secs(5);

/// Wait until the registry shows exactly `count` patients.
pub async fn wait_for_count(registry: &RegistryViewModel, count: usize) -> RegistryState {
    tokio::time::timeout(
        WAIT,
        registry.wait_for(|s| s.patients().is_some_and(|p| p.len() == count)),
    )
    .await
    .unwrap_or_else(|_| panic!("registry never reached {count} rows: {:?}", registry.state()))
}
