use crate::config::Config;
use crate::db::{self, StorageHandle};
use crate::error::RegistryError;
use crate::service::{PatientMutations, QueryExecutor, RegistryViewModel, SqlConsole};
use crate::sync::{ChangeNotifier, ChannelHub};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// One open view of the registry (the equivalent of a browser tab).
///
/// Each session owns its own storage connection to the shared database file and its
/// own view model; sessions opened on the same [`ChannelHub`] hear each other's writes.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    storage: StorageHandle,
    executor: QueryExecutor,
    registry: RegistryViewModel,
    console: Arc<Mutex<SqlConsole>>,
}

impl Session {
    pub async fn open(cfg: &Config, hub: &ChannelHub) -> Result<Self, RegistryError> {
        let id = Uuid::new_v4();
        let storage = db::open(&cfg.basic.database_url).await?;
        let bus = hub.channel(&cfg.sync.channel_name);
        let notifier = Arc::new(ChangeNotifier::new(Arc::new(bus)));
        let executor = QueryExecutor::new(storage.clone(), notifier);
        let registry = RegistryViewModel::mount(executor.clone(), cfg.sync.refresh_timing());
        let console = Arc::new(Mutex::new(SqlConsole::new(
            executor.clone(),
            cfg.sync.history_limit,
        )));

        info!(
            session = %id,
            database_url = %cfg.basic.database_url,
            channel = %cfg.sync.channel_name,
            "Session opened"
        );

        Ok(Self {
            id,
            storage,
            executor,
            registry,
            console,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &RegistryViewModel {
        &self.registry
    }

    pub fn mutations(&self) -> &PatientMutations {
        self.registry.mutations()
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        self.executor.notifier()
    }

    pub fn console(&self) -> &Arc<Mutex<SqlConsole>> {
        &self.console
    }

    /// Unmount the view model and close the storage connection.
    pub async fn close(&self) {
        self.registry.unmount();
        self.storage.close().await;
        info!(session = %self.id, "Session closed");
    }
}
