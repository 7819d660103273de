use crate::db::{MutationOutcome, PatientMutation, Row, StorageHandle};
use crate::error::RegistryError;
use crate::service::classifier::{StatementKind, classify};
use crate::sync::{ChangeEvent, ChangeNotifier};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Normalized result of a raw SQL run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub kind: StatementKind,
    /// Rows of the first statement in the batch; empty if it produced none.
    pub rows: Vec<Row>,
}

/// Single path from SQL (raw or structured) to storage, and from successful writes
/// to the change notification.
#[derive(Clone)]
pub struct QueryExecutor {
    storage: StorageHandle,
    notifier: Arc<ChangeNotifier>,
}

impl QueryExecutor {
    pub fn new(storage: StorageHandle, notifier: Arc<ChangeNotifier>) -> Self {
        Self { storage, notifier }
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Run free-form SQL text. Announces a change only when the text classifies as
    /// mutating and the engine accepted it.
    pub async fn run(&self, sql: &str) -> Result<QueryOutcome, RegistryError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(RegistryError::EmptyQuery);
        }
        let kind = classify(sql);

        self.storage.ensure_ready().await?;
        let results = self.storage.execute(sql).await?;

        if kind.is_mutating() {
            self.notifier.announce(ChangeEvent::DataUpdated);
        }
        debug!(?kind, statements = results.len(), "query executed");

        let rows = results
            .into_iter()
            .next()
            .map(|first| first.rows)
            .unwrap_or_default();
        Ok(QueryOutcome { kind, rows })
    }

    /// Run a structured write. Always announces once the engine acknowledged it,
    /// including writes that matched no row.
    pub async fn apply(&self, mutation: PatientMutation) -> Result<MutationOutcome, RegistryError> {
        self.storage.ensure_ready().await?;
        let outcome = self.storage.mutate(mutation).await?;
        self.notifier.announce(ChangeEvent::DataUpdated);
        Ok(outcome)
    }
}
