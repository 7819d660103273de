use crate::db::{Row, SELECT_ALL_PATIENTS};
use crate::error::RegistryError;
use crate::service::executor::{QueryExecutor, QueryOutcome};
use crate::service::history::QueryHistory;
use tracing::{debug, warn};

/// Free-text SQL console: an editable statement, the last result or error, and history.
pub struct SqlConsole {
    executor: QueryExecutor,
    sql: String,
    history: QueryHistory,
    result: Option<Vec<Row>>,
    error: Option<String>,
}

impl SqlConsole {
    pub fn new(executor: QueryExecutor, history_limit: usize) -> Self {
        Self {
            executor,
            sql: SELECT_ALL_PATIENTS.to_string(),
            history: QueryHistory::new(history_limit),
            result: None,
            error: None,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql = sql.into();
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    /// Rows of the last successful run.
    pub fn result(&self) -> Option<&[Row]> {
        self.result.as_deref()
    }

    /// Engine message of the last failed run, cleared on the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Load a history entry back into the editor.
    pub fn recall(&mut self, index: usize) -> bool {
        match self.history.get(index) {
            Some(sql) => {
                self.sql = sql.to_string();
                true
            }
            None => false,
        }
    }

    /// Run the current editor text.
    ///
    /// The text is remembered before it runs, so failed statements stay in history.
    /// The editor text itself is never modified here.
    pub async fn execute(&mut self) -> Result<QueryOutcome, RegistryError> {
        let sql = self.sql.trim().to_string();
        if sql.is_empty() {
            self.error = Some(RegistryError::EmptyQuery.to_string());
            return Err(RegistryError::EmptyQuery);
        }

        self.history.record(&sql);
        self.error = None;

        match self.executor.run(&sql).await {
            Ok(outcome) => {
                debug!(kind = ?outcome.kind, rows = outcome.rows.len(), "console query finished");
                self.result = Some(outcome.rows.clone());
                Ok(outcome)
            }
            Err(e) => {
                if e.is_user_facing() {
                    debug!(error = %e, "console query rejected");
                } else {
                    warn!(error = %e, "console query failed");
                }
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the editor text and run it.
    pub async fn execute_text(&mut self, sql: impl Into<String>) -> Result<QueryOutcome, RegistryError> {
        self.set_sql(sql);
        self.execute().await
    }
}
