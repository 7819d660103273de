use crate::db::models::{MutationOutcome, PatientMutation, StatementResult};
use crate::db::rows::normalize_row;
use crate::db::schema::SQLITE_INIT;
use crate::error::RegistryError;
use futures::TryStreamExt;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Either, SqlitePool};
use std::{str::FromStr, time::Duration};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Lifecycle of a storage handle: open → ready → closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    Opening,
    Ready,
    Failed(String),
    Closed,
}

#[derive(Debug)]
pub enum StorageMessage {
    /// Run raw SQL text (one or more `;`-separated statements).
    Execute(String, RpcReplyPort<Result<Vec<StatementResult>, RegistryError>>),

    /// Run a structured, parameter-bound patient write.
    Mutate(
        PatientMutation,
        RpcReplyPort<Result<MutationOutcome, RegistryError>>,
    ),
}

/// Cloneable handle to one session's connection to the shared database file.
#[derive(Clone)]
pub struct StorageHandle {
    actor: ActorRef<StorageMessage>,
    status: watch::Receiver<StorageStatus>,
}

impl StorageHandle {
    /// Current lifecycle state without waiting.
    pub fn status(&self) -> StorageStatus {
        self.status.borrow().clone()
    }

    /// Suspend until initialization (schema included) has finished.
    ///
    /// Idempotent; any number of callers may wait concurrently.
    pub async fn ensure_ready(&self) -> Result<(), RegistryError> {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| !matches!(s, StorageStatus::Opening))
            .await
            .map_err(|_| RegistryError::StorageClosed)?
            .clone();

        match status {
            StorageStatus::Ready => Ok(()),
            StorageStatus::Failed(reason) => Err(RegistryError::StorageUnavailable(reason)),
            StorageStatus::Closed | StorageStatus::Opening => Err(RegistryError::StorageClosed),
        }
    }

    pub async fn execute(
        &self,
        sql: impl Into<String>,
    ) -> Result<Vec<StatementResult>, RegistryError> {
        ractor::call!(self.actor, StorageMessage::Execute, sql.into())
            .map_err(|e| RegistryError::RactorError(format!("Storage Execute RPC failed: {e}")))?
    }

    pub async fn mutate(&self, mutation: PatientMutation) -> Result<MutationOutcome, RegistryError> {
        ractor::call!(self.actor, StorageMessage::Mutate, mutation)
            .map_err(|e| RegistryError::RactorError(format!("Storage Mutate RPC failed: {e}")))?
    }

    /// Stop the actor and release the pool. Safe to call more than once.
    pub async fn close(&self) {
        self.actor.stop(None);
        let mut rx = self.status.clone();
        let _ = rx
            .wait_for(|s| matches!(s, StorageStatus::Closed | StorageStatus::Failed(_)))
            .await;
    }
}

struct StorageActorState {
    database_url: String,
    pool: Option<SqlitePool>,
    status: watch::Sender<StorageStatus>,
}

struct StorageActor;

#[ractor::async_trait]
impl Actor for StorageActor {
    type Msg = StorageMessage;
    type State = StorageActorState;
    type Arguments = (String, watch::Sender<StorageStatus>);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (database_url, status): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(StorageActorState {
            database_url,
            pool: None,
            status,
        })
    }

    async fn post_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match connect(&state.database_url).await {
            Ok(pool) => {
                state.pool = Some(pool);
                state.status.send_replace(StorageStatus::Ready);
                info!(database_url = %state.database_url, "Storage ready");
                Ok(())
            }
            Err(e) => {
                warn!(database_url = %state.database_url, error = %e, "Storage init failed");
                state.status.send_replace(StorageStatus::Failed(e.to_string()));
                Err(ActorProcessingErr::from(format!("storage init failed: {e}")))
            }
        }
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(pool) = state.pool.take() {
            pool.close().await;
        }
        state.status.send_replace(StorageStatus::Closed);
        info!(database_url = %state.database_url, "Storage closed");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let Some(pool) = state.pool.as_ref() else {
            match message {
                StorageMessage::Execute(_, reply) => {
                    let _ = reply.send(Err(RegistryError::StorageClosed));
                }
                StorageMessage::Mutate(_, reply) => {
                    let _ = reply.send(Err(RegistryError::StorageClosed));
                }
            }
            return Ok(());
        };

        match message {
            StorageMessage::Execute(sql, reply) => {
                let res = execute_batch(pool, &sql).await;
                if let Err(e) = &res {
                    debug!(error = %e, "Statement batch rejected");
                }
                let _ = reply.send(res);
            }
            StorageMessage::Mutate(mutation, reply) => {
                let label = mutation.label();
                let res = apply_mutation(pool, mutation).await;
                match &res {
                    Ok(outcome) => debug!(
                        op = label,
                        rows_affected = outcome.rows_affected,
                        id = ?outcome.last_insert_id,
                        "Patient mutation applied"
                    ),
                    Err(e) => debug!(op = label, error = %e, "Patient mutation rejected"),
                }
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

/// Open a session's storage. Returns as soon as the actor is spawned;
/// use [`StorageHandle::ensure_ready`] to wait for the schema.
pub async fn open(database_url: &str) -> Result<StorageHandle, RegistryError> {
    let (status_tx, status_rx) = watch::channel(StorageStatus::Opening);
    let (actor, _jh) = Actor::spawn(None, StorageActor, (database_url.to_string(), status_tx))
        .await
        .map_err(|e| RegistryError::RactorError(format!("failed to spawn StorageActor: {e}")))?;

    Ok(StorageHandle {
        actor,
        status: status_rx,
    })
}

async fn connect(database_url: &str) -> Result<SqlitePool, RegistryError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), RegistryError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

async fn execute_batch(
    pool: &SqlitePool,
    sql: &str,
) -> Result<Vec<StatementResult>, RegistryError> {
    let mut results = Vec::new();
    let mut rows = Vec::new();

    let mut stream = sqlx::raw_sql(sql).fetch_many(pool);
    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => results.push(StatementResult {
                rows: std::mem::take(&mut rows),
                rows_affected: done.rows_affected(),
            }),
            Either::Right(row) => rows.push(normalize_row(&row)?),
        }
    }
    if !rows.is_empty() {
        results.push(StatementResult {
            rows,
            rows_affected: 0,
        });
    }
    Ok(results)
}

async fn apply_mutation(
    pool: &SqlitePool,
    mutation: PatientMutation,
) -> Result<MutationOutcome, RegistryError> {
    match mutation {
        PatientMutation::Create(d) => {
            let id: i64 = sqlx::query_scalar(
                r#"
            INSERT INTO patients (name, age, gender, ailment)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
            )
            .bind(d.name)
            .bind(d.age)
            .bind(d.gender)
            .bind(d.ailment)
            .fetch_one(pool)
            .await?;

            Ok(MutationOutcome {
                rows_affected: 1,
                last_insert_id: Some(id),
            })
        }

        PatientMutation::Update { id, draft: d } => {
            let res = sqlx::query(
                r#"
            UPDATE patients
            SET name = ?, age = ?, gender = ?, ailment = ?
            WHERE id = ?
            "#,
            )
            .bind(d.name)
            .bind(d.age)
            .bind(d.gender)
            .bind(d.ailment)
            .bind(id)
            .execute(pool)
            .await?;

            Ok(MutationOutcome {
                rows_affected: res.rows_affected(),
                last_insert_id: None,
            })
        }

        PatientMutation::Delete { id } => {
            let res = sqlx::query("DELETE FROM patients WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;

            Ok(MutationOutcome {
                rows_affected: res.rows_affected(),
                last_insert_id: None,
            })
        }
    }
}
