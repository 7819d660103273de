//! Storage module: the per-session handle to the shared patient database.
//!
//! Layout:
//! - `actor.rs`: ractor actor owning the SQLite pool, plus its lifecycle
//! - `models.rs`: Rust structs mirroring rows and structured writes
//! - `rows.rs`: engine row to JSON normalization
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)

pub mod actor;
pub mod models;
pub mod rows;
pub mod schema;

pub use actor::{StorageHandle, StorageStatus, open};
pub use models::{
    MutationOutcome, Patient, PatientDraft, PatientMutation, Row, StatementResult,
};
pub use schema::{SELECT_ALL_PATIENTS, SQLITE_INIT};
