//! SQL DDL for initializing the patient store.
//! SQLite-first design; `AUTOINCREMENT` keeps ids from being reused after deletes.

/// Schema is idempotent and runs on every storage open.
/// Columns are nullable since the raw SQL console may write partial rows;
/// completeness is enforced by the mutation layer instead.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    age INTEGER,
    gender TEXT,
    ailment TEXT
);
"#;

/// Query the registry view issues on every refresh.
pub const SELECT_ALL_PATIENTS: &str = "SELECT * FROM patients;";
