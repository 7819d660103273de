use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row as returned by the engine: column name to JSON value, in column order.
pub type Row = serde_json::Map<String, Value>;

/// Result of a single statement inside an executed batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatementResult {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

/// A `patients` row as shown by the registry table.
///
/// Text columns are nullable at the storage level (rows written from the raw console
/// may be partial), so missing text reads as an empty string and a missing age as `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: i64,
    #[serde(default, deserialize_with = "deserialize_text_lax")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_age_lax")]
    pub age: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_text_lax")]
    pub gender: String,
    #[serde(default, deserialize_with = "deserialize_text_lax")]
    pub ailment: String,
}

impl Patient {
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row))
    }
}

/// Validated patient fields, ready to be bound into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub ailment: String,
}

/// A structured write against `patients`. Values are always bound, never interpolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientMutation {
    Create(PatientDraft),
    Update { id: i64, draft: PatientDraft },
    Delete { id: i64 },
}

impl PatientMutation {
    pub fn label(&self) -> &'static str {
        match self {
            PatientMutation::Create(_) => "create",
            PatientMutation::Update { .. } => "update",
            PatientMutation::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MutationOutcome {
    pub rows_affected: u64,
    /// Engine-assigned id, only for creates.
    pub last_insert_id: Option<i64>,
}

fn deserialize_text_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(serde::de::Error::custom(
            "expected text, a number or null for a patient text column",
        )),
    }
}

fn deserialize_age_lax<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_i64()),
        Value::String(s) => Ok(s.trim().parse().ok()),
        _ => Err(serde::de::Error::custom(
            "expected an integer, numeric text or null for `age`",
        )),
    }
}
