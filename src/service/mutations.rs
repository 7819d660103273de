use crate::db::{MutationOutcome, Patient, PatientDraft, PatientMutation};
use crate::error::{RegistryError, ValidationError};
use crate::service::executor::QueryExecutor;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

/// Raw patient input as typed into the registration form or update modal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientForm {
    #[serde(default)]
    pub name: String,
    /// Kept as text so "abc" can be rejected locally instead of failing deserialization.
    #[serde(default, deserialize_with = "deserialize_string_lax")]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub ailment: String,
}

impl PatientForm {
    pub fn new(
        name: impl Into<String>,
        age: impl ToString,
        gender: impl Into<String>,
        ailment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            age: age.to_string(),
            gender: gender.into(),
            ailment: ailment.into(),
        }
    }

    /// Prefill for editing an existing row.
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            age: patient.age.map(|a| a.to_string()).unwrap_or_default(),
            gender: patient.gender.clone(),
            ailment: patient.ailment.clone(),
        }
    }

    /// All four fields present after trimming, age a non-negative number stored truncated.
    pub fn validate(&self) -> Result<PatientDraft, ValidationError> {
        let name = required("name", &self.name)?;
        let age = parse_age(&self.age)?;
        let gender = required("gender", &self.gender)?;
        let ailment = required("ailment", &self.ailment)?;
        Ok(PatientDraft {
            name,
            age,
            gender,
            ailment,
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn required(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

/// Any finite, non-negative number is accepted; the fractional part is dropped.
#[allow(clippy::cast_possible_truncation)]
fn parse_age(raw: &str) -> Result<i64, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField("age"));
    }
    if let Ok(age) = value.parse::<i64>() {
        return if age < 0 {
            Err(ValidationError::NegativeAge(value.to_string()))
        } else {
            Ok(age)
        };
    }

    let age: f64 = value
        .parse()
        .ok()
        .filter(|a: &f64| a.is_finite())
        .ok_or_else(|| ValidationError::InvalidAge(value.to_string()))?;
    if age < 0.0 {
        return Err(ValidationError::NegativeAge(value.to_string()));
    }
    if age >= MAX_AGE_EXCLUSIVE {
        return Err(ValidationError::InvalidAge(value.to_string()));
    }
    Ok(age.trunc() as i64)
}

// 2^63: the first float that no longer fits an i64.
const MAX_AGE_EXCLUSIVE: f64 = 9_223_372_036_854_775_808.0;

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for `age`",
        )),
    }
}

/// Create, update and delete for patients. Each validates locally, executes one
/// bound statement through the executor, and relies on it to announce the change.
#[derive(Clone)]
pub struct PatientMutations {
    executor: QueryExecutor,
}

impl PatientMutations {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Insert a patient; returns the engine-assigned id.
    pub async fn create(&self, form: &PatientForm) -> Result<i64, RegistryError> {
        let draft = form.validate()?;
        let outcome = self.executor.apply(PatientMutation::Create(draft)).await?;
        let id = outcome.last_insert_id.ok_or_else(|| RegistryError::Query {
            message: "insert did not return an id".to_string(),
        })?;
        info!(id, "Patient registered");
        Ok(id)
    }

    /// Create and reset the form; on failure the form keeps what the user typed.
    pub async fn register(&self, form: &mut PatientForm) -> Result<i64, RegistryError> {
        let id = self.create(form).await?;
        form.clear();
        Ok(id)
    }

    /// Overwrite all four fields. An unknown id is a no-op (`rows_affected == 0`).
    pub async fn update(&self, id: i64, form: &PatientForm) -> Result<MutationOutcome, RegistryError> {
        let draft = form.validate()?;
        let outcome = self
            .executor
            .apply(PatientMutation::Update { id, draft })
            .await?;
        info!(id, rows_affected = outcome.rows_affected, "Patient updated");
        Ok(outcome)
    }

    /// Hard delete. Deleting an id that is already gone is a no-op, not an error.
    pub async fn delete(&self, id: i64) -> Result<MutationOutcome, RegistryError> {
        let outcome = self.executor.apply(PatientMutation::Delete { id }).await?;
        info!(id, rows_affected = outcome.rows_affected, "Patient deleted");
        Ok(outcome)
    }
}
