use thiserror::Error as ThisError;

/// Local rejection of patient input; raised before storage is touched.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    #[error("field `{0}` is required")]
    MissingField(&'static str),

    #[error("age must be a number, got `{0}`")]
    InvalidAge(String),

    #[error("age must not be negative, got `{0}`")]
    NegativeAge(String),
}
