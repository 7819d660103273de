mod registry;
mod validation;

pub use registry::{ApiErrorBody, ApiErrorObject, RegistryError};
pub use validation::ValidationError;
