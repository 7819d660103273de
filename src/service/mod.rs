pub mod classifier;
pub mod console;
pub mod executor;
pub mod history;
pub mod mutations;
pub mod registry_view;

pub use classifier::{StatementKind, classify};
pub use console::SqlConsole;
pub use executor::{QueryExecutor, QueryOutcome};
pub use history::QueryHistory;
pub use mutations::{PatientForm, PatientMutations};
pub use registry_view::{RefreshTiming, RegistryState, RegistryViewModel};
