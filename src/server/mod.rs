pub mod router;
pub mod routes;

pub use router::{RegistryAppState, registry_router};
