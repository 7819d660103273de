pub mod config;
pub mod db;
pub mod error;
pub mod server;
pub mod service;
pub mod session;
pub mod sync;

pub use error::{RegistryError, ValidationError};
pub use session::Session;
