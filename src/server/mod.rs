//! Server module for medgate
//!
//! Contains the server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for the server and provider catalogue
//! - `loader`: Configuration loading from files and environment
//! - `providers`: Credential resolution and failover router construction
//! - `validation`: Configuration validation
//! - `background_tasks`: Daily token-usage reset
//! - `init`: Main server initialization and run loop

mod background_tasks;
pub mod config;
mod init;
mod loader;
mod providers;
mod validation;

// Re-export public API
pub use init::run;
pub use loader::{load_config, DEFAULT_CONFIG};
pub use providers::build_router;
pub use validation::validate_config;
