//! Application module
//!
//! Configuration layering, logging setup, startup wiring and the mapping of
//! fatal errors to exit codes.

pub mod config;
pub mod error_handling;
pub mod logging;
pub mod runtime;

pub use config::AppConfig;
pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
pub use runtime::{build_state, initialize_app};
