//! Application module
//!
//! Everything the `blockflow` binary needs around the engines:
//! - Verbosity and working directory
//! - Logging setup
//! - Runtime settings and engine wiring
//! - One handler per subcommand

pub mod commands;
pub mod config;
pub mod error_handling;
pub mod logging;
pub mod runtime;

pub use commands::Engines;
pub use config::AppConfig;
pub use error_handling::handle_fatal_error;
pub use logging::init_logging;
pub use runtime::initialize_app;
