//! # Blockflow
//!
//! Runtime engines behind the control blocks of a visual workflow tool.
//! Each engine is a synchronous, stateless computation: it takes an explicit
//! configuration plus the data flowing through the block and returns a
//! structured result that the orchestrator acts upon.
//!
//! ## Modules
//!
//! - `iteration` - Step-wise iteration over arrays, objects and ranges (sequential, parallel, batch)
//! - `merge` - Combining named inputs with concat/union/intersection/object merge strategies
//! - `stop_error` - Conditional stop/error signalling with severity and stop strategy
//! - `wait` - Wait duration computation for fixed, absolute and conditional waits
//! - `script` - Sandboxed evaluation of user-supplied transforms and predicates
//! - `clock` - Injectable wall clock
//! - `config` - Runtime settings loaded from TOML and the environment
//! - `error` - Unified error type with numeric codes
//! - `app` - Logging setup and CLI command handlers
#[macro_use]
mod macros;

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod iteration;
pub mod merge;
pub mod script;
pub mod stop_error;
pub mod wait;

pub use error::{BlockflowError, ErrorCode};
pub use iteration::{IterationConfig, IterationEngine, IterationResult, IterationState};
pub use merge::{MergeConfig, MergeEngine, MergeResult};
pub use stop_error::{StopErrorConfig, StopErrorEngine, StopErrorResult};
pub use wait::{WaitConfig, WaitEngine, WaitResult};
