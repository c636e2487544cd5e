//! Sandboxed evaluation of user-supplied transforms and predicates
//!
//! Workflow blocks embed small scripts (item transforms, exit conditions,
//! custom merges, stop and wait conditions). Engines never evaluate them
//! directly; they go through a [`ScriptHost`] with a fixed list of named
//! bindings per call site, see [`signatures`].

use serde_json::Value;
use thiserror::Error;

pub mod rhai_host;
pub mod signatures;

pub use rhai_host::{RhaiHost, ScriptLimits};
pub use signatures::{
    Condition, CustomMerge, ExitCondition, InputsTransform, ItemTransform, ObjectsMerge,
    OutputTransform, ResultTransform,
};

/// Errors raised while compiling or running a user script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("script compilation failed: {message}")]
    Compile { message: String },

    #[error("{message}")]
    Runtime { message: String },

    #[error("script value conversion failed: {message}")]
    Conversion { message: String },
}

impl ScriptError {
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }
}

/// Capability to evaluate a script against an explicit set of bindings.
///
/// Implementations must expose nothing to the script beyond `args`.
pub trait ScriptHost: Send + Sync {
    fn run(&self, source: &str, args: &[(&str, &Value)]) -> Result<Value, ScriptError>;
}

/// JavaScript-style truthiness of a script result
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
