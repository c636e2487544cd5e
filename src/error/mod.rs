use crate::config::ConfigError;
use crate::iteration::IterationError;
use crate::merge::MergeError;
use crate::script::ScriptError;
use crate::stop_error::{Severity, StopSignal};
use crate::wait::WaitError;
use std::fmt::Display;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The unified error type for the blockflow engines
#[derive(Error, Debug)]
pub enum BlockflowError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Script error: {message}")]
    Script {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Iteration error: {message}")]
    Iteration {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Merge error: {message}")]
    Merge {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Workflow stopped: {message}")]
    StopError {
        code: u16,
        message: String,
        signal: Option<Box<StopSignal>>,
    },

    #[error("[E{code:04}] Wait error: {message}")]
    Wait {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl BlockflowError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn script_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Script {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn iteration_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Iteration {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn merge_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Merge {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn wait_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Wait {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    ///
    /// Stop signals carry their payload instead of a source and are left as is.
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Script { source: src, .. }
            | Self::Iteration { source: src, .. }
            | Self::Merge { source: src, .. }
            | Self::Wait { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::StopError { .. } => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Script { message, .. }
            | Self::Iteration { message, .. }
            | Self::Merge { message, .. }
            | Self::StopError { message, .. }
            | Self::Wait { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Script { code, .. }
            | Self::Iteration { code, .. }
            | Self::Merge { code, .. }
            | Self::StopError { code, .. }
            | Self::Wait { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Script { .. } => 3,
            Self::Iteration { .. } => 4,
            Self::Merge { .. } => 5,
            Self::StopError { .. } => 6,
            Self::Wait { .. } => 7,
            Self::Other { .. } => 1,
        }
    }

    /// The stop payload, when this error came from a triggered stop block
    pub fn stop_signal(&self) -> Option<&StopSignal> {
        match self {
            Self::StopError { signal, .. } => signal.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BlockflowError>;

impl From<ScriptError> for BlockflowError {
    fn from(err: ScriptError) -> Self {
        let code = match &err {
            ScriptError::Compile { .. } => ErrorCode::SCRIPT_COMPILE,
            ScriptError::Runtime { .. } => ErrorCode::SCRIPT_RUNTIME,
            ScriptError::Conversion { .. } => ErrorCode::SCRIPT_CONVERSION,
        };
        BlockflowError::script_with_code(code, err.to_string()).with_source(err)
    }
}

impl From<IterationError> for BlockflowError {
    fn from(err: IterationError) -> Self {
        let code = match &err {
            IterationError::InvalidRange { .. } => ErrorCode::ITERATION_INVALID_RANGE,
            IterationError::Stats(_) => ErrorCode::ITERATION_STATS,
        };
        BlockflowError::iteration_with_code(code, err.to_string()).with_source(err)
    }
}

impl From<MergeError> for BlockflowError {
    fn from(err: MergeError) -> Self {
        let code = match &err {
            MergeError::UnknownMode(_) => ErrorCode::MERGE_UNKNOWN_MODE,
            MergeError::UnknownObjectStrategy(_) => ErrorCode::MERGE_UNKNOWN_OBJECT_STRATEGY,
            MergeError::MissingCustomCode | MergeError::MissingCustomStrategyCode => {
                ErrorCode::MERGE_MISSING_CUSTOM_CODE
            }
            MergeError::CustomCode(_) => ErrorCode::MERGE_CUSTOM_CODE,
            MergeError::PreTransform(_) | MergeError::PostTransform(_) => ErrorCode::MERGE_TRANSFORM,
            MergeError::Serialization(_) => ErrorCode::MERGE_SERIALIZATION,
        };
        BlockflowError::merge_with_code(code, err.to_string()).with_source(err)
    }
}

impl From<WaitError> for BlockflowError {
    fn from(err: WaitError) -> Self {
        let code = match &err {
            WaitError::MissingTargetDate => ErrorCode::WAIT_MISSING_TARGET,
            WaitError::InvalidTargetDate(_) => ErrorCode::WAIT_INVALID_TARGET,
            WaitError::MissingCondition => ErrorCode::WAIT_MISSING_CONDITION,
            WaitError::UnknownMode(_) => ErrorCode::WAIT_UNKNOWN_MODE,
            WaitError::Condition(_) => ErrorCode::WAIT_CONDITION,
        };
        BlockflowError::wait_with_code(code, err.to_string()).with_source(err)
    }
}

impl From<StopSignal> for BlockflowError {
    fn from(signal: StopSignal) -> Self {
        let code = match signal.severity {
            Severity::Warning => ErrorCode::STOP_WARNING,
            Severity::Error => ErrorCode::STOP_ERROR,
            Severity::Fatal => ErrorCode::STOP_FATAL,
        };
        BlockflowError::StopError {
            code,
            message: signal.to_string(),
            signal: Some(Box::new(signal)),
        }
    }
}

impl From<ConfigError> for BlockflowError {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::Read { .. } => ErrorCode::CONFIG_NOT_FOUND,
            ConfigError::Parse { .. } => ErrorCode::CONFIG_INVALID_TOML,
            ConfigError::InvalidOverride { .. } => ErrorCode::CONFIG_INVALID_VALUE,
        };
        BlockflowError::config_with_code(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for BlockflowError {
    fn from(err: serde_json::Error) -> Self {
        BlockflowError::config_with_code(ErrorCode::CONFIG_INVALID_JSON, "Invalid JSON document")
            .with_source(err)
    }
}

impl From<std::io::Error> for BlockflowError {
    fn from(err: std::io::Error) -> Self {
        BlockflowError::Other {
            code: ErrorCode::OTHER_IO,
            message: "IO operation failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
