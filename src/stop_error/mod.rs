//! Stop/error signal
//!
//! Decides whether a workflow branch should be halted with an error and
//! reports the decision. Halting itself is up to the consumer, either by
//! inspecting [`StopErrorResult`] or by propagating [`StopErrorResult::signal`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

mod engine;
mod sink;

pub use engine::StopErrorEngine;

pub const DEFAULT_ERROR_MESSAGE: &str = "Une erreur s'est produite dans le workflow";
pub const DEFAULT_LOG_FILE: &str = "logs/errors.log";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    #[default]
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of execution the consumer should halt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStrategy {
    Block,
    #[default]
    Branch,
    Workflow,
}

impl fmt::Display for StopStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::Branch => "branch",
            Self::Workflow => "workflow",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    #[default]
    Console,
    File,
    Both,
}

impl LogDestination {
    pub fn to_console(&self) -> bool {
        matches!(self, Self::Console | Self::Both)
    }

    pub fn to_file(&self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingOptions {
    pub enable_logging: bool,
    pub log_destination: LogDestination,
    /// Falls back to the runtime's configured error log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    pub include_timestamp: bool,
    pub include_stack_trace: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopErrorConfig {
    pub error_message: String,
    pub severity: Severity,
    pub stop_strategy: StopStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<Value>,
    pub logging_options: LoggingOptions,
    pub simulation_mode: bool,
    /// Boolean-valued script over `input`; absent means always trigger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Default for StopErrorConfig {
    fn default() -> Self {
        Self {
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            severity: Severity::default(),
            stop_strategy: StopStrategy::default(),
            error_code: None,
            error_data: None,
            logging_options: LoggingOptions::default(),
            simulation_mode: false,
            condition: None,
        }
    }
}

impl StopErrorConfig {
    pub(crate) fn code(&self) -> Option<&str> {
        self.error_code.as_deref().filter(|c| !c.is_empty())
    }

    pub(crate) fn condition_source(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopErrorStats {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub stop_strategy: StopStrategy,
    pub condition_evaluated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_result: Option<bool>,
    pub error_logged: bool,
    pub error_thrown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopErrorResult {
    pub stopped: bool,
    pub error_thrown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_strategy: Option<StopStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<Value>,
    pub stats: StopErrorStats,
}

/// A triggered stop, in a form that can be propagated with `?`
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{severity} ({strategy}): {message}")]
pub struct StopSignal {
    pub message: String,
    pub code: Option<String>,
    pub severity: Severity,
    pub strategy: StopStrategy,
    pub data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl StopErrorResult {
    /// The stop signal, if an error was thrown
    pub fn signal(&self) -> Option<StopSignal> {
        if !self.error_thrown {
            return None;
        }
        Some(StopSignal {
            message: self
                .error_message
                .clone()
                .unwrap_or_else(|| "Workflow arrêté par le bloc Stop and Error".to_string()),
            code: self.error_code.clone(),
            severity: self.severity.unwrap_or_default(),
            strategy: self.stop_strategy.unwrap_or_default(),
            data: self.error_data.clone(),
            timestamp: self.stats.timestamp,
        })
    }

    /// Fail with the signal when one was raised
    pub fn into_signal_result(self) -> Result<Self, StopSignal> {
        match self.signal() {
            Some(signal) => Err(signal),
            None => Ok(self),
        }
    }

    /// Shape the block output for `input` according to the stop strategy.
    ///
    /// - nothing thrown: the input unchanged
    /// - `workflow`: the stop signal as an error
    /// - `branch`: a `__stopError` marker describing the error
    /// - `block`: the input annotated with an `__error` entry
    pub fn to_output(&self, input: &Value) -> Result<Value, StopSignal> {
        let Some(signal) = self.signal() else {
            return Ok(input.clone());
        };

        let timestamp = Value::String(signal.timestamp.to_rfc3339());
        match signal.strategy {
            StopStrategy::Workflow => Err(signal),
            StopStrategy::Branch => Ok(serde_json::json!({
                "__stopError": true,
                "message": signal.message,
                "code": signal.code,
                "severity": signal.severity,
                "timestamp": timestamp,
                "data": signal.data,
            })),
            StopStrategy::Block => {
                let mut output = match input {
                    Value::Object(fields) => fields.clone(),
                    _ => Map::new(),
                };
                output.insert(
                    "__error".to_string(),
                    serde_json::json!({
                        "message": signal.message,
                        "code": signal.code,
                        "severity": signal.severity,
                        "timestamp": timestamp,
                    }),
                );
                Ok(Value::Object(output))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn thrown(strategy: StopStrategy) -> StopErrorResult {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        StopErrorResult {
            stopped: true,
            error_thrown: true,
            error_message: Some("quota exceeded".into()),
            error_code: Some("Q42".into()),
            severity: Some(Severity::Fatal),
            stop_strategy: Some(strategy),
            error_data: Some(json!({"used": 11})),
            stats: StopErrorStats {
                timestamp,
                severity: Severity::Fatal,
                stop_strategy: strategy,
                condition_evaluated: false,
                condition_result: None,
                error_logged: false,
                error_thrown: true,
            },
        }
    }

    #[test]
    fn test_config_defaults() {
        let config: StopErrorConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.error_message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(config.severity, Severity::Error);
        assert_eq!(config.stop_strategy, StopStrategy::Branch);
        assert_eq!(config.logging_options.log_destination, LogDestination::Console);
        assert_eq!(config.code(), None);
    }

    #[test]
    fn test_empty_code_and_condition_are_absent() {
        let config = StopErrorConfig {
            error_code: Some(String::new()),
            condition: Some("  ".into()),
            ..StopErrorConfig::default()
        };
        assert_eq!(config.code(), None);
        assert_eq!(config.condition_source(), None);
    }

    #[test]
    fn test_signal_display() {
        let signal = thrown(StopStrategy::Workflow).signal().unwrap();
        assert_eq!(signal.to_string(), "fatal (workflow): quota exceeded");
        assert_eq!(signal.code.as_deref(), Some("Q42"));
    }

    #[test]
    fn test_workflow_strategy_fails_output() {
        let err = thrown(StopStrategy::Workflow)
            .to_output(&json!({"a": 1}))
            .unwrap_err();
        assert_eq!(err.strategy, StopStrategy::Workflow);
        assert!(thrown(StopStrategy::Workflow).into_signal_result().is_err());
    }

    #[test]
    fn test_branch_strategy_returns_marker() {
        let output = thrown(StopStrategy::Branch).to_output(&json!({"a": 1})).unwrap();
        assert_eq!(output["__stopError"], json!(true));
        assert_eq!(output["code"], json!("Q42"));
        assert_eq!(output["severity"], json!("fatal"));
        assert_eq!(output["data"], json!({"used": 11}));
        assert_eq!(output["timestamp"], json!("2024-05-01T08:30:00+00:00"));
    }

    #[test]
    fn test_block_strategy_annotates_input() {
        let output = thrown(StopStrategy::Block).to_output(&json!({"a": 1})).unwrap();
        assert_eq!(output["a"], json!(1));
        assert_eq!(output["__error"]["message"], json!("quota exceeded"));
    }

    #[test]
    fn test_untriggered_result_passes_input_through() {
        let mut result = thrown(StopStrategy::Workflow);
        result.error_thrown = false;
        result.stopped = false;
        assert_eq!(result.signal(), None);
        assert_eq!(result.to_output(&json!([1])).unwrap(), json!([1]));
    }
}
