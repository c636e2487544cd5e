//! Wait engine
//!
//! Computes how long a workflow should pause, or whether a wait condition
//! already holds. Nothing here sleeps: the reported duration is for the
//! caller's scheduler to honor.

use crate::script::ScriptError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod engine;
mod target;

pub use engine::WaitEngine;
pub use target::parse_target_date;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WaitMode {
    #[default]
    Fixed,
    Until,
    Condition,
    Unrecognized(String),
}

impl WaitMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fixed => "fixed",
            Self::Until => "until",
            Self::Condition => "condition",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<String> for WaitMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "fixed" => Self::Fixed,
            "until" => Self::Until,
            "condition" => Self::Condition,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<WaitMode> for String {
    fn from(mode: WaitMode) -> Self {
        mode.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Ms,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn millis_per_unit(&self) -> f64 {
        match self {
            Self::Ms => 1.0,
            Self::Seconds => 1_000.0,
            Self::Minutes => 60_000.0,
            Self::Hours => 3_600_000.0,
        }
    }
}

/// Polling hints for condition waits.
///
/// Only `timeout` affects the result; `check_interval` and `retry_count`
/// are passed through for the scheduler that re-invokes the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionOptions {
    pub check_interval: u64,
    /// Milliseconds, 0 means wait indefinitely
    pub timeout: u64,
    /// 0 means unlimited
    pub retry_count: u32,
}

impl Default for ConditionOptions {
    fn default() -> Self {
        Self {
            check_interval: 1_000,
            timeout: 0,
            retry_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptStrategy {
    #[default]
    None,
    Signal,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaitConfig {
    pub mode: WaitMode,
    pub delay: f64,
    pub time_unit: TimeUnit,
    /// RFC 3339, or a naive date/time read as UTC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub condition_options: ConditionOptions,
    pub interrupt_strategy: InterruptStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_signal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_timeout: Option<u64>,
    pub simulation_mode: bool,
    pub enable_logging: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            mode: WaitMode::default(),
            delay: 1_000.0,
            time_unit: TimeUnit::default(),
            target_date: None,
            condition: None,
            condition_options: ConditionOptions::default(),
            interrupt_strategy: InterruptStrategy::default(),
            interrupt_signal: None,
            interrupt_timeout: None,
            simulation_mode: false,
            enable_logging: false,
        }
    }
}

impl WaitConfig {
    /// Signal name the scheduler should listen for under the `signal` strategy
    pub fn interrupt_signal(&self) -> Option<&str> {
        match self.interrupt_strategy {
            InterruptStrategy::Signal => Some(self.interrupt_signal.as_deref().unwrap_or("stopWaiting")),
            _ => None,
        }
    }

    /// Milliseconds before the scheduler may cancel under the `timeout` strategy
    pub fn interrupt_timeout(&self) -> Option<u64> {
        match self.interrupt_strategy {
            InterruptStrategy::Timeout => Some(self.interrupt_timeout.unwrap_or(30_000)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitIssue {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitStats {
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub mode: WaitMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_checks: Option<u32>,
    pub interrupted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<WaitIssue>,
}

impl WaitStats {
    pub(crate) fn new(start_time: DateTime<Utc>, mode: WaitMode) -> Self {
        Self {
            start_time,
            end_time: None,
            duration: None,
            mode,
            condition_checks: None,
            interrupted: false,
            interrupt_reason: None,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitResult {
    pub completed: bool,
    pub interrupted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_reason: Option<String>,
    pub stats: WaitStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Date/heure cible requise pour le mode \"until\"")]
    MissingTargetDate,

    #[error("Date/heure cible invalide: {0}")]
    InvalidTargetDate(String),

    #[error("Condition requise pour le mode \"condition\"")]
    MissingCondition,

    #[error("Mode d'attente non reconnu: {0}")]
    UnknownMode(String),

    #[error(transparent)]
    Condition(#[from] ScriptError),
}
