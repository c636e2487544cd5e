use super::sink::{append_file, write_console, LogRecord};
use super::{StopErrorConfig, StopErrorResult, StopErrorStats, DEFAULT_LOG_FILE};
use crate::clock::{Clock, SystemClock};
use crate::script::{Condition, RhaiHost, ScriptError, ScriptHost};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Evaluates stop/error blocks
#[derive(Clone)]
pub struct StopErrorEngine {
    host: Arc<dyn ScriptHost>,
    clock: Arc<dyn Clock>,
    default_log_file: PathBuf,
}

impl StopErrorEngine {
    pub fn new(host: Arc<dyn ScriptHost>, clock: Arc<dyn Clock>) -> Self {
        Self {
            host,
            clock,
            default_log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }

    /// Log file used when a block does not name one
    pub fn with_default_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_log_file = path.into();
        self
    }

    /// Decide whether `input` triggers the configured stop.
    ///
    /// Never raises: a failing condition yields an untriggered result whose
    /// `error_message` carries the failure.
    pub fn evaluate(&self, input: &Value, config: &StopErrorConfig) -> StopErrorResult {
        let timestamp = self.clock.now();
        let mut stats = StopErrorStats {
            timestamp,
            severity: config.severity,
            stop_strategy: config.stop_strategy,
            condition_evaluated: false,
            condition_result: None,
            error_logged: false,
            error_thrown: false,
        };
        let logging = config.logging_options.enable_logging;

        if config.simulation_mode {
            if logging {
                info!(
                    message = %config.error_message,
                    severity = %config.severity,
                    strategy = %config.stop_strategy,
                    "Simulation mode, stop would be triggered"
                );
                stats.error_logged = true;
            }
            return StopErrorResult {
                stopped: false,
                error_thrown: false,
                ..echo(config, stats)
            };
        }

        match self.triggered(input, config, &mut stats) {
            Ok(true) => {}
            Ok(false) => {
                engine_log!(logging, "Condition not met, no error raised");
                return StopErrorResult {
                    stopped: false,
                    error_thrown: false,
                    error_message: None,
                    error_code: None,
                    severity: None,
                    stop_strategy: None,
                    error_data: None,
                    stats,
                };
            }
            Err(err) => {
                if logging {
                    warn!(error = %err, "Stop condition failed");
                }
                stats.error_logged = logging;
                return StopErrorResult {
                    stopped: false,
                    error_thrown: false,
                    error_message: Some(err.to_string()),
                    error_code: None,
                    severity: None,
                    stop_strategy: None,
                    error_data: None,
                    stats,
                };
            }
        }

        if logging {
            stats.error_logged = self.log(config, timestamp);
        }

        stats.error_thrown = true;
        StopErrorResult {
            stopped: true,
            error_thrown: true,
            ..echo(config, stats)
        }
    }

    fn triggered(
        &self,
        input: &Value,
        config: &StopErrorConfig,
        stats: &mut StopErrorStats,
    ) -> Result<bool, ScriptError> {
        let Some(source) = config.condition_source() else {
            return Ok(true);
        };

        stats.condition_evaluated = true;
        let met = Condition::new(self.host.as_ref(), source).check(input)?;
        stats.condition_result = Some(met);
        Ok(met)
    }

    /// Writes the log line to every configured destination; true if any succeeded
    fn log(&self, config: &StopErrorConfig, timestamp: DateTime<Utc>) -> bool {
        let options = &config.logging_options;
        let record = LogRecord::new(
            config.severity,
            &config.error_message,
            config.code(),
            options.include_timestamp.then_some(timestamp),
            config.error_data.as_ref(),
            options.include_stack_trace,
        );

        let mut logged = false;
        if options.log_destination.to_console() {
            write_console(&record, config.severity);
            logged = true;
        }
        if options.log_destination.to_file() {
            let path = options
                .log_file_path
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| self.default_log_file.clone());
            match append_file(&path, &record) {
                Ok(()) => {
                    info!(path = %path.display(), "Error written to log file");
                    logged = true;
                }
                Err(err) => warn!(path = %path.display(), error = %err, "Failed to write error log"),
            }
        }
        logged
    }
}

impl Default for StopErrorEngine {
    fn default() -> Self {
        Self::new(Arc::new(RhaiHost::new()), Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for StopErrorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopErrorEngine")
            .field("default_log_file", &self.default_log_file)
            .finish_non_exhaustive()
    }
}

fn echo(config: &StopErrorConfig, stats: StopErrorStats) -> StopErrorResult {
    StopErrorResult {
        stopped: false,
        error_thrown: false,
        error_message: Some(config.error_message.clone()),
        error_code: config.code().map(str::to_string),
        severity: Some(config.severity),
        stop_strategy: Some(config.stop_strategy),
        error_data: config.error_data.clone(),
        stats,
    }
}
