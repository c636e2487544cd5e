use super::{parse_target_date, WaitConfig, WaitError, WaitIssue, WaitMode, WaitResult, WaitStats};
use crate::clock::{Clock, SystemClock};
use crate::script::{Condition, RhaiHost, ScriptHost};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Computes wait outcomes for fixed, until and condition waits
#[derive(Clone)]
pub struct WaitEngine {
    host: Arc<dyn ScriptHost>,
    clock: Arc<dyn Clock>,
}

impl WaitEngine {
    pub fn new(host: Arc<dyn ScriptHost>, clock: Arc<dyn Clock>) -> Self {
        Self { host, clock }
    }

    /// Evaluate one wait activation.
    ///
    /// Simulation short-circuits every mode. Configuration problems and
    /// failing conditions yield `completed = false` with `error`.
    pub fn evaluate(&self, input: &Value, config: &WaitConfig) -> WaitResult {
        let start = self.clock.now();
        let mut stats = WaitStats::new(start, config.mode.clone());

        if config.simulation_mode {
            engine_log!(config.enable_logging, "Simulation mode, no actual wait");
            return finished(stats, start, 0);
        }

        if let Some(signal) = config.interrupt_signal() {
            engine_log!(config.enable_logging, signal, "Wait interruptible by signal");
        }
        if let Some(timeout) = config.interrupt_timeout() {
            engine_log!(config.enable_logging, timeout_ms = timeout, "Wait interruptible by timeout");
        }

        let outcome = match &config.mode {
            WaitMode::Fixed => Ok(self.fixed(config, stats.clone(), start)),
            WaitMode::Until => self.until(config, stats.clone(), start),
            WaitMode::Condition => self.condition(input, config, &mut stats, start),
            WaitMode::Unrecognized(mode) => Err(WaitError::UnknownMode(mode.clone())),
        };

        outcome.unwrap_or_else(|err| {
            if config.enable_logging {
                warn!(error = %err, mode = config.mode.as_str(), "Wait failed");
            }
            let now = self.clock.now();
            let message = err.to_string();
            stats.end_time = Some(now);
            stats.duration = Some(millis_between(start, now));
            stats.errors.push(WaitIssue {
                message: message.clone(),
            });
            WaitResult {
                completed: false,
                interrupted: false,
                interrupt_reason: None,
                stats,
                error: Some(message),
            }
        })
    }

    fn fixed(&self, config: &WaitConfig, stats: WaitStats, start: DateTime<Utc>) -> WaitResult {
        let millis = config.delay * config.time_unit.millis_per_unit();
        let millis = if millis.is_finite() && millis > 0.0 {
            millis.round() as u64
        } else {
            0
        };

        if millis == 0 {
            engine_log!(config.enable_logging, "Zero or negative delay, no wait needed");
        } else {
            engine_log!(config.enable_logging, millis, "Waiting for fixed delay");
        }
        finished(stats, start, millis)
    }

    fn until(&self, config: &WaitConfig, stats: WaitStats, start: DateTime<Utc>) -> Result<WaitResult, WaitError> {
        let raw = config
            .target_date
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(WaitError::MissingTargetDate)?;
        let target = parse_target_date(raw).ok_or_else(|| WaitError::InvalidTargetDate(raw.to_string()))?;

        let remaining = (target - start).num_milliseconds();
        if remaining <= 0 {
            engine_log!(config.enable_logging, target = %target, "Target date already passed");
            return Ok(finished(stats, start, 0));
        }

        engine_log!(config.enable_logging, target = %target, millis = remaining, "Waiting until target date");
        Ok(finished(stats, start, remaining as u64))
    }

    /// Single evaluation of the condition; polling belongs to the scheduler
    fn condition(
        &self,
        input: &Value,
        config: &WaitConfig,
        stats: &mut WaitStats,
        start: DateTime<Utc>,
    ) -> Result<WaitResult, WaitError> {
        let source = config
            .condition
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(WaitError::MissingCondition)?;

        let met = Condition::new(self.host.as_ref(), source).check(input)?;
        stats.condition_checks = Some(1);

        if met {
            engine_log!(config.enable_logging, "Condition already satisfied");
            let now = self.clock.now();
            stats.end_time = Some(now);
            stats.duration = Some(millis_between(start, now));
            return Ok(WaitResult {
                completed: true,
                interrupted: false,
                interrupt_reason: None,
                stats: stats.clone(),
                error: None,
            });
        }

        let options = &config.condition_options;
        if options.timeout > 0 {
            engine_log!(config.enable_logging, timeout_ms = options.timeout, "Condition not met, timing out");
            stats.end_time = end_after(start, options.timeout);
            stats.duration = Some(options.timeout);
            stats.interrupted = true;
            stats.interrupt_reason = Some("timeout".to_string());
            return Ok(WaitResult {
                completed: false,
                interrupted: true,
                interrupt_reason: Some("timeout".to_string()),
                stats: stats.clone(),
                error: None,
            });
        }

        engine_log!(
            config.enable_logging,
            check_interval_ms = options.check_interval,
            retry_count = options.retry_count,
            "Condition not met, waiting indefinitely"
        );
        Ok(WaitResult {
            completed: false,
            interrupted: false,
            interrupt_reason: None,
            stats: stats.clone(),
            error: None,
        })
    }
}

impl Default for WaitEngine {
    fn default() -> Self {
        Self::new(Arc::new(RhaiHost::new()), Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for WaitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitEngine").finish_non_exhaustive()
    }
}

fn finished(mut stats: WaitStats, start: DateTime<Utc>, millis: u64) -> WaitResult {
    stats.end_time = end_after(start, millis);
    stats.duration = Some(millis);
    WaitResult {
        completed: true,
        interrupted: false,
        interrupt_reason: None,
        stats,
        error: None,
    }
}

/// `start + millis`, or `None` past the representable date range
fn end_after(start: DateTime<Utc>, millis: u64) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::try_milliseconds(i64::try_from(millis).ok()?)?;
    start.checked_add_signed(delta)
}

fn millis_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::wait::{ConditionOptions, TimeUnit};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn engine() -> WaitEngine {
        WaitEngine::new(Arc::new(RhaiHost::new()), Arc::new(FixedClock::new(now())))
    }

    #[test]
    fn test_fixed_delay_in_seconds() {
        let config = WaitConfig {
            delay: 1.0,
            time_unit: TimeUnit::Seconds,
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);

        assert!(result.completed);
        assert_eq!(result.stats.duration, Some(1_000));
        assert_eq!(result.stats.end_time, Some(now() + TimeDelta::seconds(1)));
    }

    #[test]
    fn test_fractional_and_negative_delays() {
        let half_minute = WaitConfig {
            delay: 0.5,
            time_unit: TimeUnit::Minutes,
            ..WaitConfig::default()
        };
        assert_eq!(engine().evaluate(&Value::Null, &half_minute).stats.duration, Some(30_000));

        let negative = WaitConfig {
            delay: -5.0,
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &negative);
        assert!(result.completed);
        assert_eq!(result.stats.duration, Some(0));
    }

    #[test]
    fn test_simulation_always_zero() {
        for mode in [WaitMode::Fixed, WaitMode::Until, WaitMode::Condition, WaitMode::Unrecognized("x".into())] {
            let config = WaitConfig {
                mode,
                delay: 5.0,
                time_unit: TimeUnit::Hours,
                simulation_mode: true,
                ..WaitConfig::default()
            };
            let result = engine().evaluate(&Value::Null, &config);
            assert!(result.completed);
            assert_eq!(result.stats.duration, Some(0));
            assert!(result.error.is_none());
        }
    }

    #[test]
    fn test_until_past_and_future() {
        let past = WaitConfig {
            mode: WaitMode::Until,
            target_date: Some("2020-01-01T00:00:00Z".into()),
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &past);
        assert!(result.completed);
        assert_eq!(result.stats.duration, Some(0));

        let future = WaitConfig {
            mode: WaitMode::Until,
            target_date: Some("2024-01-15T12:01:30Z".into()),
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &future);
        assert!(result.completed);
        assert_eq!(result.stats.duration, Some(90_000));
    }

    #[test]
    fn test_until_requires_target() {
        let config = WaitConfig {
            mode: WaitMode::Until,
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);
        assert!(!result.completed);
        assert_eq!(
            result.error.as_deref(),
            Some("Date/heure cible requise pour le mode \"until\"")
        );
        assert_eq!(result.stats.errors.len(), 1);
    }

    #[test]
    fn test_until_rejects_unparseable_target() {
        let config = WaitConfig {
            mode: WaitMode::Until,
            target_date: Some("soon".into()),
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);
        assert!(!result.completed);
        assert_eq!(result.error.as_deref(), Some("Date/heure cible invalide: soon"));
    }

    #[test]
    fn test_condition_met() {
        let config = WaitConfig {
            mode: WaitMode::Condition,
            condition: Some("input.ready == true".into()),
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&json!({"ready": true}), &config);
        assert!(result.completed);
        assert_eq!(result.stats.condition_checks, Some(1));
    }

    #[test]
    fn test_condition_not_met_with_timeout() {
        let config = WaitConfig {
            mode: WaitMode::Condition,
            condition: Some("return false;".into()),
            condition_options: ConditionOptions {
                timeout: 5_000,
                ..ConditionOptions::default()
            },
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);

        assert!(!result.completed);
        assert!(result.interrupted);
        assert_eq!(result.interrupt_reason.as_deref(), Some("timeout"));
        assert_eq!(result.stats.duration, Some(5_000));
        assert!(result.stats.interrupted);
    }

    #[test]
    fn test_enormous_delay_keeps_duration_without_end_time() {
        let config = WaitConfig {
            delay: 1e10,
            time_unit: TimeUnit::Hours,
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);

        assert!(result.completed);
        assert_eq!(result.stats.duration, Some(36_000_000_000_000_000));
        assert_eq!(result.stats.end_time, None);
    }

    #[test]
    fn test_enormous_timeout_keeps_duration_without_end_time() {
        for timeout in [10_000_000_000_000_000, u64::MAX] {
            let config = WaitConfig {
                mode: WaitMode::Condition,
                condition: Some("false".into()),
                condition_options: ConditionOptions {
                    timeout,
                    ..ConditionOptions::default()
                },
                ..WaitConfig::default()
            };
            let result = engine().evaluate(&Value::Null, &config);

            assert!(result.interrupted);
            assert_eq!(result.stats.duration, Some(timeout));
            assert_eq!(result.stats.end_time, None);
        }
    }

    #[test]
    fn test_condition_not_met_without_timeout() {
        let config = WaitConfig {
            mode: WaitMode::Condition,
            condition: Some("false".into()),
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);
        assert!(!result.completed);
        assert!(!result.interrupted);
        assert!(result.error.is_none());
        assert_eq!(result.stats.condition_checks, Some(1));
        assert_eq!(result.stats.duration, None);
    }

    #[test]
    fn test_condition_required() {
        let config = WaitConfig {
            mode: WaitMode::Condition,
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);
        assert_eq!(
            result.error.as_deref(),
            Some("Condition requise pour le mode \"condition\"")
        );
    }

    #[test]
    fn test_failing_condition_reports_error() {
        let config = WaitConfig {
            mode: WaitMode::Condition,
            condition: Some(r#"throw "sensor offline""#.into()),
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);
        assert!(!result.completed);
        assert_eq!(result.error.as_deref(), Some("sensor offline"));
        assert_eq!(result.stats.condition_checks, None);
    }

    #[test]
    fn test_unknown_mode() {
        let config = WaitConfig {
            mode: WaitMode::Unrecognized("later".into()),
            ..WaitConfig::default()
        };
        let result = engine().evaluate(&Value::Null, &config);
        assert!(!result.completed);
        assert_eq!(result.error.as_deref(), Some("Mode d'attente non reconnu: later"));
    }
}
