//! Subcommand handlers
//!
//! Each handler runs one engine invocation on JSON read from disk and
//! returns the JSON report the binary prints.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::iteration::{IterationConfig, IterationEngine, IterationState};
use crate::merge::{collect_inputs, MergeConfig, MergeEngine};
use crate::script::{RhaiHost, ScriptHost};
use crate::stop_error::{StopErrorConfig, StopErrorEngine, StopSignal};
use crate::wait::{WaitConfig, WaitEngine};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// All four engines sharing one script host and clock
#[derive(Debug, Clone)]
pub struct Engines {
    pub iteration: IterationEngine,
    pub merge: MergeEngine,
    pub stop_error: StopErrorEngine,
    pub wait: WaitEngine,
}

impl Engines {
    pub fn from_config(config: &Config) -> Self {
        let host: Arc<dyn ScriptHost> = Arc::new(RhaiHost::with_limits(&config.script));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_parts(host, clock, config)
    }

    pub fn with_parts(host: Arc<dyn ScriptHost>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            iteration: IterationEngine::new(host.clone()),
            merge: MergeEngine::new(host.clone()),
            stop_error: StopErrorEngine::new(host.clone(), clock.clone())
                .with_default_log_file(&config.stop_error.default_log_file),
            wait: WaitEngine::new(host, clock),
        }
    }
}

/// Orchestrator state handed to one iteration step
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IterationInput {
    pub collection: Value,
    #[serde(flatten)]
    pub state: IterationState,
}

/// Outcome of the `stop` subcommand
#[derive(Debug)]
pub struct StopReport {
    pub report: Value,
    /// Set when the block stops the whole workflow
    pub signal: Option<StopSignal>,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Read an optional input document, `null` when absent
pub fn read_input(path: Option<&Path>) -> Result<Value> {
    match path {
        Some(path) => read_json(path),
        None => Ok(Value::Null),
    }
}

pub fn iterate(engines: &Engines, config: &IterationConfig, input: IterationInput) -> Result<Value> {
    debug!(current_index = input.state.current_index, "Running iteration step");
    let result = engines.iteration.resume(&input.collection, config, input.state);
    let output = result.to_output(config);
    Ok(json!({
        "result": serde_json::to_value(&result)?,
        "output": output,
    }))
}

/// Merge the `input*` fields of the payload, or the payload itself when it has none
pub fn merge(engines: &Engines, config: &MergeConfig, payload: &Value) -> Result<Value> {
    let inputs = merge_inputs(payload)?;
    debug!(inputs = inputs.len(), "Running merge");
    let result = engines.merge.merge(&inputs, config).map_err(crate::BlockflowError::from)?;
    Ok(serde_json::to_value(result)?)
}

fn merge_inputs(payload: &Value) -> Result<Map<String, Value>> {
    let collected = collect_inputs(payload);
    if !collected.is_empty() {
        return Ok(collected);
    }
    match payload {
        Value::Object(fields) => Ok(fields.clone()),
        Value::Null => Ok(Map::new()),
        other => bail!("Merge input must be a JSON object, got {}", type_name(other)),
    }
}

/// Evaluate a stop block against the payload's `data` field, or the whole payload
pub fn stop(engines: &Engines, config: &StopErrorConfig, payload: &Value) -> Result<StopReport> {
    let input = payload.get("data").unwrap_or(payload);
    let result = engines.stop_error.evaluate(input, config);

    let (output, signal) = match result.to_output(input) {
        Ok(output) => (output, None),
        Err(signal) => (Value::Null, Some(signal)),
    };

    Ok(StopReport {
        report: json!({
            "result": serde_json::to_value(&result)?,
            "output": output,
        }),
        signal,
    })
}

pub fn wait(engines: &Engines, config: &WaitConfig, input: &Value) -> Result<Value> {
    let result = engines.wait.evaluate(input, config);
    Ok(serde_json::to_value(result)?)
}

/// The effective runtime settings, as TOML
pub fn show_config(config: &Config, source: Option<&Path>) -> Result<String> {
    let body = toml::to_string_pretty(config).context("Failed to render configuration")?;
    let header = match source {
        Some(path) => format!("# loaded from {}\n", path.display()),
        None => "# built-in defaults\n".to_string(),
    };
    Ok(format!("{header}{body}"))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop_error::StopStrategy;

    fn engines() -> Engines {
        Engines::from_config(&Config::default())
    }

    #[test]
    fn test_iterate_reports_result_and_output() {
        let input = IterationInput {
            collection: json!([1, 2, 3]),
            ..IterationInput::default()
        };
        let report = iterate(&engines(), &IterationConfig::default(), input).unwrap();

        assert_eq!(report["result"]["currentItem"], json!(1));
        assert_eq!(report["output"]["isComplete"], json!(false));
        assert_eq!(report["output"]["nextIteration"]["currentIndex"], json!(1));
    }

    #[test]
    fn test_iteration_input_reads_flattened_state() {
        let input: IterationInput = serde_json::from_value(json!({
            "collection": [1, 2, 3],
            "currentIndex": 2,
            "accumulator": [1, 2]
        }))
        .unwrap();
        assert_eq!(input.state.current_index, 2);

        let config = IterationConfig {
            accumulate_results: true,
            ..IterationConfig::default()
        };
        let report = iterate(&engines(), &config, input).unwrap();
        assert_eq!(report["output"]["data"], json!([1, 2, 3]));
        assert_eq!(report["output"]["isComplete"], json!(true));
    }

    #[test]
    fn test_merge_prefers_input_fields() {
        let payload = json!({"input1": [1], "input2": [2], "other": [3]});
        let report = merge(&engines(), &MergeConfig::default(), &payload).unwrap();
        assert_eq!(report["data"], json!([1, 2]));
    }

    #[test]
    fn test_merge_rejects_scalar_payload() {
        let err = merge(&engines(), &MergeConfig::default(), &json!(7)).unwrap_err();
        assert!(err.to_string().contains("got number"));
    }

    #[test]
    fn test_workflow_stop_yields_signal() {
        let config = StopErrorConfig {
            stop_strategy: StopStrategy::Workflow,
            ..StopErrorConfig::default()
        };
        let report = stop(&engines(), &config, &json!({"data": {"id": 1}})).unwrap();

        assert!(report.signal.is_some());
        assert_eq!(report.report["output"], Value::Null);
        assert_eq!(report.report["result"]["errorThrown"], json!(true));
    }

    #[test]
    fn test_block_stop_annotates_input() {
        let config = StopErrorConfig {
            stop_strategy: StopStrategy::Block,
            ..StopErrorConfig::default()
        };
        let report = stop(&engines(), &config, &json!({"id": 1})).unwrap();

        assert!(report.signal.is_none());
        assert_eq!(report.report["output"]["id"], json!(1));
        assert!(report.report["output"]["__error"].is_object());
    }

    #[test]
    fn test_show_config_renders_sections() {
        let rendered = show_config(&Config::default(), None).unwrap();
        assert!(rendered.starts_with("# built-in defaults"));
        assert!(rendered.contains("[script]"));
        assert!(rendered.contains("[stop_error]"));
    }
}
