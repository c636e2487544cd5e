//! Step payload handed back to the orchestrator

use super::{IterationConfig, IterationMode, IterationResult, IterationState};
use serde_json::{json, Map, Value};

impl IterationResult {
    /// State for the next sequential call, `None` once complete or outside sequential mode
    pub fn next_state(&self, config: &IterationConfig) -> Option<IterationState> {
        if self.is_complete || config.mode != IterationMode::Sequential {
            return None;
        }
        let accumulator = match &self.data {
            Value::Array(items) if config.accumulate_results => items.clone(),
            _ => Vec::new(),
        };
        Some(IterationState {
            current_index: self.current_index.map_or(0, |i| i + 1),
            accumulator,
        })
    }

    /// Build the block output for this step.
    ///
    /// Always carries `data` and `isComplete`. With `includeMetadata` the
    /// step position and stats are added; an unfinished sequential run gets
    /// a `nextIteration` describing the state to pass to the next call.
    pub fn to_output(&self, config: &IterationConfig) -> Value {
        let mut output = Map::new();
        output.insert("data".into(), self.data.clone());
        output.insert("isComplete".into(), Value::Bool(self.is_complete));

        if config.include_metadata {
            output.insert(
                "metadata".into(),
                json!({
                    "currentIndex": self.current_index,
                    "currentItem": self.current_item,
                    "isLastIteration": self.is_last_iteration,
                    "stats": self.stats,
                }),
            );
        }

        if let Some(state) = self.next_state(config) {
            output.insert(
                "nextIteration".into(),
                json!({
                    "currentIndex": state.current_index,
                    "accumulator": state.accumulator,
                }),
            );
        }

        if let Some(error) = &self.error {
            output.insert("error".into(), Value::String(error.clone()));
        }

        Value::Object(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iteration::IterationEngine;

    #[test]
    fn test_unfinished_sequential_step_announces_next_iteration() {
        let config = IterationConfig {
            accumulate_results: true,
            ..IterationConfig::default()
        };
        let result = IterationEngine::default().advance(&json!(["a", "b"]), &config, 0, vec![]);
        let output = result.to_output(&config);

        assert_eq!(output["data"], json!(["a"]));
        assert_eq!(output["isComplete"], json!(false));
        assert_eq!(
            output["nextIteration"],
            json!({"currentIndex": 1, "accumulator": ["a"]})
        );
        assert!(output.get("metadata").is_none());
    }

    #[test]
    fn test_metadata_included_on_request() {
        let config = IterationConfig {
            include_metadata: true,
            ..IterationConfig::default()
        };
        let result = IterationEngine::default().advance(&json!([5]), &config, 0, vec![]);
        let output = result.to_output(&config);

        assert_eq!(output["metadata"]["currentIndex"], json!(0));
        assert_eq!(output["metadata"]["currentItem"], json!(5));
        assert_eq!(output["metadata"]["isLastIteration"], json!(true));
        assert_eq!(output["metadata"]["stats"]["totalItems"], json!(1));
        assert!(output.get("nextIteration").is_none());
    }

    #[test]
    fn test_batch_output_has_no_next_iteration() {
        let config = IterationConfig {
            mode: IterationMode::Batch,
            ..IterationConfig::default()
        };
        let collection = Value::Array((0..25).map(Value::from).collect());
        let result = IterationEngine::default().advance(&collection, &config, 0, vec![]);
        let output = result.to_output(&config);

        assert_eq!(output["isComplete"], json!(false));
        assert!(output.get("nextIteration").is_none());
    }
}
