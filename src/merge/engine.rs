use super::array_ops::{deduplicate, flatten, sort_items};
use super::objects::{apply_key_prefixes, coerce_objects, deep_merge, merge_keep, merge_replace};
use super::{
    ArrayOptions, MergeConfig, MergeError, MergeErrorPolicy, MergeMode, MergeResult, MergeStats,
    ObjectStrategy,
};
use crate::script::{CustomMerge, InputsTransform, ObjectsMerge, OutputTransform, RhaiHost, ScriptError, ScriptHost};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Combines named inputs according to a [`MergeConfig`]
#[derive(Clone)]
pub struct MergeEngine {
    host: Arc<dyn ScriptHost>,
}

impl MergeEngine {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self { host }
    }

    /// Merge `inputs` in their iteration order.
    ///
    /// Only fails under the `stop` error policy; otherwise failures are
    /// recorded in the stats and a fallback value is returned.
    pub fn merge(&self, inputs: &Map<String, Value>, config: &MergeConfig) -> Result<MergeResult, MergeError> {
        let started = Instant::now();
        let mut stats = MergeStats::default();

        if config.collect_stats || config.simulation_mode {
            stats.input_count = inputs
                .iter()
                .map(|(name, input)| (name.clone(), item_count(input)))
                .collect();
        }

        let outcome = self.run(inputs, config, &mut stats);
        stats.processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(Outcome::Simulated(data)) => Ok(MergeResult {
                data,
                stats: Some(stats),
            }),
            Ok(Outcome::Merged(data)) => {
                if config.collect_stats {
                    stats.output_count = output_count(&data);
                }
                Ok(MergeResult {
                    data,
                    stats: config.collect_stats.then_some(stats),
                })
            }
            Err(err) if config.error_handling == MergeErrorPolicy::Stop => {
                warn!(error = %err, "Merge failed");
                Err(err)
            }
            Err(err) => {
                engine_log!(config.enable_logging, error = %err, "Merge failed, returning fallback");
                stats.record(err.to_string(), "execution");
                let data = match config.error_handling {
                    MergeErrorPolicy::Default => Value::Object(Map::new()),
                    _ => Value::Null,
                };
                Ok(MergeResult {
                    data,
                    stats: config.collect_stats.then_some(stats),
                })
            }
        }
    }

    fn run(&self, inputs: &Map<String, Value>, config: &MergeConfig, stats: &mut MergeStats) -> Result<Outcome, MergeError> {
        let inputs = self.pre_transform(inputs, config, stats)?;

        if config.simulation_mode {
            engine_log!(config.enable_logging, "Simulation mode, no merge performed");
            return Ok(Outcome::Simulated(json!({
                "simulation": true,
                "inputs": inputs,
                "config": serde_json::to_value(config)?,
            })));
        }

        if config.batch_processing {
            engine_log!(config.enable_logging, inputs = inputs.len(), "Batch processing requested");
        }

        let merged = match &config.mode {
            MergeMode::Concat => self.concat(&inputs, config, stats),
            MergeMode::Merge => self.merge_objects(&inputs, config, stats)?,
            MergeMode::Auto => self.auto(&inputs, config, stats)?,
            MergeMode::Union => self.union(&inputs, config, stats),
            MergeMode::Intersection => self.intersection(&inputs, config),
            MergeMode::Custom => self.custom(&inputs, config)?,
            MergeMode::Unrecognized(mode) => return Err(MergeError::UnknownMode(mode.clone())),
        };

        let merged = self.post_transform(merged, config, stats)?;
        Ok(Outcome::Merged(merged))
    }

    fn pre_transform(
        &self,
        inputs: &Map<String, Value>,
        config: &MergeConfig,
        stats: &mut MergeStats,
    ) -> Result<Map<String, Value>, MergeError> {
        let Some(source) = non_empty(&config.pre_transform) else {
            return Ok(inputs.clone());
        };

        let transformed = InputsTransform::new(self.host.as_ref(), source)
            .apply(&Value::Object(inputs.clone()))
            .and_then(|value| match value {
                Value::Object(map) => Ok(map),
                other => Err(ScriptError::conversion(format!(
                    "pre-transform must return an object of named inputs, got {other}"
                ))),
            });

        match transformed {
            Ok(map) => {
                engine_log!(config.enable_logging, inputs = map.len(), "Pre-transform applied");
                Ok(map)
            }
            Err(err) => {
                let err = MergeError::PreTransform(err);
                if config.error_handling == MergeErrorPolicy::Stop {
                    return Err(err);
                }
                engine_log!(config.enable_logging, error = %err, "Pre-transform failed, keeping inputs");
                stats.record(err.to_string(), "preTransform");
                Ok(inputs.clone())
            }
        }
    }

    fn post_transform(&self, merged: Value, config: &MergeConfig, stats: &mut MergeStats) -> Result<Value, MergeError> {
        let Some(source) = non_empty(&config.post_transform) else {
            return Ok(merged);
        };

        match OutputTransform::new(self.host.as_ref(), source).apply(&merged) {
            Ok(value) => {
                engine_log!(config.enable_logging, "Post-transform applied");
                Ok(value)
            }
            Err(err) => {
                let err = MergeError::PostTransform(err);
                if config.error_handling == MergeErrorPolicy::Stop {
                    return Err(err);
                }
                engine_log!(config.enable_logging, error = %err, "Post-transform failed, keeping result");
                stats.record(err.to_string(), "postTransform");
                Ok(merged)
            }
        }
    }

    /// Every input as an array, concatenated, then dedupe, sort and flatten
    fn concat(&self, inputs: &Map<String, Value>, config: &MergeConfig, stats: &mut MergeStats) -> Value {
        engine_log!(config.enable_logging, "Concatenating arrays");
        let mut items: Vec<Value> = inputs.values().flat_map(as_items).collect();
        let options = &config.array_options;

        if options.remove_duplicates {
            stats.duplicates_removed += deduplicate(&mut items, options.identifier_field.as_deref());
        }
        apply_sort(&mut items, options);
        if options.flatten {
            items = flatten(items, options.flatten_depth);
        }

        Value::Array(items)
    }

    /// Distinct values across all inputs in first-seen order
    fn union(&self, inputs: &Map<String, Value>, config: &MergeConfig, stats: &mut MergeStats) -> Value {
        engine_log!(config.enable_logging, "Union of arrays");
        let mut items: Vec<Value> = inputs.values().flat_map(as_items).collect();
        stats.duplicates_removed += deduplicate(&mut items, None);
        apply_sort(&mut items, &config.array_options);
        Value::Array(items)
    }

    /// Values present in every non-empty input, each input counted once
    fn intersection(&self, inputs: &Map<String, Value>, config: &MergeConfig) -> Value {
        engine_log!(config.enable_logging, "Intersection of arrays");
        let arrays: Vec<Vec<Value>> = inputs
            .values()
            .map(|input| as_items(input).collect::<Vec<_>>())
            .filter(|items| !items.is_empty())
            .collect();

        let mut items = match arrays.len() {
            0 => Vec::new(),
            1 => arrays.into_iter().next().unwrap_or_default(),
            required => {
                let mut order: Vec<(String, Value)> = Vec::new();
                let mut counts: HashMap<String, usize> = HashMap::new();

                for array in &arrays {
                    let mut distinct = std::collections::HashSet::new();
                    for item in array {
                        let key = item.to_string();
                        if distinct.insert(key.clone()) {
                            let count = counts.entry(key.clone()).or_insert(0);
                            if *count == 0 {
                                order.push((key, item.clone()));
                            }
                            *count += 1;
                        }
                    }
                }

                order
                    .into_iter()
                    .filter(|(key, _)| counts.get(key) == Some(&required))
                    .map(|(_, item)| item)
                    .collect()
            }
        };

        apply_sort(&mut items, &config.array_options);
        Value::Array(items)
    }

    fn merge_objects(
        &self,
        inputs: &Map<String, Value>,
        config: &MergeConfig,
        stats: &mut MergeStats,
    ) -> Result<Value, MergeError> {
        engine_log!(
            config.enable_logging,
            strategy = config.object_strategy.as_str(),
            "Merging objects"
        );
        let objects = coerce_objects(inputs);

        let merged = match &config.object_strategy {
            ObjectStrategy::Replace => Value::Object(merge_replace(objects)),
            ObjectStrategy::Keep => Value::Object(merge_keep(objects, stats)),
            ObjectStrategy::Deep => {
                let mut acc = Map::new();
                for obj in objects {
                    deep_merge(&mut acc, obj, stats);
                }
                Value::Object(acc)
            }
            ObjectStrategy::Custom => {
                let source = non_empty(&config.custom_code).ok_or(MergeError::MissingCustomStrategyCode)?;
                let objects: Vec<Value> = objects.into_iter().map(Value::Object).collect();
                ObjectsMerge::new(self.host.as_ref(), source)
                    .apply(&objects)
                    .map_err(MergeError::CustomCode)?
            }
            ObjectStrategy::Unrecognized(strategy) => {
                return Err(MergeError::UnknownObjectStrategy(strategy.clone()))
            }
        };

        if config.key_prefix.enabled {
            return Ok(apply_key_prefixes(merged, &config.key_prefix));
        }
        Ok(merged)
    }

    /// Arrays (or nulls) concatenate, objects (or nulls) merge, mixed input concatenates
    fn auto(&self, inputs: &Map<String, Value>, config: &MergeConfig, stats: &mut MergeStats) -> Result<Value, MergeError> {
        let all_arrays = inputs.values().all(|v| v.is_array() || v.is_null());
        let all_objects = inputs.values().all(|v| v.is_object() || v.is_null());

        if all_arrays {
            Ok(self.concat(inputs, config, stats))
        } else if all_objects {
            self.merge_objects(inputs, config, stats)
        } else {
            engine_log!(config.enable_logging, "Mixed input types, concatenating");
            Ok(self.concat(inputs, config, stats))
        }
    }

    fn custom(&self, inputs: &Map<String, Value>, config: &MergeConfig) -> Result<Value, MergeError> {
        engine_log!(config.enable_logging, "Running custom merge");
        let source = non_empty(&config.custom_code).ok_or(MergeError::MissingCustomCode)?;
        let config_value = serde_json::to_value(config)?;

        CustomMerge::new(self.host.as_ref(), source)
            .apply(&Value::Object(inputs.clone()), &config_value)
            .map_err(MergeError::CustomCode)
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(Arc::new(RhaiHost::new()))
    }
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine").finish_non_exhaustive()
    }
}

enum Outcome {
    Simulated(Value),
    Merged(Value),
}

fn apply_sort(items: &mut [Value], options: &ArrayOptions) {
    if options.sort {
        sort_items(items, options.sort_field.as_deref(), options.sort_direction);
    }
}

/// An input viewed as a sequence: null is empty, scalars and objects are singletons
fn as_items(input: &Value) -> Box<dyn Iterator<Item = Value> + '_> {
    match input {
        Value::Null => Box::new(std::iter::empty()),
        Value::Array(items) => Box::new(items.iter().cloned()),
        other => Box::new(std::iter::once(other.clone())),
    }
}

fn item_count(input: &Value) -> usize {
    match input {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        _ => 1,
    }
}

fn output_count(output: &Value) -> usize {
    match output {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 1,
    }
}

fn non_empty(source: &Option<String>) -> Option<&str> {
    source.as_deref().filter(|s| !s.trim().is_empty())
}
