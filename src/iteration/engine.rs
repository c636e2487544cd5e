use super::collection;
use super::{
    ErrorPolicy, ExitStrategy, IterationConfig, IterationError, IterationMode, IterationResult,
    IterationState, IterationStats,
};
use crate::script::{ExitCondition, ItemTransform, ResultTransform, RhaiHost, ScriptHost};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Outcome of running the item transform under the configured error policy
enum Transformed {
    Item(Value),
    /// The item failed and the policy is `continue`
    Skip,
    /// The item failed and the policy is `break`
    Stop,
}

/// Stateless stepper over a collection
///
/// Every call is independent; the caller threads `current_index` and the
/// accumulator between sequential steps.
#[derive(Clone)]
pub struct IterationEngine {
    host: Arc<dyn ScriptHost>,
}

impl IterationEngine {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self { host }
    }

    /// Advance the iteration starting at `current_index`.
    ///
    /// Never fails: script errors land in `stats.errors` and anything that
    /// aborts the step yields a completed result carrying `error`.
    pub fn advance(
        &self,
        collection: &Value,
        config: &IterationConfig,
        current_index: usize,
        accumulator: Vec<Value>,
    ) -> IterationResult {
        let started = Instant::now();
        let mut stats = IterationStats {
            iteration_count: current_index,
            ..IterationStats::default()
        };
        let mut accumulator = accumulator;

        let outcome = self.step(collection, config, current_index, &mut accumulator, &mut stats);
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(mut result) => {
                result.stats.processing_time_ms = elapsed;
                result
            }
            Err(err) => {
                warn!(index = current_index, error = %err, "Iteration step aborted");
                stats.processing_time_ms = elapsed;
                stats.record(format!("Erreur globale: {err}"), None, None);
                IterationResult {
                    data: accumulated(config, accumulator),
                    current_item: None,
                    current_index: None,
                    is_last_iteration: false,
                    is_complete: true,
                    next_index: None,
                    stats,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Advance from a state returned by [`IterationResult::next_state`]
    pub fn resume(&self, collection: &Value, config: &IterationConfig, state: IterationState) -> IterationResult {
        self.advance(collection, config, state.current_index, state.accumulator)
    }

    fn step(
        &self,
        collection: &Value,
        config: &IterationConfig,
        start_index: usize,
        accumulator: &mut Vec<Value>,
        stats: &mut IterationStats,
    ) -> Result<IterationResult, IterationError> {
        stats.total_items = collection::size(collection, config.collection_kind)?;
        let limit = config.effective_limit();

        engine_log!(
            config.enable_logging,
            index = start_index,
            total = stats.total_items,
            mode = ?config.mode,
            "Starting iteration step"
        );

        if config.mode == IterationMode::Parallel && !self.exhausted(config, start_index, stats) {
            return self.run_parallel(collection, config, start_index, stats);
        }

        // `continue` skips failing items by moving forward; the collection
        // size bounds the number of rounds.
        let mut index = start_index;
        let (item, processed) = loop {
            if self.exhausted(config, index, stats) {
                return Ok(IterationResult {
                    data: accumulated(config, std::mem::take(accumulator)),
                    current_item: None,
                    current_index: None,
                    is_last_iteration: false,
                    is_complete: true,
                    next_index: None,
                    stats: stats.clone(),
                    error: None,
                });
            }

            let item = collection::item_at(collection, index, config.collection_kind)
                .unwrap_or(Value::Null);

            match self.transform_item(config, &item, index, collection, stats) {
                Transformed::Item(processed) => break (item, processed),
                Transformed::Skip => {
                    stats.skipped_items += 1;
                    index += 1;
                }
                Transformed::Stop => {
                    return Ok(IterationResult {
                        data: accumulated(config, std::mem::take(accumulator)),
                        is_last_iteration: is_last(index, stats.total_items, limit),
                        current_item: Some(item),
                        current_index: Some(index),
                        is_complete: true,
                        next_index: None,
                        stats: stats.clone(),
                        error: None,
                    });
                }
            }
        };
        let last = is_last(index, stats.total_items, limit);

        if config.accumulate_results {
            accumulator.push(processed.clone());
        }
        stats.processed_items += 1;

        if self.should_exit(config, &processed, index, collection, accumulator, stats) {
            engine_log!(config.enable_logging, index, "Exit condition satisfied");
            let data = if config.accumulate_results {
                Value::Array(std::mem::take(accumulator))
            } else {
                processed.clone()
            };
            return Ok(IterationResult {
                data,
                current_item: Some(processed),
                current_index: Some(index),
                is_last_iteration: true,
                is_complete: true,
                next_index: None,
                stats: stats.clone(),
                error: None,
            });
        }

        let mut result = match config.mode {
            IterationMode::Batch => self.batch_slice(collection, config, index, processed, stats),
            _ => {
                let data = if config.accumulate_results {
                    Value::Array(std::mem::take(accumulator))
                } else {
                    processed.clone()
                };
                IterationResult {
                    data,
                    current_item: Some(processed),
                    current_index: Some(index),
                    is_last_iteration: last,
                    is_complete: last,
                    next_index: (!last).then_some(index + 1),
                    stats: stats.clone(),
                    error: None,
                }
            }
        };

        if last || config.mode == IterationMode::Batch {
            self.transform_result(config, &mut result, collection)?;
        }

        engine_log!(
            config.enable_logging,
            index,
            original = %item,
            complete = result.is_complete,
            "Iteration step finished"
        );
        Ok(result)
    }

    /// Limit first, then collection size
    fn exhausted(&self, config: &IterationConfig, index: usize, stats: &IterationStats) -> bool {
        let limit = config.effective_limit();
        if limit > 0 && index >= limit {
            engine_log!(config.enable_logging, limit, "Iteration limit reached");
            return true;
        }
        if index >= stats.total_items {
            engine_log!(config.enable_logging, "All items processed");
            return true;
        }
        false
    }

    fn transform_item(
        &self,
        config: &IterationConfig,
        item: &Value,
        index: usize,
        collection: &Value,
        stats: &mut IterationStats,
    ) -> Transformed {
        let Some(source) = non_empty(&config.item_transform) else {
            return Transformed::Item(item.clone());
        };

        match ItemTransform::new(self.host.as_ref(), source).apply(item, index, collection) {
            Ok(value) => Transformed::Item(value),
            Err(err) => {
                engine_log!(config.enable_logging, index, error = %err, "Item transform failed");
                stats.record(
                    format!("Erreur de transformation: {err}"),
                    Some(item.clone()),
                    Some(index),
                );
                match config.error_handling {
                    ErrorPolicy::Break => Transformed::Stop,
                    ErrorPolicy::Continue => Transformed::Skip,
                    ErrorPolicy::Default => Transformed::Item(item.clone()),
                    ErrorPolicy::Ignore => Transformed::Item(Value::Null),
                }
            }
        }
    }

    /// Evaluates the custom exit condition; evaluation errors keep the loop going
    fn should_exit(
        &self,
        config: &IterationConfig,
        item: &Value,
        index: usize,
        collection: &Value,
        accumulator: &[Value],
        stats: &mut IterationStats,
    ) -> bool {
        if config.exit_strategy != ExitStrategy::Custom {
            return false;
        }
        let Some(source) = non_empty(&config.exit_condition) else {
            return false;
        };

        match ExitCondition::new(self.host.as_ref(), source).check(item, index, collection, accumulator) {
            Ok(exit) => exit,
            Err(err) => {
                engine_log!(config.enable_logging, index, error = %err, "Exit condition failed");
                stats.record(format!("Erreur de condition de sortie: {err}"), None, Some(index));
                false
            }
        }
    }

    /// Whole collection in one call, honoring the limit and the error policy
    fn run_parallel(
        &self,
        collection: &Value,
        config: &IterationConfig,
        start_index: usize,
        stats: &mut IterationStats,
    ) -> Result<IterationResult, IterationError> {
        let limit = config.effective_limit();
        let end = bounded_end(stats.total_items, limit);
        let mut produced = Vec::new();
        let mut current = None;

        for index in 0..end {
            let item = collection::item_at(collection, index, config.collection_kind)
                .unwrap_or(Value::Null);
            let processed = match self.transform_item(config, &item, index, collection, stats) {
                Transformed::Item(value) => value,
                Transformed::Skip => {
                    stats.skipped_items += 1;
                    continue;
                }
                Transformed::Stop => break,
            };
            if index == start_index {
                current = Some(processed.clone());
            }
            produced.push(processed);
            stats.processed_items += 1;

            if self.should_exit(config, &produced[produced.len() - 1], index, collection, &produced, stats) {
                break;
            }
        }

        let data = if config.accumulate_results {
            Value::Array(produced)
        } else {
            current.clone().unwrap_or(Value::Null)
        };
        let mut result = IterationResult {
            data,
            current_item: current,
            current_index: Some(start_index),
            is_last_iteration: true,
            is_complete: true,
            next_index: None,
            stats: stats.clone(),
            error: None,
        };
        self.transform_result(config, &mut result, collection)?;
        Ok(result)
    }

    /// Raw slice `[index, index + size)`, clamped to the size and the limit
    fn batch_slice(
        &self,
        collection: &Value,
        config: &IterationConfig,
        index: usize,
        processed: Value,
        stats: &mut IterationStats,
    ) -> IterationResult {
        let limit = config.effective_limit();
        let end = bounded_end(stats.total_items, limit).min(index.saturating_add(config.batch_size()));
        let batch: Vec<Value> = (index..end)
            .filter_map(|i| collection::item_at(collection, i, config.collection_kind))
            .collect();

        let complete = end >= stats.total_items || (limit > 0 && end >= limit);
        stats.processed_items = end - index;

        let next_index = (!complete).then(|| end.saturating_sub(config.batch_overlap()).max(index + 1));

        IterationResult {
            data: Value::Array(batch),
            current_item: Some(processed),
            current_index: Some(end.saturating_sub(1)),
            is_last_iteration: complete,
            is_complete: complete,
            next_index,
            stats: stats.clone(),
            error: None,
        }
    }

    fn transform_result(
        &self,
        config: &IterationConfig,
        result: &mut IterationResult,
        collection: &Value,
    ) -> Result<(), IterationError> {
        let Some(source) = non_empty(&config.result_transform) else {
            return Ok(());
        };

        let stats = serde_json::to_value(&result.stats)?;
        match ResultTransform::new(self.host.as_ref(), source).apply(&result.data, collection, &stats) {
            Ok(data) => {
                engine_log!(config.enable_logging, "Result transform applied");
                result.data = data;
            }
            Err(err) => {
                engine_log!(config.enable_logging, error = %err, "Result transform failed");
                result
                    .stats
                    .record(format!("Erreur de transformation du résultat: {err}"), None, None);
                if config.error_handling != ErrorPolicy::Default {
                    result.data = Value::Null;
                }
            }
        }
        Ok(())
    }
}

impl Default for IterationEngine {
    fn default() -> Self {
        Self::new(Arc::new(RhaiHost::new()))
    }
}

impl std::fmt::Debug for IterationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationEngine").finish_non_exhaustive()
    }
}

fn is_last(index: usize, total: usize, limit: usize) -> bool {
    index + 1 == total || (limit > 0 && index + 1 == limit)
}

fn bounded_end(total: usize, limit: usize) -> usize {
    if limit > 0 {
        total.min(limit)
    } else {
        total
    }
}

fn accumulated(config: &IterationConfig, accumulator: Vec<Value>) -> Value {
    if config.accumulate_results {
        Value::Array(accumulator)
    } else {
        Value::Null
    }
}

fn non_empty(source: &Option<String>) -> Option<&str> {
    source.as_deref().filter(|s| !s.trim().is_empty())
}
