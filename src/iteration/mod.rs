//! Iterator engine
//!
//! Advances one step of an iteration over an array, object, range or
//! loosely typed collection. The caller owns the iteration state (current
//! index and accumulator) and threads it from one call to the next.
//!
//! Three execution modes are supported:
//! - `sequential`: one item per call
//! - `parallel`: the whole collection in a single call
//! - `batch`: a contiguous slice per call

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

mod collection;
mod engine;
mod output;

pub use collection::{item_at, size};
pub use engine::IterationEngine;

/// Shape of the collection being iterated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    #[default]
    Array,
    Object,
    Range,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationMode {
    #[default]
    Sequential,
    Parallel,
    Batch,
}

/// When the iteration stops before exhausting the collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStrategy {
    #[default]
    All,
    First,
    Last,
    Custom,
}

/// What to do when the item transform fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Keep going with the transform output, which is `null`
    #[default]
    Ignore,
    /// Stop the iteration and return the accumulator
    Break,
    /// Skip the failing item and move to the next index
    Continue,
    /// Fall back to the untransformed item
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    pub size: usize,
    pub overlap: usize,
    pub preserve_empty_batches: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            size: 10,
            overlap: 0,
            preserve_empty_batches: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IterationConfig {
    #[serde(rename = "collectionType")]
    pub collection_kind: CollectionKind,
    pub mode: IterationMode,
    pub exit_strategy: ExitStrategy,
    /// Maximum number of iterations, 0 means unlimited
    pub limit: usize,
    pub batch_options: Option<BatchOptions>,
    pub error_handling: ErrorPolicy,
    pub accumulate_results: bool,
    pub include_metadata: bool,
    pub simulation_mode: bool,
    pub enable_logging: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_transform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_transform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_condition: Option<String>,
}

impl IterationConfig {
    /// Limit after folding in the exit strategy; `first` stops after one item
    pub fn effective_limit(&self) -> usize {
        match self.exit_strategy {
            ExitStrategy::First => 1,
            _ => self.limit,
        }
    }

    pub fn batch_size(&self) -> usize {
        match self.batch_options.as_ref().map(|b| b.size) {
            Some(size) if size > 0 => size,
            _ => BatchOptions::default().size,
        }
    }

    pub fn batch_overlap(&self) -> usize {
        self.batch_options.as_ref().map_or(0, |b| b.overlap)
    }
}

/// Iteration state held by the caller between sequential steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IterationState {
    pub current_index: usize,
    pub accumulator: Vec<Value>,
}

/// One failure recorded during a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationStats {
    pub total_items: usize,
    pub processed_items: usize,
    pub skipped_items: usize,
    pub error_count: usize,
    /// Index the step started from
    pub iteration_count: usize,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StepError>,
}

impl IterationStats {
    pub(crate) fn record(&mut self, message: String, item: Option<Value>, index: Option<usize>) {
        self.error_count += 1;
        self.errors.push(StepError {
            message,
            item,
            index,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationResult {
    /// Accumulator, single item, batch slice or transformed result
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    pub is_last_iteration: bool,
    pub is_complete: bool,
    /// Index the caller should pass on the next call, absent once complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_index: Option<usize>,
    pub stats: IterationStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Failures that abort a step as a whole
#[derive(Error, Debug)]
pub enum IterationError {
    #[error("range bounds must be numbers, got start={start} end={end}")]
    InvalidRange { start: Value, end: Value },

    #[error("failed to serialize iteration stats: {0}")]
    Stats(#[from] serde_json::Error),
}
