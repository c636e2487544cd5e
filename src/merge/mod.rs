//! Merge engine
//!
//! Combines named inputs into a single value. Arrays can be concatenated,
//! unioned or intersected, objects merged under a key-collision strategy,
//! or everything handed to a user script. Statistics are accumulated per
//! call and never shared between invocations.

use crate::script::ScriptError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

mod array_ops;
mod engine;
mod objects;

pub use array_ops::{compare_values, deduplicate, flatten, sort_items};
pub use engine::MergeEngine;
pub use objects::{apply_key_prefixes, deep_merge};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MergeMode {
    Concat,
    Merge,
    #[default]
    Auto,
    Union,
    Intersection,
    Custom,
    Unrecognized(String),
}

impl MergeMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Concat => "concat",
            Self::Merge => "merge",
            Self::Auto => "auto",
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Custom => "custom",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<String> for MergeMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "concat" => Self::Concat,
            "merge" => Self::Merge,
            "auto" => Self::Auto,
            "union" => Self::Union,
            "intersection" => Self::Intersection,
            "custom" => Self::Custom,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<MergeMode> for String {
    fn from(mode: MergeMode) -> Self {
        mode.as_str().to_string()
    }
}

/// How key collisions between object inputs are resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectStrategy {
    Replace,
    Keep,
    #[default]
    Deep,
    Custom,
    Unrecognized(String),
}

impl ObjectStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Replace => "replace",
            Self::Keep => "keep",
            Self::Deep => "deep",
            Self::Custom => "custom",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<String> for ObjectStrategy {
    fn from(value: String) -> Self {
        match value.as_str() {
            "replace" => Self::Replace,
            "keep" => Self::Keep,
            "deep" => Self::Deep,
            "custom" => Self::Custom,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<ObjectStrategy> for String {
    fn from(strategy: ObjectStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Post-processing applied to array results, in the order
/// dedupe, sort, flatten
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArrayOptions {
    pub sort: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub remove_duplicates: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_field: Option<String>,
    pub flatten: bool,
    /// Unset or zero flattens completely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyPrefixOptions {
    pub enabled: bool,
    /// Source name to prefix
    pub prefixes: BTreeMap<String, String>,
    pub separator: String,
}

impl Default for KeyPrefixOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            prefixes: BTreeMap::new(),
            separator: "_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeErrorPolicy {
    /// Record the error and return `null`
    Ignore,
    /// Record the error and return `{}`
    #[default]
    Default,
    /// Fail the call
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeConfig {
    pub mode: MergeMode,
    pub object_strategy: ObjectStrategy,
    pub array_options: ArrayOptions,
    pub key_prefix: KeyPrefixOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_transform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_transform: Option<String>,
    pub error_handling: MergeErrorPolicy,
    pub batch_processing: bool,
    pub collect_stats: bool,
    pub simulation_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_code: Option<String>,
    pub enable_logging: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeIssue {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    /// Items per input: 0 for null, length for arrays, 1 otherwise
    pub input_count: BTreeMap<String, usize>,
    pub output_count: usize,
    pub conflicts: usize,
    pub duplicates_removed: usize,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub errors: Vec<MergeIssue>,
}

impl MergeStats {
    pub(crate) fn record(&mut self, message: impl Into<String>, source: &str) {
        self.errors.push(MergeIssue {
            message: message.into(),
            source: Some(source.to_string()),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<MergeStats>,
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Erreur de pré-transformation: {0}")]
    PreTransform(#[source] ScriptError),

    #[error("Erreur de post-transformation: {0}")]
    PostTransform(#[source] ScriptError),

    #[error("Mode de fusion non reconnu: {0}")]
    UnknownMode(String),

    #[error("Stratégie de fusion d'objets non reconnue: {0}")]
    UnknownObjectStrategy(String),

    #[error("Code personnalisé requis pour le mode de fusion personnalisé")]
    MissingCustomCode,

    #[error("Code personnalisé requis pour la stratégie de fusion personnalisée")]
    MissingCustomStrategyCode,

    #[error("Erreur dans le code personnalisé: {0}")]
    CustomCode(#[source] ScriptError),

    #[error("failed to serialize merge configuration: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Gather the `input*` fields of a block payload, in payload order
pub fn collect_inputs(payload: &Value) -> Map<String, Value> {
    payload
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .filter(|(name, _)| name.starts_with("input"))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
