//! Typed call sites for user scripts
//!
//! Each wrapper binds exactly the parameters documented for its use site,
//! so a script cannot observe anything the engine did not hand it.

use super::{is_truthy, ScriptError, ScriptHost};
use serde_json::Value;

/// `(item, index, collection) -> item'`
pub struct ItemTransform<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> ItemTransform<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    pub fn apply(&self, item: &Value, index: usize, collection: &Value) -> Result<Value, ScriptError> {
        let index = Value::from(index);
        self.host.run(
            self.source,
            &[("item", item), ("index", &index), ("collection", collection)],
        )
    }
}

/// `(item, index, collection, accumulator) -> bool`
pub struct ExitCondition<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> ExitCondition<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    pub fn check(
        &self,
        item: &Value,
        index: usize,
        collection: &Value,
        accumulator: &[Value],
    ) -> Result<bool, ScriptError> {
        let index = Value::from(index);
        let accumulator = Value::Array(accumulator.to_vec());
        self.host
            .run(
                self.source,
                &[
                    ("item", item),
                    ("index", &index),
                    ("collection", collection),
                    ("accumulator", &accumulator),
                ],
            )
            .map(|v| is_truthy(&v))
    }
}

/// `(result, collection, stats) -> result'`
pub struct ResultTransform<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> ResultTransform<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    pub fn apply(&self, result: &Value, collection: &Value, stats: &Value) -> Result<Value, ScriptError> {
        self.host.run(
            self.source,
            &[("result", result), ("collection", collection), ("stats", stats)],
        )
    }
}

/// `(inputs) -> inputs'`
pub struct InputsTransform<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> InputsTransform<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    pub fn apply(&self, inputs: &Value) -> Result<Value, ScriptError> {
        self.host.run(self.source, &[("inputs", inputs)])
    }
}

/// `(result) -> result'`
pub struct OutputTransform<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> OutputTransform<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    pub fn apply(&self, result: &Value) -> Result<Value, ScriptError> {
        self.host.run(self.source, &[("result", result)])
    }
}

/// `(inputs, config) -> any`
pub struct CustomMerge<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> CustomMerge<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    pub fn apply(&self, inputs: &Value, config: &Value) -> Result<Value, ScriptError> {
        self.host
            .run(self.source, &[("inputs", inputs), ("config", config)])
    }
}

/// `(objects) -> object`
pub struct ObjectsMerge<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> ObjectsMerge<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    pub fn apply(&self, objects: &[Value]) -> Result<Value, ScriptError> {
        let objects = Value::Array(objects.to_vec());
        self.host.run(self.source, &[("objects", &objects)])
    }
}

/// `(input) -> bool`
pub struct Condition<'a> {
    host: &'a dyn ScriptHost,
    source: &'a str,
}

impl<'a> Condition<'a> {
    pub fn new(host: &'a dyn ScriptHost, source: &'a str) -> Self {
        Self { host, source }
    }

    /// Evaluates the condition, returning the raw value alongside its truthiness
    pub fn evaluate(&self, input: &Value) -> Result<(Value, bool), ScriptError> {
        let value = self.host.run(self.source, &[("input", input)])?;
        let truthy = is_truthy(&value);
        Ok((value, truthy))
    }

    pub fn check(&self, input: &Value) -> Result<bool, ScriptError> {
        self.evaluate(input).map(|(_, truthy)| truthy)
    }
}
