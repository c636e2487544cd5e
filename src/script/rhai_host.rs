//! Rhai-backed script host
//!
//! Scripts are compiled once and cached by source text. Every evaluation
//! gets a fresh scope containing only the bindings supplied by the caller.

use super::{ScriptError, ScriptHost};
use lru::LruCache;
use rhai::{Dynamic, Engine, EvalAltResult, Position, Scope, AST};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Resource limits applied to every script evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    /// Number of compiled scripts kept in memory
    pub cache_size: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 1024 * 1024,
            max_array_size: 100_000,
            max_map_size: 10_000,
            cache_size: 128,
        }
    }
}

pub struct RhaiHost {
    engine: Engine,
    cache: Mutex<LruCache<String, Arc<AST>>>,
}

impl RhaiHost {
    pub fn new() -> Self {
        Self::with_limits(&ScriptLimits::default())
    }

    pub fn with_limits(limits: &ScriptLimits) -> Self {
        let mut engine = Engine::new();
        engine
            .set_max_operations(limits.max_operations)
            .set_max_call_levels(limits.max_call_levels)
            .set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth)
            .set_max_string_size(limits.max_string_size)
            .set_max_array_size(limits.max_array_size)
            .set_max_map_size(limits.max_map_size)
            .set_module_resolver(rhai::module_resolvers::DummyModuleResolver::new());
        engine.disable_symbol("eval");

        engine.on_print(|text| debug!(target: "blockflow::script", "{}", text));
        engine.on_debug(|text, source, pos: Position| {
            trace!(target: "blockflow::script", source = ?source, position = %pos, "{}", text)
        });

        let capacity = NonZeroUsize::new(limits.cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            engine,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn compile(&self, source: &str) -> Result<Arc<AST>, ScriptError> {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(ast) = cache.get(source) {
                return Ok(Arc::clone(ast));
            }
        }

        let ast = Arc::new(
            self.engine
                .compile(source)
                .map_err(|e| ScriptError::compile(e.to_string()))?,
        );

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(source.to_string(), Arc::clone(&ast));
        }
        Ok(ast)
    }

    /// Number of compiled scripts currently cached
    pub fn cached_scripts(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for RhaiHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RhaiHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiHost")
            .field("cached_scripts", &self.cached_scripts())
            .finish()
    }
}

impl ScriptHost for RhaiHost {
    fn run(&self, source: &str, args: &[(&str, &Value)]) -> Result<Value, ScriptError> {
        let ast = self.compile(source)?;

        let mut scope = Scope::new();
        for (name, value) in args {
            scope.push_dynamic(*name, json_to_dynamic(value)?);
        }

        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, &ast)
            .map_err(runtime_error)?;

        dynamic_to_json(&result)
    }
}

fn runtime_error(err: Box<EvalAltResult>) -> ScriptError {
    match *err {
        // `throw "message"` surfaces the thrown value rather than the wrapper text
        EvalAltResult::ErrorRuntime(value, _) => ScriptError::runtime(value.to_string()),
        other => ScriptError::runtime(other.to_string()),
    }
}

fn json_to_dynamic(value: &Value) -> Result<Dynamic, ScriptError> {
    rhai::serde::to_dynamic(value).map_err(|e| ScriptError::conversion(e.to_string()))
}

fn dynamic_to_json(value: &Dynamic) -> Result<Value, ScriptError> {
    rhai::serde::from_dynamic(value).map_err(|e| ScriptError::conversion(e.to_string()))
}
