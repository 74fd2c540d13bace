//! Execution context consumed by the property layer
//!
//! The interpreter hands an `ExecutionContext` to every operation that may
//! need to choose between a silent no-op and a `TypeError` (strict mode), to
//! invoke getters and setters, or to build descriptor objects.

use rustc_hash::FxHashSet;
use std::sync::Arc;

use crate::config::SlotMapConfig;
use crate::object::JsObject;
use crate::symbol::SymbolRegistry;

/// Engine feature flags relevant to property storage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Treat getter-only assignment as an error even outside strict code
    StrictMode,
    /// Objects created through this context get thread-safe slot containers
    ThreadSafeObjects,
}

/// Per-thread execution state needed by property operations
pub struct ExecutionContext {
    strict: bool,
    features: FxHashSet<Feature>,
    config: SlotMapConfig,
    object_prototype: Option<Arc<JsObject>>,
    symbols: Arc<SymbolRegistry>,
}

impl ExecutionContext {
    /// Non-strict context with default configuration
    pub fn new() -> Self {
        Self {
            strict: false,
            features: FxHashSet::default(),
            config: SlotMapConfig::default(),
            object_prototype: None,
            symbols: Arc::new(SymbolRegistry::new()),
        }
    }

    /// Strict-mode context with default configuration
    pub fn strict() -> Self {
        let mut cx = Self::new();
        cx.strict = true;
        cx
    }

    /// Replace the slot storage configuration
    pub fn with_config(mut self, config: SlotMapConfig) -> Self {
        if config.thread_safe {
            self.features.insert(Feature::ThreadSafeObjects);
        }
        self.config = config;
        self
    }

    /// Enable a feature
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    /// Use `proto` as the prototype of descriptor objects and `new_object` results
    pub fn with_object_prototype(mut self, proto: Arc<JsObject>) -> Self {
        self.object_prototype = Some(proto);
        self
    }

    /// Share a symbol registry with other contexts
    pub fn with_symbol_registry(mut self, symbols: Arc<SymbolRegistry>) -> Self {
        self.symbols = symbols;
        self
    }

    /// Whether the currently executing code is strict
    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Switch strictness (entering or leaving strict code)
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Check a feature flag
    #[inline]
    pub fn has_feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::ThreadSafeObjects => {
                self.config.thread_safe || self.features.contains(&feature)
            }
            Feature::StrictMode => self.features.contains(&feature),
        }
    }

    /// Slot storage configuration
    pub fn config(&self) -> &SlotMapConfig {
        &self.config
    }

    /// Symbol registry
    pub fn symbols(&self) -> &Arc<SymbolRegistry> {
        &self.symbols
    }

    /// Create an ordinary object (descriptor objects are built with this)
    pub fn new_object(&self) -> Arc<JsObject> {
        let mut config = self.config.clone();
        config.thread_safe = self.has_feature(Feature::ThreadSafeObjects);
        Arc::new(JsObject::with_config(self.object_prototype.clone(), &config))
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("strict", &self.strict)
            .field("features", &self.features)
            .field("config", &self.config)
            .finish()
    }
}
