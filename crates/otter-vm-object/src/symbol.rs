//! Symbols
//!
//! Symbols are compared by identity. The registry backs `Symbol.for` style
//! lookup and hands out well-known symbols.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// A JavaScript symbol
#[derive(Debug)]
pub struct Symbol {
    /// Symbol description
    pub description: Option<String>,
    /// Unique ID
    pub id: u64,
}

impl Symbol {
    /// Create a fresh, unique symbol
    pub fn new(description: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            description: description.map(str::to_owned),
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Hash used for slot bucket placement
    #[inline]
    pub fn hash_value(&self) -> u32 {
        // Fibonacci mixing spreads sequential ids across buckets
        (self.id.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as u32
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({})", self.description.as_deref().unwrap_or(""))
    }
}

/// Registry of shared symbols (`Symbol.for`)
///
/// Passed explicitly to whoever needs it rather than looked up globally.
pub struct SymbolRegistry {
    by_key: DashMap<String, Arc<Symbol>>,
}

impl SymbolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            by_key: DashMap::new(),
        }
    }

    /// Get or create the registered symbol for `key`
    pub fn for_key(&self, key: &str) -> Arc<Symbol> {
        self.by_key
            .entry(key.to_owned())
            .or_insert_with(|| Symbol::new(Some(key)))
            .value()
            .clone()
    }

    /// Reverse lookup (`Symbol.keyFor`)
    pub fn key_for(&self, symbol: &Arc<Symbol>) -> Option<String> {
        self.by_key
            .iter()
            .find(|entry| Arc::ptr_eq(entry.value(), symbol))
            .map(|entry| entry.key().clone())
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
