//! Interned JavaScript strings
//!
//! Property names are interned so that key comparison in a slot map is
//! usually a pointer comparison. Each string carries a precomputed hash which
//! becomes the slot's `index_or_hash`.

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Global string intern table
static STRING_TABLE: std::sync::LazyLock<DashMap<Arc<str>, Arc<JsString>>> =
    std::sync::LazyLock::new(DashMap::new);

/// String interning table for explicit management
///
/// Instance-based alternative to the global table, for embedders that want
/// isolated string tables.
pub struct StringTable {
    strings: DashMap<Arc<str>, Arc<JsString>>,
}

impl StringTable {
    /// Create a new string table
    pub fn new() -> Self {
        Self {
            strings: DashMap::new(),
        }
    }

    /// Intern a string in this table
    pub fn intern(&self, s: &str) -> Arc<JsString> {
        intern_in(&self.strings, s)
    }

    /// Check if a string is interned in this table
    pub fn is_interned(&self, s: &str) -> bool {
        self.strings.contains_key(s)
    }

    /// Get the number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

fn intern_in(table: &DashMap<Arc<str>, Arc<JsString>>, s: &str) -> Arc<JsString> {
    if let Some(existing) = table.get(s) {
        return existing.clone();
    }
    let js_str = Arc::new(JsString::new(s));
    // Another thread may have won the race; keep whichever landed first.
    table
        .entry(js_str.data.clone())
        .or_insert(js_str)
        .value()
        .clone()
}

/// An immutable JavaScript string with a precomputed hash
#[derive(Clone)]
pub struct JsString {
    data: Arc<str>,
    hash: u64,
}

impl JsString {
    /// Create or retrieve an interned string (using the global table)
    pub fn intern(s: &str) -> Arc<Self> {
        intern_in(&STRING_TABLE, s)
    }

    /// Create a string without interning
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        let data: Arc<str> = s.into();
        let hash = Self::compute_hash(&data);
        Self { data, hash }
    }

    /// Get the string as a str slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Get the length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if string is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get precomputed hash value
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Compute hash for a string
    pub fn compute_hash(s: &str) -> u64 {
        let mut hasher = FxHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        // Interned strings share their buffer
        Arc::ptr_eq(&self.data, &other.data)
            || (self.hash == other.hash && self.data == other.data)
    }
}

impl Eq for JsString {}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl std::fmt::Debug for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
