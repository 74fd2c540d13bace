//! Property keys
//!
//! A key is a string, a symbol or an integer index. Every key has an
//! `index_or_hash` used for bucket placement: the index itself for integer
//! keys, the precomputed string hash, or the symbol's mixed id.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::string::JsString;
use crate::symbol::Symbol;

/// Property key (string, symbol or integer index)
#[derive(Clone)]
pub enum PropertyKey {
    /// String property key
    String(Arc<JsString>),
    /// Symbol property key
    Symbol(Arc<Symbol>),
    /// Integer index (array-like properties)
    Index(u32),
}

impl PropertyKey {
    /// Create a string property key.
    ///
    /// Canonical array-index strings ("0", "17") become `Index` keys so that
    /// `obj["3"]` and `obj[3]` address the same slot.
    pub fn string(s: &str) -> Self {
        match parse_array_index(s) {
            Some(index) => Self::Index(index),
            None => Self::String(JsString::intern(s)),
        }
    }

    /// Create from an already interned string
    pub fn from_js_string(s: Arc<JsString>) -> Self {
        match parse_array_index(s.as_str()) {
            Some(index) => Self::Index(index),
            None => Self::String(s),
        }
    }

    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// Create a symbol property key
    pub fn symbol(sym: Arc<Symbol>) -> Self {
        Self::Symbol(sym)
    }

    /// Hash (or index) used for bucket placement
    #[inline]
    pub fn index_or_hash(&self) -> u32 {
        match self {
            Self::String(s) => s.hash_value() as u32,
            Self::Symbol(sym) => sym.hash_value(),
            Self::Index(i) => *i,
        }
    }

    /// True for symbol keys
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// The integer index, if this is an index key
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// Identity check without the equality fallback
    #[inline]
    pub(crate) fn same_identity(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Arc::ptr_eq(a, b),
            (Self::Symbol(a), Self::Symbol(b)) => Arc::ptr_eq(a, b),
            (Self::Index(a), Self::Index(b)) => a == b,
            _ => false,
        }
    }

    /// Name used for diagnostics and synthesized function names
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

/// Parse a canonical array index ("0", "42", but not "01" or "4294967295")
fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value: u64 = s.parse().ok()?;
    // 2^32 - 1 is the array length limit, not a valid index
    if value >= u32::MAX as u64 {
        return None;
    }
    Some(value as u32)
}

impl PartialEq for PropertyKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Symbol(a), Self::Symbol(b)) => Arc::ptr_eq(a, b),
            (Self::Index(a), Self::Index(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PropertyKey {}

impl Hash for PropertyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.index_or_hash());
    }
}

impl std::fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{:?}", s.as_str()),
            Self::Symbol(sym) => write!(f, "{}", sym),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s.as_str()),
            Self::Symbol(sym) => write!(f, "{}", sym),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl From<Arc<Symbol>> for PropertyKey {
    fn from(sym: Arc<Symbol>) -> Self {
        Self::Symbol(sym)
    }
}
