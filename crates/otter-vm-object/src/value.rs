//! JavaScript values as seen by the property layer
//!
//! The interpreter owns the full value representation; the property layer only
//! needs to store values, compare object identity, call functions (getters and
//! setters) and build descriptor objects.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::VmResult;
use crate::object::JsObject;
use crate::string::JsString;
use crate::symbol::Symbol;

/// Native function handler type
///
/// Receives the execution context, the `this` value and the arguments.
pub type NativeFn =
    Arc<dyn Fn(&ExecutionContext, &Value, &[Value]) -> VmResult<Value> + Send + Sync>;

/// A callable function value
pub struct JsFunction {
    name: String,
    length: u32,
    func: NativeFn,
}

impl JsFunction {
    /// Create a function from a native handler
    pub fn new(
        name: impl Into<String>,
        length: u32,
        func: impl Fn(&ExecutionContext, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            length,
            func: Arc::new(func),
        })
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter count
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Call the function with `this` and arguments.
    ///
    /// Errors raised by the callee are returned untouched.
    pub fn call(&self, cx: &ExecutionContext, this: &Value, args: &[Value]) -> VmResult<Value> {
        (self.func)(cx, this, args)
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Function: {}]", self.name)
    }
}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(Arc<JsString>),
    /// Symbol
    Symbol(Arc<Symbol>),
    /// Ordinary object
    Object(Arc<JsObject>),
    /// Callable function
    Function(Arc<JsFunction>),
}

impl Value {
    /// Create undefined value
    #[inline]
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// Create null value
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Create boolean value
    #[inline]
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Create number value
    #[inline]
    pub const fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create number value from a 32-bit integer
    #[inline]
    pub fn int32(n: i32) -> Self {
        Self::Number(n as f64)
    }

    /// Create an (uninterned) string value
    pub fn string(s: &str) -> Self {
        Self::String(Arc::new(JsString::new(s)))
    }

    /// Create object value
    pub fn object(obj: Arc<JsObject>) -> Self {
        Self::Object(obj)
    }

    /// Create function value
    pub fn function(func: Arc<JsFunction>) -> Self {
        Self::Function(func)
    }

    /// Create symbol value
    pub fn symbol(sym: Arc<Symbol>) -> Self {
        Self::Symbol(sym)
    }

    /// Check if undefined
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check if null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if boolean
    #[inline]
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean(_))
    }

    /// Check if callable
    #[inline]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Check if this is an object (functions included)
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Function(_))
    }

    /// Get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as 32-bit integer, if the number is integral and in range
    pub fn as_int32(&self) -> Option<i32> {
        match self {
            Self::Number(n) if n.fract() == 0.0 && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 => {
                Some(*n as i32)
            }
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&Arc<JsString>> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as object
    pub fn as_object(&self) -> Option<&Arc<JsObject>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get as function
    pub fn as_function(&self) -> Option<&Arc<JsFunction>> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// ToBoolean
    pub fn to_boolean(&self) -> bool {
        crate::convert::to_boolean(self)
    }

    /// Object identity: both values reference the same heap object
    pub fn same_object(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `typeof` result
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// String rendering used in error messages
    pub fn to_display_string(&self) -> String {
        crate::convert::to_string(self)
    }
}

impl PartialEq for Value {
    /// Strict equality (`===`)
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => Arc::ptr_eq(a, b),
            _ => self.same_object(other),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s.as_str()),
            Self::Symbol(sym) => write!(f, "{}", sym),
            Self::Object(obj) => write!(f, "{:?}", obj),
            Self::Function(func) => write!(f, "{:?}", func),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::int32(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}
