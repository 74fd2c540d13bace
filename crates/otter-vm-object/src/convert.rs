//! Value conversions used by the property layer.
//!
//! `FromValue` converts a JS `Value` into a Rust type. Host member setters
//! declare a [`TypeTag`] per parameter and [`coerce_arg`] marshals the
//! incoming value through the matching `FromValue` impl, the same path used
//! for ordinary native method calls.

use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::JsObject;
use crate::value::Value;

/// Convert a JS `Value` into a Rust type.
pub trait FromValue: Sized {
    /// Convert from a JS Value, returning VmError on type mismatch.
    fn from_value(value: &Value) -> Result<Self, VmError>;
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, VmError> {
        Ok(to_number(value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, VmError> {
        Ok(to_int32(to_number(value)))
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Result<Self, VmError> {
        Ok(to_uint32(to_number(value)))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, VmError> {
        Ok(to_boolean(value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, VmError> {
        if matches!(value, Value::Symbol(_)) {
            return Err(VmError::type_error(
                "Cannot convert a Symbol value to a string",
            ));
        }
        Ok(to_string(value))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, VmError> {
        Ok(value.clone())
    }
}

impl FromValue for Arc<JsObject> {
    fn from_value(value: &Value) -> Result<Self, VmError> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| VmError::type_error(format!("{} is not an object", to_string(value))))
    }
}

/// Declared parameter type of a host member
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeTag {
    /// Host string
    String,
    /// 32-bit integer
    Int,
    /// Boolean
    Boolean,
    /// Double
    Double,
    /// Script object (primitives are rejected)
    Object,
    /// Any value, passed through untouched
    Value,
}

/// Coerce a script value to the representation a host parameter expects.
pub fn coerce_arg(value: &Value, tag: TypeTag) -> VmResult<Value> {
    Ok(match tag {
        TypeTag::String => Value::string(&String::from_value(value)?),
        TypeTag::Int => Value::int32(i32::from_value(value)?),
        TypeTag::Boolean => Value::boolean(bool::from_value(value)?),
        TypeTag::Double => Value::number(f64::from_value(value)?),
        TypeTag::Object => match value {
            Value::Function(_) => value.clone(),
            _ => Value::object(Arc::<JsObject>::from_value(value)?),
        },
        TypeTag::Value => value.clone(),
    })
}

/// ES ToBoolean
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !(*n == 0.0 || n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Symbol(_) | Value::Object(_) | Value::Function(_) => true,
    }
}

/// ES ToNumber (without object-to-primitive)
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => {
            let trimmed = s.as_str().trim();
            if trimmed.is_empty() {
                0.0
            } else {
                match trimmed {
                    "Infinity" | "+Infinity" => f64::INFINITY,
                    "-Infinity" => f64::NEG_INFINITY,
                    _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
                }
            }
        }
        Value::Symbol(_) | Value::Object(_) | Value::Function(_) => f64::NAN,
    }
}

/// ES ToInt32
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ES ToUint32
pub fn to_uint32(n: f64) -> u32 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// ES ToString (without object-to-primitive)
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.as_str().to_string(),
        Value::Symbol(sym) => sym.to_string(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
    }
}

/// Format a number to string per JS semantics (common cases)
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// ES SameValue: NaN equals NaN, +0 and -0 differ
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                return true;
            }
            x.to_bits() == y.to_bits() || (x == y && *x != 0.0)
        }
        _ => a == b,
    }
}
