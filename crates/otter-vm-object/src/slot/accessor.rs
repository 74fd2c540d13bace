//! Getter and setter strategies for accessor slots.
//!
//! An accessor slot redirects reads and writes through a [`Getter`] and a
//! [`Setter`]. Each side is one of three strategies, chosen by how the
//! accessor was registered:
//!
//! - **Function**: a script callable (possibly `undefined`), called with the
//!   receiver as `this`.
//! - **Native**: a host closure that receives the receiver directly.
//! - **Member**: a reflection-style [`HostMember`] with declared parameter
//!   types, argument coercion and an optional delegate receiver.
//!
//! Native and member strategies synthesize a function value once, at
//! registration, so descriptors report a stable `get`/`set` identity.

use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::convert::{TypeTag, coerce_arg};
use crate::error::{ContinuationPending, VmError, VmResult};
use crate::value::{JsFunction, Value};

/// Host getter closure
pub type NativeGetter = Arc<dyn Fn(&ExecutionContext, &Value) -> VmResult<Value> + Send + Sync>;

/// Host setter closure
pub type NativeSetter =
    Arc<dyn Fn(&ExecutionContext, &Value, Value) -> VmResult<()> + Send + Sync>;

/// Host method reached by reflection: `(this, args) -> result`
pub type HostMethod = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync>;

/// Failure reported by a host method
#[derive(Debug)]
pub enum HostError {
    /// The host method failed; surfaced to scripts as a runtime error
    Failure(String),
    /// The host method requested continuation capture; propagated untouched
    Continuation(ContinuationPending),
}

/// A natively implemented method exposed as a getter or setter
pub struct HostMember {
    name: String,
    param_types: Vec<TypeTag>,
    delegate_to: Option<Value>,
    method: HostMethod,
}

impl HostMember {
    /// Wrap a host method with its declared parameter types
    pub fn new(
        name: impl Into<String>,
        param_types: Vec<TypeTag>,
        method: impl Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            param_types,
            delegate_to: None,
            method: Arc::new(method),
        }
    }

    /// Invoke on `target` instead of the nominal receiver.
    ///
    /// The nominal receiver is then passed as the first argument.
    pub fn with_delegate(mut self, target: Value) -> Self {
        self.delegate_to = Some(target);
        self
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed delegate receiver, if any
    pub fn delegate_to(&self) -> Option<&Value> {
        self.delegate_to.as_ref()
    }

    /// Invoke the host method, mapping host failures to script errors
    pub fn invoke(&self, this: &Value, args: &[Value]) -> VmResult<Value> {
        match (self.method)(this, args) {
            Ok(value) => Ok(value),
            Err(HostError::Continuation(pending)) => Err(VmError::continuation(pending)),
            Err(HostError::Failure(message)) => Err(VmError::host_error(&self.name, message)),
        }
    }

    /// Getter call convention
    pub fn get(&self, receiver: &Value) -> VmResult<Value> {
        match &self.delegate_to {
            None => self.invoke(receiver, &[]),
            Some(target) => self.invoke(target, &[receiver.clone()]),
        }
    }

    /// Setter call convention: coerce by the last declared parameter type
    pub fn set(&self, receiver: &Value, value: &Value) -> VmResult<()> {
        let tag = self.param_types.last().copied().unwrap_or(TypeTag::Value);
        let arg = coerce_arg(value, tag)?;
        let args: SmallVec<[Value; 2]> = match &self.delegate_to {
            None => smallvec![arg],
            Some(_) => smallvec![receiver.clone(), arg],
        };
        let this = self.delegate_to.as_ref().unwrap_or(receiver);
        self.invoke(this, &args)?;
        Ok(())
    }
}

impl std::fmt::Debug for HostMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostMember")
            .field("name", &self.name)
            .field("param_types", &self.param_types)
            .field("delegated", &self.delegate_to.is_some())
            .finish()
    }
}

/// Read side of an accessor property
#[derive(Clone)]
pub enum Getter {
    /// Script callable (or `undefined`)
    Function(Value),
    /// Host closure
    Native {
        /// The closure
        get: NativeGetter,
        /// Function value reported by descriptors
        function: Arc<JsFunction>,
    },
    /// Reflection-backed host member
    Member {
        /// The member
        member: Arc<HostMember>,
        /// Function value reported by descriptors
        function: Arc<JsFunction>,
    },
}

impl Getter {
    /// Getter backed by a script value
    pub fn function(target: Value) -> Self {
        Self::Function(target)
    }

    /// Getter backed by a host closure
    pub fn native(
        name: &str,
        get: impl Fn(&ExecutionContext, &Value) -> VmResult<Value> + Send + Sync + 'static,
    ) -> Self {
        let get: NativeGetter = Arc::new(get);
        let inner = get.clone();
        let function = JsFunction::new(format!("get {}", name), 0, move |cx, this, _| inner(cx, this));
        Self::Native { get, function }
    }

    /// Getter backed by a host member
    pub fn member(name: &str, member: Arc<HostMember>) -> Self {
        let inner = member.clone();
        let function = JsFunction::new(name, 0, move |_, this, _| inner.get(this));
        Self::Member { member, function }
    }

    /// Invoke with `receiver` as the target object
    pub fn get_value(&self, cx: &ExecutionContext, receiver: &Value) -> VmResult<Value> {
        match self {
            Self::Function(Value::Function(f)) => f.call(cx, receiver, &[]),
            Self::Function(_) => Ok(Value::undefined()),
            Self::Native { get, .. } => get(cx, receiver),
            Self::Member { member, .. } => member.get(receiver),
        }
    }

    /// Function value for descriptors (`None` renders as `undefined`)
    pub fn as_function(&self) -> Option<Value> {
        match self {
            Self::Function(v) if v.is_callable() => Some(v.clone()),
            Self::Function(_) => None,
            Self::Native { function, .. } | Self::Member { function, .. } => {
                Some(Value::function(function.clone()))
            }
        }
    }
}

/// Write side of an accessor property
#[derive(Clone)]
pub enum Setter {
    /// Script callable (or `undefined`)
    Function(Value),
    /// Host closure
    Native {
        /// The closure
        set: NativeSetter,
        /// Function value reported by descriptors
        function: Arc<JsFunction>,
    },
    /// Reflection-backed host member
    Member {
        /// The member
        member: Arc<HostMember>,
        /// Function value reported by descriptors
        function: Arc<JsFunction>,
    },
}

impl Setter {
    /// Setter backed by a script value
    pub fn function(target: Value) -> Self {
        Self::Function(target)
    }

    /// Setter backed by a host closure
    pub fn native(
        name: &str,
        set: impl Fn(&ExecutionContext, &Value, Value) -> VmResult<()> + Send + Sync + 'static,
    ) -> Self {
        let set: NativeSetter = Arc::new(set);
        let inner = set.clone();
        let function = JsFunction::new(format!("set {}", name), 1, move |cx, this, args| {
            inner(cx, this, args.first().cloned().unwrap_or_default())?;
            Ok(Value::undefined())
        });
        Self::Native { set, function }
    }

    /// Setter backed by a host member
    pub fn member(name: &str, member: Arc<HostMember>) -> Self {
        let inner = member.clone();
        let function = JsFunction::new(name, 1, move |_, this, args| {
            inner.set(this, &args.first().cloned().unwrap_or_default())?;
            Ok(Value::undefined())
        });
        Self::Member { member, function }
    }

    /// Invoke with `receiver` as `this` and `value` as the sole argument
    pub fn set_value(&self, cx: &ExecutionContext, value: Value, receiver: &Value) -> VmResult<()> {
        match self {
            Self::Function(Value::Function(f)) => {
                f.call(cx, receiver, &[value])?;
                Ok(())
            }
            Self::Function(_) => Ok(()),
            Self::Native { set, .. } => set(cx, receiver, value),
            Self::Member { member, .. } => member.set(receiver, &value),
        }
    }

    /// Function value for descriptors (`None` renders as `undefined`)
    pub fn as_function(&self) -> Option<Value> {
        match self {
            Self::Function(v) if v.is_callable() => Some(v.clone()),
            Self::Function(_) => None,
            Self::Native { function, .. } | Self::Member { function, .. } => {
                Some(Value::function(function.clone()))
            }
        }
    }
}

/// Getter/setter pair held by an accessor slot.
///
/// Both halves absent is legal: reads yield the stored value (normally
/// `undefined`) and writes fall back to data semantics.
#[derive(Clone, Default)]
pub struct AccessorPair {
    /// Read side
    pub getter: Option<Getter>,
    /// Write side
    pub setter: Option<Setter>,
}

impl AccessorPair {
    /// Neither getter nor setter present
    pub fn is_empty(&self) -> bool {
        self.getter.is_none() && self.setter.is_none()
    }
}
