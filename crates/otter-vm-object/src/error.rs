//! VM error types for property storage operations

use crate::value::Value;
use thiserror::Error;

/// VM errors raised by the object model
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g. writing a read-only property in strict mode)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reference error (missing property where one is required)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Range error (e.g. an attribute bit pattern outside the valid mask)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Internal error
    #[error("InternalError: {0}")]
    InternalError(String),

    /// Thrown JS exception (from a getter/setter script)
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),

    /// A host member failed while being invoked as a getter or setter
    #[error("Error: {member}: {message}")]
    HostError {
        /// Name of the host member
        member: String,
        /// Failure message reported by the host
        message: String,
    },

    /// Continuation capture in progress.
    ///
    /// Only the interpreter may catch this; the property layer passes it through.
    #[error("continuation pending")]
    ContinuationPending(Box<ContinuationPending>),
}

/// A thrown JavaScript value
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// The thrown value (as a string representation)
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// State captured by the interpreter when a continuation is requested.
#[derive(Debug, Clone)]
pub struct ContinuationPending {
    /// Opaque identifier assigned by the interpreter
    pub id: u64,
    /// Value handed to the continuation
    pub application_state: Value,
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a reference error
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create a host member failure
    pub fn host_error(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostError {
            member: member.into(),
            message: message.into(),
        }
    }

    /// Create an exception from a thrown JS value
    pub fn exception(value: Value) -> Self {
        let message = value.to_display_string();
        Self::Exception(Box::new(ThrownValue { message, value }))
    }

    /// Wrap a continuation capture signal
    pub fn continuation(pending: ContinuationPending) -> Self {
        Self::ContinuationPending(Box::new(pending))
    }

    /// True for `TypeError`
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeError(_))
    }

    /// True for the continuation capture signal
    pub fn is_continuation(&self) -> bool {
        matches!(self, Self::ContinuationPending(_))
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;
