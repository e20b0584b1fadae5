//! Error types for the Springboard coroutine runtime

use thiserror::Error;

use crate::value::Value;

/// Main error type for Springboard.
///
/// Errors are values here: they travel back *into* a suspended coroutine
/// through its error resume channel before they ever reach a completion
/// callback, so the type is `Clone` and carries its payload as a
/// [`Value`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Raised by the coroutine's own logic (the in-coroutine equivalent
    /// of a thrown exception).
    #[error("ComputationError: {0}")]
    Computation(Value),

    /// Reported by an async adapter via its callback's error argument.
    #[error("AdapterError: {0}")]
    Adapter(Value),

    /// A usage bug in the yield protocol (e.g. resuming a finished
    /// coroutine). Not recoverable by the computation; surfaces directly
    /// to the completion callback.
    #[error("ProtocolViolation: {0}")]
    Protocol(String),
}

impl Error {
    /// Create a `ComputationError`.
    pub fn computation(value: impl Into<Value>) -> Self {
        Error::Computation(value.into())
    }

    /// Create an `AdapterError`.
    pub fn adapter(value: impl Into<Value>) -> Self {
        Error::Adapter(value.into())
    }

    /// Create a `ProtocolViolation`.
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }

    /// The payload carried by this error, as a [`Value`].
    pub fn value(&self) -> Value {
        match self {
            Error::Computation(v) | Error::Adapter(v) => v.clone(),
            Error::Protocol(msg) => Value::String(msg.clone()),
        }
    }

    /// Returns `true` if the computation may recover from this error
    /// through its error resume channel.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Protocol(_))
    }
}

/// Result type alias for Springboard.
pub type Result<T> = std::result::Result<T, Error>;
