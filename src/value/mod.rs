//! Dynamic Values for Resume Channels
//!
//! Adapters report results as a dynamically-typed argument list and
//! coroutines are resumed with a single value, so the runtime needs a
//! small dynamic value type to carry payloads across suspension points.
//! [`Value`] plays that role, together with the packing rule that
//! normalizes a callback's argument list into one resume value.

use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically-typed value carried through resume channels and
/// completion callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (a zero-argument adapter callback resumes with this).
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Numeric value (IEEE 754 double).
    Number(f64),
    /// String value.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Object represented as key-value pairs.
    Object(HashMap<String, Value>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Object(_) => write!(f, "[object]"),
        }
    }
}

impl Value {
    /// Create an array value.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    /// Create an object value from key-value pairs.
    pub fn object(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Object(pairs.into_iter().collect())
    }

    /// Normalize an adapter callback's success arguments into a single
    /// resume value.
    ///
    /// The stepping interface accepts only one resume value, so the
    /// argument list is packed: zero arguments become [`Value::Undefined`],
    /// exactly one argument is unwrapped, and two or more arguments are
    /// packed into an ordered [`Value::Array`]. Zero- and one-argument
    /// callbacks round-trip exactly; multi-argument callbacks are
    /// observable only as a sequence.
    pub fn from_callback_args(mut args: Vec<Value>) -> Self {
        match args.len() {
            0 => Value::Undefined,
            1 => args.remove(0),
            _ => Value::Array(args),
        }
    }

    /// Returns `true` for `Undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
