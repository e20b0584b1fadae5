//! Prelude module for convenient imports
//!
//! This module provides the most commonly used types for working with
//! Springboard. Import everything from this module for quick access:
//!
//! ```
//! use springboard::prelude::*;
//!
//! let done = from_fn(|input| Ok(Step::Done(input?)));
//! Driver::start(done, |settlement| {
//!     assert_eq!(settlement, Ok(Value::Undefined));
//! });
//! ```

// Stepping contract and yield protocol
pub use crate::coroutine::{
    from_fn, immediate, AdapterCallback, AdapterFn, Coroutine, Step, StepResult, Suspension,
};

// Trampoline driver
pub use crate::trampoline::{CompletionCallback, Driver, DriverStats, Settlement};

// Join combinator
pub use crate::join::WaitAll;

// Values and errors
pub use crate::error::{Error, Result};
pub use crate::value::Value;
