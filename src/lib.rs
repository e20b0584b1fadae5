//! Springboard: a trampoline-driven coroutine runtime for callback-style async
//!
//! Springboard executes cooperative coroutines — suspendable computations
//! expressed as a sequence of steps separated by suspension points — to
//! completion, bridging them to callback-style asynchronous operations and
//! to other coroutines. Code that looks sequential (normal returns, normal
//! raised errors) runs over operations that actually complete later,
//! without blocking a thread and without growing the call stack per
//! suspension.
//!
//! # Features
//!
//! - **Trampoline driver**: queue-based re-entry keeps stack depth
//!   constant per suspension, even across tens of thousands of steps
//! - **Two-shape yield protocol**: suspend on a callback adapter or on a
//!   nested coroutine; both settle back into the parent identically
//! - **Resumable errors**: failures are delivered back into the raising
//!   coroutine's error channel first, so recovery scopes around the
//!   suspension point can catch them
//! - **WaitAll join**: drive several coroutines concurrently and yield a
//!   single aggregate that fires once all of them have settled
//!
//! # Quick Start
//!
//! ```
//! use springboard::coroutine::{from_fn, immediate, Step};
//! use springboard::{Driver, Value};
//!
//! let mut step = 0;
//! let doubled = from_fn(move |input| {
//!     step += 1;
//!     match step {
//!         1 => Ok(Step::Yield(immediate(21.0))),
//!         _ => match input? {
//!             Value::Number(n) => Ok(Step::Done(Value::Number(n * 2.0))),
//!             other => Ok(Step::Done(other)),
//!         },
//!     }
//! });
//!
//! Driver::start(doubled, |settlement| {
//!     assert_eq!(settlement, Ok(Value::Number(42.0)));
//! });
//! ```
//!
//! # Module Overview
//!
//! | Category | Modules |
//! |----------|---------|
//! | **Core** | [`coroutine`], [`trampoline`], [`error`](Error) |
//! | **Combinators** | [`join`] |
//! | **Data** | [`value`] |
// Clippy configuration for the Springboard runtime.
//
// These suppressions exist because:
// - type_complexity: adapter plumbing passes boxed callback-of-callbacks
#![allow(clippy::type_complexity)]

pub mod coroutine;
pub mod join;
pub mod prelude;
pub mod trampoline;
pub mod value;

mod error;

pub use coroutine::{Coroutine, Step, StepResult, Suspension};
pub use error::{Error, Result};
pub use join::WaitAll;
pub use trampoline::{CompletionCallback, Driver, DriverStats, Settlement};
pub use value::Value;

/// Springboard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
