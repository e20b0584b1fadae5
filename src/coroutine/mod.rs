//! Suspendable Computations and the Yield Protocol
//!
//! A coroutine here is a *suspendable computation*: given a resume value
//! or a resume error, it runs forward to its next suspension point or to
//! completion. Each suspension yields a [`Suspension`] token describing
//! what the computation is waiting on. The yield protocol admits exactly
//! two token shapes, and the enum makes anything else unrepresentable:
//!
//! - [`Suspension::Adapter`] — a callback-style asynchronous operation.
//!   The adapter receives a callback of shape `(error, values)` and must
//!   invoke it exactly once (enforced by `FnOnce`), synchronously or
//!   after an arbitrary delay.
//! - [`Suspension::Nested`] — another coroutine, driven to completion by
//!   a fresh driver; its settlement feeds back into the parent. A nested
//!   coroutine failing is indistinguishable, from the parent's
//!   perspective, from an adapter reporting an error.
//!
//! The driver lives in [`crate::trampoline`]; this module defines only
//! the stepping contract.

use crate::error::{Error, Result};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// The outcome of advancing a coroutine by one step.
#[derive(Debug)]
pub enum Step {
    /// The coroutine suspended, waiting on the given token.
    Yield(Suspension),
    /// The coroutine completed with a final value.
    Done(Value),
}

/// Result of a single resume: `Ok` is the next step, `Err` means the
/// computation raised and its own recovery scopes did not catch.
pub type StepResult = Result<Step>;

// ---------------------------------------------------------------------------
// Suspension
// ---------------------------------------------------------------------------

/// Callback handed to an adapter; invoked exactly once with either a
/// `Some(error)` (operation failed) or `None` and zero-or-more success
/// values.
pub type AdapterCallback = Box<dyn FnOnce(Option<Error>, Vec<Value>)>;

/// A callback-style asynchronous operation, yieldable by a coroutine.
pub type AdapterFn = Box<dyn FnOnce(AdapterCallback)>;

/// A suspension token: what a coroutine is waiting on.
pub enum Suspension {
    /// An async operation adapter. The driver invokes it with a callback
    /// that resumes the coroutine when the operation settles.
    Adapter(AdapterFn),
    /// Another coroutine, driven to completion by its own driver.
    Nested(Box<dyn Coroutine>),
}

impl std::fmt::Debug for Suspension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Suspension::Adapter(_) => write!(f, "Suspension::Adapter"),
            Suspension::Nested(_) => write!(f, "Suspension::Nested"),
        }
    }
}

impl Suspension {
    /// Yield an async operation adapter.
    pub fn adapter(op: impl FnOnce(AdapterCallback) + 'static) -> Self {
        Suspension::Adapter(Box::new(op))
    }

    /// Yield a nested coroutine.
    pub fn nested(computation: impl Coroutine + 'static) -> Self {
        Suspension::Nested(Box::new(computation))
    }
}

// ---------------------------------------------------------------------------
// Coroutine
// ---------------------------------------------------------------------------

/// A suspendable computation.
///
/// Exactly one of [`resume`](Coroutine::resume) or
/// [`resume_with_error`](Coroutine::resume_with_error) is invoked at a
/// time, and neither may be invoked again once a [`Step::Done`] (or an
/// `Err`) has been produced: a coroutine is driven to exactly one
/// terminal outcome. A coroutine is exclusively owned by the single
/// driver advancing it.
pub trait Coroutine {
    /// Advance with a resume value.
    fn resume(&mut self, value: Value) -> StepResult;

    /// Advance by delivering an error into the computation, giving its
    /// internal recovery scopes a chance to catch. Returning `Err`
    /// re-raises the error out of the computation.
    fn resume_with_error(&mut self, error: Error) -> StepResult;
}

impl<C: Coroutine + ?Sized> Coroutine for Box<C> {
    fn resume(&mut self, value: Value) -> StepResult {
        (**self).resume(value)
    }

    fn resume_with_error(&mut self, error: Error) -> StepResult {
        (**self).resume_with_error(error)
    }
}

// ---------------------------------------------------------------------------
// FnCoroutine
// ---------------------------------------------------------------------------

/// A coroutine backed by a state-machine closure.
///
/// The closure receives `Ok(value)` or `Err(error)` per resume and
/// returns the next step. A terminal-state guard enforces the
/// single-terminal-outcome invariant for direct trait users: resuming
/// after completion yields [`Error::Protocol`].
pub struct FnCoroutine<F> {
    f: F,
    done: bool,
}

/// Build a coroutine from a state-machine closure.
///
/// ```
/// use springboard::coroutine::{from_fn, Step, Suspension};
/// use springboard::Value;
///
/// let mut state = 0;
/// let greet = from_fn(move |input| {
///     state += 1;
///     match state {
///         1 => Ok(Step::Yield(Suspension::adapter(|cb| {
///             cb(None, vec![Value::from("hello")])
///         }))),
///         _ => Ok(Step::Done(input?)),
///     }
/// });
/// # let _ = greet;
/// ```
pub fn from_fn<F>(f: F) -> FnCoroutine<F>
where
    F: FnMut(Result<Value>) -> StepResult,
{
    FnCoroutine { f, done: false }
}

impl<F> FnCoroutine<F>
where
    F: FnMut(Result<Value>) -> StepResult,
{
    fn advance(&mut self, input: Result<Value>) -> StepResult {
        if self.done {
            return Err(Error::protocol("coroutine resumed after completion"));
        }
        let step = (self.f)(input);
        // A raise is not terminal: the driver redelivers it through the
        // error channel so recovery scopes can catch. Only Done is final.
        if matches!(step, Ok(Step::Done(_))) {
            self.done = true;
        }
        step
    }
}

impl<F> Coroutine for FnCoroutine<F>
where
    F: FnMut(Result<Value>) -> StepResult,
{
    fn resume(&mut self, value: Value) -> StepResult {
        self.advance(Ok(value))
    }

    fn resume_with_error(&mut self, error: Error) -> StepResult {
        self.advance(Err(error))
    }
}

// ---------------------------------------------------------------------------
// Ready-made adapters
// ---------------------------------------------------------------------------

/// An adapter that settles synchronously with the given value.
pub fn immediate(value: impl Into<Value>) -> Suspension {
    let value = value.into();
    Suspension::adapter(move |cb| cb(None, vec![value]))
}

/// An adapter that settles synchronously with the given error.
pub fn failing(error: Error) -> Suspension {
    Suspension::adapter(move |cb| cb(Some(error), Vec::new()))
}

// ===========================================================================
// Tests
// ===========================================================================
