//! Trampoline Driver
//!
//! The driver repeatedly advances one coroutine, interpreting each
//! yielded [`Suspension`] token, until the computation completes or
//! raises, then invokes a completion callback exactly once.
//!
//! # Re-entry without stack growth
//!
//! Every resumption — an adapter settling, a nested coroutine
//! completing — re-enters the driver through a single-slot resume queue
//! guarded by a `running` flag. If a drive loop is already active, the
//! re-entry only parks the event and returns; the active loop picks it
//! up as its next iteration. If no loop is active (the driver parked on
//! a deferred adapter), the re-entry becomes the new loop. Either way a
//! resumption is a loop iteration, never a nested recursion, so stack
//! depth stays constant per suspension regardless of how many steps a
//! coroutine takes. Depth grows only with coroutine *nesting*.
//!
//! # Failure semantics
//!
//! Any recoverable error — raised while advancing, or reported by an
//! adapter — is first delivered back into the *same* coroutine through
//! its error resume channel, so recovery scopes around the suspension
//! point can catch it. Only an error that escapes the coroutine reaches
//! the completion callback. An error raised while the error channel
//! itself is being delivered is unrecoverable at this level, as is a
//! [`Error::Protocol`] violation.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::coroutine::{Coroutine, Step, Suspension};
use crate::error::{Error, Result};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Terminal outcome of a driven coroutine.
pub type Settlement = Result<Value>;

/// Callback invoked exactly once with the terminal outcome.
pub type CompletionCallback = Box<dyn FnOnce(Settlement)>;

// ---------------------------------------------------------------------------
// DriverStats
// ---------------------------------------------------------------------------

/// Counters accumulated while driving one coroutine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverStats {
    /// Resume operations performed (value or error channel).
    pub steps: u64,
    /// Suspension tokens interpreted.
    pub suspensions: u64,
    /// Nested coroutines started on child drivers.
    pub nested_starts: u64,
    /// Errors redelivered into the coroutine's error channel.
    pub errors_redelivered: u64,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// One resume event: which channel re-enters the coroutine, and with what.
enum Resume {
    Value(Value),
    Error(Error),
}

struct DriverState {
    computation: Option<Box<dyn Coroutine>>,
    on_complete: Option<CompletionCallback>,
    /// Single-slot queue: at most one resumption can be outstanding,
    /// because a coroutine has at most one live suspension.
    queued: Option<Resume>,
    running: bool,
    finished: bool,
    stats: DriverStats,
}

/// Handle to a coroutine being driven to completion.
///
/// The handle is observational: dropping it does not stop the coroutine
/// (there is no cancellation), and shared adapter callbacks keep the
/// underlying state alive until settlement.
pub struct Driver {
    state: Rc<RefCell<DriverState>>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("Driver")
            .field("finished", &st.finished)
            .field("running", &st.running)
            .field("stats", &st.stats)
            .finish()
    }
}

impl Driver {
    /// Start driving `computation`, delivering its terminal outcome to
    /// `on_complete` exactly once. Returns an observational handle.
    pub fn start<C, F>(computation: C, on_complete: F) -> Driver
    where
        C: Coroutine + 'static,
        F: FnOnce(Settlement) + 'static,
    {
        Driver::start_boxed(Box::new(computation), Box::new(on_complete))
    }

    /// Start driving `computation` with the default completion callback,
    /// which re-raises any terminal error by panicking. Escaped errors
    /// are never silently dropped.
    pub fn spawn<C>(computation: C) -> Driver
    where
        C: Coroutine + 'static,
    {
        Driver::start(computation, |settlement| {
            if let Err(e) = settlement {
                panic!("unhandled coroutine error: {}", e);
            }
        })
    }

    pub(crate) fn start_boxed(
        computation: Box<dyn Coroutine>,
        on_complete: CompletionCallback,
    ) -> Driver {
        let state = Rc::new(RefCell::new(DriverState {
            computation: Some(computation),
            on_complete: Some(on_complete),
            queued: None,
            running: false,
            finished: false,
            stats: DriverStats::default(),
        }));
        // First advance enters through the value channel with no payload.
        pump(&state, Resume::Value(Value::Undefined));
        Driver { state }
    }

    /// Returns `true` once the completion callback has fired.
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    /// Snapshot of the driver's counters.
    pub fn stats(&self) -> DriverStats {
        self.state.borrow().stats.clone()
    }
}

// ---------------------------------------------------------------------------
// Drive loop
// ---------------------------------------------------------------------------

/// Re-enter the driver with one resume event.
fn pump(state: &Rc<RefCell<DriverState>>, event: Resume) {
    {
        let mut st = state.borrow_mut();
        if st.finished {
            warn!("resume delivered after completion; ignoring");
            return;
        }
        debug_assert!(st.queued.is_none(), "one live suspension at a time");
        st.queued = Some(event);
        if st.running {
            // An active drive loop below us will pick this up.
            return;
        }
        st.running = true;
    }
    drive(state);
}

/// The trampoline loop: consume queued resume events until the coroutine
/// parks on a deferred adapter or reaches a terminal outcome.
fn drive(state: &Rc<RefCell<DriverState>>) {
    loop {
        // Dequeue the next event and take the coroutine out, so user
        // code runs with no borrow held (it may re-enter pump()).
        let (mut computation, event) = {
            let mut st = state.borrow_mut();
            match st.queued.take() {
                Some(event) => {
                    let computation = st
                        .computation
                        .take()
                        .expect("coroutine present while driving");
                    st.stats.steps += 1;
                    (computation, event)
                }
                None => {
                    // Parked: a deferred adapter callback will restart us.
                    st.running = false;
                    return;
                }
            }
        };

        // Protocol violations bypass the coroutine's recovery scopes.
        if let Resume::Error(e) = &event {
            if !e.is_recoverable() {
                settle(state, Err(e.clone()));
                return;
            }
        }

        let via_error_channel = matches!(event, Resume::Error(_));
        let step = match event {
            Resume::Value(v) => {
                trace!(step = state.borrow().stats.steps, "resume");
                computation.resume(v)
            }
            Resume::Error(e) => {
                trace!(step = state.borrow().stats.steps, error = %e, "resume with error");
                computation.resume_with_error(e)
            }
        };

        let step = match step {
            Ok(step) => step,
            Err(error) if via_error_channel || !error.is_recoverable() => {
                // Raised while the error channel was being delivered (or
                // a protocol violation): unrecoverable at this level.
                settle(state, Err(error));
                return;
            }
            Err(error) => {
                // A raise while advancing is delivered back into the same
                // coroutine first, exactly like an adapter-reported error.
                state.borrow_mut().stats.errors_redelivered += 1;
                match computation.resume_with_error(error) {
                    Ok(step) => step,
                    Err(error) => {
                        settle(state, Err(error));
                        return;
                    }
                }
            }
        };

        match step {
            Step::Done(value) => {
                settle(state, Ok(value));
                return;
            }
            Step::Yield(Suspension::Nested(sub)) => {
                {
                    let mut st = state.borrow_mut();
                    st.computation = Some(computation);
                    st.stats.suspensions += 1;
                    st.stats.nested_starts += 1;
                }
                let parent = state.clone();
                // The child's settlement becomes the parent's resume.
                Driver::start_boxed(
                    sub,
                    Box::new(move |settlement| match settlement {
                        Ok(value) => pump(&parent, Resume::Value(value)),
                        Err(error) => pump(&parent, Resume::Error(error)),
                    }),
                );
            }
            Step::Yield(Suspension::Adapter(op)) => {
                {
                    let mut st = state.borrow_mut();
                    st.computation = Some(computation);
                    st.stats.suspensions += 1;
                }
                let target = state.clone();
                op(Box::new(move |error, values| match error {
                    Some(error) => pump(&target, Resume::Error(error)),
                    None => pump(&target, Resume::Value(Value::from_callback_args(values))),
                }));
            }
        }
        // A synchronous settlement has already queued the next event;
        // otherwise the loop parks on the next iteration.
    }
}

/// Deliver the terminal outcome exactly once and release the coroutine.
fn settle(state: &Rc<RefCell<DriverState>>, outcome: Settlement) {
    let on_complete = {
        let mut st = state.borrow_mut();
        st.finished = true;
        st.running = false;
        st.computation = None;
        st.queued = None;
        st.on_complete.take()
    };
    trace!(ok = outcome.is_ok(), "settled");
    if let Some(cb) = on_complete {
        cb(outcome);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
