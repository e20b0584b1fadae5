//! WaitAll Join Combinator
//!
//! [`WaitAll`] starts a fixed set of coroutines concurrently — each on
//! its own [`Driver`] — and exposes an aggregate adapter, yieldable via
//! the ordinary yield protocol, that fires only after every member has
//! settled. Members run to settlement independently: a failing member
//! never cancels its siblings (no cancellation mechanism exists).
//!
//! Settlement policy: the aggregate fires exactly once. If one or more
//! members failed it carries the first error to arrive; later errors are
//! retained and exposed through [`WaitAll::errors`] rather than
//! discarded. On an all-success run it fires with no error and no
//! meaningful value — callers retrieve individual results through
//! [`WaitAll::wait_with`], not through the aggregate.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::coroutine::{AdapterCallback, Coroutine, Suspension};
use crate::error::Error;
use crate::trampoline::{Driver, Settlement};

// ---------------------------------------------------------------------------
// WaitAll
// ---------------------------------------------------------------------------

struct JoinState {
    /// Members registered so far.
    registered: usize,
    /// Members that have not yet settled.
    outstanding: usize,
    /// First member error to arrive; what the aggregate fires with.
    first_error: Option<Error>,
    /// Every member error, in settlement order.
    errors: Vec<Error>,
    /// Parked aggregate callback, present only between the aggregate
    /// being yielded and the last member settling.
    notify: Option<AdapterCallback>,
    /// Whether the aggregate has been yielded.
    awaited: bool,
}

/// Joins a set of concurrently-driven coroutines.
#[derive(Clone)]
pub struct WaitAll {
    state: Rc<RefCell<JoinState>>,
}

impl std::fmt::Debug for WaitAll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("WaitAll")
            .field("registered", &st.registered)
            .field("outstanding", &st.outstanding)
            .field("failed", &st.errors.len())
            .field("awaited", &st.awaited)
            .finish()
    }
}

impl Default for WaitAll {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitAll {
    /// Create an empty wait group.
    pub fn new() -> Self {
        WaitAll {
            state: Rc::new(RefCell::new(JoinState {
                registered: 0,
                outstanding: 0,
                first_error: None,
                errors: Vec::new(),
                notify: None,
                awaited: false,
            })),
        }
    }

    /// Register one more member and immediately begin driving it,
    /// discarding its individual settlement.
    pub fn wait(&self, computation: impl Coroutine + 'static) {
        self.wait_with(computation, |_| {});
    }

    /// Register one more member and immediately begin driving it,
    /// delivering its individual settlement to `on_settled` before the
    /// aggregate accounting runs. This is how callers retrieve each
    /// member's own result.
    ///
    /// Calling this after the aggregate has been yielded is a usage
    /// error: the member still runs, but ordering relative to the
    /// aggregate firing is unspecified.
    pub fn wait_with(
        &self,
        computation: impl Coroutine + 'static,
        on_settled: impl FnOnce(Settlement) + 'static,
    ) {
        {
            let mut st = self.state.borrow_mut();
            if st.awaited {
                warn!("WaitAll::wait after the aggregate was yielded; ordering is unspecified");
            }
            st.registered += 1;
            st.outstanding += 1;
        }

        let state = self.state.clone();
        Driver::start(computation, move |settlement| {
            if let Err(e) = &settlement {
                let mut st = state.borrow_mut();
                if st.first_error.is_none() {
                    st.first_error = Some(e.clone());
                }
                st.errors.push(e.clone());
            }

            // Member's own completion first, then aggregate accounting,
            // so individual results are observable before the join fires.
            on_settled(settlement);

            let fire = {
                let mut st = state.borrow_mut();
                st.outstanding -= 1;
                if st.outstanding == 0 {
                    st.notify.take().map(|cb| (cb, st.first_error.clone()))
                } else {
                    None
                }
            };
            if let Some((cb, error)) = fire {
                cb(error, Vec::new());
            }
        });
    }

    /// The aggregate adapter, suitable for direct yielding.
    ///
    /// If every member has already settled when yielded (including the
    /// zero-member case) it fires synchronously; otherwise it fires when
    /// the last outstanding member settles. It fires exactly once;
    /// yielding it a second time reports [`Error::Protocol`].
    pub fn all(&self) -> Suspension {
        let state = self.state.clone();
        Suspension::adapter(move |cb| {
            let mut cb = Some(cb);
            let fire = {
                let mut st = state.borrow_mut();
                if st.awaited {
                    Some(Some(Error::protocol(
                        "WaitAll aggregate yielded more than once",
                    )))
                } else {
                    st.awaited = true;
                    if st.outstanding == 0 {
                        Some(st.first_error.clone())
                    } else {
                        st.notify = cb.take();
                        None
                    }
                }
            };
            if let Some(error) = fire {
                (cb.take().expect("aggregate callback present"))(error, Vec::new());
            }
        })
    }

    /// Members registered so far.
    pub fn registered(&self) -> usize {
        self.state.borrow().registered
    }

    /// Members that have not yet settled.
    pub fn pending(&self) -> usize {
        self.state.borrow().outstanding
    }

    /// Every member error so far, in settlement order. The aggregate
    /// fires with only the first; the rest are retained here.
    pub fn errors(&self) -> Vec<Error> {
        self.state.borrow().errors.clone()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{from_fn, immediate, AdapterCallback, Step};
    use crate::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Parked = Rc<RefCell<Option<AdapterCallback>>>;

    /// A member that parks on an adapter until the test settles it.
    fn parked_member(slot: &Parked) -> impl Coroutine {
        let slot = slot.clone();
        let mut step = 0;
        from_fn(move |input| {
            step += 1;
            match step {
                1 => {
                    let slot = slot.clone();
                    Ok(Step::Yield(Suspension::adapter(move |cb| {
                        *slot.borrow_mut() = Some(cb);
                    })))
                }
                _ => Ok(Step::Done(input?)),
            }
        })
    }

    /// Drive a coroutine that yields the aggregate once, capturing what
    /// the aggregate resumed with (or the error it escaped with).
    fn yield_all(wa: &WaitAll) -> Rc<RefCell<Option<Settlement>>> {
        let observed: Rc<RefCell<Option<Settlement>>> = Rc::new(RefCell::new(None));
        let at_resume = observed.clone();
        let at_completion = observed.clone();
        let mut token = Some(wa.all());
        let mut step = 0;
        Driver::start(
            from_fn(move |input| {
                step += 1;
                match step {
                    1 => Ok(Step::Yield(token.take().expect("aggregate token"))),
                    _ => {
                        *at_resume.borrow_mut() = Some(input.clone());
                        Ok(Step::Done(Value::Undefined))
                    }
                }
            }),
            // Protocol violations bypass the resume above and escape here.
            move |settlement| {
                if settlement.is_err() {
                    *at_completion.borrow_mut() = Some(settlement);
                }
            },
        );
        observed
    }

    #[test]
    fn test_zero_members_fires_immediately() {
        let wa = WaitAll::new();
        let observed = yield_all(&wa);
        assert_eq!(observed.borrow_mut().take(), Some(Ok(Value::Undefined)));
    }

    #[test]
    fn test_aggregate_waits_for_all_members() {
        let wa = WaitAll::new();
        let a: Parked = Rc::new(RefCell::new(None));
        let b: Parked = Rc::new(RefCell::new(None));
        wa.wait(parked_member(&a));
        wa.wait(parked_member(&b));

        let observed = yield_all(&wa);
        assert!(observed.borrow().is_none());
        assert_eq!(wa.pending(), 2);

        (a.borrow_mut().take().unwrap())(None, vec![Value::Number(1.0)]);
        assert!(observed.borrow().is_none(), "one member still outstanding");

        (b.borrow_mut().take().unwrap())(None, vec![Value::Number(2.0)]);
        assert_eq!(observed.borrow_mut().take(), Some(Ok(Value::Undefined)));
        assert_eq!(wa.pending(), 0);
    }

    #[test]
    fn test_failure_does_not_cancel_siblings_and_first_error_wins() {
        let wa = WaitAll::new();
        let a: Parked = Rc::new(RefCell::new(None));
        let b: Parked = Rc::new(RefCell::new(None));
        let c: Parked = Rc::new(RefCell::new(None));

        let a_result: Rc<RefCell<Option<Settlement>>> = Rc::new(RefCell::new(None));
        let c_result: Rc<RefCell<Option<Settlement>>> = Rc::new(RefCell::new(None));
        let a_result2 = a_result.clone();
        let c_result2 = c_result.clone();

        wa.wait_with(parked_member(&a), move |s| *a_result2.borrow_mut() = Some(s));
        wa.wait(parked_member(&b));
        wa.wait_with(parked_member(&c), move |s| *c_result2.borrow_mut() = Some(s));

        let observed = yield_all(&wa);

        // A settles, then B fails, then C settles.
        (a.borrow_mut().take().unwrap())(None, vec![Value::from("a")]);
        (b.borrow_mut().take().unwrap())(Some(Error::adapter("b failed")), Vec::new());
        assert!(
            observed.borrow().is_none(),
            "aggregate must not fire before all members settle"
        );

        (c.borrow_mut().take().unwrap())(None, vec![Value::from("c")]);
        assert_eq!(
            observed.borrow_mut().take(),
            Some(Err(Error::adapter("b failed")))
        );

        // Individual results remain retrievable.
        assert_eq!(a_result.borrow_mut().take(), Some(Ok(Value::from("a"))));
        assert_eq!(c_result.borrow_mut().take(), Some(Ok(Value::from("c"))));
        assert_eq!(wa.errors(), vec![Error::adapter("b failed")]);
    }

    #[test]
    fn test_all_errors_collected_in_settlement_order() {
        let wa = WaitAll::new();
        let a: Parked = Rc::new(RefCell::new(None));
        let b: Parked = Rc::new(RefCell::new(None));
        wa.wait(parked_member(&a));
        wa.wait(parked_member(&b));

        let observed = yield_all(&wa);

        // Second-registered member fails first: its error wins.
        (b.borrow_mut().take().unwrap())(Some(Error::adapter("late member")), Vec::new());
        (a.borrow_mut().take().unwrap())(Some(Error::adapter("early member")), Vec::new());

        assert_eq!(
            observed.borrow_mut().take(),
            Some(Err(Error::adapter("late member")))
        );
        assert_eq!(
            wa.errors(),
            vec![Error::adapter("late member"), Error::adapter("early member")]
        );
    }

    #[test]
    fn test_members_already_settled_when_yielded() {
        let wa = WaitAll::new();
        wa.wait(from_fn(|_| Ok(Step::Done(Value::Number(1.0)))));
        wa.wait(from_fn(|_| Ok(Step::Done(Value::Number(2.0)))));
        assert_eq!(wa.pending(), 0);

        let observed = yield_all(&wa);
        assert_eq!(observed.borrow_mut().take(), Some(Ok(Value::Undefined)));
    }

    #[test]
    fn test_late_wait_still_settles() {
        let wa = WaitAll::new();
        let observed = yield_all(&wa);
        assert_eq!(observed.borrow_mut().take(), Some(Ok(Value::Undefined)));

        // Usage error: registering after the aggregate fired. The member
        // still runs to settlement.
        let result: Rc<RefCell<Option<Settlement>>> = Rc::new(RefCell::new(None));
        let result2 = result.clone();
        let mut step = 0;
        wa.wait_with(
            from_fn(move |input| {
                step += 1;
                match step {
                    1 => Ok(Step::Yield(immediate(5.0))),
                    _ => Ok(Step::Done(input?)),
                }
            }),
            move |s| *result2.borrow_mut() = Some(s),
        );
        assert_eq!(result.borrow_mut().take(), Some(Ok(Value::Number(5.0))));
    }

    #[test]
    fn test_aggregate_yielded_twice_is_protocol_violation() {
        let wa = WaitAll::new();
        let first = yield_all(&wa);
        assert_eq!(first.borrow_mut().take(), Some(Ok(Value::Undefined)));

        let second = yield_all(&wa);
        assert_eq!(
            second.borrow_mut().take(),
            Some(Err(Error::protocol(
                "WaitAll aggregate yielded more than once"
            )))
        );
    }
}
