//! Shared test helpers for integration tests

use std::cell::RefCell;
use std::rc::Rc;

use springboard::prelude::*;

/// Shared slot a completion callback writes its settlement into.
pub type Captured = Rc<RefCell<Option<Settlement>>>;

/// Build a capture slot and a completion callback that fills it,
/// asserting the exactly-once discipline.
pub fn capture() -> (Captured, impl FnOnce(Settlement)) {
    let slot: Captured = Rc::new(RefCell::new(None));
    let writer = slot.clone();
    (slot, move |settlement| {
        assert!(writer.borrow().is_none(), "completion callback fired twice");
        *writer.borrow_mut() = Some(settlement);
    })
}

/// Drive a coroutine whose adapters all settle synchronously and return
/// its settlement.
pub fn run(computation: impl Coroutine + 'static) -> Settlement {
    let (slot, cb) = capture();
    Driver::start(computation, cb);
    let settlement = slot
        .borrow_mut()
        .take()
        .expect("coroutine did not settle synchronously");
    settlement
}

/// Install a fmt subscriber honoring `RUST_LOG` (idempotent).
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
