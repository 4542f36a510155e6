//! Flash program/erase exclusion
//!
//! On the RP2040 the store lives in the same flash bank the firmware executes
//! from. While a page is being programmed or a sector erased, nothing else may
//! fetch instructions from that bank, so every program/erase must run with
//! interrupts masked and no other execution context scheduled.

/// Run `f` inside the global exclusive-access region
///
/// Store implementations wrap each program and erase operation in this call.
/// Keep `f` short: it runs with interrupts disabled on target.
pub fn exclusive<R>(f: impl FnOnce() -> R) -> R {
    critical_section::with(|_| f())
}
