//! Process-wide fault handler for programmer-contract violations (impossible
//! states, allocation failure) as distinct from ordinary MIDI format errors,
//! which always go through [`crate::error::Error`] instead.
//!
//! This is a hook invoked immediately before an unconditional `panic!`, not a
//! substitute for one: installing a handler lets an embedder log or report a
//! contract violation, but it cannot make the violation recoverable.

use std::sync::OnceLock;

type Handler = dyn Fn(&str) + Send + Sync + 'static;

static HANDLER: OnceLock<Box<Handler>> = OnceLock::new();

/// Installs the process-wide fault handler. Returns `false` if a handler was
/// already installed (it may be set only once).
pub fn set_fault_handler<F>(handler: F) -> bool
where
    F: Fn(&str) + Send + Sync + 'static,
{
    HANDLER.set(Box::new(handler)).is_ok()
}

/// Reports a contract violation and terminates the process. Never returns.
pub(crate) fn fault(message: &str) -> ! {
    if let Some(handler) = HANDLER.get() {
        handler(message);
    }
    panic!("contract violation: {}", message);
}
