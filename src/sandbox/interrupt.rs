//! Host interrupt (Ctrl+C) tracking.
//!
//! `install` replaces the default SIGINT action with a handler that only
//! raises a flag. Long waits on backend processes poll the flag so they can
//! stop containers before rover exits. A second Ctrl+C exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};

/// Exit code for a run cut short by Ctrl+C.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_sigint(_signal: libc::c_int) {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        // SAFETY: _exit is async-signal-safe.
        unsafe { libc::_exit(INTERRUPTED_EXIT_CODE) };
    }
}

/// Install the SIGINT handler. Call once, early in `main`.
pub fn install() {
    #[cfg(unix)]
    {
        let handler = on_sigint as extern "C" fn(libc::c_int);
        // SAFETY: the handler only touches an atomic and calls _exit.
        let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            tracing::warn!("could not install the Ctrl+C handler");
        }
    }
}

/// Whether Ctrl+C has been pressed.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(test)]
pub(crate) fn set_interrupted(value: bool) {
    INTERRUPTED.store(value, Ordering::SeqCst);
}
