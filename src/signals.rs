//! Shutdown signal handling
//!
//! The host loop polls `shutdown_requested()` once per tick.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SigHandler, Signal};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Check if shutdown was requested (SIGTERM, SIGINT, or SIGHUP)
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Install shutdown handlers (call once at startup)
pub fn setup_signal_handlers() -> nix::Result<()> {
    let handler = SigHandler::Handler(shutdown_signal_handler);
    for sig in [Signal::SIGTERM, Signal::SIGINT, Signal::SIGHUP] {
        // The handler only stores to an atomic
        unsafe { signal::signal(sig, handler) }?;
    }
    Ok(())
}

extern "C" fn shutdown_signal_handler(_signo: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}
