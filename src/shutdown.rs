//! Process-wide shutdown flag, set by the Ctrl-C handler.
//!
//! The CLI checks it before the write starts. Once the temp file exists the
//! write always runs to commit or cleanup, so an interrupt never leaves a
//! stray temp file behind.
//!
//! A blocking payload read (stdin with no EOF) can't observe the flag, so the
//! read is tracked as a phase: the handler may exit the process outright while
//! the read is in progress and never after it has finished.
//!
//! Notes:
//! - Relaxed atomics are sufficient for a one-way "stop" flag.
//! - `request()` is safe to call from signal handlers.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

const IDLE: u8 = 0;
const READING: u8 = 1;
const EXITING: u8 = 2;

static PHASE: AtomicU8 = AtomicU8::new(IDLE);

/// Request a cooperative shutdown (idempotent).
#[inline]
pub fn request() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Check whether a shutdown has been requested.
#[inline]
pub fn is_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Mark the payload read as in progress.
pub fn begin_payload_read() {
    PHASE.store(READING, Ordering::SeqCst);
}

/// Leave the read phase. Returns false if an interrupt already claimed it,
/// in which case the process is on its way out and nothing may be written.
pub fn finish_payload_read() -> bool {
    PHASE
        .compare_exchange(READING, IDLE, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

/// Called from the interrupt handler. True if the payload read was still in
/// progress; the caller should then exit immediately.
pub fn claim_exit_during_read() -> bool {
    PHASE
        .compare_exchange(READING, EXITING, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

/// Test-only: clear the shutdown flag and the read phase.
#[cfg(any(test, feature = "test-helpers"))]
#[inline]
pub fn reset() {
    SHUTDOWN.store(false, Ordering::Relaxed);
    PHASE.store(IDLE, Ordering::SeqCst);
}
