//! I/O helper utilities.
//!
//! Provides small adapters to enrich io::Error with actionable context/hints,
//! usable with map_err in both io::Result and anyhow::Result code paths, and the
//! hint table `AtomicWriteError::hint` draws from.
//!
//! Usage:
//!   // in functions returning anyhow::Result<_>
//!   fs::read(p).map_err(io_error_with_help("read input", p))?;
//!
//!   // in functions returning io::Result<_>
//!   File::open(p).map_err(io_error_with_help_io("open file", p))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

/// Platform-aware hint for an I/O error, keyed on the raw OS code first and
/// the error kind second.
pub fn os_hint(e: &io::Error) -> Option<&'static str> {
    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            let hint = match code {
                libc::EACCES | libc::EPERM => {
                    Some("permission denied; check ownership and write permissions.")
                }
                libc::EXDEV => Some("cross-filesystem; atomic rename not possible."),
                libc::EBUSY => Some("resource busy; ensure no other process is writing."),
                libc::ENOENT => Some("path not found; verify it exists."),
                libc::EEXIST => Some("already exists; pick a unique name or remove the target."),
                libc::ENOSPC => Some("insufficient space on device."),
                libc::EDQUOT => Some("disk quota exceeded."),
                libc::EROFS => Some("read-only filesystem; cannot write here."),
                libc::ELOOP => Some("too many symbolic link levels (ELOOP); possible symlink cycle."),
                libc::ENAMETOOLONG => Some("filename or path too long; shorten path segments."),
                libc::ENOTDIR => Some("a path component is not a directory."),
                libc::EISDIR => Some("target is a directory."),
                libc::EMFILE => {
                    Some("process file descriptor limit reached; close files or raise limits.")
                }
                libc::ENFILE => Some("system-wide file table overflow; reduce open files."),
                libc::EIO => Some("low-level I/O error; the device may be failing."),
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
        #[cfg(windows)]
        {
            // Common Win32 errors
            let hint = match code {
                5 => Some("access denied; check permissions."), // ERROR_ACCESS_DENIED
                17 => Some("not same device; cross-filesystem move."), // ERROR_NOT_SAME_DEVICE
                32 => Some("sharing violation; file is in use."), // ERROR_SHARING_VIOLATION
                2 | 3 => Some("path not found; verify it exists."), // FILE/ PATH NOT FOUND
                80 | 183 => Some("already exists; pick a unique name."), // ERROR_FILE_EXISTS / ERROR_ALREADY_EXISTS
                112 => Some("insufficient disk space."), // ERROR_DISK_FULL
                19 => Some("write protected / read-only media."), // ERROR_WRITE_PROTECT
                206 => Some("filename or path too long (MAX_PATH exceeded)."), // ERROR_FILENAME_EXCED_RANGE
                4 => Some("too many open files; close handles or increase limit."), // ERROR_TOO_MANY_OPEN_FILES
                _ => None,
            };
            if hint.is_some() {
                return hint;
            }
        }
        let _ = code;
    }

    match e.kind() {
        io::ErrorKind::PermissionDenied => {
            Some("permission denied; check ownership and write permissions.")
        }
        io::ErrorKind::NotFound => Some("path not found; verify it exists."),
        io::ErrorKind::AlreadyExists => Some("already exists; remove or choose a unique name."),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            Some("busy/timed out; retry after the current write finishes.")
        }
        _ => None,
    }
}

/// Format a human-friendly message with op/path plus platform-aware hints.
fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    if let Some(hint) = os_hint(e) {
        msg.push_str(" - ");
        msg.push_str(hint);
    }
    if let Some(code) = e.raw_os_error() {
        // Include OS code for diagnostics
        msg.push_str(&format!(" [os code: {}]", code));
    }
    msg
}

/// Adapter for anyhow::Result code.
/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> anyhow::Error.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}

/// Adapter for io::Result code (when the surrounding function returns io::Result).
/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> io::Error
/// with enriched context in the message while preserving the original ErrorKind.
pub fn io_error_with_help_io<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), build_message(op, path, &e))
}
