//! Temporary file allocation and cleanup guard.
//! The temp file is created next to the destination (same filesystem, so the
//! final rename stays atomic) with create-exclusive semantics.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::validate::ValidPath;
use crate::errors::AtomicWriteError;
use crate::platform::{Primitives, temp_sibling_name};

/// Name collisions tolerated before giving up.
pub const MAX_TEMP_ATTEMPTS: u32 = 16;

/// Owns a temp file path; removes the file when dropped unless disarmed.
pub struct TempFile<'a, P: Primitives + ?Sized> {
    prims: &'a P,
    path: PathBuf,
    armed: bool,
}

impl<'a, P: Primitives + ?Sized> TempFile<'a, P> {
    /// Create a fresh temp file beside `dest`, retrying name collisions.
    pub fn allocate(prims: &'a P, dest: &ValidPath) -> Result<(Self, File), AtomicWriteError> {
        let mut last_err = None;
        for attempt in 1..=MAX_TEMP_ATTEMPTS {
            let path = temp_sibling_name(dest.as_path());
            match prims.create_exclusive(&path) {
                Ok(file) => {
                    debug!(temp = %path.display(), attempt, "created temp file");
                    let guard = Self {
                        prims,
                        path,
                        armed: true,
                    };
                    return Ok((guard, file));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    trace!(temp = %path.display(), attempt, "temp name taken; retrying");
                    last_err = Some(e);
                }
                Err(e) => {
                    return Err(AtomicWriteError::TempCreateFailed {
                        dir: dest.parent().to_path_buf(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
        Err(AtomicWriteError::TempCreateFailed {
            dir: dest.parent().to_path_buf(),
            attempts: MAX_TEMP_ATTEMPTS,
            source: last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file now lives under the destination name; nothing to remove.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<P: Primitives + ?Sized> Drop for TempFile<'_, P> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.prims.remove(&self.path) {
            Ok(()) => trace!(temp = %self.path.display(), "removed temp file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(temp = %self.path.display(), error = %e, "failed to remove temp file")
            }
        }
    }
}
