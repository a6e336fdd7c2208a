//! Atomic commit: rename the synced temp file onto the destination.
//! - `ReplaceExisting`: plain atomic rename.
//! - `NoClobber`: no-replace rename; where the platform lacks one, lstat right
//!   before an ordinary rename. Anything created in the gap between those two
//!   calls is overwritten; that window is the documented limit of the fallback.
//! - After the rename, the parent directory is synced so the new name survives a crash.

use std::io;
use std::path::Path;
use tracing::{debug, warn};

use super::options::Strategy;
use crate::errors::AtomicWriteError;
use crate::platform::Primitives;

pub fn commit<P: Primitives + ?Sized>(
    prims: &P,
    temp: &Path,
    dest: &Path,
    strategy: Strategy,
) -> Result<(), AtomicWriteError> {
    let res = match strategy {
        Strategy::ReplaceExisting => prims.rename_replace(temp, dest),
        Strategy::NoClobber => match prims.rename_noreplace(temp, dest) {
            Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                debug!(dest = %dest.display(), error = %e, "no-replace rename unavailable; using check-then-rename");
                return checked_rename(prims, temp, dest);
            }
            other => other,
        },
    };
    res.map_err(|e| rename_error(temp, dest, e))
}

fn checked_rename<P: Primitives + ?Sized>(prims: &P, temp: &Path, dest: &Path) -> Result<(), AtomicWriteError> {
    match prims.lstat(dest) {
        Ok(None) => {}
        Ok(Some(_)) => {
            return Err(AtomicWriteError::DestinationExists {
                path: dest.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(AtomicWriteError::StatFailed {
                path: dest.to_path_buf(),
                source: e,
            });
        }
    }
    prims
        .rename_replace(temp, dest)
        .map_err(|e| rename_error(temp, dest, e))
}

fn rename_error(temp: &Path, dest: &Path, e: io::Error) -> AtomicWriteError {
    if e.kind() == io::ErrorKind::AlreadyExists {
        return AtomicWriteError::DestinationExists {
            path: dest.to_path_buf(),
        };
    }
    AtomicWriteError::RenameFailed {
        from: temp.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    }
}

/// Flush the directory holding `dest`.
pub fn sync_parent<P: Primitives + ?Sized>(prims: &P, dest: &Path, dir: &Path) -> Result<(), AtomicWriteError> {
    prims.sync_dir(dir).map_err(|e| {
        warn!(path = %dest.display(), dir = %dir.display(), error = %e, "directory sync failed after commit");
        AtomicWriteError::DirectorySyncFailed {
            path: dest.to_path_buf(),
            dir: dir.to_path_buf(),
            source: e,
        }
    })
}
