//! Destination inspection.
//! - Checks the parent directory (following links) before anything is created.
//! - lstat()s the destination: a symlink counts as existing and is replaced,
//!   never followed; a directory is refused.
//! - Captures what the preserver needs, reading xattrs/ACLs only when asked.

use std::io;
use tracing::{debug, warn};

use super::options::{Strategy, WriteOptions};
use super::validate::ValidPath;
use crate::errors::AtomicWriteError;
use crate::platform::{EntryKind, EntryMeta, Primitives, Xattr};

/// Metadata captured from the file about to be replaced.
#[derive(Debug, Clone)]
pub struct PreservedMetadata {
    pub entry: EntryMeta,
    pub xattrs: Vec<Xattr>,
    pub acl: Option<Vec<u8>>,
}

/// What sits at the destination right now.
#[derive(Debug, Clone)]
pub struct Destination {
    pub kind: EntryKind,
    /// `None` for symlinks and special files: defaults apply instead.
    pub preserved: Option<PreservedMetadata>,
}

pub fn inspect<P: Primitives + ?Sized>(
    prims: &P,
    dest: &ValidPath,
    opts: &WriteOptions,
) -> Result<Option<Destination>, AtomicWriteError> {
    check_parent(prims, dest)?;

    let path = dest.as_path();
    let entry = match prims.lstat(path) {
        Ok(Some(e)) => e,
        Ok(None) => {
            debug!(path = %path.display(), "destination absent");
            return Ok(None);
        }
        // The parent itself was stat()ed fine, so a denial here means it
        // lacks search permission.
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(AtomicWriteError::ParentAccessDenied {
                path: dest.parent().to_path_buf(),
                source: e,
            });
        }
        Err(e) => {
            return Err(AtomicWriteError::StatFailed {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if entry.kind == EntryKind::Directory {
        return Err(AtomicWriteError::DestinationIsDirectory {
            path: path.to_path_buf(),
        });
    }
    if opts.strategy == Strategy::NoClobber {
        return Err(AtomicWriteError::DestinationExists {
            path: path.to_path_buf(),
        });
    }

    if entry.kind != EntryKind::File {
        debug!(path = %path.display(), kind = ?entry.kind, "destination is not a regular file; metadata not captured");
        return Ok(Some(Destination {
            kind: entry.kind,
            preserved: None,
        }));
    }

    let xattrs = if opts.preserve_extended_attributes {
        match prims.list_xattrs(path) {
            Ok(v) => v,
            Err(e) => {
                log_capture_failure("extended attributes", path, &e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let acl = if opts.preserve_acls {
        match prims.read_acl(path) {
            Ok(v) => v,
            Err(e) => {
                log_capture_failure("acl", path, &e);
                None
            }
        }
    } else {
        None
    };

    debug!(
        path = %path.display(),
        mode = ?entry.mode.map(|m| format!("{m:o}")),
        xattrs = xattrs.len(),
        acl = acl.is_some(),
        "destination exists"
    );

    Ok(Some(Destination {
        kind: EntryKind::File,
        preserved: Some(PreservedMetadata { entry, xattrs, acl }),
    }))
}

fn check_parent<P: Primitives + ?Sized>(prims: &P, dest: &ValidPath) -> Result<(), AtomicWriteError> {
    let parent = dest.parent();
    match prims.stat(parent) {
        Ok(meta) if meta.kind == EntryKind::Directory => Ok(()),
        Ok(_) => Err(AtomicWriteError::ParentNotDirectory {
            path: parent.to_path_buf(),
        }),
        Err(e) => Err(match e.kind() {
            io::ErrorKind::NotFound => AtomicWriteError::ParentNotFound {
                path: parent.to_path_buf(),
            },
            io::ErrorKind::NotADirectory => AtomicWriteError::ParentNotDirectory {
                path: parent.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => AtomicWriteError::ParentAccessDenied {
                path: parent.to_path_buf(),
                source: e,
            },
            _ => AtomicWriteError::StatFailed {
                path: parent.to_path_buf(),
                source: e,
            },
        }),
    }
}

fn log_capture_failure(what: &str, path: &std::path::Path, e: &io::Error) {
    if e.kind() == io::ErrorKind::Unsupported {
        debug!(path = %path.display(), error = %e, "{what} not supported here; skipping");
    } else {
        warn!(path = %path.display(), error = %e, "failed to read {what} from destination");
    }
}
