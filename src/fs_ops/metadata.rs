//! Metadata preservation onto the temp file, before it becomes visible.
//! - Copies permissions, ownership, timestamps, xattrs and the ACL (in that
//!   order), each only when requested.
//! - Best-effort: failures are logged and recorded, except ownership under
//!   `strict_ownership`, which aborts the write.
//! - Operations the platform can't do are recorded as unsupported and skipped,
//!   even when strict.

use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, trace, warn};

use super::inspect::PreservedMetadata;
use super::options::WriteOptions;
use crate::errors::{AtomicWriteError, MetadataOp};
use crate::platform::Primitives;

/// Outcome of one metadata sub-operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpStatus {
    Applied,
    Unsupported,
    /// Failed but tolerated; carries the error text.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataResult {
    pub op: MetadataOp,
    pub status: OpStatus,
}

/// Per-step accumulator: records each result and keeps the first fatal error.
struct Fold<'a> {
    temp: &'a Path,
    results: Vec<MetadataResult>,
    fatal: Option<AtomicWriteError>,
}

impl<'a> Fold<'a> {
    fn new(temp: &'a Path) -> Self {
        Self {
            temp,
            results: Vec::new(),
            fatal: None,
        }
    }

    /// Record `res` for `op`. Returns true if the operation took effect.
    fn step(&mut self, op: MetadataOp, fatal: bool, res: io::Result<()>) -> bool {
        let status = match res {
            Ok(()) => {
                trace!(temp = %self.temp.display(), %op, "metadata applied");
                OpStatus::Applied
            }
            Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                debug!(temp = %self.temp.display(), %op, error = %e, "metadata operation unsupported; skipped");
                OpStatus::Unsupported
            }
            Err(e) if fatal => {
                let status = OpStatus::Failed(e.to_string());
                if self.fatal.is_none() {
                    self.fatal = Some(AtomicWriteError::MetadataFailed {
                        op,
                        path: self.temp.to_path_buf(),
                        source: e,
                    });
                }
                status
            }
            Err(e) => {
                warn!(temp = %self.temp.display(), %op, error = %e, "failed to preserve metadata; continuing");
                OpStatus::Failed(e.to_string())
            }
        };
        let applied = status == OpStatus::Applied;
        self.results.push(MetadataResult { op, status });
        applied
    }

    fn aborted(&self) -> bool {
        self.fatal.is_some()
    }

    fn finish(self) -> Result<Vec<MetadataResult>, AtomicWriteError> {
        match self.fatal {
            Some(e) => Err(e),
            None => Ok(self.results),
        }
    }
}

/// Apply requested metadata to the open temp file at `temp`.
///
/// `preserved` is `None` when there was nothing (or only a link) to copy from;
/// then only `default_permissions` applies.
pub fn apply<P: Primitives + ?Sized>(
    prims: &P,
    file: &File,
    temp: &Path,
    preserved: Option<&PreservedMetadata>,
    opts: &WriteOptions,
) -> Result<Vec<MetadataResult>, AtomicWriteError> {
    let mut fold = Fold::new(temp);

    let Some(pm) = preserved else {
        if let Some(mode) = opts.default_permissions {
            fold.step(MetadataOp::Permissions, false, prims.set_mode(file, mode));
        }
        return fold.finish();
    };
    let entry = &pm.entry;

    // 1) Permissions. Setting xattrs or the ACL by path needs the owner write
    // bit, so a mode without it is applied widened now and exactly at the end.
    let by_path = (opts.preserve_extended_attributes && !pm.xattrs.is_empty())
        || (opts.preserve_acls && pm.acl.is_some());
    let mode = if opts.preserve_permissions {
        entry.mode
    } else {
        opts.default_permissions
    };
    let widened = mode.filter(|m| by_path && m & 0o200 == 0).map(|m| m | 0o200);
    let set_perms = |m: Option<u32>| match m {
        Some(m) => prims.set_mode(file, m),
        None => prims.set_permissions(file, &entry.permissions),
    };
    let requested = opts.preserve_permissions || opts.default_permissions.is_some();
    let perms_applied = requested && fold.step(MetadataOp::Permissions, false, set_perms(widened.or(mode)));

    // 2) Ownership
    if opts.preserve_ownership {
        let res = match &entry.owner {
            Some(owner) => prims.set_owner(file, owner),
            None => Err(io::Error::new(io::ErrorKind::Unsupported, "no owner recorded")),
        };
        let changed = fold.step(MetadataOp::Ownership, opts.strict_ownership, res);
        if fold.aborted() {
            return fold.finish();
        }
        // chown(2) clears setuid/setgid; put them back.
        if changed && opts.preserve_permissions && entry.has_setid_bits() {
            fold.step(MetadataOp::Permissions, false, set_perms(widened.or(mode)));
        }
    }

    // 3) Timestamps
    if opts.preserve_timestamps {
        let res = match (entry.accessed, entry.modified) {
            (Some(at), Some(mt)) => prims.set_times(file, at, mt),
            _ => Err(io::Error::new(io::ErrorKind::Unsupported, "timestamps unavailable")),
        };
        fold.step(MetadataOp::Timestamps, false, res);
    }

    // 4) Extended attributes
    if opts.preserve_extended_attributes && !pm.xattrs.is_empty() {
        let res = copy_xattrs(prims, temp, pm);
        fold.step(MetadataOp::ExtendedAttributes, false, res);
    }

    // 5) ACL
    if opts.preserve_acls {
        if let Some(acl) = &pm.acl {
            fold.step(MetadataOp::Acl, false, prims.set_acl(temp, acl));
        }
    }

    if perms_applied && widened.is_some() {
        fold.step(MetadataOp::Permissions, false, set_perms(mode));
    }

    fold.finish()
}

// Every attribute is attempted; the first error is reported for the group.
fn copy_xattrs<P: Primitives + ?Sized>(prims: &P, temp: &Path, pm: &PreservedMetadata) -> io::Result<()> {
    let mut first_err = None;
    for attr in &pm.xattrs {
        match prims.set_xattr(temp, attr) {
            Ok(()) => {
                trace!(temp = %temp.display(), xattr = %attr.name.to_string_lossy(), size = attr.value.len(), "preserved xattr")
            }
            Err(e) if e.kind() == io::ErrorKind::Unsupported => return Err(e),
            Err(e) => {
                warn!(temp = %temp.display(), xattr = %attr.name.to_string_lossy(), error = %e, "failed to set xattr");
                first_err.get_or_insert(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
