//! Typed error definitions for atomwrite.
//! One variant per failure stage of an atomic write, each carrying the path(s)
//! involved and the underlying OS error so callers can diagnose without retrying.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::fs_ops::os_hint;

/// What the caller may assume about the destination after a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Nothing happened on disk: the destination is untouched and no temp file remains.
    Unchanged,
    /// Work happened in a temp file that was never exposed and has been removed.
    NeverVisible,
    /// The new content is committed under the destination name, but the rename
    /// may not survive a crash because the directory could not be synced.
    CommittedNotDurable,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Disposition::Unchanged => "unchanged",
            Disposition::NeverVisible => "never_visible",
            Disposition::CommittedNotDurable => "committed_not_durable",
        };
        f.write_str(s)
    }
}

/// Metadata sub-operations applied by the preserver, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOp {
    Permissions,
    Ownership,
    Timestamps,
    ExtendedAttributes,
    Acl,
}

impl fmt::Display for MetadataOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetadataOp::Permissions => "permissions",
            MetadataOp::Ownership => "ownership",
            MetadataOp::Timestamps => "timestamps",
            MetadataOp::ExtendedAttributes => "extended attributes",
            MetadataOp::Acl => "acl",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("invalid destination path {path:?}: {reason}")]
    InvalidPath { path: PathBuf, reason: &'static str },

    #[error("encoding payload for '{}' failed: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("parent directory not found: '{}'", .path.display())]
    ParentNotFound { path: PathBuf },

    #[error("parent is not a directory: '{}'", .path.display())]
    ParentNotDirectory { path: PathBuf },

    #[error("access denied to parent directory '{}': {source}", .path.display())]
    ParentAccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stat '{}' failed: {source}", .path.display())]
    StatFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination is a directory: '{}'", .path.display())]
    DestinationIsDirectory { path: PathBuf },

    #[error("cannot create temporary file in '{}' after {attempts} attempt(s): {source}", .dir.display())]
    TempCreateFailed {
        dir: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("write to '{}' failed after {written} of {expected} bytes: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        written: u64,
        expected: u64,
        #[source]
        source: io::Error,
    },

    #[error("sync of '{}' failed: {source}", .path.display())]
    SyncFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("close of '{}' failed: {source}", .path.display())]
    CloseFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("preserving {op} on '{}' failed: {source}", .path.display())]
    MetadataFailed {
        op: MetadataOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("rename '{}' -> '{}' failed: {source}", .from.display(), .to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination already exists: '{}'", .path.display())]
    DestinationExists { path: PathBuf },

    #[error("'{}' was written, but syncing directory '{}' failed: {source}", .path.display(), .dir.display())]
    DirectorySyncFailed {
        path: PathBuf,
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("background write to '{}' did not complete: {message}", .path.display())]
    Offload { path: PathBuf, message: String },
}

impl AtomicWriteError {
    /// Stable numeric code; the tens digit is the pipeline stage.
    pub fn code(&self) -> u16 {
        match self {
            AtomicWriteError::InvalidPath { .. } => 10,
            AtomicWriteError::Encode { .. } => 11,
            AtomicWriteError::ParentNotFound { .. } => 20,
            AtomicWriteError::ParentNotDirectory { .. } => 21,
            AtomicWriteError::ParentAccessDenied { .. } => 22,
            AtomicWriteError::StatFailed { .. } => 30,
            AtomicWriteError::DestinationIsDirectory { .. } => 31,
            AtomicWriteError::TempCreateFailed { .. } => 40,
            AtomicWriteError::WriteFailed { .. } => 50,
            AtomicWriteError::SyncFailed { .. } => 60,
            AtomicWriteError::CloseFailed { .. } => 61,
            AtomicWriteError::MetadataFailed { .. } => 70,
            AtomicWriteError::RenameFailed { .. } => 80,
            AtomicWriteError::DestinationExists { .. } => 81,
            AtomicWriteError::DirectorySyncFailed { .. } => 90,
            AtomicWriteError::Offload { .. } => 99,
        }
    }

    /// Short snake_case name, used as a structured log field.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AtomicWriteError::InvalidPath { .. } => "invalid_path",
            AtomicWriteError::Encode { .. } => "encode_failed",
            AtomicWriteError::ParentNotFound { .. } => "parent_not_found",
            AtomicWriteError::ParentNotDirectory { .. } => "parent_not_directory",
            AtomicWriteError::ParentAccessDenied { .. } => "parent_access_denied",
            AtomicWriteError::StatFailed { .. } => "stat_failed",
            AtomicWriteError::DestinationIsDirectory { .. } => "destination_is_directory",
            AtomicWriteError::TempCreateFailed { .. } => "temp_create_failed",
            AtomicWriteError::WriteFailed { .. } => "write_failed",
            AtomicWriteError::SyncFailed { .. } => "sync_failed",
            AtomicWriteError::CloseFailed { .. } => "close_failed",
            AtomicWriteError::MetadataFailed { .. } => "metadata_failed",
            AtomicWriteError::RenameFailed { .. } => "rename_failed",
            AtomicWriteError::DestinationExists { .. } => "destination_exists",
            AtomicWriteError::DirectorySyncFailed { .. } => "directory_sync_failed",
            AtomicWriteError::Offload { .. } => "offload_failed",
        }
    }

    /// What the failure means for the destination.
    ///
    /// A failed rename leaves the destination as it was, so it is grouped with
    /// the pre-write stages. A background job that died mid-flight unwinds
    /// through the temp-file guard, so nothing of it is ever visible.
    pub fn disposition(&self) -> Disposition {
        match self {
            AtomicWriteError::InvalidPath { .. }
            | AtomicWriteError::Encode { .. }
            | AtomicWriteError::ParentNotFound { .. }
            | AtomicWriteError::ParentNotDirectory { .. }
            | AtomicWriteError::ParentAccessDenied { .. }
            | AtomicWriteError::StatFailed { .. }
            | AtomicWriteError::DestinationIsDirectory { .. }
            | AtomicWriteError::TempCreateFailed { .. }
            | AtomicWriteError::RenameFailed { .. }
            | AtomicWriteError::DestinationExists { .. } => Disposition::Unchanged,
            AtomicWriteError::WriteFailed { .. }
            | AtomicWriteError::SyncFailed { .. }
            | AtomicWriteError::CloseFailed { .. }
            | AtomicWriteError::MetadataFailed { .. }
            | AtomicWriteError::Offload { .. } => Disposition::NeverVisible,
            AtomicWriteError::DirectorySyncFailed { .. } => Disposition::CommittedNotDurable,
        }
    }

    /// True when the destination now holds the new content despite the error.
    pub fn is_committed(&self) -> bool {
        self.disposition() == Disposition::CommittedNotDurable
    }

    /// Underlying I/O error, if the failure came from a syscall.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            AtomicWriteError::ParentAccessDenied { source, .. }
            | AtomicWriteError::StatFailed { source, .. }
            | AtomicWriteError::TempCreateFailed { source, .. }
            | AtomicWriteError::WriteFailed { source, .. }
            | AtomicWriteError::SyncFailed { source, .. }
            | AtomicWriteError::CloseFailed { source, .. }
            | AtomicWriteError::MetadataFailed { source, .. }
            | AtomicWriteError::RenameFailed { source, .. }
            | AtomicWriteError::DirectorySyncFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Platform error code (errno / Win32 error) of the underlying failure.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }

    /// Actionable hint derived from the OS error, e.g. "insufficient space on device".
    pub fn hint(&self) -> Option<&'static str> {
        self.io_error().and_then(os_hint)
    }
}
