//! Platform-specific primitives.
//! This module hides OS differences (Unix/Windows) behind the `Primitives` trait
//! so the atomic write pipeline in `fs_ops` stays platform-agnostic: only the
//! individual syscalls (create-exclusive, write, fsync, rename, rename-no-replace,
//! directory fsync, metadata setters) live here.

use filetime::FileTime;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::Path;

#[cfg(any(test, feature = "test-helpers"))]
pub mod fault;
mod temp;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use temp::{TEMP_SUFFIX, is_temp_name, temp_sibling_name};

#[cfg(unix)]
pub use unix::{UnixFs, open_log_file_secure_append};
/// Primitives for the platform this crate was built for.
#[cfg(unix)]
pub type NativeFs = UnixFs;

#[cfg(windows)]
pub use windows::{WindowsFs, open_log_file_secure_append};
/// Primitives for the platform this crate was built for.
#[cfg(windows)]
pub type NativeFs = WindowsFs;

/// Numeric owner of a file (POSIX uid/gid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// One extended attribute (name and raw value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xattr {
    pub name: OsString,
    pub value: Vec<u8>,
}

/// File type reported by a stat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Platform-neutral view of the stat fields the write pipeline cares about.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub kind: EntryKind,
    pub permissions: fs::Permissions,
    /// Permission bits (`st_mode & 0o7777`) where the platform has them.
    pub mode: Option<u32>,
    pub owner: Option<Owner>,
    pub accessed: Option<FileTime>,
    pub modified: Option<FileTime>,
}

impl EntryMeta {
    /// True when the mode carries setuid or setgid bits (cleared by chown).
    pub fn has_setid_bits(&self) -> bool {
        self.mode.is_some_and(|m| m & 0o6000 != 0)
    }
}

/// The OS operations the atomic write algorithm is built from.
///
/// Operations a platform cannot perform return an error of kind
/// [`io::ErrorKind::Unsupported`]; callers treat that as "skip", never as a
/// failure of the write.
pub trait Primitives {
    /// Stat following symlinks.
    fn stat(&self, path: &Path) -> io::Result<EntryMeta>;
    /// Stat without following symlinks; `Ok(None)` when nothing exists at `path`.
    fn lstat(&self, path: &Path) -> io::Result<Option<EntryMeta>>;
    /// Extended attributes of `path`, excluding ACL-carrying attributes.
    fn list_xattrs(&self, path: &Path) -> io::Result<Vec<Xattr>>;
    /// Serialized access ACL of `path`, if it has one.
    fn read_acl(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Create `path` for writing; fails with `AlreadyExists` if anything is there.
    fn create_exclusive(&self, path: &Path) -> io::Result<File>;
    /// One write call; may write fewer bytes than offered.
    fn write(&self, file: &mut File, buf: &[u8]) -> io::Result<usize>;

    fn set_permissions(&self, file: &File, perms: &fs::Permissions) -> io::Result<()>;
    /// Apply POSIX-style permission bits (`0o7777`); Windows maps them to the readonly flag.
    fn set_mode(&self, file: &File, mode: u32) -> io::Result<()>;
    fn set_owner(&self, file: &File, owner: &Owner) -> io::Result<()>;
    fn set_times(&self, file: &File, accessed: FileTime, modified: FileTime) -> io::Result<()>;
    fn set_xattr(&self, path: &Path, attr: &Xattr) -> io::Result<()>;
    fn set_acl(&self, path: &Path, acl: &[u8]) -> io::Result<()>;

    /// Flush data and metadata of `file` to stable storage.
    fn sync(&self, file: &File) -> io::Result<()>;
    /// Close `file`, reporting errors the implicit drop would swallow.
    fn close(&self, file: File) -> io::Result<()>;

    /// Atomically rename `from` onto `to`, replacing whatever `to` names.
    fn rename_replace(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Atomically rename `from` to `to`, failing with `AlreadyExists` if `to` exists.
    /// Returns `Unsupported` when the platform or filesystem has no such primitive.
    fn rename_noreplace(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Flush a directory's entries to stable storage.
    fn sync_dir(&self, dir: &Path) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Convenience constructor for "this platform can't do that".
pub(crate) fn unsupported(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{what} is not supported on this platform"),
    )
}

/// Map a stat result's file type onto `EntryKind`.
pub(crate) fn kind_of(meta: &fs::Metadata) -> EntryKind {
    let ft = meta.file_type();
    if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_dir() {
        EntryKind::Directory
    } else if ft.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}
