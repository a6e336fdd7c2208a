//! Windows implementation of the write primitives (best-effort, minimal ACL awareness).
//!
//! Notes:
//! - Windows lacks POSIX mode semantics; permissions map to the readonly attribute.
//! - Renames go through `MoveFileExW` with `MOVEFILE_WRITE_THROUGH`, which also
//!   flushes the rename itself, so the directory sync is a no-op here.
//! - Ownership, extended attributes and ACL preservation report `Unsupported`.

use filetime::FileTime;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows_sys::Win32::Storage::FileSystem::{
    MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH, MoveFileExW,
};

use super::{EntryMeta, Owner, Primitives, Xattr, kind_of, unsupported};

/// Open (or create) a log file for appending.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Native primitives for Windows targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsFs;

fn entry_meta(meta: &fs::Metadata) -> EntryMeta {
    EntryMeta {
        kind: kind_of(meta),
        permissions: meta.permissions(),
        mode: None,
        owner: None,
        accessed: Some(FileTime::from_last_access_time(meta)),
        modified: Some(FileTime::from_last_modification_time(meta)),
    }
}

fn wide(path: &Path) -> Vec<u16> {
    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn move_file(from: &Path, to: &Path, flags: u32) -> io::Result<()> {
    let from_w = wide(from);
    let to_w = wide(to);
    let ok = unsafe { MoveFileExW(from_w.as_ptr(), to_w.as_ptr(), flags) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl Primitives for WindowsFs {
    fn stat(&self, path: &Path) -> io::Result<EntryMeta> {
        fs::metadata(path).map(|m| entry_meta(&m))
    }

    fn lstat(&self, path: &Path) -> io::Result<Option<EntryMeta>> {
        match fs::symlink_metadata(path) {
            Ok(m) => Ok(Some(entry_meta(&m))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_xattrs(&self, _path: &Path) -> io::Result<Vec<Xattr>> {
        Err(unsupported("extended attributes"))
    }

    fn read_acl(&self, _path: &Path) -> io::Result<Option<Vec<u8>>> {
        Err(unsupported("ACL preservation"))
    }

    fn create_exclusive(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().write(true).create_new(true).open(path)
    }

    fn write(&self, file: &mut File, buf: &[u8]) -> io::Result<usize> {
        file.write(buf)
    }

    fn set_permissions(&self, file: &File, perms: &fs::Permissions) -> io::Result<()> {
        let mut current = file.metadata()?.permissions();
        current.set_readonly(perms.readonly());
        file.set_permissions(current)
    }

    fn set_mode(&self, file: &File, mode: u32) -> io::Result<()> {
        let mut current = file.metadata()?.permissions();
        current.set_readonly(mode & 0o222 == 0);
        file.set_permissions(current)
    }

    fn set_owner(&self, _file: &File, _owner: &Owner) -> io::Result<()> {
        Err(unsupported("ownership preservation"))
    }

    fn set_times(&self, file: &File, accessed: FileTime, modified: FileTime) -> io::Result<()> {
        filetime::set_file_handle_times(file, Some(accessed), Some(modified))
    }

    fn set_xattr(&self, _path: &Path, _attr: &Xattr) -> io::Result<()> {
        Err(unsupported("extended attributes"))
    }

    fn set_acl(&self, _path: &Path, _acl: &[u8]) -> io::Result<()> {
        Err(unsupported("ACL preservation"))
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        // FlushFileBuffers
        file.sync_all()
    }

    fn close(&self, file: File) -> io::Result<()> {
        drop(file);
        Ok(())
    }

    fn rename_replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        move_file(from, to, MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH)
    }

    fn rename_noreplace(&self, from: &Path, to: &Path) -> io::Result<()> {
        // Without MOVEFILE_REPLACE_EXISTING the move fails with ERROR_ALREADY_EXISTS,
        // which std maps to ErrorKind::AlreadyExists.
        move_file(from, to, MOVEFILE_WRITE_THROUGH)
    }

    fn sync_dir(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
