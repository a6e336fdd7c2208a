//! Unix implementation of the write primitives (Linux, macOS, BSDs).
//!
//! Notes:
//! - No-replace rename uses `renameat2(RENAME_NOREPLACE)` on Linux and
//!   `renamex_np(RENAME_EXCL)` on macOS. Other Unixes report `Unsupported` and
//!   the committer falls back to check-then-rename.
//! - On macOS `fsync` does not flush the drive cache; `F_FULLFSYNC` is tried first.
//! - POSIX ACLs are stored in the `system.posix_acl_access` extended attribute
//!   on Linux, so ACL preservation needs the `xattrs` feature there.

use filetime::FileTime;
#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos"))]
use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos"))]
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::os::unix::io::IntoRawFd;
use std::path::Path;

use super::{EntryMeta, Owner, Primitives, Xattr, kind_of, unsupported};

#[cfg(any(target_os = "linux", target_os = "android"))]
const ACL_ACCESS_XATTR: &str = "system.posix_acl_access";
#[cfg(any(target_os = "linux", target_os = "android"))]
const ACL_DEFAULT_XATTR: &str = "system.posix_acl_default";

/// Open (or create) a log file for appending. New files get mode 0600;
/// an existing file keeps its permissions.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)
}

/// Native primitives for Unix targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixFs;

fn entry_meta(meta: &fs::Metadata) -> EntryMeta {
    let mode = meta.mode() & 0o7777;
    EntryMeta {
        kind: kind_of(meta),
        permissions: fs::Permissions::from_mode(mode),
        mode: Some(mode),
        owner: Some(Owner {
            uid: meta.uid(),
            gid: meta.gid(),
        }),
        accessed: Some(FileTime::from_last_access_time(meta)),
        modified: Some(FileTime::from_last_modification_time(meta)),
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "macos"))]
fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[cfg_attr(not(feature = "xattrs"), allow(dead_code))]
fn is_acl_xattr(name: &std::ffi::OsStr) -> bool {
    name == std::ffi::OsStr::new(ACL_ACCESS_XATTR) || name == std::ffi::OsStr::new(ACL_DEFAULT_XATTR)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[cfg_attr(not(feature = "xattrs"), allow(dead_code))]
fn is_acl_xattr(_name: &std::ffi::OsStr) -> bool {
    false
}

impl Primitives for UnixFs {
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

    #[cfg(feature = "xattrs")]
    fn list_xattrs(&self, path: &Path) -> io::Result<Vec<Xattr>> {
        let mut out = Vec::new();
        for name in xattr::list(path)? {
            if is_acl_xattr(&name) {
                continue;
            }
            // Attributes can vanish between list and get; skip those.
            if let Some(value) = xattr::get(path, &name)? {
                out.push(Xattr { name, value });
            }
        }
        Ok(out)
    }

    #[cfg(not(feature = "xattrs"))]
    fn list_xattrs(&self, _path: &Path) -> io::Result<Vec<Xattr>> {
        Err(unsupported("extended attributes (built without the `xattrs` feature)"))
    }

    #[cfg(all(feature = "xattrs", any(target_os = "linux", target_os = "android")))]
    fn read_acl(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match xattr::get(path, ACL_ACCESS_XATTR) {
            Ok(v) => Ok(v),
            // ENODATA surfaces as Ok(None); ENOTSUP means the filesystem has no ACLs.
            Err(e) if e.raw_os_error() == Some(libc::EOPNOTSUPP) => Err(unsupported("POSIX ACLs")),
            Err(e) => Err(e),
        }
    }

    #[cfg(not(all(feature = "xattrs", any(target_os = "linux", target_os = "android"))))]
    fn read_acl(&self, _path: &Path) -> io::Result<Option<Vec<u8>>> {
        Err(unsupported("ACL preservation"))
    }

    fn create_exclusive(&self, path: &Path) -> io::Result<File> {
        // 0o666 filtered by the umask gives the platform default mode.
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o666)
            .open(path)
    }

    fn write(&self, file: &mut File, buf: &[u8]) -> io::Result<usize> {
        file.write(buf)
    }

    fn set_permissions(&self, file: &File, perms: &fs::Permissions) -> io::Result<()> {
        file.set_permissions(perms.clone())
    }

    fn set_mode(&self, file: &File, mode: u32) -> io::Result<()> {
        file.set_permissions(fs::Permissions::from_mode(mode & 0o7777))
    }

    fn set_owner(&self, file: &File, owner: &Owner) -> io::Result<()> {
        std::os::unix::fs::fchown(file, Some(owner.uid), Some(owner.gid))
    }

    fn set_times(&self, file: &File, accessed: FileTime, modified: FileTime) -> io::Result<()> {
        filetime::set_file_handle_times(file, Some(accessed), Some(modified))
    }

    #[cfg(feature = "xattrs")]
    fn set_xattr(&self, path: &Path, attr: &Xattr) -> io::Result<()> {
        xattr::set(path, &attr.name, &attr.value)
    }

    #[cfg(not(feature = "xattrs"))]
    fn set_xattr(&self, _path: &Path, _attr: &Xattr) -> io::Result<()> {
        Err(unsupported("extended attributes (built without the `xattrs` feature)"))
    }

    #[cfg(all(feature = "xattrs", any(target_os = "linux", target_os = "android")))]
    fn set_acl(&self, path: &Path, acl: &[u8]) -> io::Result<()> {
        xattr::set(path, ACL_ACCESS_XATTR, acl)
    }

    #[cfg(not(all(feature = "xattrs", any(target_os = "linux", target_os = "android"))))]
    fn set_acl(&self, _path: &Path, _acl: &[u8]) -> io::Result<()> {
        Err(unsupported("ACL preservation"))
    }

    #[cfg(target_os = "macos")]
    fn sync(&self, file: &File) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) };
        if rc == -1 {
            // Some filesystems (e.g. network or FUSE mounts) reject F_FULLFSYNC.
            return file.sync_all();
        }
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    fn sync(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    fn close(&self, file: File) -> io::Result<()> {
        let fd = file.into_raw_fd();
        let rc = unsafe { libc::close(fd) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            // The descriptor is released even when close reports EINTR; retrying would be wrong.
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    fn rename_replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn rename_noreplace(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_c = c_path(from)?;
        let to_c = c_path(to)?;
        let rc = unsafe {
            libc::syscall(
                libc::SYS_renameat2,
                libc::AT_FDCWD,
                from_c.as_ptr(),
                libc::AT_FDCWD,
                to_c.as_ptr(),
                libc::RENAME_NOREPLACE,
            )
        };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            // Old kernel, or a filesystem without RENAME_NOREPLACE support.
            Some(libc::ENOSYS) | Some(libc::EINVAL) | Some(libc::EOPNOTSUPP) => {
                Err(unsupported("renameat2(RENAME_NOREPLACE)"))
            }
            _ => Err(err),
        }
    }

    #[cfg(target_os = "macos")]
    fn rename_noreplace(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_c = c_path(from)?;
        let to_c = c_path(to)?;
        let rc = unsafe { libc::renamex_np(from_c.as_ptr(), to_c.as_ptr(), libc::RENAME_EXCL) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ENOTSUP) | Some(libc::EINVAL) => Err(unsupported("renamex_np(RENAME_EXCL)")),
            _ => Err(err),
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos")))]
    fn rename_noreplace(&self, from: &Path, to: &Path) -> io::Result<()> {
        let _ = (from, to);
        Err(unsupported("atomic no-replace rename"))
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        let f = File::open(dir)?;
        f.sync_all()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
