//! Fault-injecting primitives for tests.
//! Wraps another `Primitives` implementation and fails chosen operations with
//! an injected error, so every stage of the write pipeline can be exercised.

use filetime::FileTime;
use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use super::{EntryMeta, NativeFs, Owner, Primitives, Xattr};

/// Operation that should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Stat,
    TempCreate,
    /// Fail once `after` bytes have been accepted (shorter writes up to that point).
    Write { after: usize },
    Permissions,
    Ownership,
    Timestamps,
    Xattr,
    Acl,
    Sync,
    Close,
    Rename,
    DirSync,
}

/// Errors produced by a [`FaultyFs`].
pub fn injected() -> io::Error {
    io::Error::other("injected fault")
}

/// `Primitives` wrapper with injectable failures and hooks.
pub struct FaultyFs<P: Primitives = NativeFs> {
    inner: P,
    faults: Vec<Fault>,
    perm_denied_ownership: bool,
    noreplace_unsupported: bool,
    interrupts: Cell<usize>,
    temp_collisions: Cell<usize>,
    written: Cell<usize>,
    on_sync: RefCell<Option<Box<dyn FnOnce()>>>,
    created: RefCell<Vec<std::path::PathBuf>>,
}

impl Default for FaultyFs<NativeFs> {
    fn default() -> Self {
        Self::new(NativeFs::default())
    }
}

impl<P: Primitives> FaultyFs<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            faults: Vec::new(),
            perm_denied_ownership: false,
            noreplace_unsupported: false,
            interrupts: Cell::new(0),
            temp_collisions: Cell::new(0),
            written: Cell::new(0),
            on_sync: RefCell::new(None),
            created: RefCell::new(Vec::new()),
        }
    }

    pub fn fail(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Make ownership changes fail with `PermissionDenied`, as for an unprivileged process.
    pub fn deny_ownership(mut self) -> Self {
        self.perm_denied_ownership = true;
        self
    }

    /// Pretend the platform has no atomic no-replace rename.
    pub fn without_noreplace(mut self) -> Self {
        self.noreplace_unsupported = true;
        self
    }

    /// Return `Interrupted` from the first `n` write calls.
    pub fn interrupt_writes(self, n: usize) -> Self {
        self.interrupts.set(n);
        self
    }

    /// Report `AlreadyExists` for the first `n` temp-file creations.
    pub fn collide_temp_names(self, n: usize) -> Self {
        self.temp_collisions.set(n);
        self
    }

    /// Run `f` once, right before the temp file is synced.
    pub fn on_sync(self, f: impl FnOnce() + 'static) -> Self {
        *self.on_sync.borrow_mut() = Some(Box::new(f));
        self
    }

    /// Temp paths successfully created through this wrapper.
    pub fn created_paths(&self) -> Vec<std::path::PathBuf> {
        self.created.borrow().clone()
    }

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn write_limit(&self) -> Option<usize> {
        self.faults.iter().find_map(|f| match f {
            Fault::Write { after } => Some(*after),
            _ => None,
        })
    }

    fn check(&self, fault: Fault) -> io::Result<()> {
        if self.has(fault) { Err(injected()) } else { Ok(()) }
    }
}

impl<P: Primitives> Primitives for FaultyFs<P> {
    fn stat(&self, path: &Path) -> io::Result<EntryMeta> {
        self.check(Fault::Stat)?;
        self.inner.stat(path)
    }

    fn lstat(&self, path: &Path) -> io::Result<Option<EntryMeta>> {
        self.check(Fault::Stat)?;
        self.inner.lstat(path)
    }

    fn list_xattrs(&self, path: &Path) -> io::Result<Vec<Xattr>> {
        self.inner.list_xattrs(path)
    }

    fn read_acl(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        self.inner.read_acl(path)
    }

    fn create_exclusive(&self, path: &Path) -> io::Result<File> {
        self.check(Fault::TempCreate)?;
        let left = self.temp_collisions.get();
        if left > 0 {
            self.temp_collisions.set(left - 1);
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        let f = self.inner.create_exclusive(path)?;
        self.created.borrow_mut().push(path.to_path_buf());
        Ok(f)
    }

    fn write(&self, file: &mut File, buf: &[u8]) -> io::Result<usize> {
        let left = self.interrupts.get();
        if left > 0 {
            self.interrupts.set(left - 1);
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        let buf = match self.write_limit() {
            Some(after) => {
                let done = self.written.get();
                if done >= after {
                    return Err(injected());
                }
                &buf[..buf.len().min(after - done)]
            }
            None => buf,
        };
        let n = self.inner.write(file, buf)?;
        self.written.set(self.written.get() + n);
        Ok(n)
    }

    fn set_permissions(&self, file: &File, perms: &fs::Permissions) -> io::Result<()> {
        self.check(Fault::Permissions)?;
        self.inner.set_permissions(file, perms)
    }

    fn set_mode(&self, file: &File, mode: u32) -> io::Result<()> {
        self.check(Fault::Permissions)?;
        self.inner.set_mode(file, mode)
    }

    fn set_owner(&self, file: &File, owner: &Owner) -> io::Result<()> {
        self.check(Fault::Ownership)?;
        if self.perm_denied_ownership {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.set_owner(file, owner)
    }

    fn set_times(&self, file: &File, accessed: FileTime, modified: FileTime) -> io::Result<()> {
        self.check(Fault::Timestamps)?;
        self.inner.set_times(file, accessed, modified)
    }

    fn set_xattr(&self, path: &Path, attr: &Xattr) -> io::Result<()> {
        self.check(Fault::Xattr)?;
        self.inner.set_xattr(path, attr)
    }

    fn set_acl(&self, path: &Path, acl: &[u8]) -> io::Result<()> {
        self.check(Fault::Acl)?;
        self.inner.set_acl(path, acl)
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        if let Some(hook) = self.on_sync.borrow_mut().take() {
            hook();
        }
        self.check(Fault::Sync)?;
        self.inner.sync(file)
    }

    fn close(&self, file: File) -> io::Result<()> {
        if self.has(Fault::Close) {
            drop(file);
            return Err(injected());
        }
        self.inner.close(file)
    }

    fn rename_replace(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check(Fault::Rename)?;
        self.inner.rename_replace(from, to)
    }

    fn rename_noreplace(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.noreplace_unsupported {
            return Err(super::unsupported("no-replace rename (simulated)"));
        }
        self.check(Fault::Rename)?;
        self.inner.rename_noreplace(from, to)
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        self.check(Fault::DirSync)?;
        self.inner.sync_dir(dir)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.inner.remove(path)
    }
}
