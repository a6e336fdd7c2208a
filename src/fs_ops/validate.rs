//! Destination path validation.
//! A `ValidPath` is a destination that passed the pre-I/O checks: non-empty,
//! free of control characters, and ending in a file name.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::AtomicWriteError;

/// A destination path accepted by the atomic writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPath {
    path: PathBuf,
    parent: PathBuf,
}

impl ValidPath {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AtomicWriteError> {
        let path = path.into();
        let invalid = |reason| AtomicWriteError::InvalidPath {
            path: path.clone(),
            reason,
        };

        if path.as_os_str().is_empty() {
            return Err(invalid("path is empty"));
        }
        if path
            .as_os_str()
            .as_encoded_bytes()
            .iter()
            .any(|&b| b < 0x20 || b == 0x7f)
        {
            return Err(invalid("path contains control characters"));
        }
        if ends_with_separator(path.as_os_str()) {
            return Err(invalid("path ends with a separator"));
        }
        if path.file_name().is_none() {
            return Err(invalid("path has no file name component"));
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self { path, parent })
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Directory the file lives in; `.` for bare file names.
    pub fn parent(&self) -> &Path {
        &self.parent
    }

    pub fn file_name(&self) -> &OsStr {
        // Checked in `new`.
        self.path.file_name().unwrap_or_default()
    }
}

// `Path::file_name` ignores a trailing slash ("dir/f/" -> "f"), which would
// silently turn a directory-looking path into a file write.
fn ends_with_separator(s: &OsStr) -> bool {
    match s.as_encoded_bytes().last() {
        Some(b'/') => true,
        #[cfg(windows)]
        Some(b'\\') => true,
        _ => false,
    }
}

impl AsRef<Path> for ValidPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ValidPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl TryFrom<PathBuf> for ValidPath {
    type Error = AtomicWriteError;
    fn try_from(p: PathBuf) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl TryFrom<&Path> for ValidPath {
    type Error = AtomicWriteError;
    fn try_from(p: &Path) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl TryFrom<&str> for ValidPath {
    type Error = AtomicWriteError;
    fn try_from(p: &str) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}
