//! Payload writer: loops over short writes and retries interrupted calls.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::errors::AtomicWriteError;
use crate::platform::Primitives;

/// Write all of `data` into `file`. Returns the byte count on success.
pub fn write_all<P: Primitives + ?Sized>(
    prims: &P,
    file: &mut File,
    data: &[u8],
    temp: &Path,
) -> Result<u64, AtomicWriteError> {
    let mut offset = 0usize;
    while offset < data.len() {
        match prims.write(file, &data[offset..]) {
            Ok(0) => {
                return Err(failed(temp, offset, data.len(), io::ErrorKind::WriteZero.into()));
            }
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(failed(temp, offset, data.len(), e)),
        }
    }
    Ok(offset as u64)
}

fn failed(temp: &Path, written: usize, expected: usize, source: io::Error) -> AtomicWriteError {
    AtomicWriteError::WriteFailed {
        path: temp.to_path_buf(),
        written: written as u64,
        expected: expected as u64,
        source,
    }
}
