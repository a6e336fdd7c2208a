//! Atomic write pipeline.
//! inspect destination -> allocate temp -> write -> preserve metadata -> fsync
//! -> close -> rename -> fsync parent directory.
//!
//! Until the rename, every exit path drops the `TempFile` guard, which removes
//! the temp file, so the destination is either untouched or fully replaced.

use std::error::Error as StdError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::atomic::{commit, sync_parent};
use super::inspect::{PreservedMetadata, inspect};
use super::metadata::{self, MetadataResult};
use super::options::WriteOptions;
use super::temp::TempFile;
use super::validate::ValidPath;
use super::writer::write_all;
use crate::errors::AtomicWriteError;
use crate::platform::{NativeFs, Primitives};

/// What a successful write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub destination: PathBuf,
    pub bytes_written: u64,
    /// A file or link was at the destination and has been replaced.
    pub replaced: bool,
    /// Metadata sub-operations attempted, in order.
    pub metadata: Vec<MetadataResult>,
}

/// Atomically write `data` to `dest` using the native platform primitives.
///
/// After a crash at any point, `dest` holds either its previous content or all of `data`.
pub fn atomic_write(
    data: &[u8],
    dest: impl AsRef<Path>,
    opts: &WriteOptions,
) -> Result<WriteReport, AtomicWriteError> {
    atomic_write_with(&NativeFs::default(), data, dest, opts)
}

/// Same as [`atomic_write`], against caller-supplied primitives.
pub fn atomic_write_with<P: Primitives + ?Sized>(
    prims: &P,
    data: &[u8],
    dest: impl AsRef<Path>,
    opts: &WriteOptions,
) -> Result<WriteReport, AtomicWriteError> {
    let dest = ValidPath::new(dest.as_ref())?;
    write_validated(prims, data, &dest, opts)
}

/// Serialize `value` with `encode`, then write the bytes atomically.
/// Encoder failures are reported before anything touches the disk.
///
/// ```no_run
/// use atomwrite::{WriteOptions, atomic_write_encoded};
/// let doc = vec![1u32, 2, 3];
/// atomic_write_encoded(&doc, "numbers.txt", &WriteOptions::default(), |v| {
///     Ok::<_, std::fmt::Error>(format!("{v:?}").into_bytes())
/// })?;
/// # Ok::<(), atomwrite::AtomicWriteError>(())
/// ```
pub fn atomic_write_encoded<T, F, E>(
    value: &T,
    dest: impl AsRef<Path>,
    opts: &WriteOptions,
    encode: F,
) -> Result<WriteReport, AtomicWriteError>
where
    T: ?Sized,
    F: FnOnce(&T) -> Result<Vec<u8>, E>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let dest = ValidPath::new(dest.as_ref())?;
    let bytes = encode(value).map_err(|e| AtomicWriteError::Encode {
        path: dest.as_path().to_path_buf(),
        source: e.into(),
    })?;
    write_validated(&NativeFs::default(), &bytes, &dest, opts)
}

pub(crate) fn write_validated<P: Primitives + ?Sized>(
    prims: &P,
    data: &[u8],
    dest: &ValidPath,
    opts: &WriteOptions,
) -> Result<WriteReport, AtomicWriteError> {
    let opts = opts.normalized();
    debug!(path = %dest, bytes = data.len(), strategy = %opts.strategy, "atomic write");

    let existing = inspect(prims, dest, &opts)?;
    let preserved = existing.as_ref().and_then(|d| d.preserved.as_ref());

    let (temp, file) = TempFile::allocate(prims, dest)?;
    let (bytes_written, metadata) = fill(prims, file, data, temp.path(), preserved, &opts)?;

    commit(prims, temp.path(), dest.as_path(), opts.strategy)?;
    temp.disarm();
    info!(path = %dest, bytes = bytes_written, replaced = existing.is_some(), "committed atomic write");

    sync_parent(prims, dest.as_path(), dest.parent())?;

    Ok(WriteReport {
        destination: dest.as_path().to_path_buf(),
        bytes_written,
        replaced: existing.is_some(),
        metadata,
    })
}

// Takes the handle by value so it is closed (or dropped) before the guard
// removes the file on error; Windows can't delete open files.
fn fill<P: Primitives + ?Sized>(
    prims: &P,
    mut file: File,
    data: &[u8],
    temp: &Path,
    preserved: Option<&PreservedMetadata>,
    opts: &WriteOptions,
) -> Result<(u64, Vec<MetadataResult>), AtomicWriteError> {
    let written = write_all(prims, &mut file, data, temp)?;
    let applied = metadata::apply(prims, &file, temp, preserved, opts)?;

    prims.sync(&file).map_err(|e| AtomicWriteError::SyncFailed {
        path: temp.to_path_buf(),
        source: e,
    })?;
    prims.close(file).map_err(|e| AtomicWriteError::CloseFailed {
        path: temp.to_path_buf(),
        source: e,
    })?;
    debug!(temp = %temp.display(), bytes = written, "temp file synced and closed");
    Ok((written, applied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Disposition, MetadataOp};
    use crate::fs_ops::metadata::OpStatus;
    use crate::fs_ops::options::Strategy;
    use crate::platform::fault::{Fault, FaultyFs};
    use crate::platform::is_temp_name;
    use std::fs;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut v: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        v.sort();
        v
    }

    fn assert_no_temp(dir: &Path) {
        let left: Vec<_> = entries(dir).into_iter().filter(|n| is_temp_name(n)).collect();
        assert!(left.is_empty(), "temp files left behind: {left:?}");
    }

    const STAGES: &[Fault] = &[
        Fault::Write { after: 3 },
        Fault::Sync,
        Fault::Close,
        Fault::Rename,
    ];

    #[test]
    fn failure_at_any_stage_leaves_absent_destination_absent() {
        for &fault in STAGES {
            let dir = tempdir().unwrap();
            let dest = dir.path().join("out.txt");
            let prims = FaultyFs::default().fail(fault);
            let err = atomic_write_with(&prims, b"new content", &dest, &WriteOptions::default())
                .expect_err("fault must surface");
            assert!(!dest.exists(), "{fault:?}: destination appeared");
            assert_ne!(err.disposition(), Disposition::CommittedNotDurable, "{fault:?}");
            assert!(entries(dir.path()).is_empty(), "{fault:?}: {:?}", entries(dir.path()));
            assert_eq!(prims.created_paths().len(), 1, "{fault:?}");
        }
    }

    #[test]
    fn failure_at_any_stage_keeps_old_content() {
        for &fault in STAGES {
            let dir = tempdir().unwrap();
            let dest = dir.path().join("out.txt");
            fs::write(&dest, b"old").unwrap();
            let prims = FaultyFs::default().fail(fault);
            atomic_write_with(&prims, b"new content", &dest, &WriteOptions::default())
                .expect_err("fault must surface");
            assert_eq!(fs::read(&dest).unwrap(), b"old", "{fault:?}");
            assert_eq!(entries(dir.path()), vec!["out.txt".to_string()], "{fault:?}");
        }
    }

    #[test]
    fn errors_name_their_stage() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let cases: &[(Fault, &str)] = &[
            (Fault::Stat, "stat_failed"),
            (Fault::TempCreate, "temp_create_failed"),
            (Fault::Write { after: 0 }, "write_failed"),
            (Fault::Sync, "sync_failed"),
            (Fault::Close, "close_failed"),
            (Fault::Rename, "rename_failed"),
        ];
        for &(fault, kind) in cases {
            let prims = FaultyFs::default().fail(fault);
            let err = atomic_write_with(&prims, b"x", &dest, &WriteOptions::default()).unwrap_err();
            assert_eq!(err.kind_name(), kind, "{fault:?}");
        }
        assert_no_temp(dir.path());
    }

    #[test]
    fn early_failures_create_no_temp() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let prims = FaultyFs::default().fail(Fault::Stat);
        let err = atomic_write_with(&prims, b"x", &dest, &WriteOptions::default()).unwrap_err();
        assert_eq!(err.disposition(), Disposition::Unchanged);
        assert!(prims.created_paths().is_empty());
    }

    #[test]
    fn write_failure_after_n_bytes_reports_progress_and_cleans_up() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let prims = FaultyFs::default().fail(Fault::Write { after: 5 });
        let err = atomic_write_with(&prims, &[7u8; 64], &dest, &WriteOptions::default()).unwrap_err();
        match &err {
            AtomicWriteError::WriteFailed { written, expected, .. } => {
                assert_eq!((*written, *expected), (5, 64));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(err.disposition(), Disposition::NeverVisible);
        assert!(!prims.created_paths()[0].exists());
        assert!(!dest.exists());
    }

    #[test]
    fn dir_sync_failure_is_committed_but_not_durable() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let prims = FaultyFs::default().fail(Fault::DirSync);
        let err = atomic_write_with(&prims, b"data", &dest, &WriteOptions::default()).unwrap_err();
        assert!(err.is_committed());
        assert_eq!(fs::read(&dest).unwrap(), b"data");
        assert_no_temp(dir.path());
    }

    #[test]
    fn interrupted_writes_and_temp_collisions_are_absorbed() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let prims = FaultyFs::default().interrupt_writes(3).collide_temp_names(2);
        let report = atomic_write_with(&prims, b"payload", &dest, &WriteOptions::default()).unwrap();
        assert_eq!(report.bytes_written, 7);
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
        assert_no_temp(dir.path());
    }

    #[cfg(unix)]
    #[test]
    fn strict_ownership_failure_aborts_and_cleans_up() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        fs::write(&dest, b"old").unwrap();
        let opts = WriteOptions {
            preserve_ownership: true,
            strict_ownership: true,
            ..WriteOptions::default()
        };
        let prims = FaultyFs::default().fail(Fault::Ownership);
        let err = atomic_write_with(&prims, b"new", &dest, &opts).unwrap_err();
        assert!(matches!(err, AtomicWriteError::MetadataFailed { op: MetadataOp::Ownership, .. }), "{err:?}");
        assert_eq!(fs::read(&dest).unwrap(), b"old");
        assert_no_temp(dir.path());
    }

    #[test]
    fn lenient_ownership_failure_still_commits() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        fs::write(&dest, b"old").unwrap();
        let opts = WriteOptions {
            preserve_ownership: true,
            ..WriteOptions::default()
        };
        let prims = FaultyFs::default().deny_ownership();
        let report = atomic_write_with(&prims, b"new", &dest, &opts).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
        assert!(report.replaced);
        let ownership: Vec<_> = report
            .metadata
            .iter()
            .filter(|r| r.op == MetadataOp::Ownership)
            .collect();
        assert_eq!(ownership.len(), 1);
        assert_ne!(ownership[0].status, OpStatus::Applied);
    }

    #[test]
    fn no_clobber_fallback_catches_destination_created_mid_write() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let racer = dest.clone();
        let prims = FaultyFs::default()
            .without_noreplace()
            .on_sync(move || fs::write(&racer, b"theirs").unwrap());
        let err = atomic_write_with(&prims, b"ours", &dest, &WriteOptions::no_clobber()).unwrap_err();
        assert!(matches!(err, AtomicWriteError::DestinationExists { .. }), "{err:?}");
        assert_eq!(fs::read(&dest).unwrap(), b"theirs");
        assert_no_temp(dir.path());
    }

    #[test]
    fn no_clobber_native_catches_destination_created_mid_write() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let racer = dest.clone();
        let prims = FaultyFs::default().on_sync(move || fs::write(&racer, b"theirs").unwrap());
        let opts = WriteOptions::default().with_strategy(Strategy::NoClobber);
        let err = atomic_write_with(&prims, b"ours", &dest, &opts).unwrap_err();
        assert!(matches!(err, AtomicWriteError::DestinationExists { .. }), "{err:?}");
        assert_eq!(fs::read(&dest).unwrap(), b"theirs");
        assert_no_temp(dir.path());
    }

    #[test]
    fn encoder_failure_touches_nothing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let err = atomic_write_encoded(&5u8, &dest, &WriteOptions::default(), |_| {
            Err::<Vec<u8>, _>("cannot encode")
        })
        .unwrap_err();
        assert_eq!(err.kind_name(), "encode_failed");
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn invalid_path_is_rejected_before_io() {
        let err = atomic_write(b"x", "", &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, AtomicWriteError::InvalidPath { .. }));
    }
}
