use std::io;
use std::path::Path;

use atomwrite::fs_ops::{io_error_with_help, io_error_with_help_io};
use atomwrite::{AtomicWriteError, Disposition, MetadataOp};

#[test]
fn notfound_fallback_hint_includes_path() {
    let p = Path::new("/nonexistent/path/for/test");
    let f = io_error_with_help("read input", p);
    let err = f(io::Error::from(io::ErrorKind::NotFound));
    let msg = format!("{}", err);
    assert!(msg.contains("read input"));
    assert!(msg.contains(p.to_string_lossy().as_ref()));
    assert!(msg.contains("path not found"));
}

#[cfg(unix)]
#[test]
fn enospc_hint_present() {
    let p = Path::new("/tmp");
    let f = io_error_with_help("write", p);
    let err = f(io::Error::from_raw_os_error(libc::ENOSPC));
    let msg = format!("{}", err);
    assert!(msg.contains("insufficient space"), "msg was: {}", msg);
    assert!(msg.contains("os code"), "should include os code in message");
}

#[cfg(unix)]
#[test]
fn erofs_hint_present() {
    let p = Path::new("/tmp");
    let f = io_error_with_help("write", p);
    let err = f(io::Error::from_raw_os_error(libc::EROFS));
    assert!(format!("{}", err).contains("read-only filesystem"));
}

#[test]
fn io_adapter_preserves_kind() {
    let p = Path::new("/tmp/test.txt");
    let f = io_error_with_help_io("create", p);
    let wrapped = f(io::Error::from(io::ErrorKind::AlreadyExists));
    assert_eq!(wrapped.kind(), io::ErrorKind::AlreadyExists);
    assert!(format!("{}", wrapped).contains("already exists"));
}

#[cfg(unix)]
#[test]
fn write_error_hint_comes_from_the_os_code() {
    let err = AtomicWriteError::WriteFailed {
        path: "/tmp/x.tmp".into(),
        written: 4096,
        expected: 8192,
        source: io::Error::from_raw_os_error(libc::ENOSPC),
    };
    assert_eq!(err.raw_os_error(), Some(libc::ENOSPC));
    assert_eq!(err.hint(), Some("insufficient space on device."));
    assert_eq!(err.disposition(), Disposition::NeverVisible);
    let msg = err.to_string();
    assert!(msg.contains("4096 of 8192"), "{msg}");
}

#[test]
fn error_codes_group_by_stage() {
    let unchanged = AtomicWriteError::DestinationExists { path: "f".into() };
    assert_eq!(unchanged.code() / 10, 8);
    assert_eq!(unchanged.kind_name(), "destination_exists");
    assert!(unchanged.hint().is_none());

    let meta = AtomicWriteError::MetadataFailed {
        op: MetadataOp::Ownership,
        path: "f.tmp".into(),
        source: io::Error::from(io::ErrorKind::PermissionDenied),
    };
    assert_eq!(meta.code() / 10, 7);
    assert!(meta.to_string().contains("ownership"));
    assert!(!meta.is_committed());

    let durable = AtomicWriteError::DirectorySyncFailed {
        path: "d/f".into(),
        dir: "d".into(),
        source: io::Error::other("fsync"),
    };
    assert!(durable.is_committed());
    assert_eq!(durable.disposition(), Disposition::CommittedNotDurable);
}
