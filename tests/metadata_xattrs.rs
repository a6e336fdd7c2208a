#![cfg(all(unix, feature = "xattrs"))]

use std::fs;
use tempfile::tempdir;

use atomwrite::{MetadataOp, OpStatus, WriteOptions, atomic_write};

#[test]
fn xattrs_survive_replacement() {
    let td = tempdir().unwrap();
    let dest = td.path().join("tagged.txt");
    fs::write(&dest, b"old").unwrap();

    // tmpfs without user xattrs, or a filesystem mounted nouser_xattr
    if xattr::set(&dest, "user.atomwrite.test", b"kept").is_err() {
        eprintln!("skipping: user xattrs not supported here");
        return;
    }

    let opts = WriteOptions {
        preserve_extended_attributes: true,
        ..WriteOptions::default()
    };
    let report = atomic_write(b"new", &dest, &opts).expect("write");
    assert_eq!(fs::read(&dest).unwrap(), b"new");

    let got = xattr::get(&dest, "user.atomwrite.test").expect("get xattr");
    assert_eq!(got.as_deref(), Some(b"kept".as_slice()));

    let step = report
        .metadata
        .iter()
        .find(|r| r.op == MetadataOp::ExtendedAttributes)
        .expect("xattr step reported");
    assert_eq!(step.status, OpStatus::Applied);
}

#[test]
fn xattrs_dropped_unless_requested() {
    let td = tempdir().unwrap();
    let dest = td.path().join("plain.txt");
    fs::write(&dest, b"old").unwrap();
    if xattr::set(&dest, "user.atomwrite.test", b"gone").is_err() {
        eprintln!("skipping: user xattrs not supported here");
        return;
    }

    atomic_write(b"new", &dest, &WriteOptions::default()).unwrap();
    assert_eq!(xattr::get(&dest, "user.atomwrite.test").unwrap(), None);
}

#[test]
fn xattrs_survive_on_read_only_destination() {
    use std::os::unix::fs::PermissionsExt;
    let td = tempdir().unwrap();
    let dest = td.path().join("frozen.txt");
    fs::write(&dest, b"old").unwrap();
    if xattr::set(&dest, "user.atomwrite.test", b"kept").is_err() {
        eprintln!("skipping: user xattrs not supported here");
        return;
    }
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o444)).unwrap();

    let opts = WriteOptions {
        preserve_extended_attributes: true,
        ..WriteOptions::default()
    };
    let report = atomic_write(b"new", &dest, &opts).expect("write");
    assert_eq!(fs::read(&dest).unwrap(), b"new");
    assert_eq!(
        xattr::get(&dest, "user.atomwrite.test").unwrap().as_deref(),
        Some(b"kept".as_slice())
    );
    assert_eq!(fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o444);
    let perms: Vec<_> = report
        .metadata
        .iter()
        .filter(|r| r.op == MetadataOp::Permissions)
        .map(|r| r.status.clone())
        .collect();
    assert_eq!(perms, vec![OpStatus::Applied, OpStatus::Applied]);
}

// Access ACL in the kernel's xattr encoding: a u32 version header followed by
// {tag: u16, perm: u16, id: u32} entries, sorted by tag.
#[cfg(target_os = "linux")]
fn acl_with_named_user(uid: u32) -> Vec<u8> {
    const UNDEFINED_ID: u32 = u32::MAX;
    let entries: [(u16, u16, u32); 5] = [
        (0x01, 6, UNDEFINED_ID), // user::rw-
        (0x02, 4, uid),          // user:<uid>:r--
        (0x04, 4, UNDEFINED_ID), // group::r--
        (0x10, 4, UNDEFINED_ID), // mask::r--
        (0x20, 4, UNDEFINED_ID), // other::r--
    ];
    let mut blob = 2u32.to_le_bytes().to_vec();
    for (tag, perm, id) in entries {
        blob.extend_from_slice(&tag.to_le_bytes());
        blob.extend_from_slice(&perm.to_le_bytes());
        blob.extend_from_slice(&id.to_le_bytes());
    }
    blob
}

#[cfg(target_os = "linux")]
#[test]
fn posix_acl_survives_replacement() {
    const ACL_XATTR: &str = "system.posix_acl_access";
    let td = tempdir().unwrap();
    let dest = td.path().join("shared.txt");
    fs::write(&dest, b"old").unwrap();
    if xattr::set(&dest, ACL_XATTR, &acl_with_named_user(12345)).is_err() {
        eprintln!("skipping: POSIX ACLs not supported here");
        return;
    }
    let before = xattr::get(&dest, ACL_XATTR).unwrap().expect("acl set");

    let opts = WriteOptions {
        preserve_acls: true,
        ..WriteOptions::default()
    };
    let report = atomic_write(b"new", &dest, &opts).expect("write");
    assert_eq!(fs::read(&dest).unwrap(), b"new");
    assert_eq!(xattr::get(&dest, ACL_XATTR).unwrap(), Some(before));

    let step = report
        .metadata
        .iter()
        .find(|r| r.op == MetadataOp::Acl)
        .expect("acl step reported");
    assert_eq!(step.status, OpStatus::Applied);
}

#[cfg(target_os = "linux")]
#[test]
fn posix_acl_dropped_unless_requested() {
    const ACL_XATTR: &str = "system.posix_acl_access";
    let td = tempdir().unwrap();
    let dest = td.path().join("private.txt");
    fs::write(&dest, b"old").unwrap();
    if xattr::set(&dest, ACL_XATTR, &acl_with_named_user(12345)).is_err() {
        eprintln!("skipping: POSIX ACLs not supported here");
        return;
    }

    let report = atomic_write(b"new", &dest, &WriteOptions::default()).unwrap();
    assert_eq!(xattr::get(&dest, ACL_XATTR).unwrap(), None);
    assert!(report.metadata.iter().all(|r| r.op != MetadataOp::Acl));
}
