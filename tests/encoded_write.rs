use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use tempfile::tempdir;

use atomwrite::{AtomicWriteError, Disposition, WriteOptions, atomic_write_encoded};

#[derive(Serialize)]
struct State {
    name: String,
    generation: u32,
}

#[test]
fn json_document_is_written_atomically() {
    let td = tempdir().unwrap();
    let dest = td.path().join("state.json");
    let state = State {
        name: "primary".into(),
        generation: 7,
    };

    let report = atomic_write_encoded(&state, &dest, &WriteOptions::default(), serde_json::to_vec)
        .expect("encoded write");
    let back: serde_json::Value = serde_json::from_slice(&fs::read(&dest).unwrap()).unwrap();
    assert_eq!(back["name"], "primary");
    assert_eq!(back["generation"], 7);
    assert_eq!(report.bytes_written, fs::metadata(&dest).unwrap().len());
}

#[test]
fn encoder_failure_leaves_destination_alone() {
    let td = tempdir().unwrap();
    let dest = td.path().join("state.json");
    fs::write(&dest, b"{\"keep\":true}").unwrap();

    // JSON object keys must be strings.
    let mut bad = BTreeMap::new();
    bad.insert((1, 2), "tuple key");

    let err = atomic_write_encoded(&bad, &dest, &WriteOptions::default(), serde_json::to_vec)
        .unwrap_err();
    assert!(matches!(err, AtomicWriteError::Encode { .. }), "{err:?}");
    assert_eq!(err.disposition(), Disposition::Unchanged);
    assert_eq!(fs::read(&dest).unwrap(), b"{\"keep\":true}");
    assert_eq!(fs::read_dir(td.path()).unwrap().count(), 1);
}

#[test]
fn invalid_path_is_reported_before_encoding() {
    let mut called = false;
    let err = atomic_write_encoded(&(), "", &WriteOptions::default(), |_| {
        called = true;
        Ok::<_, serde_json::Error>(Vec::new())
    })
    .unwrap_err();
    assert!(matches!(err, AtomicWriteError::InvalidPath { .. }));
    assert!(!called);
}
