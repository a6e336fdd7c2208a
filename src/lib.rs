//! Core library for `atomwrite`.
//!
//! Crash-safe atomic file writes: after a crash, power loss or kill at any
//! point, the destination holds either its complete old content or the
//! complete new content, never a mix.
//!
//! The write goes to a uniquely named temp file in the destination's
//! directory, is synced, gets the requested metadata, and is renamed over the
//! destination in one step. The directory is synced afterwards so the new name
//! is durable too.
//!
//! ```no_run
//! use atomwrite::{WriteOptions, atomic_write};
//! let report = atomic_write(b"hello\n", "greeting.txt", &WriteOptions::default())?;
//! assert_eq!(report.bytes_written, 6);
//! # Ok::<(), atomwrite::AtomicWriteError>(())
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod shutdown;

pub use config::{
    Config, LogLevel, default_config_path, default_log_path, load_config_from_xml_path,
    path_has_symlink_ancestor,
};
pub use errors::{AtomicWriteError, Disposition, MetadataOp};
#[cfg(feature = "tokio")]
pub use fs_ops::atomic_write_async;
pub use fs_ops::{
    MetadataResult, OpStatus, Strategy, ValidPath, WriteOptions, WriteReport, atomic_write,
    atomic_write_encoded, atomic_write_with, io_error_with_help, io_error_with_help_io,
};
pub use platform::{NativeFs, Primitives};
