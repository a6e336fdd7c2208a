//! Atomic write pipeline: modularized.

mod atomic;
mod helpers;
mod inspect;
mod metadata;
#[cfg(feature = "tokio")]
mod offload;
mod options;
mod temp;
mod validate;
mod write;
mod writer;

pub use helpers::{io_error_with_help, io_error_with_help_io, os_hint};
pub use inspect::{Destination, PreservedMetadata, inspect};
pub use metadata::{MetadataResult, OpStatus};
#[cfg(feature = "tokio")]
pub use offload::atomic_write_async;
pub use options::{Strategy, WriteOptions};
pub use temp::MAX_TEMP_ATTEMPTS;
pub use validate::ValidPath;
pub use write::{WriteReport, atomic_write, atomic_write_encoded, atomic_write_with};
