//! Async entry point (feature `tokio`).
//! The blocking pipeline runs on tokio's blocking pool. Dropping the returned
//! future does not cancel it: the job still ends in a commit or a cleanup.

use std::path::PathBuf;
use tracing::warn;

use super::options::WriteOptions;
use super::write::{WriteReport, atomic_write};
use crate::errors::AtomicWriteError;

pub async fn atomic_write_async(
    data: Vec<u8>,
    dest: PathBuf,
    opts: WriteOptions,
) -> Result<WriteReport, AtomicWriteError> {
    let path = dest.clone();
    match tokio::task::spawn_blocking(move || atomic_write(&data, &dest, &opts)).await {
        Ok(res) => res,
        Err(join) => {
            warn!(path = %path.display(), error = %join, "blocking write task did not complete");
            Err(AtomicWriteError::Offload {
                path,
                message: join.to_string(),
            })
        }
    }
}
