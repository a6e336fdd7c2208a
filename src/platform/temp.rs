//! Temporary sibling names for atomic writes.
//! Names are hidden and live next to the destination. A random component from
//! the OS generator makes them unpredictable to other users of the directory;
//! the pid and a process-wide counter keep concurrent writers apart.
use rand::RngCore;
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Every temp file created by this crate ends with this suffix.
pub const TEMP_SUFFIX: &str = ".atomwrite.tmp";

// Keep generated names well below the common 255-byte component limit.
const MAX_STEM_BYTES: usize = 96;

/// Generate a unique hidden sibling temp path for `target`.
/// Pattern: `.<file_name>.<pid>.<16 random hex>.<seq>.atomwrite.tmp`
pub fn temp_sibling_name(target: &Path) -> PathBuf {
    let pid = std::process::id();
    let token = OsRng.next_u64();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    let stem = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let stem = truncate_on_char_boundary(&stem, MAX_STEM_BYTES);

    let name = format!(".{stem}.{pid}.{token:016x}.{seq}{TEMP_SUFFIX}");
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.join(name)
}

/// True if `name` looks like a temp file produced by [`temp_sibling_name`].
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
