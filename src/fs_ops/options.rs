//! Write options.
//! - `Strategy` decides what happens when the destination already exists.
//! - `WriteOptions` holds the strategy plus the metadata preservation matrix.

use std::fmt;
use std::str::FromStr;

/// Conflict strategy for the final rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Atomically replace whatever is at the destination (last writer wins).
    #[default]
    ReplaceExisting,
    /// Fail with `DestinationExists` if the destination exists at commit time.
    ///
    /// Atomic where the platform has a no-replace rename (Linux `renameat2`,
    /// macOS `renamex_np`, Windows `MoveFileExW`). Elsewhere the destination is
    /// checked right before an ordinary rename, which leaves a small race window
    /// between that check and the rename.
    NoClobber,
}

impl Strategy {
    /// Parse common spellings (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "replace" | "replace_existing" | "overwrite" => Some(Strategy::ReplaceExisting),
            "no_clobber" | "noclobber" | "create_new" => Some(Strategy::NoClobber),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::ReplaceExisting => "replace_existing",
            Strategy::NoClobber => "no_clobber",
        };
        f.write_str(s)
    }
}

impl FromStr for Strategy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid strategy: '{s}'"))
    }
}

/// Options for one atomic write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub strategy: Strategy,
    /// Copy permission bits from the file being replaced (default true).
    pub preserve_permissions: bool,
    /// Copy uid/gid from the file being replaced; usually needs privilege.
    pub preserve_ownership: bool,
    /// Treat a failed ownership change as fatal instead of ignoring it.
    pub strict_ownership: bool,
    /// Copy atime/mtime from the file being replaced.
    pub preserve_timestamps: bool,
    /// Copy extended attributes from the file being replaced.
    pub preserve_extended_attributes: bool,
    /// Copy the access ACL from the file being replaced where supported.
    pub preserve_acls: bool,
    /// Permission bits for the new file when nothing is preserved from an
    /// existing one. `None` keeps the platform default (umask-filtered on Unix).
    pub default_permissions: Option<u32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::ReplaceExisting,
            preserve_permissions: true,
            preserve_ownership: false,
            strict_ownership: false,
            preserve_timestamps: false,
            preserve_extended_attributes: false,
            preserve_acls: false,
            default_permissions: None,
        }
    }
}

impl WriteOptions {
    /// Defaults with the `NoClobber` strategy.
    pub fn no_clobber() -> Self {
        Self {
            strategy: Strategy::NoClobber,
            ..Self::default()
        }
    }

    /// Defaults with every preservation flag turned on (ownership stays lenient).
    pub fn preserve_all() -> Self {
        Self {
            preserve_ownership: true,
            preserve_timestamps: true,
            preserve_extended_attributes: true,
            preserve_acls: true,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_default_permissions(mut self, mode: u32) -> Self {
        self.default_permissions = Some(mode);
        self
    }

    /// Resolve flag interactions before any I/O:
    /// strictness only applies when ownership is preserved, and default
    /// permissions are reduced to permission bits.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        if !out.preserve_ownership {
            out.strict_ownership = false;
        }
        out.default_permissions = out.default_permissions.map(|m| m & 0o7777);
        out
    }
}
