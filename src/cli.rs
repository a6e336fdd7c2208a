//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Flags override values from config.xml; unset flags leave them alone.
//! - --debug is a shorthand for --log-level debug.

use clap::{ArgAction, Parser, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::config::xml::parse_mode;
use crate::fs_ops::Strategy;

/// Atomically write stdin (or --input) to a file.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Crash-safe atomic file writes: the destination ends up fully old or fully new"
)]
pub struct Args {
    /// Destination file.
    #[arg(value_name = "DEST", value_hint = ValueHint::FilePath, required_unless_present_any = ["print_config", "init_config"])]
    pub dest: Option<PathBuf>,

    /// Read the payload from this file instead of stdin.
    #[arg(short = 'i', long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Fail if DEST already exists (atomic where the platform supports it).
    #[arg(short = 'n', long, conflicts_with = "replace")]
    pub no_clobber: bool,

    /// Replace DEST if it exists (default; overrides a config `no_clobber`).
    #[arg(long)]
    pub replace: bool,

    /// Do not copy permission bits from the file being replaced.
    #[arg(long)]
    pub no_preserve_permissions: bool,

    /// Copy uid/gid from the file being replaced.
    #[arg(long)]
    pub preserve_ownership: bool,

    /// Fail the write if ownership cannot be copied (implies --preserve-ownership).
    #[arg(long)]
    pub strict_ownership: bool,

    /// Copy atime/mtime from the file being replaced.
    #[arg(long)]
    pub preserve_timestamps: bool,

    /// Copy extended attributes from the file being replaced.
    #[arg(long)]
    pub preserve_xattrs: bool,

    /// Copy the access ACL from the file being replaced (where supported).
    #[arg(long)]
    pub preserve_acls: bool,

    /// Preserve everything: permissions, ownership, timestamps, xattrs, ACL.
    #[arg(short = 'p', long)]
    pub preserve_all: bool,

    /// Octal mode for a new file, e.g. 0644 (umask default when unset).
    #[arg(short = 'm', long, value_name = "MODE", value_parser = parse_mode_arg)]
    pub mode: Option<u32>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON.
    #[arg(long)]
    pub json: bool,

    /// Print the config file location in effect and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Write a template config file if none exists, then exit.
    #[arg(long)]
    pub init_config: bool,
}

fn parse_mode_arg(s: &str) -> Result<u32, String> {
    parse_mode(s).map_err(|e| e.to_string())
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }

        let o = &mut cfg.options;
        if self.no_clobber {
            o.strategy = Strategy::NoClobber;
        } else if self.replace {
            o.strategy = Strategy::ReplaceExisting;
        }
        if self.preserve_all {
            o.preserve_permissions = true;
            o.preserve_ownership = true;
            o.preserve_timestamps = true;
            o.preserve_extended_attributes = true;
            o.preserve_acls = true;
        }
        if self.no_preserve_permissions {
            o.preserve_permissions = false;
        }
        if self.preserve_ownership {
            o.preserve_ownership = true;
        }
        if self.strict_ownership {
            o.preserve_ownership = true;
            o.strict_ownership = true;
        }
        if self.preserve_timestamps {
            o.preserve_timestamps = true;
        }
        if self.preserve_xattrs {
            o.preserve_extended_attributes = true;
        }
        if self.preserve_acls {
            o.preserve_acls = true;
        }
        if let Some(mode) = self.mode {
            o.default_permissions = Some(mode);
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
