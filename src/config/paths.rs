//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.
//!
//! `ATOMWRITE_CONFIG` overrides the config location. It may name a file or an
//! existing directory (then `config.xml` is appended); relative values are
//! resolved against the current directory. The default log file sits next to
//! an overridden config.

use anyhow::{Context, Result, anyhow};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file or directory.
pub const CONFIG_ENV: &str = "ATOMWRITE_CONFIG";

const APP_DIR: &str = "atomwrite";
const CONFIG_FILE: &str = "config.xml";
const LOG_FILE: &str = "atomwrite.log";

/// Explicit config path from `ATOMWRITE_CONFIG`, if set and non-empty.
pub fn env_config_path() -> Result<Option<PathBuf>> {
    let Some(raw) = env::var_os(CONFIG_ENV) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let mut p = PathBuf::from(raw);
    if p.is_relative() {
        let cwd = env::current_dir().context("resolve current directory for relative ATOMWRITE_CONFIG")?;
        p = cwd.join(p);
    }
    if p.is_dir() {
        p.push(CONFIG_FILE);
    }
    Ok(Some(p))
}

/// Config path in effect: `ATOMWRITE_CONFIG` or the OS config dir.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(p) = env_config_path()? {
        return Ok(p);
    }
    let base = config_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or_else(|| anyhow!("cannot determine a config directory (no HOME)"))?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE))
}

/// OS-appropriate default log file path (data dir, or beside an overridden config).
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(cfg) = env_config_path()? {
        let dir = cfg.parent().map(Path::to_path_buf).unwrap_or_default();
        return Ok(dir.join(LOG_FILE));
    }
    let base = data_dir()
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
        .ok_or_else(|| anyhow!("cannot determine a data directory (no HOME)"))?;
    Ok(base.join(APP_DIR).join(LOG_FILE))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.as_os_str().is_empty() {
            break;
        }
        match fs::symlink_metadata(anc) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        p = anc.parent();
    }
    Ok(false)
}
