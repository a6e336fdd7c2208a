//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template on request, written with our own atomic
//!   no-clobber write (mode 0600).
//!
//! Notes:
//! - Unknown XML fields are rejected so typos surface instead of being ignored.
//! - Values are trimmed; empty elements count as unset.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::fs_ops::{Strategy, WriteOptions, atomic_write};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    log_level: Option<String>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    strategy: Option<String>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    preserve_permissions: Option<bool>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    preserve_ownership: Option<bool>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    strict_ownership: Option<bool>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    preserve_timestamps: Option<bool>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    preserve_extended_attributes: Option<bool>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    preserve_acls: Option<bool>,
    /// Octal permission bits for new files, e.g. `0640`
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    default_mode: Option<String>,
}

// Trim surrounding whitespace; empty means unset.
fn de_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn de_bool_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match de_trimmed_opt(deserializer)? {
        None => Ok(None),
        Some(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(serde::de::Error::custom(format!("invalid boolean '{s}'"))),
        },
    }
}

/// Parse an octal mode such as `644`, `0644` or `0o644`.
pub fn parse_mode(s: &str) -> Result<u32> {
    let t = s.trim();
    let digits = t.strip_prefix("0o").unwrap_or(t);
    let mode = u32::from_str_radix(digits, 8).with_context(|| format!("invalid octal mode '{s}'"))?;
    if mode > 0o7777 {
        bail!("mode '{s}' has bits outside 0o7777");
    }
    Ok(mode)
}

// Map XmlConfig -> Config.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = parsed.log_level.as_deref() {
        cfg.log_level = s.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }
    cfg.log_file = parsed.log_file.map(PathBuf::from);

    let o = &mut cfg.options;
    if let Some(s) = parsed.strategy.as_deref() {
        o.strategy = s.parse::<Strategy>().map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = parsed.preserve_permissions {
        o.preserve_permissions = v;
    }
    if let Some(v) = parsed.preserve_ownership {
        o.preserve_ownership = v;
    }
    if let Some(v) = parsed.strict_ownership {
        o.strict_ownership = v;
    }
    if let Some(v) = parsed.preserve_timestamps {
        o.preserve_timestamps = v;
    }
    if let Some(v) = parsed.preserve_extended_attributes {
        o.preserve_extended_attributes = v;
    }
    if let Some(v) = parsed.preserve_acls {
        o.preserve_acls = v;
    }
    if let Some(s) = parsed.default_mode.as_deref() {
        o.default_permissions = Some(parse_mode(s)?);
    }

    Ok(cfg)
}

/// Load a Config from a specific XML file path (quick_xml).
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in config xml '{}'", path.display()))
}

/// Load the config in effect (`ATOMWRITE_CONFIG` or the default location).
/// A missing file yields the built-in defaults.
pub fn load_config() -> Result<Config> {
    let path = default_config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config_from_xml_path(&path)
}

/// Create a template config file and its parent directory.
/// Refuses symlinked ancestors and never overwrites an existing file.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let existed = parent.exists();
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
        // Only a directory we just made is ours to restrict.
        #[cfg(unix)]
        if !existed {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .with_context(|| format!("restrict config directory '{}'", parent.display()))?;
        }
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/atomwrite.log".into());

    let content = format!(
        "<!--\n  atomwrite configuration (XML)\n\n  log_level                     -> quiet | normal | info | debug\n  log_file                      -> path to log file (optional; stderr logging stays on)\n  strategy                      -> replace_existing | no_clobber\n  preserve_permissions          -> copy mode bits from the file being replaced\n  preserve_ownership            -> copy uid/gid (usually needs root)\n  strict_ownership              -> fail the write if ownership can't be copied\n  preserve_timestamps           -> copy atime/mtime\n  preserve_extended_attributes  -> copy xattrs (when built with the xattrs feature)\n  preserve_acls                 -> copy the POSIX access ACL where supported\n  default_mode                  -> octal mode for new files, e.g. 0644 (empty = umask default)\n\n  CLI flags override XML values.\n-->\n<config>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <strategy>replace_existing</strategy>\n  <preserve_permissions>true</preserve_permissions>\n  <preserve_ownership>false</preserve_ownership>\n  <strict_ownership>false</strict_ownership>\n  <preserve_timestamps>false</preserve_timestamps>\n  <preserve_extended_attributes>false</preserve_extended_attributes>\n  <preserve_acls>false</preserve_acls>\n  <default_mode></default_mode>\n</config>\n",
        suggested_log
    );

    let opts = WriteOptions::no_clobber().with_default_permissions(0o600);
    atomic_write(content.as_bytes(), path, &opts)
        .with_context(|| format!("write template config '{}'", path.display()))?;

    info!("Created template config at {}", path.display());
    Ok(())
}

/// Create the template at the config path in effect unless a file is already there.
/// Returns the created path so the CLI can tell the user.
pub fn ensure_default_config_exists() -> Result<Option<PathBuf>> {
    let cfg_path = default_config_path()?;
    if cfg_path.exists() {
        return Ok(None);
    }
    create_template_config(&cfg_path)?;
    Ok(Some(cfg_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mode_parsing() {
        assert_eq!(parse_mode("0644").unwrap(), 0o644);
        assert_eq!(parse_mode(" 0o600 ").unwrap(), 0o600);
        assert_eq!(parse_mode("4755").unwrap(), 0o4755);
        assert!(parse_mode("0999").is_err());
        assert!(parse_mode("77777").is_err());
    }

    #[test]
    fn template_parses_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.xml");
        create_template_config(&path).unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Normal);
        assert_eq!(cfg.options, WriteOptions::default());
        assert!(create_template_config(&path).is_err(), "template must not overwrite");
    }

    #[cfg(unix)]
    #[test]
    fn template_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.xml");
        create_template_config(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn existing_config_dir_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let shared = fs::canonicalize(dir.path()).unwrap().join("shared");
        fs::create_dir(&shared).unwrap();
        fs::set_permissions(&shared, fs::Permissions::from_mode(0o755)).unwrap();

        create_template_config(&shared.join("config.xml")).unwrap();
        let mode = fs::metadata(&shared).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn created_config_dir_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let fresh = fs::canonicalize(dir.path()).unwrap().join("a").join("atomwrite");
        create_template_config(&fresh.join("config.xml")).unwrap();
        let mode = fs::metadata(&fresh).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }
}
