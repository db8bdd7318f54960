//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a template on first run (unless HAUL_CONFIG points elsewhere).
//!
//! This module only reads/writes the config file; CLI override precedence
//! lives in the binary.

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::job::CollisionAction;

use super::paths::{default_config_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "haul_config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    default_collision: Option<String>,
    preserve_metadata: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
}

fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();

    if let Some(s) = parsed.default_collision.as_deref() {
        if let Some(action) = CollisionAction::parse(s.trim()) {
            cfg.default_collision = action;
        }
    }
    if let Some(preserve) = parsed.preserve_metadata {
        cfg.preserve_metadata = preserve;
    }
    if let Some(s) = parsed.log_level.as_deref() {
        if let Some(level) = LogLevel::parse(s.trim()) {
            cfg.log_level = level;
        }
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }

    cfg
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    Ok(xml_to_config(parsed))
}

/// Load the effective config file: `HAUL_CONFIG` if set, else the platform
/// default path. `Ok(None)` when no config file exists.
pub fn load_config() -> Result<Option<Config>> {
    if let Some(p) = env::var_os("HAUL_CONFIG") {
        let path = PathBuf::from(p);
        return load_config_from_path(&path).map(Some);
    }

    let Some(path) = default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    debug!(path = %path.display(), "loading config");
    load_config_from_path(&path).map(Some)
}

/// Create a template config file with conservative permissions.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        anyhow::bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    let content = "<!--\n  haul configuration (XML)\n\n  Fields:\n    default_collision   -> ask | skip | overwrite | overwrite-if-older |\n                           overwrite-if-size-differs | resume | rename\n    preserve_metadata   -> copy timestamps (and Unix permission bits) (true/false)\n    log_level           -> quiet | normal | info | debug\n    log_file            -> path to log file (optional)\n\n  CLI flags override XML values.\n-->\n<haul_config>\n  <default_collision>ask</default_collision>\n  <preserve_metadata>false</preserve_metadata>\n  <log_level>normal</log_level>\n</haul_config>\n";

    fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }

    Ok(())
}

/// Create the default config if HAUL_CONFIG is not set and none exists yet;
/// returns the created path so the CLI can inform the user.
pub fn ensure_default_config_exists() -> Option<PathBuf> {
    if env::var_os("HAUL_CONFIG").is_some() {
        return None;
    }

    let cfg_path = default_config_path()?;
    if cfg_path.exists() {
        return None;
    }

    match create_template_config(&cfg_path) {
        Ok(()) => Some(cfg_path),
        Err(e) => {
            eprintln!(
                "Failed to create template config at {}: {}",
                cfg_path.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_all_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.xml");
        fs::write(
            &path,
            "<haul_config>\n  <default_collision>overwrite-if-older</default_collision>\n  <preserve_metadata>true</preserve_metadata>\n  <log_level>debug</log_level>\n  <log_file>/tmp/haul-test.log</log_file>\n</haul_config>\n",
        )
        .unwrap();

        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.default_collision, CollisionAction::OverwriteIfOlder);
        assert!(cfg.preserve_metadata);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/haul-test.log")));
    }

    #[test]
    fn missing_fields_keep_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.xml");
        fs::write(&path, "<haul_config>\n  <log_level>quiet</log_level>\n</haul_config>\n").unwrap();

        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.default_collision, CollisionAction::Ask);
        assert!(!cfg.preserve_metadata);
        assert_eq!(cfg.log_level, LogLevel::Quiet);
    }

    #[test]
    fn template_round_trips_through_the_parser() {
        let dir = tempdir().unwrap();
        // Canonicalize so platform temp symlinks do not trip the safety check.
        let base = dir.path().canonicalize().unwrap();
        let path = base.join("sub").join("config.xml");
        create_template_config(&path).unwrap();
        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.default_collision, CollisionAction::Ask);
        assert_eq!(cfg.log_level, LogLevel::Normal);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.xml");
        fs::write(&path, "<haul_config><bogus>1</bogus></haul_config>").unwrap();
        assert!(load_config_from_path(&path).is_err());
    }
}
