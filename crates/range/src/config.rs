//! Host configuration.
//!
//! Layered with the `config` crate: built-in defaults, then
//! `~/.config/armory/config.json`, then `ARMORY_*` environment variables
//! (nested keys use `__`, e.g. `ARMORY_ENGINE__SEED=7`).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use armory_core::EngineConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::save::SaveManager;

pub const CONFIG_DIR: &str = "armory";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Weapons and inventory to start from. A built-in loadout is used when missing.
    pub loadout: PathBuf,
    pub save_dir: PathBuf,
    /// Continue from the newest save instead of the loadout.
    pub resume: bool,
    /// Sleep through cue delays. When off, cues print immediately.
    pub realtime_cues: bool,
    /// Weapon to hold at start; the first in the loadout when unset.
    pub weapon: Option<String>,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            loadout: config_dir().join("loadout.json"),
            save_dir: SaveManager::default_root(),
            resume: false,
            realtime_cues: true,
            weapon: None,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .context("failed to serialise default configuration")?;
        let layered = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix("ARMORY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        layered
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Write the default configuration on first run.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    ensure_default_config_at(&path)?;
    Ok(path)
}

pub fn ensure_default_config_at(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialised = serde_json::to_string_pretty(&AppConfig::default())?;
    fs::write(path, serialised).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(&dir.path().join("absent.json"))?;
        assert!(config.realtime_cues);
        assert_eq!(config.engine, EngineConfig::default());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"{ "realtime_cues": false, "weapon": "m870", "engine": { "seed": 9, "thermal": { "ambient_temperature": 40.0 } } }"#,
        )?;
        let config = AppConfig::load_from(&path)?;
        assert!(!config.realtime_cues);
        assert_eq!(config.weapon.as_deref(), Some("m870"));
        assert_eq!(config.engine.seed, Some(9));
        assert_eq!(config.engine.thermal.ambient_temperature, 40.0);
        assert_eq!(config.engine.thermal.cooling_constant, 0.01);
        Ok(())
    }

    #[test]
    fn default_file_is_written_once() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        ensure_default_config_at(&path)?;
        let first = fs::read_to_string(&path)?;
        fs::write(&path, r#"{ "resume": true }"#)?;
        ensure_default_config_at(&path)?;
        assert_ne!(fs::read_to_string(&path)?, first);
        assert!(AppConfig::load_from(&path)?.resume);
        Ok(())
    }
}
