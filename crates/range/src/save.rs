//! Range session archives on disk.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use armory_core::{CombatSession, MemoryInventory, Weapon};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Root directory under `~/.config` used for range saves.
pub const DEFAULT_SAVE_DIR: &str = "armory/saves";

/// Everything needed to pick a range session back up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeSave {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub current_weapon: String,
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub inventory: MemoryInventory,
    #[serde(default)]
    pub sessions: BTreeMap<String, CombatSession>,
}

/// A save file found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveEntry {
    pub path: PathBuf,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

impl SaveEntry {
    fn describe(path: PathBuf, save: &RangeSave) -> Self {
        Self {
            path,
            name: save.name.clone(),
            updated_at: save.saved_at,
        }
    }
}

pub struct SaveManager {
    root: PathBuf,
}

impl SaveManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_SAVE_DIR)
    }

    /// Saves on disk, newest first. Unreadable files are skipped.
    pub fn entries(&self) -> Result<Vec<SaveEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let listing = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read {}", self.root.display()))?;
        for item in listing {
            let path = item?.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_save(&path) {
                Ok(save) => entries.push(SaveEntry::describe(path, &save)),
                Err(err) => warn!("skipping unreadable save {}: {err:#}", path.display()),
            }
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    /// Write `save` to a new timestamped file.
    pub fn create_save(&self, save: &RangeSave) -> Result<SaveEntry> {
        let file_name = format!(
            "{}_{}.json",
            sanitize_component(&save.name),
            save.saved_at.format("%Y%m%d%H%M%S%3f")
        );
        let path = self.root.join(file_name);
        write_save(&path, save)?;
        debug!("created save {}", path.display());
        Ok(SaveEntry::describe(path, save))
    }

    /// Overwrite an existing save file in place.
    pub fn update_save(&self, entry: &SaveEntry, save: &RangeSave) -> Result<SaveEntry> {
        write_save(&entry.path, save)?;
        Ok(SaveEntry::describe(entry.path.clone(), save))
    }

    pub fn load(&self, entry: &SaveEntry) -> Result<RangeSave> {
        read_save(&entry.path)
    }

    pub fn latest(&self) -> Result<Option<SaveEntry>> {
        Ok(self.entries()?.into_iter().next())
    }
}

fn write_save(path: &Path, save: &RangeSave) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialised = serde_json::to_vec_pretty(save)?;
    fs::write(path, serialised).with_context(|| format!("failed to write {}", path.display()))
}

fn read_save(path: &Path) -> Result<RangeSave> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn sanitize_component(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|ch| if ch.is_whitespace() { '-' } else { ch })
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "range".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armory_core::{FeedSystem, Platform};
    use tempfile::tempdir;

    fn sample(name: &str) -> RangeSave {
        let weapon = Weapon::new(
            "m4",
            "Carbine",
            Platform::SelfLoading,
            FeedSystem::Detachable,
            "5.56x45mm",
            30,
        );
        let mut sessions = BTreeMap::new();
        let mut session = CombatSession::new(&weapon, 70.0);
        session.temperature = 240.0;
        sessions.insert(weapon.id.clone(), session);
        RangeSave {
            name: name.to_string(),
            saved_at: Utc::now(),
            current_weapon: weapon.id.clone(),
            weapons: vec![weapon],
            inventory: MemoryInventory::default(),
            sessions,
        }
    }

    #[test]
    fn saves_round_trip_through_disk() -> Result<()> {
        let dir = tempdir()?;
        let manager = SaveManager::new(dir.path().join("saves"));
        assert!(manager.entries()?.is_empty());

        let entry = manager.create_save(&sample("Morning Drill"))?;
        assert!(entry.path.exists());
        assert!(entry
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("Morning-Drill_")));

        let loaded = manager.load(&entry)?;
        assert_eq!(loaded.weapons.len(), 1);
        assert_eq!(loaded.sessions["m4"].temperature, 240.0);

        let mut changed = loaded;
        changed.saved_at = Utc::now() + chrono::Duration::seconds(5);
        changed.sessions.clear();
        let updated = manager.update_save(&entry, &changed)?;
        assert_eq!(updated.path, entry.path);
        assert!(manager.load(&updated)?.sessions.is_empty());

        let latest = manager.latest()?.expect("a save exists");
        assert_eq!(latest.updated_at, changed.saved_at);
        Ok(())
    }

    #[test]
    fn broken_files_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("junk.json"), "{ not json")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;
        let manager = SaveManager::new(dir.path());
        manager.create_save(&sample("ok"))?;
        assert_eq!(manager.entries()?.len(), 1);
        Ok(())
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("Range Day #2!"), "Range-Day-2");
        assert_eq!(sanitize_component("???"), "range");
    }
}
