#![allow(missing_docs)]

//! Weapon profiles as they appear in loadout files.
//!
//! Profiles describe platforms and feeds with free text ("Pump-Action
//! Shotgun", "Internal Tube"). They are classified once here so the engine
//! only ever sees [`Platform`] and [`FeedSystem`].

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    attachment::{self, Accessory, AccessorySlot, StatField, StatValue},
    error::ProfileError,
    weapon::{FeedSystem, FireMode, Platform, Weapon},
};

static LAUNCHER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)launch|\bgrenade\b|\bgl\b").expect("valid launcher regex"));
static PUMP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpump").expect("valid pump regex"));
static BOLT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbolt|\blever|\bbreak[- ]?action").expect("valid bolt regex"));
static REVOLVER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)revolver").expect("valid revolver regex"));

static TUBE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btub(e|ular)\b").expect("valid tube regex"));
static INTERNAL_BOX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\binternal\b|\bfixed\b|\ben[- ]?bloc\b|\bstripper\b").expect("valid box regex")
});
static CYLINDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcylinder\b|revolver").expect("valid cylinder regex"));
static BELT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbelt").expect("valid belt regex"));
static DETACHABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bdetachable\b|\bbox\b|\bmagazine\b|\bdrum\b|\bstanag\b")
        .expect("valid detachable regex")
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub id: String,
    pub name: String,
    /// Free-text weapon type, e.g. "Bolt-Action Rifle".
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    /// Free-text feed description, e.g. "Detachable Box Magazine".
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub caliber: Option<String>,
    #[serde(default)]
    pub calibers: Vec<String>,
    #[serde(default)]
    pub fire_modes: Vec<String>,
    #[serde(default)]
    pub cyclic_rate: Option<u32>,
    #[serde(default)]
    pub burst_size: Option<u32>,
    #[serde(default)]
    pub burst_cyclic_rate: Option<u32>,
    #[serde(default)]
    pub magazine_type: Option<String>,
    #[serde(default)]
    pub magazine_system: Option<String>,
    #[serde(default)]
    pub belt_link: Option<String>,
    #[serde(default)]
    pub sub_magazine_system: Option<String>,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub jam_rate: Option<f64>,
    #[serde(default)]
    pub suppressed: bool,
    #[serde(default)]
    pub infinite_ammo: bool,
    #[serde(default)]
    pub slots: Vec<SlotProfile>,
    #[serde(default)]
    pub extra: BTreeMap<String, StatValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotProfile {
    pub name: String,
    #[serde(default)]
    pub accepts: Vec<String>,
    #[serde(default)]
    pub installed: Option<AccessoryProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessoryProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub overrides: BTreeMap<StatField, StatValue>,
    #[serde(default)]
    pub underbarrel: Option<Box<WeaponProfile>>,
}

impl WeaponProfile {
    /// Resolve the profile into a weapon with overrides from installed accessories applied.
    pub fn build(&self) -> Result<Weapon, ProfileError> {
        let platform = classify_platform(self);
        let feed = classify_feed(self, platform)?;

        let mut calibers: Vec<String> = self.calibers.clone();
        if let Some(caliber) = &self.caliber {
            if !calibers.iter().any(|known| known == caliber) {
                calibers.insert(0, caliber.clone());
            }
        }
        calibers.retain(|caliber| !caliber.trim().is_empty());
        let Some(first) = calibers.first().cloned() else {
            return Err(ProfileError::MissingCaliber(self.id.clone()));
        };

        let mut weapon = Weapon::new(&self.id, &self.name, platform, feed, first, self.capacity);
        weapon.calibers = calibers;
        if !self.fire_modes.is_empty() {
            let modes = self
                .fire_modes
                .iter()
                .map(|raw| raw.parse::<FireMode>())
                .collect::<Result<Vec<_>, _>>()?;
            weapon.fire_modes = modes;
        }
        if let Some(rate) = self.cyclic_rate {
            weapon.cyclic_rate = rate;
        }
        if let Some(rate) = self.jam_rate {
            weapon.jam_rate = rate;
        }
        weapon.burst_size = self.burst_size;
        weapon.burst_cyclic_rate = self.burst_cyclic_rate;
        weapon.magazine_type = self.magazine_type.clone();
        weapon.magazine_system = self.magazine_system.clone();
        weapon.belt_link = self.belt_link.clone();
        weapon.sub_magazine_system = self.sub_magazine_system.clone();
        weapon.suppressed = self.suppressed;
        weapon.infinite_ammo = self.infinite_ammo;
        weapon.extra = self.extra.clone();

        for slot in &self.slots {
            weapon.accessories.push(AccessorySlot {
                name: slot.name.clone(),
                accepts: slot.accepts.clone(),
                installed: slot.installed.as_ref().map(AccessoryProfile::build).transpose()?,
            });
        }
        attachment::apply_overrides(&mut weapon);

        debug!(weapon = %weapon.id, ?platform, ?feed, "profile resolved");
        Ok(weapon)
    }
}

impl AccessoryProfile {
    pub fn build(&self) -> Result<Accessory, ProfileError> {
        let underbarrel = self
            .underbarrel
            .as_ref()
            .map(|profile| profile.build().map(Box::new))
            .transpose()?;
        Ok(Accessory {
            id: self.id.clone(),
            name: self.name.clone(),
            tags: self.tags.clone(),
            overrides: self.overrides.clone(),
            underbarrel,
        })
    }
}

/// Parse and resolve a single weapon profile.
pub fn parse_weapon(json: &str) -> Result<Weapon, ProfileError> {
    let profile: WeaponProfile = serde_json::from_str(json)?;
    profile.build()
}

/// Parse and resolve a JSON array of weapon profiles.
pub fn parse_weapons(json: &str) -> Result<Vec<Weapon>, ProfileError> {
    let profiles: Vec<WeaponProfile> = serde_json::from_str(json)?;
    profiles.iter().map(WeaponProfile::build).collect()
}

fn descriptors(profile: &WeaponProfile) -> String {
    [profile.platform.as_deref(), profile.kind.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn classify_platform(profile: &WeaponProfile) -> Platform {
    let text = descriptors(profile);
    let feed = profile.feed.as_deref().unwrap_or_default();
    if LAUNCHER_PATTERN.is_match(&text) || LAUNCHER_PATTERN.is_match(feed) {
        Platform::Launcher
    } else if REVOLVER_PATTERN.is_match(&text) {
        Platform::Revolver
    } else if PUMP_PATTERN.is_match(&text) {
        Platform::PumpAction
    } else if BOLT_PATTERN.is_match(&text) {
        Platform::BoltAction
    } else {
        Platform::SelfLoading
    }
}

/// Launcher, tube, internal box, cylinder, belt, then detachable box.
pub fn classify_feed(profile: &WeaponProfile, platform: Platform) -> Result<FeedSystem, ProfileError> {
    if platform == Platform::Launcher {
        return Ok(FeedSystem::Launcher);
    }
    if let Some(feed) = profile.feed.as_deref() {
        return if TUBE_PATTERN.is_match(feed) {
            Ok(FeedSystem::InternalTube)
        } else if INTERNAL_BOX_PATTERN.is_match(feed) {
            Ok(FeedSystem::InternalBox)
        } else if CYLINDER_PATTERN.is_match(feed) {
            Ok(FeedSystem::Cylinder)
        } else if BELT_PATTERN.is_match(feed) {
            Ok(FeedSystem::Belt)
        } else if DETACHABLE_PATTERN.is_match(feed) {
            Ok(FeedSystem::Detachable)
        } else {
            Err(ProfileError::UnknownFeed(feed.to_string()))
        };
    }

    if platform == Platform::Revolver {
        Ok(FeedSystem::Cylinder)
    } else if profile.belt_link.is_some() {
        Ok(FeedSystem::Belt)
    } else if profile.magazine_system.is_some() || profile.magazine_type.is_some() {
        Ok(FeedSystem::Detachable)
    } else {
        Err(ProfileError::UnknownFeed(profile.id.clone()))
    }
}
