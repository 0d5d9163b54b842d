#![allow(missing_docs)]

//! Weapon model and the capability enums resolved from weapon profiles.

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    ammo::{Magazine, Round},
    attachment::{AccessorySlot, StatField, StatValue},
    error::ProfileError,
};

/// Selector positions a weapon may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireMode {
    Safe,
    Semi,
    Auto,
    Burst,
    Bolt,
    Pump,
}

impl FireMode {
    /// Bolt and pump modes fire a single round per trigger pull.
    pub fn is_manual(self) -> bool {
        matches!(self, FireMode::Bolt | FireMode::Pump)
    }

    /// Whether the action feeds the next round into the chamber after a shot.
    pub fn auto_chambers(self) -> bool {
        !self.is_manual() && self != FireMode::Safe
    }
}

impl fmt::Display for FireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FireMode::Safe => "Safe",
            FireMode::Semi => "Semi",
            FireMode::Auto => "Auto",
            FireMode::Burst => "Burst",
            FireMode::Bolt => "Bolt",
            FireMode::Pump => "Pump",
        };
        f.write_str(label)
    }
}

impl FromStr for FireMode {
    type Err = ProfileError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "safe" | "safety" => Ok(FireMode::Safe),
            "semi" | "semiauto" | "single" => Ok(FireMode::Semi),
            "auto" | "fullauto" | "automatic" => Ok(FireMode::Auto),
            "burst" | "3roundburst" | "threeroundburst" => Ok(FireMode::Burst),
            "bolt" | "boltaction" => Ok(FireMode::Bolt),
            "pump" | "pumpaction" => Ok(FireMode::Pump),
            _ => Err(ProfileError::UnknownFireMode(raw.to_string())),
        }
    }
}

/// Operating platform of a weapon, used for chambering and cycling rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    SelfLoading,
    PumpAction,
    BoltAction,
    Revolver,
    Launcher,
}

/// How a weapon is fed, resolved once when the weapon is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedSystem {
    Detachable,
    InternalTube,
    InternalBox,
    Cylinder,
    Belt,
    Launcher,
}

impl FeedSystem {
    /// Feeds that keep their rounds in `Weapon::internal_rounds`.
    pub fn uses_internal_store(self) -> bool {
        matches!(
            self,
            FeedSystem::InternalTube
                | FeedSystem::InternalBox
                | FeedSystem::Cylinder
                | FeedSystem::Launcher
        )
    }

    /// Cylinders and launchers fire straight out of the store.
    pub fn has_chamber(self) -> bool {
        !matches!(self, FeedSystem::Cylinder | FeedSystem::Launcher)
    }

    pub fn ejects_casings(self) -> bool {
        self.has_chamber()
    }
}

/// A firearm together with its current ammunition state and accessories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    pub feed: FeedSystem,
    pub calibers: Vec<String>,
    pub fire_modes: Vec<FireMode>,
    pub cyclic_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_cyclic_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magazine_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magazine_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belt_link: Option<String>,
    /// Magazine system a dual-feed weapon accepts when no belt is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_magazine_system: Option<String>,
    pub capacity: u32,
    pub jam_rate: f64,
    #[serde(default)]
    pub chambered: Option<Round>,
    #[serde(default)]
    pub loaded: Option<Magazine>,
    #[serde(default)]
    pub internal_rounds: VecDeque<Round>,
    #[serde(default)]
    pub accessories: Vec<AccessorySlot>,
    #[serde(default)]
    pub suppressed: bool,
    #[serde(default)]
    pub infinite_ammo: bool,
    #[serde(default)]
    pub extra: BTreeMap<String, StatValue>,
    /// Values the weapon had before accessory overrides were applied.
    #[serde(default)]
    pub applied_overrides: BTreeMap<StatField, Option<StatValue>>,
}

impl Weapon {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        platform: Platform,
        feed: FeedSystem,
        caliber: impl Into<String>,
        capacity: u32,
    ) -> Self {
        let fire_modes = match platform {
            Platform::PumpAction => vec![FireMode::Pump],
            Platform::BoltAction => vec![FireMode::Bolt],
            _ => vec![FireMode::Semi],
        };
        Self {
            id: id.into(),
            name: name.into(),
            platform,
            feed,
            calibers: vec![caliber.into()],
            fire_modes,
            cyclic_rate: 600,
            burst_size: None,
            burst_cyclic_rate: None,
            magazine_type: None,
            magazine_system: None,
            belt_link: None,
            sub_magazine_system: None,
            capacity,
            jam_rate: 0.01,
            chambered: None,
            loaded: None,
            internal_rounds: VecDeque::new(),
            accessories: Vec::new(),
            suppressed: false,
            infinite_ammo: false,
            extra: BTreeMap::new(),
            applied_overrides: BTreeMap::new(),
        }
    }

    pub fn with_fire_modes(mut self, modes: impl IntoIterator<Item = FireMode>) -> Self {
        self.fire_modes = modes.into_iter().collect();
        self
    }

    pub fn with_cyclic_rate(mut self, rate: u32) -> Self {
        self.cyclic_rate = rate;
        self
    }

    pub fn with_burst(mut self, size: u32, cyclic_rate: Option<u32>) -> Self {
        self.burst_size = Some(size);
        self.burst_cyclic_rate = cyclic_rate;
        self
    }

    pub fn with_magazine_system(mut self, system: impl Into<String>) -> Self {
        self.magazine_system = Some(system.into());
        self
    }

    pub fn with_belt_link(mut self, link: impl Into<String>) -> Self {
        self.belt_link = Some(link.into());
        self
    }

    pub fn with_jam_rate(mut self, rate: f64) -> Self {
        self.jam_rate = rate;
        self
    }

    pub fn with_slot(mut self, slot: AccessorySlot) -> Self {
        self.accessories.push(slot);
        self
    }

    /// Safe is always available; every other mode must be listed by the weapon.
    pub fn supports(&self, mode: FireMode) -> bool {
        mode == FireMode::Safe || self.fire_modes.contains(&mode)
    }

    /// Mode a fresh session starts in.
    pub fn default_fire_mode(&self) -> FireMode {
        self.fire_modes
            .iter()
            .copied()
            .find(|mode| *mode != FireMode::Safe)
            .unwrap_or(FireMode::Safe)
    }

    pub fn accepts_caliber(&self, caliber: &str) -> bool {
        self.calibers
            .iter()
            .any(|known| known.eq_ignore_ascii_case(caliber))
    }

    /// Burst length used when the profile leaves it out.
    pub fn effective_burst_size(&self) -> u32 {
        self.burst_size.filter(|size| *size > 0).unwrap_or(3)
    }

    /// Slot name of the first installed accessory that carries a weapon.
    pub fn underbarrel_slot(&self) -> Option<&str> {
        self.accessories
            .iter()
            .find(|slot| {
                slot.installed
                    .as_ref()
                    .map(|item| item.underbarrel.is_some())
                    .unwrap_or(false)
            })
            .map(|slot| slot.name.as_str())
    }

    pub fn underbarrel(&self, slot: &str) -> Option<&Weapon> {
        self.accessories
            .iter()
            .find(|candidate| candidate.name == slot)
            .and_then(|candidate| candidate.installed.as_ref())
            .and_then(|item| item.underbarrel.as_deref())
    }

    pub fn underbarrel_mut(&mut self, slot: &str) -> Option<&mut Weapon> {
        self.accessories
            .iter_mut()
            .find(|candidate| candidate.name == slot)
            .and_then(|candidate| candidate.installed.as_mut())
            .and_then(|item| item.underbarrel.as_deref_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fire_mode_labels() {
        assert_eq!("Semi-Auto".parse::<FireMode>().ok(), Some(FireMode::Semi));
        assert_eq!("Full Auto".parse::<FireMode>().ok(), Some(FireMode::Auto));
        assert_eq!("3-Round Burst".parse::<FireMode>().ok(), Some(FireMode::Burst));
        assert_eq!("pump".parse::<FireMode>().ok(), Some(FireMode::Pump));
        assert!("laser".parse::<FireMode>().is_err());
    }

    #[test]
    fn safe_is_always_supported() {
        let rifle = Weapon::new(
            "r1",
            "Rifle",
            Platform::BoltAction,
            FeedSystem::InternalBox,
            "7.62x51mm",
            5,
        );
        assert!(rifle.supports(FireMode::Safe));
        assert!(rifle.supports(FireMode::Bolt));
        assert!(!rifle.supports(FireMode::Auto));
        assert_eq!(rifle.default_fire_mode(), FireMode::Bolt);
    }

    #[test]
    fn manual_modes_do_not_chamber() {
        assert!(FireMode::Semi.auto_chambers());
        assert!(FireMode::Burst.auto_chambers());
        assert!(!FireMode::Bolt.auto_chambers());
        assert!(!FireMode::Pump.auto_chambers());
        assert!(!FeedSystem::Cylinder.has_chamber());
        assert!(FeedSystem::InternalTube.uses_internal_store());
        assert!(!FeedSystem::Belt.uses_internal_store());
    }
}
