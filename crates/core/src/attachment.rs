#![allow(missing_docs)]

//! Accessory slots and the stat overrides installed accessories contribute.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{CombatError, Result},
    weapon::Weapon,
};

/// A weapon stat an accessory may override.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatField {
    CyclicRate,
    BurstSize,
    BurstCyclicRate,
    JamRate,
    Suppressed,
    /// Free-form stat kept in `Weapon::extra`.
    Extra(String),
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatField::CyclicRate => f.write_str("cyclic_rate"),
            StatField::BurstSize => f.write_str("burst_size"),
            StatField::BurstCyclicRate => f.write_str("burst_cyclic_rate"),
            StatField::JamRate => f.write_str("jam_rate"),
            StatField::Suppressed => f.write_str("suppressed"),
            StatField::Extra(name) => f.write_str(name),
        }
    }
}

impl FromStr for StatField {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let key = raw.trim();
        if key.is_empty() {
            return Err("empty stat name".to_string());
        }
        Ok(match key {
            "cyclic_rate" => StatField::CyclicRate,
            "burst_size" => StatField::BurstSize,
            "burst_cyclic_rate" => StatField::BurstCyclicRate,
            "jam_rate" => StatField::JamRate,
            "suppressed" => StatField::Suppressed,
            other => StatField::Extra(other.to_string()),
        })
    }
}

impl TryFrom<String> for StatField {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatField> for String {
    fn from(field: StatField) -> Self {
        field.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl StatValue {
    fn as_count(&self) -> Option<u32> {
        match self {
            StatValue::Number(value) if value.is_finite() && *value >= 1.0 => {
                Some(value.round() as u32)
            }
            _ => None,
        }
    }

    fn as_rate(&self) -> Option<f64> {
        match self {
            StatValue::Number(value) if (0.0..=1.0).contains(value) => Some(*value),
            _ => None,
        }
    }
}

/// An installable item that may change weapon stats or carry its own weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accessory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub overrides: BTreeMap<StatField, StatValue>,
    /// Underbarrel launcher or shotgun with its own ammunition store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underbarrel: Option<Box<Weapon>>,
}

impl Accessory {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            overrides: BTreeMap::new(),
            underbarrel: None,
        }
    }

    pub fn with_override(mut self, field: StatField, value: StatValue) -> Self {
        self.overrides.insert(field, value);
        self
    }

    pub fn with_underbarrel(mut self, weapon: Weapon) -> Self {
        self.underbarrel = Some(Box::new(weapon));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessorySlot {
    pub name: String,
    /// Tags an accessory needs one of to fit.
    #[serde(default)]
    pub accepts: Vec<String>,
    #[serde(default)]
    pub installed: Option<Accessory>,
}

impl AccessorySlot {
    pub fn new(name: impl Into<String>, accepts: &[&str]) -> Self {
        Self {
            name: name.into(),
            accepts: accepts.iter().map(|tag| tag.to_string()).collect(),
            installed: None,
        }
    }

    pub fn fits(&self, accessory: &Accessory) -> bool {
        self.accepts.is_empty()
            || accessory
                .tags
                .iter()
                .any(|tag| self.accepts.iter().any(|accepted| accepted.eq_ignore_ascii_case(tag)))
    }
}

impl Weapon {
    /// Current value of an overridable stat; `None` when the stat is absent.
    pub fn stat(&self, field: &StatField) -> Option<StatValue> {
        match field {
            StatField::CyclicRate => Some(StatValue::Number(f64::from(self.cyclic_rate))),
            StatField::BurstSize => self.burst_size.map(|v| StatValue::Number(f64::from(v))),
            StatField::BurstCyclicRate => self
                .burst_cyclic_rate
                .map(|v| StatValue::Number(f64::from(v))),
            StatField::JamRate => Some(StatValue::Number(self.jam_rate)),
            StatField::Suppressed => Some(StatValue::Flag(self.suppressed)),
            StatField::Extra(name) => self.extra.get(name).cloned(),
        }
    }

    /// Write or clear a stat. Returns `false` if the value does not fit the field.
    pub fn set_stat(&mut self, field: &StatField, value: Option<StatValue>) -> bool {
        match (field, value) {
            (StatField::CyclicRate, Some(value)) => match value.as_count() {
                Some(rate) => {
                    self.cyclic_rate = rate;
                    true
                }
                None => false,
            },
            (StatField::BurstSize, None) => {
                self.burst_size = None;
                true
            }
            (StatField::BurstSize, Some(value)) => match value.as_count() {
                Some(size) => {
                    self.burst_size = Some(size);
                    true
                }
                None => false,
            },
            (StatField::BurstCyclicRate, None) => {
                self.burst_cyclic_rate = None;
                true
            }
            (StatField::BurstCyclicRate, Some(value)) => match value.as_count() {
                Some(rate) => {
                    self.burst_cyclic_rate = Some(rate);
                    true
                }
                None => false,
            },
            (StatField::JamRate, Some(value)) => match value.as_rate() {
                Some(rate) => {
                    self.jam_rate = rate;
                    true
                }
                None => false,
            },
            (StatField::Suppressed, Some(StatValue::Flag(flag))) => {
                self.suppressed = flag;
                true
            }
            (StatField::Extra(name), Some(value)) => {
                self.extra.insert(name.clone(), value);
                true
            }
            (StatField::Extra(name), None) => {
                self.extra.remove(name);
                true
            }
            _ => false,
        }
    }
}

/// Restore the previous snapshot, then re-apply every installed accessory in slot order.
///
/// The first accessory to touch a field records the value the weapon had
/// before any accessory, so removing accessories later restores the base
/// stats exactly. Calling this repeatedly without changes is a no-op.
pub fn apply_overrides(weapon: &mut Weapon) {
    restore_overrides(weapon);

    let overrides: Vec<(String, StatField, StatValue)> = weapon
        .accessories
        .iter()
        .filter_map(|slot| slot.installed.as_ref())
        .flat_map(|item| {
            item.overrides
                .iter()
                .map(move |(field, value)| (item.name.clone(), field.clone(), value.clone()))
        })
        .collect();

    for (source, field, value) in overrides {
        if !weapon.applied_overrides.contains_key(&field) {
            let original = weapon.stat(&field);
            weapon.applied_overrides.insert(field.clone(), original);
        }
        if weapon.set_stat(&field, Some(value.clone())) {
            debug!(weapon = %weapon.id, %field, ?value, "override applied by {source}");
        } else {
            warn!(weapon = %weapon.id, %field, ?value, "ignoring invalid override from {source}");
        }
    }
}

fn restore_overrides(weapon: &mut Weapon) {
    let snapshot = std::mem::take(&mut weapon.applied_overrides);
    for (field, original) in snapshot {
        if !weapon.set_stat(&field, original) {
            warn!(weapon = %weapon.id, %field, "could not restore overridden stat");
        }
    }
}

/// Put `accessory` into `slot`, returning whatever was there before.
pub fn install_accessory(
    weapon: &mut Weapon,
    slot: &str,
    accessory: Accessory,
) -> Result<Option<Accessory>> {
    let target = weapon
        .accessories
        .iter_mut()
        .find(|candidate| candidate.name == slot)
        .ok_or_else(|| CombatError::UnknownSlot(slot.to_string()))?;
    if !target.fits(&accessory) {
        return Err(CombatError::IncompatibleAccessory {
            slot: slot.to_string(),
            accessory: accessory.name,
        });
    }
    let previous = target.installed.replace(accessory);
    apply_overrides(weapon);
    Ok(previous)
}

pub fn remove_accessory(weapon: &mut Weapon, slot: &str) -> Result<Option<Accessory>> {
    let target = weapon
        .accessories
        .iter_mut()
        .find(|candidate| candidate.name == slot)
        .ok_or_else(|| CombatError::UnknownSlot(slot.to_string()))?;
    let previous = target.installed.take();
    apply_overrides(weapon);
    Ok(previous)
}
