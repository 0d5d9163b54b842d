#![allow(missing_docs)]

//! Per-weapon combat session state and its persistence seam.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    config::ThermalConfig,
    thermal::{self, ShotWear},
    weapon::{FireMode, Weapon},
};

/// Thermal, reliability and selector state of one weapon instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSession {
    pub weapon_id: String,
    /// °F as of `temperature_recorded`.
    pub temperature: f64,
    /// 0–100
    pub cleanliness: f64,
    pub ambient_temperature: f64,
    /// Time of the most recent shot.
    #[serde(default)]
    pub last_fired: Option<DateTime<Utc>>,
    /// When `temperature` was last written. Cooling runs from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_recorded: Option<DateTime<Utc>>,
    pub fire_mode: FireMode,
    /// Accessory slot whose underbarrel weapon currently takes the trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_underbarrel: Option<String>,
    #[serde(default)]
    pub jammed: bool,
    #[serde(default)]
    pub rounds_fired: u64,
}

impl CombatSession {
    pub fn new(weapon: &Weapon, ambient_temperature: f64) -> Self {
        Self {
            weapon_id: weapon.id.clone(),
            temperature: ambient_temperature,
            cleanliness: 100.0,
            ambient_temperature,
            last_fired: None,
            temperature_recorded: None,
            fire_mode: weapon.default_fire_mode(),
            active_underbarrel: None,
            jammed: false,
            rounds_fired: 0,
        }
    }

    /// Barrel temperature at `now`, decayed from the last recorded reading.
    pub fn temperature_at(&self, config: &ThermalConfig, now: DateTime<Utc>) -> f64 {
        match self.temperature_recorded.or(self.last_fired) {
            Some(last) => {
                let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
                thermal::cooled_temperature(
                    config,
                    self.temperature,
                    self.ambient_temperature,
                    elapsed,
                )
            }
            None => self.temperature,
        }
    }

    /// Fold the cooling up to `now` into the stored temperature. The time of
    /// the last shot is left alone.
    pub fn settle(&mut self, config: &ThermalConfig, now: DateTime<Utc>) {
        if self.temperature_recorded.or(self.last_fired).is_some() {
            self.temperature = self.temperature_at(config, now);
            self.temperature_recorded = Some(now);
        }
    }

    /// Stamp a trigger pull that fired at `now`.
    pub fn mark_fired(&mut self, now: DateTime<Utc>) {
        self.last_fired = Some(now);
        self.temperature_recorded = Some(now);
    }

    pub fn apply_shot(&mut self, wear: ShotWear) {
        self.temperature += wear.heat;
        self.cleanliness = (self.cleanliness - wear.fouling).max(0.0);
        self.rounds_fired += 1;
    }

    pub fn clean(&mut self) {
        self.cleanliness = 100.0;
    }

    pub fn jam_chance(&self, config: &ThermalConfig, base_rate: f64, now: DateTime<Utc>) -> f64 {
        thermal::jam_chance(
            config,
            base_rate,
            self.temperature_at(config, now),
            self.cleanliness,
        )
    }
}

/// Where sessions live between actions. The host decides how they are saved.
pub trait SessionRepository {
    fn get(&self, weapon_id: &str) -> Option<CombatSession>;
    fn set(&mut self, session: CombatSession);
    fn snapshot(&self) -> BTreeMap<String, CombatSession>;
}

/// Thread-safe in-memory session map that can be shared with a save task.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<BTreeMap<String, CombatSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(sessions: BTreeMap<String, CombatSession>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(sessions)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl SessionRepository for SessionStore {
    fn get(&self, weapon_id: &str) -> Option<CombatSession> {
        self.inner.read().get(weapon_id).cloned()
    }

    fn set(&mut self, session: CombatSession) {
        self.inner
            .write()
            .insert(session.weapon_id.clone(), session);
    }

    fn snapshot(&self) -> BTreeMap<String, CombatSession> {
        self.inner.read().clone()
    }
}
