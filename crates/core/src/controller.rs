#![allow(missing_docs)]

//! Single entry point the host drives: one controller owns every combat
//! session, the RNG and the engine configuration.
//!
//! While an underbarrel is active, firing, cycling and reloading go to the
//! underbarrel weapon, which keeps its own session under its own id.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ammo,
    attachment::{self, Accessory},
    config::EngineConfig,
    cue::{Cue, CueKind, CueSchedule},
    error::{CombatError, Result},
    fire::{self, CycleReport, FireReport},
    inventory::{Inventory, InventoryItem},
    reload::{self, ReloadMode, ReloadReport},
    session::{CombatSession, SessionRepository, SessionStore},
    weapon::{FireMode, Weapon},
};

/// What a single reload press led to.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadPress {
    /// First press: the host should offer these for selection. A second
    /// press inside the double-press window reloads automatically instead.
    AwaitSelection(Vec<InventoryItem>),
    Reloaded(ReloadReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderbarrelToggle {
    /// Slot now taking the trigger, `None` when back on the main weapon.
    pub active: Option<String>,
    pub cues: Vec<Cue>,
}

/// Snapshot for the host's status display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponStatus {
    pub weapon_id: String,
    pub name: String,
    pub fire_mode: FireMode,
    /// °F, cooled to the time of the query.
    pub temperature: f64,
    pub cleanliness: f64,
    pub jam_chance: f64,
    pub jammed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chambered: Option<String>,
    pub rounds_in_source: u32,
    pub source_capacity: u32,
    pub rounds_fired: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_underbarrel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underbarrel: Option<Box<WeaponStatus>>,
}

pub struct WeaponController<S: SessionRepository = SessionStore> {
    config: EngineConfig,
    sessions: S,
    rng: ChaCha8Rng,
    reload_presses: HashMap<String, DateTime<Utc>>,
}

impl WeaponController<SessionStore> {
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(config, SessionStore::new())
    }
}

impl<S: SessionRepository> WeaponController<S> {
    pub fn new(config: EngineConfig, sessions: S) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            sessions,
            rng,
            reload_presses: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Fetch the weapon's session, creating a fresh one on first contact.
    pub fn enter_combat(&mut self, weapon: &Weapon, now: DateTime<Utc>) -> CombatSession {
        let session = self.session_for(weapon);
        debug!(weapon = %weapon.id, mode = %session.fire_mode, %now, "entered combat");
        self.sessions.set(session.clone());
        session
    }

    pub fn fire(
        &mut self,
        weapon: &mut Weapon,
        rounds: u32,
        now: DateTime<Utc>,
    ) -> Result<FireReport> {
        let target = self.active_target(weapon)?;
        let mut session = self.session_for(target);
        let report = fire::fire(target, &mut session, rounds, &self.config, now, &mut self.rng)?;
        self.sessions.set(session);
        Ok(report)
    }

    /// Work the action of whatever currently takes the trigger.
    pub fn cycle(&mut self, weapon: &mut Weapon, now: DateTime<Utc>) -> Result<CycleReport> {
        let target = self.active_target(weapon)?;
        let mut session = self.session_for(target);
        session.settle(&self.config.thermal, now);
        let report = fire::cycle(target, &mut session, &self.config);
        self.sessions.set(session);
        Ok(report)
    }

    /// Reload and apply the resulting inventory changes.
    pub fn reload(
        &mut self,
        weapon: &mut Weapon,
        inventory: &mut dyn Inventory,
        mode: &ReloadMode,
    ) -> Result<ReloadReport> {
        self.reload_presses.remove(&weapon.id);
        let target = self.active_target(weapon)?;
        let report = reload::reload(target, &*inventory, mode, &self.config)?;
        inventory.commit(&report.inventory);
        Ok(report)
    }

    pub fn auto_reload(
        &mut self,
        weapon: &mut Weapon,
        inventory: &mut dyn Inventory,
    ) -> Result<ReloadReport> {
        self.reload(weapon, inventory, &ReloadMode::Auto)
    }

    /// Handle one press of the reload control.
    pub fn reload_pressed(
        &mut self,
        weapon: &mut Weapon,
        inventory: &mut dyn Inventory,
        now: DateTime<Utc>,
    ) -> Result<ReloadPress> {
        let window = self.config.timing.double_press();
        let double = self
            .reload_presses
            .get(&weapon.id)
            .and_then(|previous| (now - *previous).to_std().ok())
            .map(|gap| gap <= window)
            .unwrap_or(false);

        if double {
            info!(weapon = %weapon.id, "double press, auto reload");
            return self.auto_reload(weapon, inventory).map(ReloadPress::Reloaded);
        }

        self.reload_presses.insert(weapon.id.clone(), now);
        let target = self.active_target(weapon)?;
        Ok(ReloadPress::AwaitSelection(reload::reload_candidates(
            target, &*inventory,
        )))
    }

    /// Restore full cleanliness. Temperature is not affected.
    pub fn clean(&mut self, weapon: &Weapon, now: DateTime<Utc>) -> CombatSession {
        let mut session = self.session_for(weapon);
        session.settle(&self.config.thermal, now);
        session.clean();
        self.sessions.set(session.clone());
        info!(weapon = %weapon.id, "barrel cleaned");
        session
    }

    pub fn select_fire_mode(&mut self, weapon: &Weapon, mode: FireMode) -> Result<Vec<Cue>> {
        if !weapon.supports(mode) {
            return Err(CombatError::UnsupportedFireMode(mode));
        }
        let mut session = self.session_for(weapon);
        session.fire_mode = mode;
        self.sessions.set(session);
        debug!(weapon = %weapon.id, %mode, "fire mode selected");
        let mut schedule = CueSchedule::new();
        schedule.then(Duration::ZERO, CueKind::Selector, false);
        Ok(schedule.finish())
    }

    /// Step the selector to the next position, Safe first.
    pub fn next_fire_mode(&mut self, weapon: &Weapon) -> Result<FireMode> {
        let mut positions = vec![FireMode::Safe];
        for mode in &weapon.fire_modes {
            if !positions.contains(mode) {
                positions.push(*mode);
            }
        }
        let current = self.session_for(weapon).fire_mode;
        let next = positions
            .iter()
            .position(|mode| *mode == current)
            .map(|index| positions[(index + 1) % positions.len()])
            .unwrap_or(FireMode::Safe);
        self.select_fire_mode(weapon, next)?;
        Ok(next)
    }

    /// Switch the trigger between the main weapon and its underbarrel.
    pub fn toggle_underbarrel(&mut self, weapon: &Weapon) -> Result<UnderbarrelToggle> {
        let mut session = self.session_for(weapon);
        let active = match session.active_underbarrel.take() {
            Some(_) => None,
            None => {
                let slot = weapon.underbarrel_slot().ok_or(CombatError::NoUnderbarrel)?;
                if let Some(launcher) = weapon.underbarrel(slot) {
                    let launcher_session = self.session_for(launcher);
                    self.sessions.set(launcher_session);
                }
                Some(slot.to_string())
            }
        };
        session.active_underbarrel = active.clone();
        self.sessions.set(session);
        info!(weapon = %weapon.id, underbarrel = ?active, "underbarrel toggled");

        let mut schedule = CueSchedule::new();
        schedule.then(Duration::ZERO, CueKind::UnderbarrelToggle, false);
        Ok(UnderbarrelToggle {
            active,
            cues: schedule.finish(),
        })
    }

    pub fn install_accessory(
        &mut self,
        weapon: &mut Weapon,
        slot: &str,
        accessory: Accessory,
    ) -> Result<Option<Accessory>> {
        let previous = attachment::install_accessory(weapon, slot, accessory)?;
        if weapon.underbarrel(slot).is_none() {
            self.deactivate_underbarrel(weapon, slot);
        }
        Ok(previous)
    }

    pub fn remove_accessory(&mut self, weapon: &mut Weapon, slot: &str) -> Result<Option<Accessory>> {
        let removed = attachment::remove_accessory(weapon, slot)?;
        self.deactivate_underbarrel(weapon, slot);
        Ok(removed)
    }

    pub fn status(&self, weapon: &Weapon, now: DateTime<Utc>) -> WeaponStatus {
        let session = self.session_for(weapon);
        let thermal = &self.config.thermal;
        let underbarrel = session
            .active_underbarrel
            .as_deref()
            .and_then(|slot| weapon.underbarrel(slot))
            .map(|launcher| Box::new(self.status(launcher, now)));

        WeaponStatus {
            weapon_id: weapon.id.clone(),
            name: weapon.name.clone(),
            fire_mode: session.fire_mode,
            temperature: session.temperature_at(thermal, now),
            cleanliness: session.cleanliness,
            jam_chance: session.jam_chance(thermal, weapon.jam_rate, now),
            jammed: session.jammed,
            chambered: weapon.chambered.as_ref().map(|round| round.label()),
            rounds_in_source: ammo::source_len(weapon),
            source_capacity: ammo::source_capacity(weapon),
            rounds_fired: session.rounds_fired,
            active_underbarrel: session.active_underbarrel.clone(),
            underbarrel,
        }
    }

    fn session_for(&self, weapon: &Weapon) -> CombatSession {
        self.sessions
            .get(&weapon.id)
            .unwrap_or_else(|| CombatSession::new(weapon, self.config.thermal.ambient_temperature))
    }

    fn active_target<'w>(&self, weapon: &'w mut Weapon) -> Result<&'w mut Weapon> {
        let active = self
            .sessions
            .get(&weapon.id)
            .and_then(|session| session.active_underbarrel);
        match active {
            Some(slot) => weapon.underbarrel_mut(&slot).ok_or(CombatError::NoUnderbarrel),
            None => Ok(weapon),
        }
    }

    fn deactivate_underbarrel(&mut self, weapon: &Weapon, slot: &str) {
        let Some(mut session) = self.sessions.get(&weapon.id) else {
            return;
        };
        if session.active_underbarrel.as_deref() == Some(slot) {
            session.active_underbarrel = None;
            self.sessions.set(session);
            debug!(weapon = %weapon.id, slot, "underbarrel deactivated");
        }
    }
}
