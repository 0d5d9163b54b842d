#![allow(missing_docs)]

//! Rounds, magazines and the weapon's ammunition source.
//!
//! A weapon fires from its chamber first. Once the chamber is empty the next
//! round comes from the internal store (tube, box, cylinder, launcher) or from
//! the loaded magazine, depending on the weapon's feed system.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    error::{CombatError, Result},
    weapon::Weapon,
};

/// A single cartridge. Rounds of the same caliber and variant are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Round {
    pub caliber: String,
    pub variant: String,
    /// Payload category for grenades and other special loads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Round {
    pub fn new(caliber: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            caliber: caliber.into(),
            variant: variant.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// `"5.56x45mm (M855)"`
    pub fn label(&self) -> String {
        format!("{} ({})", self.caliber, self.variant)
    }
}

/// A detachable box magazine or an ammunition belt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Magazine {
    pub id: String,
    pub name: String,
    /// Tag matched against a weapon's magazine system.
    pub system: String,
    /// Present for linked belts; matched against a weapon's belt-link tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub belt_link: Option<String>,
    pub capacity: u32,
    /// Front is the next round to feed.
    #[serde(default)]
    pub rounds: VecDeque<Round>,
}

impl Magazine {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        system: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            system: system.into(),
            belt_link: None,
            capacity,
            rounds: VecDeque::new(),
        }
    }

    pub fn belt(id: impl Into<String>, name: impl Into<String>, link: impl Into<String>, capacity: u32) -> Self {
        let link = link.into();
        Self {
            id: id.into(),
            name: name.into(),
            system: link.clone(),
            belt_link: Some(link),
            capacity,
            rounds: VecDeque::new(),
        }
    }

    /// Convenience for building a magazine topped up with `count` copies of `round`.
    pub fn filled(mut self, round: &Round, count: u32) -> Result<Self> {
        self.load(std::iter::repeat(round.clone()).take(count as usize).collect())?;
        Ok(self)
    }

    pub fn is_belt(&self) -> bool {
        self.belt_link.is_some()
    }

    pub fn len(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.len())
    }

    /// Append rounds behind the existing ones. Rejected whole if they do not fit.
    pub fn load(&mut self, rounds: Vec<Round>) -> Result<()> {
        let attempted = rounds.len() as u32;
        if attempted > self.remaining_capacity() {
            return Err(CombatError::CapacityExceeded {
                capacity: self.capacity,
                loaded: self.len(),
                attempted,
            });
        }
        self.rounds.extend(rounds);
        assert!(self.len() <= self.capacity, "magazine {} overfilled", self.id);
        Ok(())
    }

    pub fn take_round(&mut self) -> Option<Round> {
        self.rounds.pop_front()
    }

    pub fn calibers(&self) -> impl Iterator<Item = &str> {
        self.rounds.iter().map(|round| round.caliber.as_str())
    }
}

/// The round that would fire next, without touching the weapon.
pub fn peek_next_round(weapon: &Weapon) -> Option<&Round> {
    weapon.chambered.as_ref().or_else(|| source_front(weapon))
}

/// Remove and return the round that fires next. `None` means the weapon is dry.
pub fn consume_round(weapon: &mut Weapon) -> Option<Round> {
    if let Some(round) = weapon.chambered.take() {
        return Some(round);
    }
    take_from_source(weapon)
}

/// Feed the next round from the source into an empty chamber.
///
/// Returns `true` when a round ended up chambered. Feeds without a separate
/// chamber never chamber.
pub fn chamber_next(weapon: &mut Weapon) -> bool {
    if !weapon.feed.has_chamber() {
        return false;
    }
    if weapon.chambered.is_some() {
        return true;
    }
    match take_from_source(weapon) {
        Some(round) => {
            weapon.chambered = Some(round);
            true
        }
        None => false,
    }
}

/// Push rounds into the weapon's internal store, all or nothing.
pub fn load_internal(weapon: &mut Weapon, rounds: Vec<Round>) -> Result<u32> {
    let loaded = weapon.internal_rounds.len() as u32;
    let attempted = rounds.len() as u32;
    if attempted > weapon.capacity.saturating_sub(loaded) {
        return Err(CombatError::CapacityExceeded {
            capacity: weapon.capacity,
            loaded,
            attempted,
        });
    }
    weapon.internal_rounds.extend(rounds);
    assert!(
        weapon.internal_rounds.len() as u32 <= weapon.capacity,
        "internal store of {} overfilled",
        weapon.id
    );
    Ok(attempted)
}

/// Rounds left in the feeding store, excluding the chamber.
pub fn source_len(weapon: &Weapon) -> u32 {
    if weapon.feed.uses_internal_store() {
        weapon.internal_rounds.len() as u32
    } else {
        weapon.loaded.as_ref().map(Magazine::len).unwrap_or(0)
    }
}

/// Capacity of the feeding store; zero when no magazine is inserted.
pub fn source_capacity(weapon: &Weapon) -> u32 {
    if weapon.feed.uses_internal_store() {
        weapon.capacity
    } else {
        weapon.loaded.as_ref().map(|mag| mag.capacity).unwrap_or(0)
    }
}

/// Chamber plus source.
pub fn rounds_available(weapon: &Weapon) -> u32 {
    source_len(weapon) + u32::from(weapon.chambered.is_some())
}

/// Nothing chambered and nothing left to feed.
pub fn is_empty(weapon: &Weapon) -> bool {
    rounds_available(weapon) == 0
}

fn source_front(weapon: &Weapon) -> Option<&Round> {
    if weapon.feed.uses_internal_store() {
        weapon.internal_rounds.front()
    } else {
        weapon.loaded.as_ref().and_then(|mag| mag.rounds.front())
    }
}

fn take_from_source(weapon: &mut Weapon) -> Option<Round> {
    if weapon.feed.uses_internal_store() {
        weapon.internal_rounds.pop_front()
    } else {
        weapon.loaded.as_mut().and_then(Magazine::take_round)
    }
}
