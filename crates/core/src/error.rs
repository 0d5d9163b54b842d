#![allow(missing_docs)]

//! Typed outcomes for combat actions that could not proceed.

use thiserror::Error;

use crate::weapon::FireMode;

/// Recoverable reasons a fire, cycle, reload or accessory action was refused.
///
/// Every variant except a mid-sequence jam guarantees that no weapon,
/// session or inventory state was changed. Jams that interrupt a firing
/// sequence are reported through [`crate::fire::FireReport::jammed`] so the
/// rounds fired before the jam stay accounted for.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombatError {
    #[error("no round available to fire")]
    DryFire,

    #[error("safety engaged")]
    SafetyEngaged,

    #[error("weapon is jammed; cycle the action to clear it")]
    Jammed,

    #[error("action must be cycled before firing")]
    ActionNotCycled,

    #[error("fire mode {0} is not supported by this weapon")]
    UnsupportedFireMode(FireMode),

    #[error("no compatible ammunition in inventory")]
    NoCompatibleAmmunition,

    #[error("no compatible magazine in inventory")]
    NoCompatibleMagazine,

    #[error("capacity exceeded: {attempted} rounds offered, {loaded}/{capacity} already loaded")]
    CapacityExceeded {
        capacity: u32,
        loaded: u32,
        attempted: u32,
    },

    #[error("unknown accessory slot '{0}'")]
    UnknownSlot(String),

    #[error("accessory '{accessory}' does not fit slot '{slot}'")]
    IncompatibleAccessory { slot: String, accessory: String },

    #[error("weapon has no underbarrel attachment")]
    NoUnderbarrel,
}

/// Failures while turning a loosely-typed weapon profile into a [`crate::Weapon`].
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to parse weapon profile: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown fire mode '{0}'")]
    UnknownFireMode(String),

    #[error("unable to determine feed system for '{0}'")]
    UnknownFeed(String),

    #[error("weapon '{0}' lists no caliber")]
    MissingCaliber(String),
}

pub type Result<T> = std::result::Result<T, CombatError>;
