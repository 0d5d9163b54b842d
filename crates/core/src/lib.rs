#![warn(clippy::all, missing_docs)]

//! Combat core for the armory tabletop companion.
//!
//! The crate models a weapon's ammunition, chamber, barrel heat and fouling,
//! runs fire-mode sequences and the reload protocols of each magazine
//! family, and hands timing back to the host as cue schedules. It performs
//! no I/O: inventory and session persistence are traits the host implements.

pub mod ammo;
pub mod attachment;
pub mod config;
pub mod controller;
pub mod cue;
pub mod error;
pub mod fire;
pub mod inventory;
pub mod profile;
pub mod reload;
pub mod session;
pub mod thermal;
pub mod weapon;

pub use ammo::{Magazine, Round};
pub use attachment::{Accessory, AccessorySlot, StatField, StatValue};
pub use config::EngineConfig;
pub use controller::{ReloadPress, UnderbarrelToggle, WeaponController, WeaponStatus};
pub use cue::{Cue, CueKind};
pub use error::{CombatError, ProfileError};
pub use fire::{CycleReport, FireReport};
pub use inventory::{AmmoQuery, Inventory, InventoryDelta, InventoryItem, MemoryInventory};
pub use reload::{ReloadFamily, ReloadMode, ReloadReport};
pub use session::{CombatSession, SessionRepository, SessionStore};
pub use weapon::{FeedSystem, FireMode, Platform, Weapon};
