#![allow(missing_docs)]

//! Reload handlers, one per magazine family.
//!
//! Every handler reads candidates from the inventory, decides what to use,
//! mutates the weapon synchronously, and returns the inventory changes and
//! the paced cue sequence. When nothing compatible is found the weapon is
//! left exactly as it was.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ammo::{self, Magazine, Round},
    config::{secs, EngineConfig},
    cue::{Cue, CueKind, CueSchedule},
    error::{CombatError, Result},
    inventory::{AmmoQuery, Inventory, InventoryDelta, InventoryItem, ItemKind},
    weapon::{FeedSystem, Platform, Weapon},
};

/// Which handler a weapon reloads with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReloadFamily {
    Launcher,
    InternalTube,
    InternalBox,
    Cylinder,
    Belt,
    Detachable,
}

impl ReloadFamily {
    /// Launcher, then tube, box, cylinder, belt, and finally detachable box.
    pub fn for_weapon(weapon: &Weapon) -> Self {
        if weapon.feed == FeedSystem::Launcher || weapon.platform == Platform::Launcher {
            ReloadFamily::Launcher
        } else if weapon.feed == FeedSystem::InternalTube {
            ReloadFamily::InternalTube
        } else if weapon.feed == FeedSystem::InternalBox {
            ReloadFamily::InternalBox
        } else if weapon.feed == FeedSystem::Cylinder || weapon.platform == Platform::Revolver {
            ReloadFamily::Cylinder
        } else if weapon.feed == FeedSystem::Belt {
            ReloadFamily::Belt
        } else {
            ReloadFamily::Detachable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReloadMode {
    /// Fullest candidate; the old magazine goes back to the inventory.
    #[default]
    Standard,
    Select(String),
    /// Fullest candidate, previous magazine discarded.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadReport {
    pub family: ReloadFamily,
    pub rounds_loaded: u32,
    pub chambered: bool,
    /// Id of the magazine or belt now in the weapon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted: Option<String>,
    /// Rounds taken out with the old magazine or dumped from the cylinder.
    #[serde(default)]
    pub ejected: u32,
    #[serde(default)]
    pub inventory: InventoryDelta,
    pub cues: Vec<Cue>,
}

/// Items the player could pick from for a standard reload.
pub fn reload_candidates(weapon: &Weapon, inventory: &dyn Inventory) -> Vec<InventoryItem> {
    match ReloadFamily::for_weapon(weapon) {
        ReloadFamily::Detachable => magazines(weapon, inventory, &detachable_query(weapon)),
        ReloadFamily::Belt => {
            let mut belts = magazines(weapon, inventory, &belt_query(weapon));
            if let Some(query) = sub_magazine_query(weapon) {
                belts.extend(magazines(weapon, inventory, &query));
            }
            belts
        }
        _ => ammunition(weapon, inventory),
    }
}

/// Reload `weapon` from `inventory` with the handler its feed calls for.
pub fn reload(
    weapon: &mut Weapon,
    inventory: &dyn Inventory,
    mode: &ReloadMode,
    config: &EngineConfig,
) -> Result<ReloadReport> {
    let family = ReloadFamily::for_weapon(weapon);
    debug!(weapon = %weapon.id, ?family, ?mode, "reload requested");
    let report = match family {
        ReloadFamily::Detachable => reload_detachable(weapon, inventory, mode, config),
        ReloadFamily::Belt => reload_belt(weapon, inventory, mode, config),
        ReloadFamily::InternalTube | ReloadFamily::InternalBox => {
            reload_internal(weapon, inventory, mode, config, family)
        }
        ReloadFamily::Cylinder => reload_cylinder(weapon, inventory, mode, config),
        ReloadFamily::Launcher => reload_launcher(weapon, inventory, config),
    }?;
    info!(
        weapon = %weapon.id,
        ?family,
        rounds = report.rounds_loaded,
        chambered = report.chambered,
        "reloaded"
    );
    Ok(report)
}

/// Box magazine swap.
pub fn reload_detachable(
    weapon: &mut Weapon,
    inventory: &dyn Inventory,
    mode: &ReloadMode,
    config: &EngineConfig,
) -> Result<ReloadReport> {
    let candidates = magazines(weapon, inventory, &detachable_query(weapon));
    let (item_id, magazine) =
        pick_magazine(candidates, mode).ok_or(CombatError::NoCompatibleMagazine)?;
    Ok(swap_magazine(
        weapon,
        item_id,
        magazine,
        mode,
        config,
        ReloadFamily::Detachable,
    ))
}

/// Belt swap. Belts win; a dual-feed weapon falls back to its sub-magazine
/// only when no belt with rounds is available.
pub fn reload_belt(
    weapon: &mut Weapon,
    inventory: &dyn Inventory,
    mode: &ReloadMode,
    config: &EngineConfig,
) -> Result<ReloadReport> {
    let belts = magazines(weapon, inventory, &belt_query(weapon));
    let picked = match pick_magazine(belts, mode) {
        Some(found) => Some(found),
        None => sub_magazine_query(weapon)
            .map(|query| magazines(weapon, inventory, &query))
            .and_then(|subs| pick_magazine(subs, mode)),
    };
    let (item_id, magazine) = picked.ok_or(CombatError::NoCompatibleMagazine)?;
    Ok(swap_magazine(
        weapon,
        item_id,
        magazine,
        mode,
        config,
        ReloadFamily::Belt,
    ))
}

/// Tube or fixed box: rounds go in one at a time until full or out of stock.
pub fn reload_internal(
    weapon: &mut Weapon,
    inventory: &dyn Inventory,
    mode: &ReloadMode,
    config: &EngineConfig,
    family: ReloadFamily,
) -> Result<ReloadReport> {
    let space = weapon
        .capacity
        .saturating_sub(weapon.internal_rounds.len() as u32);
    if space == 0 {
        return Err(full_store(weapon));
    }
    let stacks = order_stacks(ammunition(weapon, inventory), mode);
    if stacks.is_empty() {
        return Err(CombatError::NoCompatibleAmmunition);
    }

    let was_empty = ammo::is_empty(weapon);
    let (rounds, inventory_delta) = draw_rounds(weapon, &stacks, space);
    let rounds_loaded = rounds.len() as u32;

    let mut schedule = CueSchedule::new();
    let mut delay = Duration::ZERO;
    for round in rounds {
        ammo::load_internal(weapon, vec![round])?;
        schedule.then(delay, CueKind::RoundInsert, true);
        delay = secs(config.pacing.round_insert);
    }

    let chambered = chamber_if_empty(weapon, was_empty, &mut schedule, delay);
    Ok(ReloadReport {
        family,
        rounds_loaded,
        chambered,
        inserted: None,
        ejected: 0,
        inventory: inventory_delta,
        cues: schedule.finish(),
    })
}

/// Open, dump everything, insert fresh rounds, close.
pub fn reload_cylinder(
    weapon: &mut Weapon,
    inventory: &dyn Inventory,
    mode: &ReloadMode,
    config: &EngineConfig,
) -> Result<ReloadReport> {
    let stacks = order_stacks(ammunition(weapon, inventory), mode);
    if stacks.is_empty() {
        return Err(CombatError::NoCompatibleAmmunition);
    }
    let pacing = &config.pacing;
    let mut schedule = CueSchedule::new();
    schedule.then(Duration::ZERO, CueKind::CylinderOpen, true);

    let ejected: Vec<Round> = weapon.internal_rounds.drain(..).collect();
    let ejected_count = ejected.len() as u32;
    let mut delay = secs(pacing.cylinder_open);
    if !ejected.is_empty() {
        schedule.then(delay, CueKind::CylinderEject, true);
        delay = secs(pacing.cylinder_eject);
    }

    let (rounds, mut inventory_delta) = draw_rounds(weapon, &stacks, weapon.capacity);
    if !weapon.infinite_ammo {
        inventory_delta.return_rounds(ejected);
    }
    let rounds_loaded = rounds.len() as u32;
    for round in rounds {
        ammo::load_internal(weapon, vec![round])?;
        schedule.then(delay, CueKind::RoundInsert, true);
        delay = secs(pacing.round_insert);
    }
    schedule.then(delay, CueKind::CylinderClose, true);

    Ok(ReloadReport {
        family: ReloadFamily::Cylinder,
        rounds_loaded,
        chambered: false,
        inserted: None,
        ejected: ejected_count,
        inventory: inventory_delta,
        cues: schedule.finish(),
    })
}

/// Load a single loose round into an underbarrel or standalone launcher.
///
/// The store takes one round per reload whatever its capacity.
pub fn reload_launcher(
    weapon: &mut Weapon,
    inventory: &dyn Inventory,
    config: &EngineConfig,
) -> Result<ReloadReport> {
    let space = weapon
        .capacity
        .saturating_sub(weapon.internal_rounds.len() as u32);
    if space == 0 {
        return Err(full_store(weapon));
    }
    let stacks = ammunition(weapon, inventory);
    if stacks.is_empty() {
        return Err(CombatError::NoCompatibleAmmunition);
    }

    let pacing = &config.pacing;
    let (rounds, inventory_delta) = draw_rounds(weapon, &stacks, 1);
    let rounds_loaded = rounds.len() as u32;
    ammo::load_internal(weapon, rounds)?;

    let mut schedule = CueSchedule::new();
    schedule
        .then(Duration::ZERO, CueKind::LauncherOpen, true)
        .then(secs(pacing.launcher_open), CueKind::RoundInsert, true)
        .then(secs(pacing.round_insert), CueKind::LauncherClose, true);

    Ok(ReloadReport {
        family: ReloadFamily::Launcher,
        rounds_loaded,
        chambered: false,
        inserted: None,
        ejected: 0,
        inventory: inventory_delta,
        cues: schedule.finish(),
    })
}

/// Magazine systems a detachable weapon takes, most explicit first.
pub fn compatible_magazine_systems(weapon: &Weapon) -> Vec<String> {
    let mut systems = Vec::new();
    let inferred = [
        weapon.magazine_system.as_deref(),
        weapon.magazine_type.as_deref(),
        weapon.loaded.as_ref().map(|mag| mag.system.as_str()),
    ];
    for system in inferred.into_iter().flatten() {
        let system = system.trim();
        let known = systems
            .iter()
            .any(|existing: &String| existing.eq_ignore_ascii_case(system));
        if !system.is_empty() && !known {
            systems.push(system.to_string());
        }
    }
    systems
}

fn detachable_query(weapon: &Weapon) -> AmmoQuery {
    let magazine_systems = compatible_magazine_systems(weapon);
    AmmoQuery {
        calibers: weapon.calibers.clone(),
        match_contents: magazine_systems.is_empty(),
        magazine_systems,
        ..AmmoQuery::default()
    }
}

fn belt_query(weapon: &Weapon) -> AmmoQuery {
    AmmoQuery {
        calibers: weapon.calibers.clone(),
        belt_links: weapon.belt_link.iter().cloned().collect(),
        ..AmmoQuery::default()
    }
}

fn sub_magazine_query(weapon: &Weapon) -> Option<AmmoQuery> {
    weapon.sub_magazine_system.as_ref().map(|system| AmmoQuery {
        calibers: weapon.calibers.clone(),
        magazine_systems: vec![system.clone()],
        ..AmmoQuery::default()
    })
}

/// Compatible magazines that hold at least one round the weapon can chamber.
fn magazines(weapon: &Weapon, inventory: &dyn Inventory, query: &AmmoQuery) -> Vec<InventoryItem> {
    inventory
        .find_compatible(query)
        .into_iter()
        .filter(|item| query.matches(item))
        .filter(|item| {
            item.as_magazine()
                .map(|mag| !mag.is_empty() && mag.calibers().all(|c| weapon.accepts_caliber(c)))
                .unwrap_or(false)
        })
        .collect()
}

fn ammunition(weapon: &Weapon, inventory: &dyn Inventory) -> Vec<InventoryItem> {
    let query = AmmoQuery::loose(&weapon.calibers);
    inventory
        .find_compatible(&query)
        .into_iter()
        .filter(|item| query.matches(item))
        .collect()
}

fn pick_magazine(candidates: Vec<InventoryItem>, mode: &ReloadMode) -> Option<(String, Magazine)> {
    if let ReloadMode::Select(wanted) = mode {
        return candidates
            .into_iter()
            .find(|item| &item.id == wanted)
            .and_then(|item| match item.kind {
                ItemKind::Magazine(mag) => Some((item.id, mag)),
                ItemKind::Ammunition { .. } => None,
            });
    }
    let mut fullest: Option<(String, Magazine)> = None;
    for item in candidates {
        if let ItemKind::Magazine(mag) = item.kind {
            let better = fullest
                .as_ref()
                .map(|(_, best)| mag.len() > best.len())
                .unwrap_or(true);
            if better {
                fullest = Some((item.id, mag));
            }
        }
    }
    fullest
}

/// Auto mode draws from the largest stacks first; otherwise inventory order.
fn order_stacks(mut stacks: Vec<InventoryItem>, mode: &ReloadMode) -> Vec<InventoryItem> {
    match mode {
        ReloadMode::Auto => {
            stacks.sort_by_key(|item| {
                std::cmp::Reverse(item.as_ammunition().map(|(_, qty)| qty).unwrap_or(0))
            });
        }
        ReloadMode::Select(wanted) => {
            if let Some(index) = stacks.iter().position(|item| &item.id == wanted) {
                let chosen = stacks.remove(index);
                stacks.insert(0, chosen);
            }
        }
        ReloadMode::Standard => {}
    }
    stacks
}

/// Take up to `space` rounds from `stacks` in order.
fn draw_rounds(weapon: &Weapon, stacks: &[InventoryItem], space: u32) -> (Vec<Round>, InventoryDelta) {
    let mut rounds = Vec::new();
    let mut delta = InventoryDelta::default();
    for item in stacks {
        let remaining = space - rounds.len() as u32;
        if remaining == 0 {
            break;
        }
        let Some((round, quantity)) = item.as_ammunition() else {
            continue;
        };
        let take = quantity.min(remaining);
        rounds.extend(std::iter::repeat(round.clone()).take(take as usize));
        if !weapon.infinite_ammo {
            delta.remove(item.id.clone(), take);
        }
    }
    (rounds, delta)
}

fn swap_magazine(
    weapon: &mut Weapon,
    item_id: String,
    magazine: Magazine,
    mode: &ReloadMode,
    config: &EngineConfig,
    family: ReloadFamily,
) -> ReloadReport {
    assert!(
        magazine.len() <= magazine.capacity,
        "magazine {} holds more than its capacity",
        magazine.id
    );
    let pacing = &config.pacing;
    let was_empty = ammo::is_empty(weapon);
    let mut inventory = InventoryDelta::default();
    let mut schedule = CueSchedule::new();
    let belt = family == ReloadFamily::Belt;

    if belt {
        schedule.then(Duration::ZERO, CueKind::CoverOpen, true);
    }
    let mut delay = if belt { secs(pacing.cover_open) } else { Duration::ZERO };

    if !weapon.infinite_ammo {
        inventory.remove(item_id, 1);
    }
    let rounds_loaded = magazine.len();
    let inserted = magazine.id.clone();
    let previous = weapon.loaded.replace(magazine);
    let ejected_count = previous.as_ref().map(Magazine::len).unwrap_or(0);

    if let Some(old) = previous {
        schedule.then(delay, if belt { CueKind::BeltOut } else { CueKind::MagazineOut }, true);
        delay = secs(pacing.magazine_out);
        let keep = !weapon.infinite_ammo && *mode != ReloadMode::Auto;
        if keep {
            inventory.added.push(InventoryItem::magazine(old));
        } else {
            debug!(weapon = %weapon.id, magazine = %old.id, "previous magazine discarded");
        }
    }
    schedule.then(delay, if belt { CueKind::BeltIn } else { CueKind::MagazineIn }, true);
    let mut settle = secs(pacing.magazine_in);
    if belt {
        schedule.then(settle, CueKind::CoverClose, true);
        settle = secs(pacing.cover_close);
    }

    let chambered = chamber_if_empty(weapon, was_empty, &mut schedule, settle);
    ReloadReport {
        family,
        rounds_loaded,
        chambered,
        inserted: Some(inserted),
        ejected: ejected_count,
        inventory,
        cues: schedule.finish(),
    }
}

/// Chamber after a reload, but only from empty. Pump actions wait for the
/// shooter to rack the slide. `after` is how long the last reload step takes.
fn chamber_if_empty(
    weapon: &mut Weapon,
    was_empty: bool,
    schedule: &mut CueSchedule,
    after: Duration,
) -> bool {
    if !was_empty || weapon.platform == Platform::PumpAction || !weapon.feed.has_chamber() {
        return false;
    }
    let chambered = ammo::chamber_next(weapon);
    if chambered {
        let action = match weapon.platform {
            Platform::BoltAction => CueKind::BoltCycle,
            _ => CueKind::ChargingHandle,
        };
        schedule.then(after, action, true);
    }
    chambered
}

fn full_store(weapon: &Weapon) -> CombatError {
    CombatError::CapacityExceeded {
        capacity: weapon.capacity,
        loaded: weapon.internal_rounds.len() as u32,
        attempted: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::MemoryInventory;

    fn nato() -> Round {
        Round::new("5.56x45mm", "M855")
    }

    fn stanag(id: &str, rounds: u32) -> InventoryItem {
        InventoryItem::magazine(
            Magazine::new(id, "STANAG 30", "STANAG", 30)
                .filled(&nato(), rounds)
                .expect("fits"),
        )
    }

    fn carbine() -> Weapon {
        Weapon::new("m4", "Carbine", Platform::SelfLoading, FeedSystem::Detachable, "5.56x45mm", 30)
            .with_magazine_system("STANAG")
    }

    #[test]
    fn family_follows_the_feed() {
        let launcher = Weapon::new("gl", "GL", Platform::Launcher, FeedSystem::Launcher, "40mm", 1);
        let revolver = Weapon::new("r", "R", Platform::Revolver, FeedSystem::Cylinder, ".38", 6);
        let mg = Weapon::new("mg", "MG", Platform::SelfLoading, FeedSystem::Belt, "7.62", 100);
        assert_eq!(ReloadFamily::for_weapon(&launcher), ReloadFamily::Launcher);
        assert_eq!(ReloadFamily::for_weapon(&revolver), ReloadFamily::Cylinder);
        assert_eq!(ReloadFamily::for_weapon(&mg), ReloadFamily::Belt);
        assert_eq!(ReloadFamily::for_weapon(&carbine()), ReloadFamily::Detachable);
    }

    #[test]
    fn empty_weapon_takes_fullest_magazine_and_chambers() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![stanag("a", 12), stanag("b", 30), stanag("c", 0)]);
        let mut weapon = carbine();

        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.inserted.as_deref(), Some("b"));
        assert_eq!(report.rounds_loaded, 30);
        assert!(report.chambered);
        assert!(weapon.chambered.is_some());
        assert_eq!(ammo::source_len(&weapon), 29);
        assert_eq!(report.inventory.removed.len(), 1);
        assert!(report.inventory.added.is_empty());
        Ok(())
    }

    #[test]
    fn swap_returns_the_old_magazine_once() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![stanag("fresh", 30)]);
        let mut weapon = carbine();
        weapon.loaded = Some(Magazine::new("old", "STANAG 30", "STANAG", 30).filled(&nato(), 4)?);
        weapon.chambered = Some(nato());

        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        let returned: Vec<_> = report.inventory.added.iter().filter(|item| item.id == "old").collect();
        assert_eq!(returned.len(), 1);
        assert!(!report.chambered);
        assert_eq!(report.ejected, 4);
        let names: Vec<_> = report.cues.iter().map(Cue::name).collect();
        assert_eq!(names, vec!["magazine_out", "magazine_in"]);
        Ok(())
    }

    #[test]
    fn auto_reload_discards_the_old_magazine() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![stanag("a", 10), stanag("b", 20)]);
        let mut weapon = carbine();
        weapon.loaded = Some(Magazine::new("old", "STANAG 30", "STANAG", 30).filled(&nato(), 4)?);

        let report = reload(&mut weapon, &inventory, &ReloadMode::Auto, &config)?;
        assert_eq!(report.inserted.as_deref(), Some("b"));
        assert!(report.inventory.added.is_empty());
        Ok(())
    }

    #[test]
    fn explicit_selection_wins_over_fullest() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![stanag("a", 10), stanag("b", 20)]);
        let mut weapon = carbine();
        let report = reload(&mut weapon, &inventory, &ReloadMode::Select("a".into()), &config)?;
        assert_eq!(report.inserted.as_deref(), Some("a"));
        Ok(())
    }

    #[test]
    fn infinite_ammo_takes_and_returns_nothing() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![stanag("a", 30)]);
        let mut weapon = carbine();
        weapon.infinite_ammo = true;
        weapon.loaded = Some(Magazine::new("old", "STANAG 30", "STANAG", 30));

        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert!(report.inventory.is_empty());
        Ok(())
    }

    #[test]
    fn missing_magazines_leave_the_weapon_alone() {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![InventoryItem::magazine(
            Magazine::new("ak", "AK 30", "AK", 30)
                .filled(&Round::new("7.62x39mm", "M43"), 30)
                .expect("fits"),
        )]);
        let mut weapon = carbine();
        let before = weapon.clone();
        let err = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config).unwrap_err();
        assert_eq!(err, CombatError::NoCompatibleMagazine);
        assert_eq!(weapon, before);
    }

    #[test]
    fn system_is_inferred_from_contents_when_untagged() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![stanag("a", 5)]);
        let mut weapon = carbine();
        weapon.magazine_system = None;
        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.rounds_loaded, 5);
        Ok(())
    }

    #[test]
    fn tube_fills_one_round_at_a_time_across_stacks() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![
            InventoryItem::ammunition("buck", Round::new("12ga", "00 Buck"), 3),
            InventoryItem::ammunition("slug", Round::new("12ga", "Slug"), 10),
        ]);
        let mut weapon = Weapon::new(
            "sg",
            "Shotgun",
            Platform::PumpAction,
            FeedSystem::InternalTube,
            "12ga",
            7,
        );
        ammo::load_internal(&mut weapon, vec![Round::new("12ga", "00 Buck")])?;

        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.family, ReloadFamily::InternalTube);
        assert_eq!(report.rounds_loaded, 6);
        assert_eq!(weapon.internal_rounds.len(), 7);
        assert!(!report.chambered);
        assert_eq!(
            report.cues.iter().filter(|cue| cue.kind == CueKind::RoundInsert).count(),
            6
        );
        assert_eq!(report.inventory.removed.len(), 2);
        assert_eq!(report.inventory.removed[1].quantity, 3);

        let err = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config).unwrap_err();
        assert!(matches!(err, CombatError::CapacityExceeded { .. }));
        Ok(())
    }

    #[test]
    fn internal_box_on_self_loader_chambers_from_empty() -> Result<()> {
        let config = EngineConfig::default();
        let inventory =
            MemoryInventory::new(vec![InventoryItem::ammunition("ball", Round::new("7.62x54R", "LPS"), 20)]);
        let mut weapon = Weapon::new(
            "svt",
            "Rifle",
            Platform::SelfLoading,
            FeedSystem::InternalBox,
            "7.62x54R",
            10,
        );
        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.family, ReloadFamily::InternalBox);
        assert!(report.chambered);
        assert_eq!(weapon.internal_rounds.len(), 9);
        Ok(())
    }

    #[test]
    fn cylinder_replaces_contents_and_returns_live_rounds() -> Result<()> {
        let config = EngineConfig::default();
        let inventory =
            MemoryInventory::new(vec![InventoryItem::ammunition("jhp", Round::new(".357 Magnum", "JHP"), 10)]);
        let mut weapon = Weapon::new(
            "rev",
            "Revolver",
            Platform::Revolver,
            FeedSystem::Cylinder,
            ".357 Magnum",
            6,
        );
        ammo::load_internal(&mut weapon, vec![Round::new(".357 Magnum", "FMJ"); 2])?;

        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.rounds_loaded, 6);
        assert_eq!(report.ejected, 2);
        assert!(weapon.internal_rounds.iter().all(|round| round.variant == "JHP"));
        assert_eq!(report.inventory.added.len(), 1);
        let names: Vec<_> = report.cues.iter().map(Cue::name).collect();
        assert_eq!(names.first().map(String::as_str), Some("cylinder_open"));
        assert_eq!(names.get(1).map(String::as_str), Some("cylinder_eject"));
        assert_eq!(names.last().map(String::as_str), Some("cylinder_close"));
        Ok(())
    }

    #[test]
    fn dual_feed_prefers_belts_then_falls_back() -> Result<()> {
        let config = EngineConfig::default();
        let mut weapon = Weapon::new(
            "saw",
            "LMG",
            Platform::SelfLoading,
            FeedSystem::Belt,
            "5.56x45mm",
            200,
        )
        .with_belt_link("M27");
        weapon.sub_magazine_system = Some("STANAG".into());

        let belt = InventoryItem::magazine(Magazine::belt("belt", "M27 belt", "M27", 200).filled(&nato(), 200)?);
        let inventory = MemoryInventory::new(vec![stanag("mag", 30), belt]);
        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.inserted.as_deref(), Some("belt"));
        assert_eq!(report.cues.first().map(Cue::name).as_deref(), Some("cover_open"));

        weapon.loaded = None;
        weapon.chambered = None;
        let inventory = MemoryInventory::new(vec![stanag("mag", 30)]);
        let report = reload(&mut weapon, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.inserted.as_deref(), Some("mag"));
        Ok(())
    }

    #[test]
    fn launcher_takes_a_loose_round() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![InventoryItem::ammunition(
            "he",
            Round::new("40x46mm", "M433").with_payload("he"),
            4,
        )]);
        let mut launcher = Weapon::new("gl", "M203", Platform::Launcher, FeedSystem::Launcher, "40x46mm", 1);

        let report = reload(&mut launcher, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(report.rounds_loaded, 1);
        assert_eq!(launcher.internal_rounds.len(), 1);
        assert_eq!(report.inventory.removed[0].quantity, 1);

        let err = reload(&mut launcher, &inventory, &ReloadMode::Standard, &config).unwrap_err();
        assert!(matches!(err, CombatError::CapacityExceeded { .. }));
        Ok(())
    }

    #[test]
    fn launcher_loads_one_round_per_reload() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![InventoryItem::ammunition(
            "he",
            Round::new("40x46mm", "M433").with_payload("he"),
            5,
        )]);
        let mut launcher = Weapon::new("gl", "Revolving GL", Platform::Launcher, FeedSystem::Launcher, "40x46mm", 3);

        let report = reload(&mut launcher, &inventory, &ReloadMode::Auto, &config)?;
        assert_eq!(report.rounds_loaded, 1);
        assert_eq!(launcher.internal_rounds.len(), 1);
        assert_eq!(report.inventory.removed[0].quantity, 1);

        let again = reload(&mut launcher, &inventory, &ReloadMode::Standard, &config)?;
        assert_eq!(again.rounds_loaded, 1);
        assert_eq!(launcher.internal_rounds.len(), 2);
        Ok(())
    }

    #[test]
    fn bolt_action_magazine_chambers_from_empty_but_pump_does_not() -> Result<()> {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::new(vec![InventoryItem::magazine(
            Magazine::new("aics", "AICS 10", "AICS", 10)
                .filled(&Round::new("7.62x51mm", "M118LR"), 10)?,
        )]);
        let mut rifle = Weapon::new(
            "awm",
            "Rifle",
            Platform::BoltAction,
            FeedSystem::Detachable,
            "7.62x51mm",
            10,
        )
        .with_magazine_system("AICS");

        let report = reload(&mut rifle, &inventory, &ReloadMode::Standard, &config)?;
        assert!(report.chambered);
        assert!(rifle.chambered.is_some());
        assert_eq!(ammo::source_len(&rifle), 9);
        assert_eq!(report.cues.last().map(Cue::name).as_deref(), Some("bolt_cycle"));

        let shells = MemoryInventory::new(vec![InventoryItem::ammunition("buck", Round::new("12ga", "00 Buck"), 8)]);
        let mut shotgun = Weapon::new(
            "sg",
            "Shotgun",
            Platform::PumpAction,
            FeedSystem::InternalTube,
            "12ga",
            6,
        );
        let report = reload(&mut shotgun, &shells, &ReloadMode::Standard, &config)?;
        assert!(!report.chambered);
        assert!(shotgun.chambered.is_none());
        Ok(())
    }

    #[test]
    fn no_loose_ammunition_is_reported() {
        let config = EngineConfig::default();
        let inventory = MemoryInventory::default();
        let mut launcher = Weapon::new("gl", "M203", Platform::Launcher, FeedSystem::Launcher, "40x46mm", 1);
        let err = reload(&mut launcher, &inventory, &ReloadMode::Standard, &config).unwrap_err();
        assert_eq!(err, CombatError::NoCompatibleAmmunition);
    }
}
