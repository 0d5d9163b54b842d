//! Property checks over the firing, thermal, reload and override models.

use armory_core::{
    ammo,
    attachment::{apply_overrides, install_accessory},
    config::ThermalConfig,
    fire, reload, thermal, Accessory, AccessorySlot, CombatSession, EngineConfig, FeedSystem,
    FireMode, InventoryItem, Magazine, MemoryInventory, Platform, ReloadMode, Round, StatField,
    StatValue, Weapon,
};
use chrono::Utc;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn round() -> Round {
    Round::new("5.56x45mm", "M855")
}

fn mode_strategy() -> impl Strategy<Value = FireMode> {
    prop_oneof![
        Just(FireMode::Semi),
        Just(FireMode::Auto),
        Just(FireMode::Burst),
    ]
}

proptest! {
    #[test]
    fn never_fires_more_than_requested(
        mode in mode_strategy(),
        requested in 0u32..40,
        loaded in 0u32..=30,
        chambered in any::<bool>(),
        jam_rate in 0.0f64..0.2,
        seed in any::<u64>(),
    ) {
        let config = EngineConfig::default();
        let mut weapon = Weapon::new("ar", "Rifle", Platform::SelfLoading, FeedSystem::Detachable, "5.56x45mm", 30)
            .with_fire_modes([FireMode::Semi, FireMode::Auto, FireMode::Burst])
            .with_jam_rate(jam_rate);
        weapon.loaded = Some(Magazine::new("m", "STANAG", "STANAG", 30).filled(&round(), loaded).unwrap());
        if chambered {
            weapon.chambered = Some(round());
        }
        let mut session = CombatSession::new(&weapon, 70.0);
        session.fire_mode = mode;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let before = ammo::rounds_available(&weapon);

        match fire::fire(&mut weapon, &mut session, requested, &config, Utc::now(), &mut rng) {
            Ok(report) => {
                prop_assert!(report.rounds_fired <= report.actual_rounds);
                prop_assert_eq!(before - ammo::rounds_available(&weapon), report.rounds_fired);
            }
            Err(_) => prop_assert_eq!(before, 0),
        }
    }

    #[test]
    fn bolt_actions_fire_at_most_once(requested in 0u32..20, stored in 0u32..=5, seed in any::<u64>()) {
        let config = EngineConfig::default();
        let mut weapon = Weapon::new("k98", "Rifle", Platform::BoltAction, FeedSystem::InternalBox, "7.92x57mm", 5);
        ammo::load_internal(&mut weapon, vec![Round::new("7.92x57mm", "sS"); stored as usize]).unwrap();
        weapon.chambered = Some(Round::new("7.92x57mm", "sS"));
        let mut session = CombatSession::new(&weapon, 70.0);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let report = fire::fire(&mut weapon, &mut session, requested, &config, Utc::now(), &mut rng).unwrap();
        prop_assert!(report.rounds_fired <= 1);
    }

    #[test]
    fn jam_chance_rises_with_heat(low in 0.0f64..1500.0, delta in 0.0f64..500.0, clean in 0.0f64..=100.0, base in 0.0f64..0.5) {
        let config = ThermalConfig::default();
        let cooler = thermal::jam_chance(&config, base, low, clean);
        let hotter = thermal::jam_chance(&config, base, low + delta, clean);
        prop_assert!(hotter >= cooler);
    }

    #[test]
    fn jam_chance_falls_with_cleanliness(temp in 0.0f64..1500.0, low in 0.0f64..=100.0, delta in 0.0f64..=100.0, base in 0.0f64..0.5) {
        let config = ThermalConfig::default();
        let dirtier = thermal::jam_chance(&config, base, temp, low);
        let cleaner = thermal::jam_chance(&config, base, temp, (low + delta).min(100.0));
        prop_assert!(cleaner <= dirtier);
        prop_assert!(dirtier <= 1.0);
    }

    #[test]
    fn reload_never_overfills(capacity in 1u32..10, stored in 0u32..10, stock in 0u32..30) {
        let config = EngineConfig::default();
        let stored = stored.min(capacity);
        let mut weapon = Weapon::new("sg", "Shotgun", Platform::PumpAction, FeedSystem::InternalTube, "12ga", capacity);
        ammo::load_internal(&mut weapon, vec![Round::new("12ga", "Buck"); stored as usize]).unwrap();
        let inventory = MemoryInventory::new(vec![InventoryItem::ammunition("buck", Round::new("12ga", "Buck"), stock)]);

        let _ = reload::reload(&mut weapon, &inventory, &ReloadMode::Standard, &config);
        prop_assert!(weapon.internal_rounds.len() as u32 <= capacity);
    }

    #[test]
    fn cylinder_reload_never_overfills(capacity in 1u32..9, stored in 0u32..9, stock in 0u32..20) {
        let config = EngineConfig::default();
        let stored = stored.min(capacity);
        let mut weapon = Weapon::new("rev", "Revolver", Platform::Revolver, FeedSystem::Cylinder, ".38 Special", capacity);
        ammo::load_internal(&mut weapon, vec![Round::new(".38 Special", "LRN"); stored as usize]).unwrap();
        let inventory = MemoryInventory::new(vec![InventoryItem::ammunition("wc", Round::new(".38 Special", "WC"), stock)]);

        if let Ok(report) = reload::reload(&mut weapon, &inventory, &ReloadMode::Standard, &config) {
            prop_assert!(report.rounds_loaded <= capacity);
            prop_assert_eq!(report.ejected, stored);
        }
        prop_assert!(weapon.internal_rounds.len() as u32 <= capacity);
    }

    #[test]
    fn launcher_reload_adds_one_round_or_nothing(capacity in 1u32..5, stored in 0u32..5, stock in 0u32..8) {
        let config = EngineConfig::default();
        let stored = stored.min(capacity);
        let shell = Round::new("40x46mm", "M433").with_payload("he");
        let mut weapon = Weapon::new("gl", "Launcher", Platform::Launcher, FeedSystem::Launcher, "40x46mm", capacity);
        ammo::load_internal(&mut weapon, vec![shell.clone(); stored as usize]).unwrap();
        let inventory = MemoryInventory::new(vec![InventoryItem::ammunition("he", shell, stock)]);

        match reload::reload(&mut weapon, &inventory, &ReloadMode::Standard, &config) {
            Ok(report) => {
                prop_assert_eq!(report.rounds_loaded, 1);
                prop_assert_eq!(weapon.internal_rounds.len() as u32, stored + 1);
            }
            Err(_) => prop_assert_eq!(weapon.internal_rounds.len() as u32, stored),
        }
        prop_assert!(weapon.internal_rounds.len() as u32 <= capacity);
    }

    #[test]
    fn magazine_swap_never_overfills(
        loaded in 0u32..=30,
        fills in proptest::collection::vec((1u32..=40, 0u32..=40), 0..5),
        auto in any::<bool>(),
    ) {
        let config = EngineConfig::default();
        let mut weapon = Weapon::new("m4", "Carbine", Platform::SelfLoading, FeedSystem::Detachable, "5.56x45mm", 30)
            .with_magazine_system("STANAG");
        weapon.loaded = Some(Magazine::new("old", "STANAG 30", "STANAG", 30).filled(&round(), loaded).unwrap());
        let items = fills
            .iter()
            .enumerate()
            .map(|(i, &(capacity, count))| {
                let magazine = Magazine::new(format!("mag{i}"), "STANAG", "STANAG", capacity)
                    .filled(&round(), count.min(capacity))
                    .unwrap();
                InventoryItem::magazine(magazine)
            })
            .collect();
        let inventory = MemoryInventory::new(items);
        let mode = if auto { ReloadMode::Auto } else { ReloadMode::Standard };

        let _ = reload::reload(&mut weapon, &inventory, &mode, &config);
        let magazine = weapon.loaded.as_ref().unwrap();
        prop_assert!(magazine.rounds.len() as u32 <= magazine.capacity);
        prop_assert!(weapon.chambered.is_none() || loaded == 0);
    }

    #[test]
    fn overrides_are_idempotent(rate in 100u32..1500, jam in 0.0f64..0.1, suppressed in any::<bool>()) {
        let mut weapon = Weapon::new("ar", "Rifle", Platform::SelfLoading, FeedSystem::Detachable, "5.56x45mm", 30)
            .with_slot(AccessorySlot::new("muzzle", &[]))
            .with_slot(AccessorySlot::new("rail", &[]));
        let muzzle = Accessory::new("can", "Can", &[])
            .with_override(StatField::Suppressed, StatValue::Flag(suppressed))
            .with_override(StatField::CyclicRate, StatValue::Number(rate as f64));
        let rail = Accessory::new("grip", "Grip", &[])
            .with_override(StatField::JamRate, StatValue::Number(jam));
        install_accessory(&mut weapon, "muzzle", muzzle).unwrap();
        install_accessory(&mut weapon, "rail", rail).unwrap();

        apply_overrides(&mut weapon);
        let once = weapon.clone();
        apply_overrides(&mut weapon);
        prop_assert_eq!(once, weapon);
    }
}
