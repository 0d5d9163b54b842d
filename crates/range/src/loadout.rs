//! Loadout files: the weapons a range session starts with and the
//! inventory it reloads from.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use armory_core::{inventory::ItemKind, profile::WeaponProfile, InventoryItem, MemoryInventory, Weapon};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Used when no loadout file exists yet.
const SAMPLE_LOADOUT: &str = r#"{
  "weapons": [
    {
      "id": "m4a1",
      "name": "M4A1 Carbine",
      "type": "Assault Rifle",
      "feed": "Detachable Box Magazine",
      "caliber": "5.56x45mm NATO",
      "fire_modes": ["Safe", "Semi", "Full Auto"],
      "cyclic_rate": 800,
      "magazine_system": "STANAG",
      "capacity": 30,
      "jam_rate": 0.004,
      "slots": [
        { "name": "muzzle", "accepts": ["muzzle"] },
        {
          "name": "underbarrel",
          "accepts": ["underbarrel"],
          "installed": {
            "id": "m203",
            "name": "M203",
            "tags": ["underbarrel"],
            "underbarrel": {
              "id": "m203-launcher",
              "name": "M203 Launcher",
              "type": "Grenade Launcher",
              "caliber": "40x46mm",
              "capacity": 1,
              "jam_rate": 0.0
            }
          }
        }
      ]
    },
    {
      "id": "m870",
      "name": "Remington 870",
      "type": "Pump-Action Shotgun",
      "feed": "Internal Tube",
      "caliber": "12 gauge",
      "capacity": 6,
      "jam_rate": 0.003
    },
    {
      "id": "gp100",
      "name": "Ruger GP100",
      "type": "Revolver",
      "caliber": ".357 Magnum",
      "calibers": [".38 Special"],
      "capacity": 6,
      "jam_rate": 0.001
    },
    {
      "id": "m24",
      "name": "M24 SWS",
      "type": "Bolt-Action Rifle",
      "feed": "Internal Box",
      "caliber": "7.62x51mm NATO",
      "capacity": 5,
      "jam_rate": 0.002
    },
    {
      "id": "m249",
      "name": "M249 SAW",
      "type": "Light Machine Gun",
      "feed": "Belt (M27 links)",
      "caliber": "5.56x45mm NATO",
      "fire_modes": ["Full Auto"],
      "cyclic_rate": 750,
      "belt_link": "M27",
      "sub_magazine_system": "STANAG",
      "capacity": 200,
      "jam_rate": 0.008
    }
  ],
  "inventory": [
    { "id": "stanag-1", "kind": { "type": "magazine", "id": "stanag-1", "name": "STANAG 30", "system": "STANAG", "capacity": 30,
      "rounds": [] } },
    { "id": "ammo-556", "kind": { "type": "ammunition", "round": { "caliber": "5.56x45mm NATO", "variant": "M855" }, "quantity": 420 } },
    { "id": "ammo-12ga", "kind": { "type": "ammunition", "round": { "caliber": "12 gauge", "variant": "00 Buck" }, "quantity": 24 } },
    { "id": "ammo-357", "kind": { "type": "ammunition", "round": { "caliber": ".357 Magnum", "variant": "JHP" }, "quantity": 36 } },
    { "id": "ammo-308", "kind": { "type": "ammunition", "round": { "caliber": "7.62x51mm NATO", "variant": "M118LR" }, "quantity": 40 } },
    { "id": "ammo-40mm", "kind": { "type": "ammunition", "round": { "caliber": "40x46mm", "variant": "M433 HEDP", "payload": "he" }, "quantity": 6 } }
  ]
}"#;

/// On-disk shape of a loadout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadoutFile {
    #[serde(default)]
    pub weapons: Vec<WeaponProfile>,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    /// Magazines to pack from loose stacks when the loadout is read.
    #[serde(default)]
    pub fill: Vec<MagazineFill>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagazineFill {
    pub magazine: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Loadout {
    pub weapons: Vec<Weapon>,
    pub inventory: MemoryInventory,
}

impl Loadout {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LoadoutFile = serde_json::from_str(json).context("failed to parse loadout")?;
        Self::build(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid loadout {}", path.display()))
    }

    /// Read `path`, or fall back to the built-in loadout when it does not exist.
    pub fn load_or_sample(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        info!("no loadout at {}, using the built-in range kit", path.display());
        Self::sample()
    }

    pub fn sample() -> Result<Self> {
        let mut loadout = Self::from_json(SAMPLE_LOADOUT)?;
        loadout.pack_magazines(&["stanag-1"], "ammo-556")?;
        Ok(loadout)
    }

    fn build(file: LoadoutFile) -> Result<Self> {
        let weapons = file
            .weapons
            .iter()
            .map(|profile| {
                profile
                    .build()
                    .with_context(|| format!("invalid weapon profile '{}'", profile.id))
            })
            .collect::<Result<Vec<_>>>()?;
        if weapons.is_empty() {
            bail!("loadout lists no weapons");
        }
        let mut loadout = Self {
            weapons,
            inventory: MemoryInventory::new(file.inventory),
        };
        for fill in &file.fill {
            loadout.pack_magazines(&[fill.magazine.as_str()], &fill.from)?;
        }
        Ok(loadout)
    }

    /// Top up the named inventory magazines from a loose stack.
    fn pack_magazines(&mut self, magazines: &[&str], stack: &str) -> Result<()> {
        let mut items = self.inventory.items().to_vec();
        let (round, mut available) = items
            .iter()
            .find(|item| item.id == stack)
            .and_then(InventoryItem::as_ammunition)
            .map(|(round, quantity)| (round.clone(), quantity))
            .with_context(|| format!("no ammunition stack '{stack}'"))?;

        for item in items.iter_mut().filter(|item| magazines.contains(&item.id.as_str())) {
            let ItemKind::Magazine(magazine) = &mut item.kind else {
                bail!("'{}' is not a magazine", item.id);
            };
            let take = magazine.remaining_capacity().min(available);
            magazine.load(vec![round.clone(); take as usize])?;
            available -= take;
        }

        for item in items.iter_mut().filter(|item| item.id == stack) {
            if let ItemKind::Ammunition { quantity, .. } = &mut item.kind {
                *quantity = available;
            }
        }
        items.retain(|item| item.as_ammunition().map_or(true, |(_, quantity)| quantity > 0));
        self.inventory = MemoryInventory::new(items);
        Ok(())
    }
}
