//! The firing range: holds the loadout, drives the controller and turns
//! results into lines for the terminal.

use anyhow::{bail, Result};
use armory_core::{
    ammo, CombatError, Cue, EngineConfig, InventoryItem, MemoryInventory, ReloadMode,
    ReloadPress, ReloadReport, SessionRepository, SessionStore, Weapon, WeaponController,
    WeaponStatus,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::{
    commands::{Command, HELP},
    loadout::Loadout,
    save::{RangeSave, SaveEntry, SaveManager},
};

/// What one command produced.
#[derive(Debug, Default)]
pub struct Outcome {
    pub lines: Vec<String>,
    pub cues: Vec<Cue>,
    pub quit: bool,
}

impl Outcome {
    fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            ..Self::default()
        }
    }

    fn with_cues(mut self, cues: Vec<Cue>) -> Self {
        self.cues = cues;
        self
    }
}

pub struct Range {
    controller: WeaponController,
    weapons: Vec<Weapon>,
    inventory: MemoryInventory,
    current: usize,
    /// Time skipped with `wait`, added to the wall clock.
    skipped: Duration,
    saves: SaveManager,
    entry: Option<SaveEntry>,
}

impl Range {
    pub fn new(engine: EngineConfig, loadout: Loadout, saves: SaveManager) -> Result<Self> {
        if loadout.weapons.is_empty() {
            bail!("loadout lists no weapons");
        }
        let mut range = Self {
            controller: WeaponController::in_memory(engine),
            weapons: loadout.weapons,
            inventory: loadout.inventory,
            current: 0,
            skipped: Duration::zero(),
            saves,
            entry: None,
        };
        let now = range.now();
        for weapon in &range.weapons {
            range.controller.enter_combat(weapon, now);
        }
        Ok(range)
    }

    /// Continue from the newest save, if there is one.
    pub fn resume(engine: EngineConfig, saves: SaveManager) -> Result<Option<Self>> {
        let Some(entry) = saves.latest()? else {
            return Ok(None);
        };
        let save = saves.load(&entry)?;
        info!("resuming '{}' from {}", entry.name, entry.path.display());
        if save.weapons.is_empty() {
            bail!("save {} holds no weapons", entry.path.display());
        }
        let current = save
            .weapons
            .iter()
            .position(|weapon| weapon.id == save.current_weapon)
            .unwrap_or(0);
        Ok(Some(Self {
            controller: WeaponController::new(engine, SessionStore::from_snapshot(save.sessions)),
            weapons: save.weapons,
            inventory: save.inventory,
            current,
            skipped: Duration::zero(),
            saves,
            entry: Some(entry),
        }))
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
            .checked_add_signed(self.skipped)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Skip `seconds` of simulated time. `None` leaves the clock alone when the
    /// result would not be a representable date.
    fn advance_clock(&mut self, seconds: f64) -> Option<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        let step = Duration::try_milliseconds((seconds * 1000.0) as i64)?;
        let skipped = self.skipped.checked_add(&step)?;
        Utc::now().checked_add_signed(skipped)?;
        self.skipped = skipped;
        Some(())
    }

    pub fn weapon(&self) -> &Weapon {
        &self.weapons[self.current]
    }

    pub fn select_weapon(&mut self, id: &str) -> Result<()> {
        let Some(index) = self.weapons.iter().position(|weapon| weapon.id == id) else {
            bail!("no weapon '{id}' in the loadout");
        };
        self.current = index;
        let now = self.now();
        self.controller.enter_combat(&self.weapons[index], now);
        Ok(())
    }

    pub fn snapshot(&self) -> RangeSave {
        RangeSave {
            name: "range".to_string(),
            saved_at: Utc::now(),
            current_weapon: self.weapon().id.clone(),
            weapons: self.weapons.clone(),
            inventory: self.inventory.clone(),
            sessions: self.controller.sessions().snapshot(),
        }
    }

    /// Run one command. Combat refusals become output lines; only I/O failures are errors.
    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        let outcome = match command {
            Command::Save => self.save()?,
            Command::Quit => Outcome {
                quit: true,
                ..Outcome::default()
            },
            Command::Help => Outcome::line(HELP),
            Command::Weapon(None) => self.list_weapons(),
            Command::Weapon(Some(id)) => match self.select_weapon(&id) {
                Ok(()) => Outcome::line(format!("holding {}", self.weapon().name)),
                Err(err) => Outcome::line(format!("! {err}")),
            },
            Command::Inventory => self.list_inventory(),
            Command::Wait(seconds) => match self.advance_clock(seconds) {
                Some(()) => Outcome::line(format!("waited {seconds:.0}s")),
                None => Outcome::line(format!("! cannot wait {seconds}s")),
            },
            Command::Status => {
                let status = self.controller.status(self.weapon(), self.now());
                Outcome {
                    lines: describe_status(&status),
                    ..Outcome::default()
                }
            }
            combat => match self.combat(combat) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(weapon = %self.weapon().id, "{err}");
                    Outcome::line(format!("! {err}"))
                }
            },
        };
        Ok(outcome)
    }

    fn combat(&mut self, command: Command) -> Result<Outcome, CombatError> {
        let now = self.now();
        let weapon = &mut self.weapons[self.current];
        let controller = &mut self.controller;
        let inventory = &mut self.inventory;

        let outcome = match command {
            Command::Fire(rounds) => {
                let report = controller.fire(weapon, rounds, now)?;
                let mut lines = vec![format!(
                    "{}: fired {}/{} ({})",
                    weapon.name, report.rounds_fired, report.actual_rounds, report.mode
                )];
                if report.jammed {
                    lines.push("jammed!".to_string());
                } else if report.ran_dry {
                    lines.push("click. out of ammunition".to_string());
                }
                lines.extend(report.cycle_note);
                Outcome {
                    lines,
                    cues: report.cues,
                    quit: false,
                }
            }
            Command::Reload(Some(selection)) => {
                let report = controller.reload(weapon, inventory, &ReloadMode::Select(selection))?;
                describe_reload(&report)
            }
            Command::Reload(None) => match controller.reload_pressed(weapon, inventory, now)? {
                ReloadPress::Reloaded(report) => describe_reload(&report),
                ReloadPress::AwaitSelection(candidates) => {
                    let mut lines =
                        vec!["choose with 'reload <id>', or press reload again to auto-reload:".to_string()];
                    lines.extend(candidates.iter().map(describe_item));
                    if candidates.is_empty() {
                        lines.push("  (nothing compatible)".to_string());
                    }
                    Outcome {
                        lines,
                        ..Outcome::default()
                    }
                }
            },
            Command::AutoReload => describe_reload(&controller.auto_reload(weapon, inventory)?),
            Command::Cycle => {
                let report = controller.cycle(weapon, now)?;
                let text = match (&report.ejected, report.cleared_jam, report.chambered) {
                    (_, true, _) => "cleared the jam".to_string(),
                    (Some(round), _, _) => format!("ejected a live {}", round.label()),
                    (None, _, true) => "chambered a round".to_string(),
                    (None, _, false) => "action cycled on an empty weapon".to_string(),
                };
                Outcome::line(text).with_cues(report.cues)
            }
            Command::Clean => {
                let session = controller.clean(weapon, now);
                Outcome::line(format!("cleaned, cleanliness {:.0}%", session.cleanliness))
            }
            Command::Mode(Some(mode)) => {
                let cues = controller.select_fire_mode(weapon, mode)?;
                Outcome::line(format!("selector on {mode}")).with_cues(cues)
            }
            Command::Mode(None) => {
                let mode = controller.next_fire_mode(weapon)?;
                Outcome::line(format!("selector on {mode}"))
            }
            Command::Underbarrel => {
                let toggle = controller.toggle_underbarrel(weapon)?;
                let text = match &toggle.active {
                    Some(slot) => format!("switched to the {slot} weapon"),
                    None => format!("back on the {}", weapon.name),
                };
                Outcome::line(text).with_cues(toggle.cues)
            }
            other => Outcome::line(format!("'{other:?}' is not a weapon action")),
        };
        Ok(outcome)
    }

    fn save(&mut self) -> Result<Outcome> {
        let snapshot = self.snapshot();
        let entry = match &self.entry {
            Some(existing) => self.saves.update_save(existing, &snapshot)?,
            None => self.saves.create_save(&snapshot)?,
        };
        let line = format!("saved to {}", entry.path.display());
        self.entry = Some(entry);
        Ok(Outcome::line(line))
    }

    fn list_weapons(&self) -> Outcome {
        let lines = self
            .weapons
            .iter()
            .enumerate()
            .map(|(index, weapon)| {
                let marker = if index == self.current { ">" } else { " " };
                format!(
                    "{marker} {:<8} {} [{}] {}/{}",
                    weapon.id,
                    weapon.name,
                    weapon.calibers.join(", "),
                    ammo::rounds_available(weapon),
                    weapon.capacity
                )
            })
            .collect();
        Outcome {
            lines,
            ..Outcome::default()
        }
    }

    fn list_inventory(&self) -> Outcome {
        let mut lines: Vec<String> = self.inventory.items().iter().map(describe_item).collect();
        if lines.is_empty() {
            lines.push("inventory is empty".to_string());
        }
        Outcome {
            lines,
            ..Outcome::default()
        }
    }
}

fn describe_item(item: &InventoryItem) -> String {
    if let Some(magazine) = item.as_magazine() {
        format!(
            "  {:<10} {} {}/{}",
            item.id,
            magazine.name,
            magazine.len(),
            magazine.capacity
        )
    } else if let Some((round, quantity)) = item.as_ammunition() {
        format!("  {:<10} {} x{quantity}", item.id, round.label())
    } else {
        format!("  {}", item.id)
    }
}

fn describe_reload(report: &ReloadReport) -> Outcome {
    let mut text = format!("reloaded {} rounds ({:?})", report.rounds_loaded, report.family);
    if let Some(inserted) = &report.inserted {
        text.push_str(&format!(", inserted {inserted}"));
    }
    if report.chambered {
        text.push_str(", chambered");
    }
    Outcome::line(text).with_cues(report.cues.clone())
}

fn describe_status(status: &WeaponStatus) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", status.name, status.weapon_id),
        format!(
            "  mode {}  rounds {}/{}  chamber {}",
            status.fire_mode,
            status.rounds_in_source,
            status.source_capacity,
            status.chambered.as_deref().unwrap_or("empty")
        ),
        format!(
            "  barrel {:.0}°F  clean {:.0}%  jam {:.2}%{}",
            status.temperature,
            status.cleanliness,
            status.jam_chance * 100.0,
            if status.jammed { "  JAMMED" } else { "" }
        ),
        format!("  {} rounds fired", status.rounds_fired),
    ];
    if let Some(underbarrel) = &status.underbarrel {
        lines.push(format!(
            "  underbarrel {} active: {}/{}",
            underbarrel.name, underbarrel.rounds_in_source, underbarrel.source_capacity
        ));
    }
    lines
}
