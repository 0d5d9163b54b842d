#![allow(missing_docs)]

//! Fire-mode execution and working the action.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ammo::{self, Round},
    config::{secs, EngineConfig},
    cue::{Cue, CueKind, CueSchedule},
    error::{CombatError, Result},
    session::CombatSession,
    thermal::{self, ShotWear},
    weapon::{FireMode, Platform, Weapon},
};

/// Outcome of one trigger pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireReport {
    pub mode: FireMode,
    pub rounds_requested: u32,
    /// Requested count after the mode's rules (single shot, burst rounding).
    pub actual_rounds: u32,
    pub rounds_fired: u32,
    pub jammed: bool,
    /// The weapon ran out before `actual_rounds` were fired.
    pub ran_dry: bool,
    pub cycle_note: Option<String>,
    pub cues: Vec<Cue>,
}

/// Outcome of working the action by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Round thrown out of the chamber. A round that caused a jam is lost.
    pub ejected: Option<Round>,
    pub cleared_jam: bool,
    pub chambered: bool,
    pub cues: Vec<Cue>,
}

/// How many rounds a request turns into under `mode`.
pub fn actual_round_count(mode: FireMode, requested: u32, burst_size: u32) -> u32 {
    let requested = requested.max(1);
    match mode {
        FireMode::Safe => 0,
        FireMode::Bolt | FireMode::Pump => 1,
        FireMode::Burst => {
            let burst = burst_size.max(1);
            requested.div_ceil(burst).saturating_mul(burst)
        }
        FireMode::Semi | FireMode::Auto => requested,
    }
}

/// Delay before shot number `index` (zero-based) within one request.
pub fn shot_delay(weapon: &Weapon, mode: FireMode, index: u32, config: &EngineConfig) -> Duration {
    if index == 0 {
        return Duration::ZERO;
    }
    let interval = |rate: u32| secs(60.0 / f64::from(rate.max(1)));
    match mode {
        FireMode::Safe | FireMode::Bolt | FireMode::Pump => Duration::ZERO,
        FireMode::Semi => interval(weapon.cyclic_rate) + config.timing.reaction(),
        FireMode::Auto => interval(weapon.cyclic_rate),
        FireMode::Burst => {
            let within = interval(weapon.burst_cyclic_rate.unwrap_or(weapon.cyclic_rate));
            if index % weapon.effective_burst_size() == 0 {
                within + config.timing.reaction()
            } else {
                within
            }
        }
    }
}

/// Pull the trigger for `rounds_requested` rounds in the session's fire mode.
///
/// Refusals leave weapon and session untouched. Once the first round goes
/// out, every fired round stays consumed even if a later one jams.
pub fn fire<R: Rng + ?Sized>(
    weapon: &mut Weapon,
    session: &mut CombatSession,
    rounds_requested: u32,
    config: &EngineConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<FireReport> {
    let mode = session.fire_mode;
    if mode == FireMode::Safe {
        return Err(CombatError::SafetyEngaged);
    }
    if !weapon.supports(mode) {
        return Err(CombatError::UnsupportedFireMode(mode));
    }
    if session.jammed {
        return Err(CombatError::Jammed);
    }
    if ammo::peek_next_round(weapon).is_none() {
        return Err(CombatError::DryFire);
    }
    if mode.is_manual() && weapon.feed.has_chamber() && weapon.chambered.is_none() {
        return Err(CombatError::ActionNotCycled);
    }

    let actual_rounds = actual_round_count(mode, rounds_requested, weapon.effective_burst_size());
    session.settle(&config.thermal, now);

    let mut schedule = CueSchedule::new();
    let mut rounds_fired = 0;
    let mut jammed = false;
    let mut ran_dry = false;

    for index in 0..actual_rounds {
        let delay = shot_delay(weapon, mode, index, config);
        if ammo::peek_next_round(weapon).is_none() {
            ran_dry = true;
            schedule.then(delay, CueKind::DryClick, false);
            break;
        }

        let chance = thermal::jam_chance(
            &config.thermal,
            weapon.jam_rate,
            session.temperature,
            session.cleanliness,
        );
        if thermal::roll_jam(chance, rng) {
            jammed = true;
            session.jammed = true;
            schedule.then(delay, CueKind::Jam, true);
            info!(
                weapon = %weapon.id,
                fired = rounds_fired,
                chance,
                temperature = session.temperature,
                "weapon jammed"
            );
            break;
        }

        let Some(round) = ammo::consume_round(weapon) else {
            ran_dry = true;
            break;
        };
        session.apply_shot(ShotWear::roll(&config.thermal, rng));
        rounds_fired += 1;

        let shot = if weapon.suppressed {
            CueKind::FireSuppressed
        } else {
            CueKind::Fire
        };
        schedule.then(delay, shot, false);
        if weapon.feed.ejects_casings() && mode.auto_chambers() {
            schedule.alongside(secs(config.timing.casing_drop_delay), CueKind::CasingDrop);
        }
        if let Some(payload) = &round.payload {
            schedule.alongside(
                secs(config.timing.payload_impact_delay),
                CueKind::Payload(payload.clone()),
            );
        }

        if mode.auto_chambers() {
            ammo::chamber_next(weapon);
        }
    }

    session.mark_fired(now);

    let cycle_note = if jammed {
        Some("jammed: cycle the action to clear".to_string())
    } else if mode.is_manual()
        && weapon.feed.has_chamber()
        && weapon.chambered.is_none()
        && ammo::source_len(weapon) > 0
    {
        Some(match mode {
            FireMode::Pump => "pump to chamber the next round".to_string(),
            _ => "work the bolt to chamber the next round".to_string(),
        })
    } else {
        None
    };

    debug!(
        weapon = %weapon.id,
        %mode,
        requested = rounds_requested,
        actual_rounds,
        rounds_fired,
        jammed,
        ran_dry,
        temperature = session.temperature,
        cleanliness = session.cleanliness,
        "trigger pulled"
    );

    Ok(FireReport {
        mode,
        rounds_requested,
        actual_rounds,
        rounds_fired,
        jammed,
        ran_dry,
        cycle_note,
        cues: schedule.finish(),
    })
}

/// Work the action: clear a jam, eject what is chambered and feed the next round.
pub fn cycle(weapon: &mut Weapon, session: &mut CombatSession, config: &EngineConfig) -> CycleReport {
    let pacing = &config.pacing;
    let mut schedule = CueSchedule::new();
    let cleared_jam = session.jammed;

    let action_cue = match weapon.platform {
        Platform::PumpAction => CueKind::PumpCycle,
        Platform::BoltAction => CueKind::BoltCycle,
        _ => CueKind::ChargingHandle,
    };

    let ejected = if weapon.feed.has_chamber() {
        weapon.chambered.take()
    } else {
        None
    };

    if cleared_jam {
        session.jammed = false;
        schedule
            .then(Duration::ZERO, CueKind::JamClear, true)
            .then(secs(pacing.jam_clear), action_cue, true);
        info!(weapon = %weapon.id, discarded = ?ejected, "jam cleared");
    } else {
        schedule.then(Duration::ZERO, action_cue, true);
    }
    if ejected.is_some() {
        schedule.alongside(secs(config.timing.casing_drop_delay), CueKind::CasingDrop);
    }

    let chambered = ammo::chamber_next(weapon);
    debug!(weapon = %weapon.id, chambered, cleared_jam, "action cycled");

    CycleReport {
        ejected: if cleared_jam { None } else { ejected },
        cleared_jam,
        chambered,
        cues: schedule.finish(),
    }
}
