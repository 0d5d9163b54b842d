//! Timed audio/visual cue requests handed to the host's scheduler.
//!
//! Actions never sleep. They return an ordered list of cues where each
//! `delay` is measured from the start of the previous cue, and the host
//! realizes the delays however it likes.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Sound or animation the host should play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueKind {
    /// Unsuppressed shot.
    Fire,
    /// Shot through a suppressor.
    FireSuppressed,
    /// Spent casing hitting the ground.
    CasingDrop,
    /// Trigger pulled on an empty weapon.
    DryClick,
    /// Malfunction on the shot.
    Jam,
    /// Impact or fuse timer of a payload round, e.g. `payload:smoke`.
    Payload(String),
    /// Magazine dropped out of the well.
    MagazineOut,
    /// Magazine seated.
    MagazineIn,
    /// Feed cover opened on a belt-fed weapon.
    CoverOpen,
    /// Feed cover closed.
    CoverClose,
    /// Old belt pulled out.
    BeltOut,
    /// New belt laid on the feed tray.
    BeltIn,
    /// One round pushed into a tube, box, cylinder or launcher.
    RoundInsert,
    /// Cylinder swung out.
    CylinderOpen,
    /// Cylinder contents dumped.
    CylinderEject,
    /// Cylinder swung shut.
    CylinderClose,
    /// Launcher breech opened.
    LauncherOpen,
    /// Launcher breech closed.
    LauncherClose,
    /// Charging handle racked on a self-loader.
    ChargingHandle,
    /// Bolt worked.
    BoltCycle,
    /// Slide pumped.
    PumpCycle,
    /// Malfunction cleared by hand.
    JamClear,
    /// Selector switch moved.
    Selector,
    /// Trigger moved to or from the underbarrel weapon.
    UnderbarrelToggle,
}

impl fmt::Display for CueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CueKind::Fire => "fire",
            CueKind::FireSuppressed => "fire_suppressed",
            CueKind::CasingDrop => "casing_drop",
            CueKind::DryClick => "dry_click",
            CueKind::Jam => "jam",
            CueKind::Payload(category) => return write!(f, "payload:{category}"),
            CueKind::MagazineOut => "magazine_out",
            CueKind::MagazineIn => "magazine_in",
            CueKind::CoverOpen => "cover_open",
            CueKind::CoverClose => "cover_close",
            CueKind::BeltOut => "belt_out",
            CueKind::BeltIn => "belt_in",
            CueKind::RoundInsert => "round_insert",
            CueKind::CylinderOpen => "cylinder_open",
            CueKind::CylinderEject => "cylinder_eject",
            CueKind::CylinderClose => "cylinder_close",
            CueKind::LauncherOpen => "launcher_open",
            CueKind::LauncherClose => "launcher_close",
            CueKind::ChargingHandle => "charging_handle",
            CueKind::BoltCycle => "bolt_cycle",
            CueKind::PumpCycle => "pump_cycle",
            CueKind::JamClear => "jam_clear",
            CueKind::Selector => "selector",
            CueKind::UnderbarrelToggle => "underbarrel_toggle",
        };
        f.write_str(name)
    }
}

/// One `(delay, cue, blocking)` request.
///
/// A blocking cue must finish playing before the host moves on to the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Wait after the previous cue started.
    pub delay: Duration,
    /// What to play.
    pub kind: CueKind,
    /// Whether the host must let it finish before the next cue.
    pub blocking: bool,
}

impl Cue {
    /// Wire name of the cue, e.g. `magazine_in`.
    pub fn name(&self) -> String {
        self.kind.to_string()
    }
}

/// Builds a cue list on an absolute timeline, then converts it to relative delays.
///
/// Main-line cues advance the cursor; side cues (casing drops, payload timers)
/// are pinned at an offset from the cursor without delaying what follows.
#[derive(Debug, Default)]
pub struct CueSchedule {
    cursor: Duration,
    entries: Vec<(Duration, CueKind, bool)>,
}

impl CueSchedule {
    /// Empty schedule with the cursor at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `delay` after the current cursor, then play `kind`.
    pub fn then(&mut self, delay: Duration, kind: CueKind, blocking: bool) -> &mut Self {
        self.cursor += delay;
        self.entries.push((self.cursor, kind, blocking));
        self
    }

    /// Play `kind` `offset` after the cursor without moving it.
    pub fn alongside(&mut self, offset: Duration, kind: CueKind) -> &mut Self {
        self.entries.push((self.cursor + offset, kind, false));
        self
    }

    /// No cue has been scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Time from the first cue to the last.
    pub fn span(&self) -> Duration {
        self.entries
            .iter()
            .map(|(at, _, _)| *at)
            .max()
            .unwrap_or_default()
    }

    /// Sort by start time and turn absolute times into delays.
    pub fn finish(mut self) -> Vec<Cue> {
        // stable: equal timestamps keep insertion order
        self.entries.sort_by_key(|(at, _, _)| *at);
        let mut previous = Duration::ZERO;
        self.entries
            .into_iter()
            .map(|(at, kind, blocking)| {
                let delay = at.saturating_sub(previous);
                previous = at;
                Cue {
                    delay,
                    kind,
                    blocking,
                }
            })
            .collect()
    }
}

/// Total time a cue list takes to play out.
pub fn total_delay(cues: &[Cue]) -> Duration {
    cues.iter().map(|cue| cue.delay).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_cues_do_not_push_the_main_line() {
        let mut schedule = CueSchedule::new();
        schedule
            .then(Duration::ZERO, CueKind::Fire, false)
            .alongside(Duration::from_millis(350), CueKind::CasingDrop)
            .then(Duration::from_millis(100), CueKind::Fire, false);

        assert_eq!(schedule.span(), Duration::from_millis(350));
        let cues = schedule.finish();
        let names: Vec<_> = cues.iter().map(Cue::name).collect();
        assert_eq!(names, vec!["fire", "fire", "casing_drop"]);
        assert_eq!(cues[1].delay, Duration::from_millis(100));
        assert_eq!(cues[2].delay, Duration::from_millis(250));
        assert_eq!(total_delay(&cues), Duration::from_millis(350));
    }

    #[test]
    fn payload_cue_names_carry_category() {
        assert_eq!(CueKind::Payload("smoke".into()).to_string(), "payload:smoke");
        assert_eq!(CueKind::RoundInsert.to_string(), "round_insert");
    }
}
