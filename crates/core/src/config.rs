#![allow(missing_docs)]

//! Tunable constants for the thermal, timing and reload pacing models.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Engine-wide configuration. Every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub thermal: ThermalConfig,
    pub timing: TimingConfig,
    pub pacing: ReloadPacing,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

/// Inclusive range sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Exponential decay constant per second since the last shot.
    pub cooling_constant: f64,
    /// °F
    pub ambient_temperature: f64,
    /// °F added per fired round.
    pub heat_per_round: ValueRange,
    /// Cleanliness percentage points lost per fired round.
    pub fouling_per_round: ValueRange,
    /// Temperature above which jams become more likely.
    pub overheat_threshold: f64,
    pub overheat_divisor: f64,
    pub clean_baseline: f64,
    pub clean_divisor: f64,
    pub clean_multiplier_min: f64,
    pub clean_multiplier_max: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            cooling_constant: 0.01,
            ambient_temperature: 70.0,
            heat_per_round: ValueRange::new(15.0, 25.0),
            fouling_per_round: ValueRange::new(0.1, 0.3),
            overheat_threshold: 212.0,
            overheat_divisor: 400.0,
            clean_baseline: 50.0,
            clean_divisor: 100.0,
            clean_multiplier_min: 0.5,
            clean_multiplier_max: 1.5,
        }
    }
}

/// Delays used when sequencing shots and their side effects, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Added between semi-auto shots and between bursts.
    pub reaction_delay: f64,
    pub casing_drop_delay: f64,
    pub payload_impact_delay: f64,
    /// Two reload presses closer than this trigger an auto-reload.
    pub double_press_window: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reaction_delay: 0.18,
            casing_drop_delay: 0.35,
            payload_impact_delay: 2.0,
            double_press_window: 0.4,
        }
    }
}

impl TimingConfig {
    pub fn reaction(&self) -> Duration {
        secs(self.reaction_delay)
    }

    pub fn double_press(&self) -> Duration {
        secs(self.double_press_window)
    }
}

/// How long each reload or jam-clearing step takes, in seconds. The cue after
/// a step waits for it to finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadPacing {
    pub magazine_out: f64,
    pub magazine_in: f64,
    pub round_insert: f64,
    pub cylinder_open: f64,
    pub cylinder_eject: f64,
    pub cover_open: f64,
    pub cover_close: f64,
    pub launcher_open: f64,
    pub jam_clear: f64,
}

impl Default for ReloadPacing {
    fn default() -> Self {
        Self {
            magazine_out: 0.4,
            magazine_in: 0.9,
            round_insert: 0.45,
            cylinder_open: 0.5,
            cylinder_eject: 0.6,
            cover_open: 0.8,
            cover_close: 0.8,
            launcher_open: 0.6,
            jam_clear: 1.2,
        }
    }
}

/// Non-negative, finite seconds to a `Duration`.
pub fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "thermal": { "ambient_temperature": 40.0 }, "seed": 7 }"#)
                .expect("config parses");
        assert_eq!(config.thermal.ambient_temperature, 40.0);
        assert_eq!(config.thermal.cooling_constant, 0.01);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn samples_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let range = ValueRange::new(15.0, 25.0);
        for _ in 0..200 {
            let value = range.sample(&mut rng);
            assert!((15.0..=25.0).contains(&value));
        }
        assert_eq!(ValueRange::new(2.0, 2.0).sample(&mut rng), 2.0);
    }

    #[test]
    fn invalid_seconds_become_zero() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(0.5), Duration::from_millis(500));
    }
}
