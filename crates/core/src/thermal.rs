//! Barrel heat, fouling and malfunction probability.

use rand::Rng;

use crate::config::ThermalConfig;

/// Heat and fouling produced by one fired round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotWear {
    /// °F added to the barrel.
    pub heat: f64,
    /// Cleanliness points lost.
    pub fouling: f64,
}

impl ShotWear {
    /// Draw heat and fouling from the configured ranges.
    pub fn roll<R: Rng + ?Sized>(config: &ThermalConfig, rng: &mut R) -> Self {
        Self {
            heat: config.heat_per_round.sample(rng),
            fouling: config.fouling_per_round.sample(rng),
        }
    }
}

/// Newton cooling toward ambient after `elapsed_secs` without firing.
///
/// A barrel that started above ambient never drops below it.
pub fn cooled_temperature(
    config: &ThermalConfig,
    temperature: f64,
    ambient: f64,
    elapsed_secs: f64,
) -> f64 {
    let elapsed = elapsed_secs.max(0.0);
    let cooled = ambient + (temperature - ambient) * (-config.cooling_constant * elapsed).exp();
    if temperature >= ambient {
        cooled.max(ambient)
    } else {
        cooled.min(ambient)
    }
}

/// Grows linearly once the barrel passes the overheat threshold.
pub fn temperature_multiplier(config: &ThermalConfig, temperature: f64) -> f64 {
    1.0 + (temperature - config.overheat_threshold).max(0.0) / config.overheat_divisor
}

/// Below 1 for a clean gun, above 1 for a dirty one, clamped both ways.
pub fn cleanliness_multiplier(config: &ThermalConfig, cleanliness: f64) -> f64 {
    (1.0 - (cleanliness - config.clean_baseline) / config.clean_divisor)
        .clamp(config.clean_multiplier_min, config.clean_multiplier_max)
}

/// Per-round jam probability, capped at certainty.
pub fn jam_chance(config: &ThermalConfig, base_rate: f64, temperature: f64, cleanliness: f64) -> f64 {
    let chance = base_rate.max(0.0)
        * temperature_multiplier(config, temperature)
        * cleanliness_multiplier(config, cleanliness);
    chance.min(1.0)
}

/// True with probability `chance`.
pub fn roll_jam<R: Rng + ?Sized>(chance: f64, rng: &mut R) -> bool {
    rng.gen::<f64>() < chance
}
