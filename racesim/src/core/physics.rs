use crate::core::tireset::{Compound, DriveMode, TireConfig};
use serde::{Deserialize, Serialize};

/// Minimum pace factor, a car always keeps at least 10% of its base speed.
pub const MIN_PACE_FACTOR: f64 = 0.1;

/// * `wear` - Multiplier on the tire wear rate
/// * `pace` - Multiplier on the base pace (>1.0 is faster)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModePars {
    pub wear: f64,
    pub pace: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModeConfig {
    pub push: ModePars,
    pub normal: ModePars,
    pub conserve: ModePars,
}

impl Default for ModeConfig {
    fn default() -> Self {
        ModeConfig {
            push: ModePars {
                wear: 1.6,
                pace: 1.05,
            },
            normal: ModePars {
                wear: 1.0,
                pace: 1.0,
            },
            conserve: ModePars {
                wear: 0.6,
                pace: 0.92,
            },
        }
    }
}

impl ModeConfig {
    pub fn for_mode(&self, mode: DriveMode) -> &ModePars {
        match mode {
            DriveMode::Push => &self.push,
            DriveMode::Normal => &self.normal,
            DriveMode::Conserve => &self.conserve,
        }
    }
}

/// Coefficients of the stylized tire and weather model.
///
/// * `tires` - Wear rate and pace delta per compound
/// * `modes` - Wear and pace multipliers per drive mode
/// * `pace_delta_scale` - (1/s) Converts a compound lap time delta into a pace fraction
/// * `cliff_wear` - Wear above which the wear penalty gets steeper
/// * `wear_penalty_lin` - Pace loss per unit wear below the cliff
/// * `wear_penalty_cliff` - Pace loss per unit wear above the cliff
/// * `wear_accel` - Wear accrual acceleration, wear grows by `1 + wear_accel * wear`
/// * `dry_limit` - Rain intensity below which the track counts as dry
/// * `heavy_limit` - Rain intensity from which on the track counts as heavy wet
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PhysicsPars {
    pub tires: TireConfig,
    pub modes: ModeConfig,
    pub pace_delta_scale: f64,
    pub cliff_wear: f64,
    pub wear_penalty_lin: f64,
    pub wear_penalty_cliff: f64,
    pub wear_accel: f64,
    pub dry_limit: f64,
    pub heavy_limit: f64,
}

impl Default for PhysicsPars {
    fn default() -> Self {
        PhysicsPars {
            tires: TireConfig::default(),
            modes: ModeConfig::default(),
            pace_delta_scale: 0.012,
            cliff_wear: 0.6,
            wear_penalty_lin: 0.1,
            wear_penalty_cliff: 0.5,
            wear_accel: 1.5,
            dry_limit: 0.1,
            heavy_limit: 0.6,
        }
    }
}

/// Stateless tire and weather model. Only the player car consults it, ghost cars replay history.
#[derive(Debug, Clone, Default)]
pub struct PhysicsModel {
    pars: PhysicsPars,
}

impl PhysicsModel {
    pub fn new(pars: PhysicsPars) -> PhysicsModel {
        PhysicsModel { pars }
    }

    /// tire_wear_increment returns the wear a tire accrues per lap under the current conditions.
    /// The caller scales it by the fraction of the lap actually covered.
    pub fn tire_wear_increment(&self, compound: Compound, current_wear: f64, mode: DriveMode) -> f64 {
        let base = self.pars.tires.for_compound(compound).wear_rate;
        let mult = self.pars.modes.for_mode(mode).wear;

        // worn tires wear faster (up to 2.5x at the end of their life)
        let cliff_factor = 1.0 + current_wear * self.pars.wear_accel;

        base * mult * cliff_factor
    }

    /// wear_penalty returns the pace loss caused by tire wear: linear up to the cliff, much
    /// steeper beyond it. Continuous at the cliff.
    pub fn wear_penalty(&self, wear: f64) -> f64 {
        let cliff = self.pars.cliff_wear;
        if wear < cliff {
            wear * self.pars.wear_penalty_lin
        } else {
            cliff * self.pars.wear_penalty_lin + (wear - cliff) * self.pars.wear_penalty_cliff
        }
    }

    /// compound_delta returns the pace loss of a compound relative to the softest one.
    pub fn compound_delta(&self, compound: Compound) -> f64 {
        self.pars.tires.for_compound(compound).pace_delta * self.pars.pace_delta_scale
    }

    /// weather_penalty returns the pace loss of running a compound that does not match the
    /// current rain band.
    pub fn weather_penalty(&self, compound: Compound, rain_intensity: f64) -> f64 {
        if rain_intensity < self.pars.dry_limit {
            // dry track: rain tires overheat
            match compound {
                Compound::Intermediate | Compound::Wet => 0.05 + rain_intensity * 0.1,
                _ => 0.0,
            }
        } else if rain_intensity < self.pars.heavy_limit {
            // damp track: intermediates are optimal
            match compound {
                c if c.is_slick() => rain_intensity * 0.8,
                Compound::Wet => 0.05,
                _ => 0.0,
            }
        } else {
            // heavy rain: anything but full wets is barely drivable
            match compound {
                Compound::Wet => 0.0,
                _ => rain_intensity * 1.2,
            }
        }
    }

    /// pace_factor returns the speed multiplier of the player car (1.0 = baseline, >1.0 faster),
    /// never below `MIN_PACE_FACTOR`.
    pub fn pace_factor(
        &self,
        compound: Compound,
        wear: f64,
        mode: DriveMode,
        rain_intensity: f64,
    ) -> f64 {
        let mode_pace = self.pars.modes.for_mode(mode).pace;
        let total_perf = mode_pace
            - self.wear_penalty(wear)
            - self.compound_delta(compound)
            - self.weather_penalty(compound, rain_intensity);

        total_perf.max(MIN_PACE_FACTOR)
    }
}
