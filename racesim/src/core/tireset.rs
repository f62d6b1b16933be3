use crate::error::RacesimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum tire wear, a tire never reaches 100% wear.
pub const MAX_TIRE_WEAR: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

impl Compound {
    pub const ALL: [Compound; 5] = [
        Compound::Soft,
        Compound::Medium,
        Compound::Hard,
        Compound::Intermediate,
        Compound::Wet,
    ];

    /// is_slick returns true for the dry-weather compounds.
    pub fn is_slick(&self) -> bool {
        matches!(self, Compound::Soft | Compound::Medium | Compound::Hard)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compound {
    type Err = RacesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SOFT" => Ok(Compound::Soft),
            "MEDIUM" => Ok(Compound::Medium),
            "HARD" => Ok(Compound::Hard),
            "INTERMEDIATE" => Ok(Compound::Intermediate),
            "WET" => Ok(Compound::Wet),
            _ => Err(RacesimError::UnknownCompound(s.to_owned())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriveMode {
    Push,
    #[default]
    Normal,
    Conserve,
}

impl DriveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveMode::Push => "PUSH",
            DriveMode::Normal => "NORMAL",
            DriveMode::Conserve => "CONSERVE",
        }
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveMode {
    type Err = RacesimError;

    /// Mode names are matched exactly, e.g. "PUSH". Anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUSH" => Ok(DriveMode::Push),
            "NORMAL" => Ok(DriveMode::Normal),
            "CONSERVE" => Ok(DriveMode::Conserve),
            _ => Err(RacesimError::UnknownMode(s.to_owned())),
        }
    }
}

/// * `wear_rate` - (1/lap) Base tire wear per lap at normal mode and fresh tires
/// * `pace_delta` - (s) Lap time delta relative to the softest compound
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TireCompoundConfig {
    pub wear_rate: f64,
    pub pace_delta: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TireConfig {
    pub soft: TireCompoundConfig,
    pub medium: TireCompoundConfig,
    pub hard: TireCompoundConfig,
    pub intermediate: TireCompoundConfig,
    pub wet: TireCompoundConfig,
}

impl Default for TireConfig {
    fn default() -> Self {
        TireConfig {
            soft: TireCompoundConfig {
                wear_rate: 0.035,
                pace_delta: 0.0,
            },
            medium: TireCompoundConfig {
                wear_rate: 0.025,
                pace_delta: 0.5,
            },
            hard: TireCompoundConfig {
                wear_rate: 0.018,
                pace_delta: 1.1,
            },
            intermediate: TireCompoundConfig {
                wear_rate: 0.030,
                pace_delta: 2.0,
            },
            wet: TireCompoundConfig {
                wear_rate: 0.022,
                pace_delta: 4.5,
            },
        }
    }
}

impl TireConfig {
    pub fn for_compound(&self, compound: Compound) -> &TireCompoundConfig {
        match compound {
            Compound::Soft => &self.soft,
            Compound::Medium => &self.medium,
            Compound::Hard => &self.hard,
            Compound::Intermediate => &self.intermediate,
            Compound::Wet => &self.wet,
        }
    }
}

/// Tire set currently mounted on a car.
///
/// * `compound` - Mounted compound
/// * `age_laps` - (laps) Distance driven on this set, fractional in the telemetry variant
/// * `wear` - Wear in [0.0, 0.99], only reset to 0.0 when a new set is fitted
#[derive(Debug, Clone, PartialEq)]
pub struct Tireset {
    pub compound: Compound,
    pub age_laps: f64,
    pub wear: f64,
}

impl Tireset {
    pub fn new(compound: Compound, age_laps: f64) -> Tireset {
        Tireset {
            compound,
            age_laps,
            wear: 0.0,
        }
    }

    /// drive_lap_frac adds a fraction of a lap to the tire age and the scaled wear increment to
    /// the wear, clamped to the maximum wear.
    pub fn drive_lap_frac(&mut self, wear_increment: f64, lap_frac: f64) {
        self.wear = (self.wear + wear_increment * lap_frac).min(MAX_TIRE_WEAR);
        self.age_laps += lap_frac;
    }

    /// add_wear accrues wear without touching the age.
    pub fn add_wear(&mut self, wear_increment: f64, lap_frac: f64) {
        self.wear = (self.wear + wear_increment * lap_frac).min(MAX_TIRE_WEAR);
    }

    /// fit_new replaces the set by a fresh one of the given compound.
    pub fn fit_new(&mut self, compound: Compound) {
        self.compound = compound;
        self.age_laps = 0.0;
        self.wear = 0.0;
    }
}
