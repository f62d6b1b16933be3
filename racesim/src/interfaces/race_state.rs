use crate::core::car::CarStatus;
use crate::core::oracle::Recommendation;
use crate::core::tireset::{Compound, DriveMode};
use crate::post::race_result::{HistoricalComparison, RaceResult};

pub const MAX_GUI_UPDATE_FREQUENCY: f64 = 20.0;

/// Fallback color for teams without a parsable color.
pub const DEFAULT_COLOR: RgbColor = RgbColor {
    r: 200,
    g: 200,
    b: 200,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for RgbColor {
    fn default() -> Self {
        DEFAULT_COLOR
    }
}

impl RgbColor {
    /// parse reads a CSS color string, e.g. "#1e41ff", and falls back to grey.
    pub fn parse(color: &str) -> RgbColor {
        match color.parse::<css_color_parser::Color>() {
            Ok(c) => RgbColor {
                r: c.r,
                g: c.g,
                b: c.b,
            },
            Err(_) => {
                tracing::debug!("Could not parse color '{}', using default", color);
                DEFAULT_COLOR
            }
        }
    }
}

/// Snapshot of one car for presentation.
///
/// * `lap_progress` - Fraction of the current lap in [0, 1]
/// * `gap_to_leader` - (s) Only available in the lap-time variant
/// * `x`, `y`, `speed` - Only available in the telemetry variant
#[derive(Debug, Clone)]
pub struct CarSnapshot {
    pub driver_code: String,
    pub color: RgbColor,
    pub is_player: bool,
    pub position: usize,
    pub lap: u32,
    pub lap_progress: f64,
    pub gap_to_leader: Option<f64>,
    pub compound: Compound,
    pub tire_wear: f64,
    pub tire_age_laps: f64,
    pub mode: DriveMode,
    pub in_pit: bool,
    pub pit_requested: bool,
    pub status: CarStatus,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub speed: Option<f64>,
}

/// Snapshot of the whole race. Car states are ordered by race position.
#[derive(Debug, Clone)]
pub struct RaceState {
    pub car_states: Vec<CarSnapshot>,
    pub race_time: f64,
    pub race_progress: f64,
    pub total_laps: u32,
    pub rain_intensity: f64,
    pub sandbox_weather: bool,
    pub paused: bool,
    pub player_code: String,
    pub player_position: usize,
    pub recommendation: Recommendation,
    pub historical: Option<HistoricalComparison>,

    // final results payload (sent once when race finishes)
    pub final_result: Option<RaceResult>,
}

impl RaceState {
    pub fn player(&self) -> Option<&CarSnapshot> {
        self.car_states.iter().find(|car| car.is_player)
    }
}
