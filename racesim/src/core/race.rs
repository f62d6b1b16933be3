use crate::core::tireset::{Compound, DriveMode};
use crate::core::weather::Weather;
use crate::error::RacesimError;
use crate::interfaces::race_state::RaceState;
use crate::post::race_result::RaceResult;
use serde::{Deserialize, Serialize};

/// Tuning constants of both simulation engines.
///
/// * `base_rate` - (samples/s) Telemetry index advance of a car at pace factor 1.0
/// * `telemetry_pit_duration` - (s) Standstill time in the telemetry variant
/// * `laptime_pit_duration` - (s) Standstill time in the lap-time variant
/// * `pit_entry_zone` - Lap fraction from which on a pending pit request is executed (telemetry
/// variant)
/// * `avg_lap_time_estimate` - (s) Average lap time used to estimate the race clock after jumps
/// (telemetry variant)
/// * `grid_spacing` - (samples) Index offset between consecutive cars at the start (telemetry
/// variant)
/// * `time_multiplier` - Simulation speed relative to the external clock
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SimConstants {
    pub base_rate: f64,
    pub telemetry_pit_duration: f64,
    pub laptime_pit_duration: f64,
    pub pit_entry_zone: f64,
    pub avg_lap_time_estimate: f64,
    pub grid_spacing: f64,
    pub time_multiplier: f64,
}

impl Default for SimConstants {
    fn default() -> Self {
        SimConstants {
            base_rate: 10.0,
            telemetry_pit_duration: 25.0,
            laptime_pit_duration: 22.0,
            pit_entry_zone: 0.95,
            avg_lap_time_estimate: 90.0,
            grid_spacing: 5.0,
            time_multiplier: 1.0,
        }
    }
}

impl SimConstants {
    /// check validates the constants. A non-positive time multiplier or base rate would stop the
    /// race clock or the telemetry cars.
    pub fn check(&self) -> Result<(), RacesimError> {
        let positive = [
            ("time_multiplier", self.time_multiplier),
            ("base_rate", self.base_rate),
            ("avg_lap_time_estimate", self.avg_lap_time_estimate),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RacesimError::InvalidConstant(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("telemetry_pit_duration", self.telemetry_pit_duration),
            ("laptime_pit_duration", self.laptime_pit_duration),
            ("grid_spacing", self.grid_spacing),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(RacesimError::InvalidConstant(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.pit_entry_zone) {
            return Err(RacesimError::InvalidConstant(format!(
                "pit_entry_zone must be in [0, 1], got {}",
                self.pit_entry_zone
            )));
        }

        Ok(())
    }
}

/// Action and query contract between a simulation engine and the layers driving it (process
/// loop, input handling, presentation). All calls are synchronous and must only be made between
/// two `update` calls.
pub trait RaceEngine {
    /// update advances the simulation by `dt` seconds of external time. No-op while paused.
    fn update(&mut self, dt: f64);

    /// toggle_pause flips the pause flag and returns the new state.
    fn toggle_pause(&mut self) -> bool;

    fn is_paused(&self) -> bool;

    fn set_time_multiplier(&mut self, time_multiplier: f64);

    fn set_mode(&mut self, mode: DriveMode);

    /// request_pit stages a tire change for the player. Returns false if a stop is already
    /// pending or active.
    fn request_pit(&mut self, compound: Compound) -> bool;

    /// cancel_pit withdraws a pending request. Returns false if none is pending or the car
    /// already stands in the pit.
    fn cancel_pit(&mut self) -> bool;

    /// jump_to_lap moves the whole field to the start of the given lap (clamped).
    fn jump_to_lap(&mut self, lap: u32);

    /// set_race_progress moves the whole field to the given race fraction (clamped to [0, 1]).
    fn set_race_progress(&mut self, progress: f64);

    fn player_code(&self) -> &str;

    fn player_lap(&self) -> u32;

    /// player_position returns the 1-based race position of the player.
    fn player_position(&self) -> usize;

    /// race_progress returns the progress of the leader in [0, 1].
    fn race_progress(&self) -> f64;

    fn race_time(&self) -> f64;

    fn total_laps(&self) -> u32;

    /// all_finished returns true once every car reached a terminal state.
    fn all_finished(&self) -> bool;

    fn weather(&self) -> &Weather;

    fn weather_mut(&mut self) -> &mut Weather;

    /// race_state returns a snapshot of the field for presentation.
    fn race_state(&self) -> RaceState;

    /// race_result returns the current classification.
    fn race_result(&self) -> RaceResult;

    /// set_mode_name sets the drive mode from its name. Unknown names are ignored.
    fn set_mode_name(&mut self, name: &str) -> bool {
        match name.parse::<DriveMode>() {
            Ok(mode) => {
                self.set_mode(mode);
                true
            }
            Err(_) => false,
        }
    }

    /// request_pit_name requests a pit stop with a compound given by name. Unknown compounds are
    /// rejected without mutation.
    fn request_pit_name(&mut self, compound: &str) -> bool {
        match compound.parse::<Compound>() {
            Ok(compound) => self.request_pit(compound),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sim_constants_accept_partial_json() {
        let consts: SimConstants =
            serde_json::from_str(r#"{"laptime_pit_duration": 20.0, "time_multiplier": 4.0}"#)
                .unwrap();
        assert_relative_eq!(consts.laptime_pit_duration, 20.0);
        assert_relative_eq!(consts.time_multiplier, 4.0);
        assert_relative_eq!(consts.telemetry_pit_duration, 25.0);
        assert_relative_eq!(consts.pit_entry_zone, 0.95);
    }

    #[test]
    fn sim_constants_reject_stalling_values() {
        assert!(SimConstants::default().check().is_ok());

        let consts = SimConstants {
            time_multiplier: 0.0,
            ..SimConstants::default()
        };
        let err = consts.check().unwrap_err();
        assert!(err.to_string().contains("time_multiplier"));

        let consts = SimConstants {
            base_rate: -1.0,
            ..SimConstants::default()
        };
        assert!(matches!(consts.check(), Err(RacesimError::InvalidConstant(_))));

        let consts = SimConstants {
            laptime_pit_duration: f64::NAN,
            ..SimConstants::default()
        };
        assert!(consts.check().is_err());

        let consts = SimConstants {
            pit_entry_zone: 1.5,
            ..SimConstants::default()
        };
        assert!(consts.check().is_err());
    }
}
