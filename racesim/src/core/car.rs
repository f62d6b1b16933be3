use crate::core::driver::DriverRaceData;
use crate::core::state_handler::StateHandler;
use crate::core::tireset::{Compound, DriveMode, Tireset};
use crate::core::track::TelemetryTrace;
use crate::interfaces::race_state::RgbColor;
use helpers::general::stable_seed;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarStatus {
    Running,
    Finished,
    Dnf,
}

/// Role decides which step function moves a car. Ghosts replay history with a fixed pace jitter
/// and never consult the physics model or the weather.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    Player,
    Ghost { pace_jitter: f64 },
}

impl Role {
    /// ghost creates a ghost role with the deterministic jitter of the driver.
    pub fn ghost(driver_code: &str) -> Role {
        Role::Ghost {
            pace_jitter: ghost_pace_jitter(driver_code),
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Role::Player)
    }
}

/// ghost_pace_jitter returns a per-driver pace multiplier in [0.95, 1.04] in steps of 0.01. The
/// value only depends on the driver code, hence it is identical across runs and platforms.
pub fn ghost_pace_jitter(driver_code: &str) -> f64 {
    let mut rng = StdRng::seed_from_u64(stable_seed(driver_code));
    0.95 + rng.gen_range(0..10) as f64 * 0.01
}

/// Car state of the telemetry variant.
///
/// * `track_index` - Continuous index into the driver's telemetry trace, doubles as the position
/// along the lap
/// * `lap` - Current lap (1-based), `total_laps + 1` only transiently before finishing
/// * `position_x`, `position_y`, `speed`, `gear` - Display fields sampled from the trace
/// * `finish_time` - (s) Race time at which the car finished
#[derive(Debug, Clone)]
pub struct CarState {
    pub driver_code: String,
    pub color: RgbColor,
    pub role: Role,
    pub trace: TelemetryTrace,
    pub track_index: f64,
    pub lap: u32,
    pub position_x: f64,
    pub position_y: f64,
    pub speed: f64,
    pub gear: u8,
    pub tireset: Tireset,
    pub mode: DriveMode,
    pub sh: StateHandler,
    pub finished: bool,
    pub finish_time: Option<f64>,
}

impl CarState {
    pub fn new(
        driver_code: &str,
        color: RgbColor,
        role: Role,
        trace: TelemetryTrace,
        start_compound: Compound,
    ) -> CarState {
        let mut car = CarState {
            driver_code: driver_code.to_owned(),
            color,
            role,
            trace,
            track_index: 0.0,
            lap: 1,
            position_x: 0.0,
            position_y: 0.0,
            speed: 0.0,
            gear: 1,
            tireset: Tireset::new(start_compound, 0.0),
            mode: DriveMode::Normal,
            sh: StateHandler::default(),
            finished: false,
            finish_time: None,
        };
        car.sync_from_telemetry();
        car
    }

    pub fn track_length(&self) -> f64 {
        self.trace.length()
    }

    /// lap_progress returns the covered fraction of the current lap.
    pub fn lap_progress(&self) -> f64 {
        self.track_index / self.track_length()
    }

    pub fn in_pit(&self) -> bool {
        self.sh.in_pit()
    }

    pub fn pit_requested(&self) -> bool {
        self.sh.pit_requested()
    }

    pub fn pit_timer(&self) -> f64 {
        self.sh.pit_timer()
    }

    pub fn status(&self) -> CarStatus {
        if self.finished {
            CarStatus::Finished
        } else {
            CarStatus::Running
        }
    }

    /// advance_index moves the car along the trace and handles the lap wrap. Returns true if a
    /// lap was completed.
    pub(crate) fn advance_index(&mut self, delta_index: f64, total_laps: u32, race_time: f64) -> bool {
        self.track_index += delta_index;

        let track_length = self.track_length();
        if self.track_index < track_length {
            return false;
        }

        self.track_index -= track_length;
        self.lap += 1;

        if self.lap > total_laps {
            self.finished = true;
            self.finish_time = Some(race_time);
            self.track_index = track_length - 1.0;
            tracing::debug!("{} finished the race at {:.3}s", self.driver_code, race_time);
        }
        true
    }

    /// sync_from_telemetry resamples the display fields at the current index.
    pub fn sync_from_telemetry(&mut self) {
        let sample = *self.trace.sample_at(self.track_index);
        self.position_x = sample.x;
        self.position_y = sample.y;
        self.speed = sample.speed;
        self.gear = sample.gear;
    }
}

/// Car state of the lap-time variant.
///
/// * `current_lap` - Current lap (1-based)
/// * `lap_progress` - Covered fraction of the current lap in [0, 1)
/// * `position` - Race position (1-based), recomputed after every tick
/// * `gap_to_leader` - (s) Accumulated time minus the accumulated time of the leader
/// * `last_lap_time` - (s) Duration of the last completed lap
/// * `accumulated_time` - (s) Race time ledger used for ranking, grows by whole laps and pit
/// stops
/// * `cur_lap_elapsed` - (s) Simulated time spent on the current lap (player only)
/// * `history` - Historical race of the driver, ghost script and player baseline
#[derive(Debug, Clone)]
pub struct LapCarState {
    pub driver_code: String,
    pub color: RgbColor,
    pub role: Role,
    pub history: DriverRaceData,
    pub current_lap: u32,
    pub lap_progress: f64,
    pub position: usize,
    pub gap_to_leader: f64,
    pub last_lap_time: f64,
    pub accumulated_time: f64,
    pub cur_lap_elapsed: f64,
    pub tireset: Tireset,
    pub mode: DriveMode,
    pub sh: StateHandler,
    pub finished: bool,
    pub dnf: bool,
}

impl LapCarState {
    /// new creates the car on the grid using the tire state of its first recorded lap.
    pub fn new(history: DriverRaceData, role: Role, position: usize) -> LapCarState {
        let (compound, tire_life) = history
            .laps
            .first()
            .map(|lap| (lap.compound, lap.tire_life))
            .unwrap_or((Compound::Medium, 0));

        LapCarState {
            driver_code: history.driver_code.to_owned(),
            color: RgbColor::parse(&history.team_color),
            role,
            history,
            current_lap: 1,
            lap_progress: 0.0,
            position,
            gap_to_leader: 0.0,
            last_lap_time: 0.0,
            accumulated_time: 0.0,
            cur_lap_elapsed: 0.0,
            tireset: Tireset::new(compound, tire_life as f64),
            mode: DriveMode::Normal,
            sh: StateHandler::default(),
            finished: false,
            dnf: false,
        }
    }

    pub fn in_pit(&self) -> bool {
        self.sh.in_pit()
    }

    pub fn pit_requested(&self) -> bool {
        self.sh.pit_requested()
    }

    pub fn pit_timer(&self) -> f64 {
        self.sh.pit_timer()
    }

    /// next_compound returns the staged compound while a pit stop is pending or active.
    pub fn next_compound(&self) -> Option<Compound> {
        self.sh.next_compound()
    }

    pub fn is_terminal(&self) -> bool {
        self.finished || self.dnf
    }

    pub fn status(&self) -> CarStatus {
        if self.dnf {
            CarStatus::Dnf
        } else if self.finished {
            CarStatus::Finished
        } else {
            CarStatus::Running
        }
    }

    /// race_distance returns the covered distance in laps used for ranking. DNF cars sort last.
    pub fn race_distance(&self) -> f64 {
        if self.dnf {
            -1.0
        } else {
            (self.current_lap as f64 - 1.0) + self.lap_progress
        }
    }

    /// laps_completed returns the number of fully driven laps.
    pub fn laps_completed(&self, total_laps: u32) -> u32 {
        self.current_lap.saturating_sub(1).min(total_laps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::track::TelemetrySample;
    use approx::assert_relative_eq;

    fn trace(len: usize) -> TelemetryTrace {
        let samples = (0..len)
            .map(|i| TelemetrySample {
                x: i as f64,
                y: 0.0,
                speed: 200.0,
                gear: 7,
            })
            .collect();
        TelemetryTrace::new(samples).unwrap()
    }

    #[test]
    fn ghost_jitter_is_deterministic_and_bounded() {
        for code in ["VER", "HAM", "LEC", "NOR", "ALO", ""] {
            let jitter = ghost_pace_jitter(code);
            assert!((0.95 - 1e-9..=1.04 + 1e-9).contains(&jitter), "{}", jitter);
            assert_relative_eq!(jitter, ghost_pace_jitter(code));
            let steps = (jitter - 0.95) / 0.01;
            assert_relative_eq!(steps, steps.round(), epsilon = 1e-9);
        }
        assert!(Role::Player.is_player());
        assert!(!Role::ghost("VER").is_player());
    }

    #[test]
    fn index_wraps_and_finishes() {
        let mut car = CarState::new("VER", RgbColor::default(), Role::Player, trace(10), Compound::Soft);
        assert!(!car.advance_index(9.5, 2, 1.0));
        assert!(car.advance_index(1.0, 2, 2.0));
        assert_eq!(car.lap, 2);
        assert_relative_eq!(car.track_index, 0.5);
        assert!(!car.finished);

        assert!(car.advance_index(10.0, 2, 3.0));
        assert!(car.finished);
        assert_eq!(car.status(), CarStatus::Finished);
        assert_relative_eq!(car.track_index, 9.0);
        assert_eq!(car.finish_time, Some(3.0));
    }

    #[test]
    fn lap_car_starts_on_first_recorded_tires() {
        use crate::core::driver::tests::lap;

        let history = DriverRaceData {
            driver_code: "HAM".to_owned(),
            driver_name: String::new(),
            team: String::new(),
            team_color: "#00d2be".to_owned(),
            laps: vec![lap(1, 90.0, Compound::Hard, 3)],
            final_position: 3,
            total_laps: 1,
        };
        let car = LapCarState::new(history, Role::ghost("HAM"), 3);
        assert_eq!(car.tireset.compound, Compound::Hard);
        assert_relative_eq!(car.tireset.age_laps, 1.0);
        assert_eq!(car.color, RgbColor { r: 0, g: 210, b: 190 });
        assert_relative_eq!(car.race_distance(), 0.0);
        assert_eq!(car.status(), CarStatus::Running);
    }
}
