use crate::core::car::{CarState, Role};
use crate::core::oracle::recommend;
use crate::core::physics::PhysicsModel;
use crate::core::race::{RaceEngine, SimConstants};
use crate::core::tireset::{Compound, DriveMode};
use crate::core::track::TelemetryTrace;
use crate::core::weather::Weather;
use crate::error::{RacesimError, Result};
use crate::interfaces::race_state::{CarSnapshot, RaceState, RgbColor};
use crate::post::race_result::{ClassifiedCar, RaceResult};
use helpers::general::{argsort, SortOrder};
use std::collections::HashMap;

/// Lap weight of the ranking key, must exceed every trace length.
const LAP_SORT_WEIGHT: f64 = 1.0e6;

/// Input of one driver for the telemetry variant.
///
/// * `team_color` - CSS color string, e.g. #1e41ff
/// * `start_compound` - Compound mounted at the start
/// * `trace` - Resampled telemetry of the driver's reference lap
#[derive(Debug, Clone)]
pub struct TelemetryEntry {
    pub driver_code: String,
    pub team_color: String,
    pub start_compound: Compound,
    pub trace: TelemetryTrace,
}

/// Race engine replaying recorded telemetry. Ghosts move along their trace at a jittered base
/// rate, the player's rate is modulated by the physics model.
#[derive(Debug)]
pub struct TelemetryRace {
    pub total_laps: u32,
    pub race_time: f64,
    pub paused: bool,
    consts: SimConstants,
    physics: PhysicsModel,
    weather: Weather,
    player_code: String,
    player_idx: usize,
    cars_list: Vec<CarState>,
    car_idxs: HashMap<String, usize>,
}

impl TelemetryRace {
    pub fn new(
        entries: Vec<TelemetryEntry>,
        player_code: &str,
        total_laps: u32,
        physics: PhysicsModel,
        weather: Weather,
        consts: SimConstants,
    ) -> Result<TelemetryRace> {
        consts.check()?;
        if entries.is_empty() {
            return Err(RacesimError::EmptyDataset);
        }

        let mut cars_list = Vec::with_capacity(entries.len());
        let mut car_idxs = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.into_iter().enumerate() {
            if car_idxs.contains_key(&entry.driver_code) {
                tracing::warn!("Skipping duplicate driver {}", entry.driver_code);
                continue;
            }

            let role = if entry.driver_code == player_code {
                Role::Player
            } else {
                Role::ghost(&entry.driver_code)
            };

            // stagger the grid
            let track_length = entry.trace.length();
            let start_idx = (consts.grid_spacing * i as f64) % track_length;

            let mut car = CarState::new(
                &entry.driver_code,
                RgbColor::parse(&entry.team_color),
                role,
                entry.trace,
                entry.start_compound,
            );
            car.track_index = start_idx;
            car.sync_from_telemetry();

            car_idxs.insert(entry.driver_code, cars_list.len());
            cars_list.push(car);
        }

        let player_idx = *car_idxs
            .get(player_code)
            .ok_or_else(|| RacesimError::UnknownPlayer(player_code.to_owned()))?;

        tracing::info!(
            "Telemetry race set up with {} cars over {} laps, player {}",
            cars_list.len(),
            total_laps,
            player_code
        );

        Ok(TelemetryRace {
            total_laps,
            race_time: 0.0,
            paused: false,
            consts,
            physics,
            weather,
            player_code: player_code.to_owned(),
            player_idx,
            cars_list,
            car_idxs,
        })
    }

    pub fn cars(&self) -> &[CarState] {
        &self.cars_list
    }

    pub fn car(&self, driver_code: &str) -> Option<&CarState> {
        self.car_idxs.get(driver_code).map(|&idx| &self.cars_list[idx])
    }

    pub fn player(&self) -> &CarState {
        &self.cars_list[self.player_idx]
    }

    /// sorted_car_idxs returns the car indices ordered by race position. Ties keep insertion
    /// order.
    fn sorted_car_idxs(&self) -> Vec<usize> {
        let keys: Vec<f64> = self
            .cars_list
            .iter()
            .map(|car| car.lap as f64 * LAP_SORT_WEIGHT + car.track_index)
            .collect();
        argsort(&keys, SortOrder::Descending)
    }

    /// sorted_cars returns the cars ordered by race position, lap first and track index second.
    pub fn sorted_cars(&self) -> Vec<&CarState> {
        self.sorted_car_idxs()
            .into_iter()
            .map(|idx| &self.cars_list[idx])
            .collect()
    }

    fn reset_for_jump(car: &mut CarState) {
        car.sh.reset();
        car.finish_time = None;
        car.sync_from_telemetry();
    }
}

/// step_ghost advances a ghost at its jittered base rate.
fn step_ghost(
    car: &mut CarState,
    pace_jitter: f64,
    dt: f64,
    consts: &SimConstants,
    total_laps: u32,
    race_time: f64,
) {
    if car.finished {
        return;
    }

    car.advance_index(dt * consts.base_rate * pace_jitter, total_laps, race_time);
    car.sync_from_telemetry();
}

/// step_player advances the player according to pit state and physics.
fn step_player(
    car: &mut CarState,
    dt: f64,
    physics: &PhysicsModel,
    rain_intensity: f64,
    consts: &SimConstants,
    total_laps: u32,
    race_time: f64,
) {
    if car.finished {
        return;
    }

    // pit entry zone
    if car.pit_requested()
        && car.lap_progress() >= consts.pit_entry_zone
        && car.sh.act_pit_standstill(consts.telemetry_pit_duration)
    {
        tracing::debug!(
            "{} entered the pit on lap {} at {:.3}s",
            car.driver_code,
            car.lap,
            race_time
        );
    }

    if car.in_pit() {
        if !car.sh.increment_t_standstill(dt) {
            return;
        }

        let compound = car.sh.deact_pit_standstill().unwrap_or(car.tireset.compound);
        car.tireset.fit_new(compound);
        tracing::debug!("{} left the pit on {}", car.driver_code, compound);
    }

    let pace_factor = physics.pace_factor(
        car.tireset.compound,
        car.tireset.wear,
        car.mode,
        rain_intensity,
    );
    let delta_index = dt * consts.base_rate * pace_factor;

    let lap_frac = delta_index / car.track_length();
    let wear_increment =
        physics.tire_wear_increment(car.tireset.compound, car.tireset.wear, car.mode);
    car.tireset.drive_lap_frac(wear_increment, lap_frac);

    if car.advance_index(delta_index, total_laps, race_time) && !car.finished {
        tracing::debug!(
            "{} started lap {}, tire wear {:.3}",
            car.driver_code,
            car.lap,
            car.tireset.wear
        );
    }
    car.sync_from_telemetry();
}

impl RaceEngine for TelemetryRace {
    fn update(&mut self, dt: f64) {
        if self.paused {
            return;
        }

        let sim_dt = dt * self.consts.time_multiplier;
        self.race_time += sim_dt;

        let rain_intensity = self.weather.get_current_weather(self.race_time);

        for car in self.cars_list.iter_mut() {
            match car.role {
                Role::Player => step_player(
                    car,
                    sim_dt,
                    &self.physics,
                    rain_intensity,
                    &self.consts,
                    self.total_laps,
                    self.race_time,
                ),
                Role::Ghost { pace_jitter } => step_ghost(
                    car,
                    pace_jitter,
                    sim_dt,
                    &self.consts,
                    self.total_laps,
                    self.race_time,
                ),
            }
        }
    }

    fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_time_multiplier(&mut self, time_multiplier: f64) {
        self.consts.time_multiplier = time_multiplier.max(0.0);
    }

    fn set_mode(&mut self, mode: DriveMode) {
        let player = &mut self.cars_list[self.player_idx];
        if player.mode != mode {
            tracing::debug!("{} switched to {}", player.driver_code, mode);
        }
        player.mode = mode;
    }

    fn request_pit(&mut self, compound: Compound) -> bool {
        let player = &mut self.cars_list[self.player_idx];
        let ok = player.sh.request_pit(compound);
        if ok {
            tracing::debug!("{} requested a pit stop for {}", player.driver_code, compound);
        }
        ok
    }

    fn cancel_pit(&mut self) -> bool {
        let player = &mut self.cars_list[self.player_idx];
        let ok = player.sh.cancel_pit();
        if ok {
            tracing::debug!("{} cancelled the pit stop", player.driver_code);
        }
        ok
    }

    fn jump_to_lap(&mut self, lap: u32) {
        let lap = lap.clamp(1, self.total_laps.max(1));

        for car in self.cars_list.iter_mut() {
            car.lap = lap;
            car.track_index = 0.0;
            car.finished = lap > self.total_laps;
            Self::reset_for_jump(car);
        }

        self.race_time = (lap - 1) as f64 * self.consts.avg_lap_time_estimate;
        tracing::debug!("Jumped to lap {}, estimated race time {:.1}s", lap, self.race_time);
    }

    fn set_race_progress(&mut self, progress: f64) {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };

        let distance = progress * self.total_laps as f64;
        let target_lap = distance.floor() as u32 + 1;
        let lap_frac = distance - distance.floor();

        for car in self.cars_list.iter_mut() {
            car.lap = target_lap.min(self.total_laps);
            car.track_index = lap_frac * car.track_length();
            car.finished = target_lap > self.total_laps;
            Self::reset_for_jump(car);
        }

        self.race_time = progress * self.total_laps as f64 * self.consts.avg_lap_time_estimate;
        tracing::debug!("Set race progress to {:.3}", progress);
    }

    fn player_code(&self) -> &str {
        &self.player_code
    }

    fn player_lap(&self) -> u32 {
        self.player().lap
    }

    fn player_position(&self) -> usize {
        self.sorted_car_idxs()
            .iter()
            .position(|&idx| idx == self.player_idx)
            .map(|rank| rank + 1)
            .unwrap_or(self.cars_list.len())
    }

    fn race_progress(&self) -> f64 {
        let leader = match self.sorted_cars().first() {
            Some(car) => *car,
            None => return 0.0,
        };

        let completed_laps = leader.lap as f64 - 1.0;
        let progress = (completed_laps + leader.lap_progress()) / self.total_laps as f64;
        if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        }
    }

    fn race_time(&self) -> f64 {
        self.race_time
    }

    fn total_laps(&self) -> u32 {
        self.total_laps
    }

    fn all_finished(&self) -> bool {
        self.cars_list.iter().all(|car| car.finished)
    }

    fn weather(&self) -> &Weather {
        &self.weather
    }

    fn weather_mut(&mut self) -> &mut Weather {
        &mut self.weather
    }

    fn race_state(&self) -> RaceState {
        let car_states = self
            .sorted_cars()
            .into_iter()
            .enumerate()
            .map(|(rank, car)| CarSnapshot {
                driver_code: car.driver_code.to_owned(),
                color: car.color,
                is_player: car.role.is_player(),
                position: rank + 1,
                lap: car.lap,
                lap_progress: car.lap_progress(),
                gap_to_leader: None,
                compound: car.tireset.compound,
                tire_wear: car.tireset.wear,
                tire_age_laps: car.tireset.age_laps,
                mode: car.mode,
                in_pit: car.in_pit(),
                pit_requested: car.pit_requested(),
                status: car.status(),
                x: Some(car.position_x),
                y: Some(car.position_y),
                speed: Some(car.speed),
            })
            .collect();

        let rain_intensity = self.weather.get_current_weather(self.race_time);

        RaceState {
            car_states,
            race_time: self.race_time,
            race_progress: self.race_progress(),
            total_laps: self.total_laps,
            rain_intensity,
            sandbox_weather: self.weather.sandbox_mode(),
            paused: self.paused,
            player_code: self.player_code.to_owned(),
            player_position: self.player_position(),
            recommendation: recommend(self.player().tireset.age_laps, rain_intensity),
            historical: None,
            final_result: None,
        }
    }

    fn race_result(&self) -> RaceResult {
        let sorted = self.sorted_cars();
        let leader_time = sorted.first().and_then(|car| car.finish_time);

        let classification = sorted
            .iter()
            .enumerate()
            .map(|(rank, car)| ClassifiedCar {
                position: rank + 1,
                driver_code: car.driver_code.to_owned(),
                is_player: car.role.is_player(),
                status: car.status(),
                laps_completed: car.lap.saturating_sub(1).min(self.total_laps),
                race_time: car.finish_time,
                gap_to_leader: match (car.finish_time, leader_time) {
                    (Some(t), Some(t_leader)) => Some(t - t_leader),
                    _ => None,
                },
                compound: car.tireset.compound,
            })
            .collect();

        RaceResult {
            tot_no_laps: self.total_laps,
            player_code: self.player_code.to_owned(),
            race_time: self.race_time,
            classification,
            historical: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::physics::PhysicsPars;
    use crate::core::track::TelemetrySample;
    use approx::assert_relative_eq;

    fn trace(len: usize) -> TelemetryTrace {
        let samples = (0..len)
            .map(|i| TelemetrySample {
                x: i as f64,
                y: 2.0 * i as f64,
                speed: 100.0 + i as f64,
                gear: 4,
            })
            .collect();
        TelemetryTrace::new(samples).unwrap()
    }

    fn entry(code: &str, len: usize) -> TelemetryEntry {
        TelemetryEntry {
            driver_code: code.to_owned(),
            team_color: "#dc0000".to_owned(),
            start_compound: Compound::Medium,
            trace: trace(len),
        }
    }

    fn race(codes: &[&str], player: &str, total_laps: u32) -> TelemetryRace {
        let entries = codes.iter().map(|code| entry(code, 100)).collect();
        TelemetryRace::new(
            entries,
            player,
            total_laps,
            PhysicsModel::new(PhysicsPars::default()),
            Weather::new(),
            SimConstants::default(),
        )
        .unwrap()
    }

    #[test]
    fn construction_validates_input() {
        let err = TelemetryRace::new(
            Vec::new(),
            "VER",
            3,
            PhysicsModel::new(PhysicsPars::default()),
            Weather::new(),
            SimConstants::default(),
        )
        .unwrap_err();
        assert_eq!(err, RacesimError::EmptyDataset);

        let err = TelemetryRace::new(
            vec![entry("VER", 10)],
            "HAM",
            3,
            PhysicsModel::new(PhysicsPars::default()),
            Weather::new(),
            SimConstants::default(),
        )
        .unwrap_err();
        assert_eq!(err, RacesimError::UnknownPlayer("HAM".to_owned()));
    }

    #[test]
    fn grid_is_staggered_and_synced() {
        let race = race(&["VER", "HAM", "LEC"], "HAM", 3);
        assert_relative_eq!(race.car("VER").unwrap().track_index, 0.0);
        assert_relative_eq!(race.car("HAM").unwrap().track_index, 5.0);
        let lec = race.car("LEC").unwrap();
        assert_relative_eq!(lec.track_index, 10.0);
        assert_relative_eq!(lec.position_x, 10.0);
        assert_relative_eq!(lec.speed, 110.0);
        assert_eq!(race.player_position(), 2);
    }

    #[test]
    fn ghost_advances_at_jittered_base_rate() {
        let mut race = race(&["VER", "HAM"], "HAM", 3);
        let jitter = match race.car("VER").unwrap().role {
            Role::Ghost { pace_jitter } => pace_jitter,
            Role::Player => panic!("VER must be a ghost"),
        };
        race.update(1.0);
        assert_relative_eq!(race.car("VER").unwrap().track_index, 10.0 * jitter, epsilon = 1e-9);
        assert_relative_eq!(race.race_time, 1.0);
    }

    #[test]
    fn pause_freezes_everything() {
        let mut race = race(&["VER", "HAM"], "HAM", 3);
        assert!(race.toggle_pause());
        race.update(1.0);
        assert_relative_eq!(race.race_time, 0.0);
        assert_relative_eq!(race.car("VER").unwrap().track_index, 0.0);
        assert!(!race.toggle_pause());
    }

    #[test]
    fn time_multiplier_scales_dt() {
        let mut race = race(&["VER", "HAM"], "HAM", 3);
        race.set_time_multiplier(4.0);
        race.update(0.5);
        assert_relative_eq!(race.race_time, 2.0);
    }

    #[test]
    fn player_wears_tires_in_dry() {
        let mut race = race(&["VER", "HAM"], "HAM", 3);
        race.update(1.0);
        let ham = race.car("HAM").unwrap();
        assert!(ham.tireset.wear > 0.0);
        assert!(ham.tireset.age_laps > 0.0);
        // NORMAL on fresh MEDIUM in the dry is slower than the softest baseline
        assert!(ham.track_index < 15.0);
    }

    #[test]
    fn higher_lap_outranks_higher_index() {
        let mut race = race(&["VER", "HAM"], "HAM", 5);
        race.cars_list[0].lap = 2;
        race.cars_list[0].track_index = 1.0;
        race.cars_list[1].lap = 1;
        race.cars_list[1].track_index = 99.0;
        let sorted: Vec<&str> = race.sorted_cars().iter().map(|c| c.driver_code.as_str()).collect();
        assert_eq!(sorted, vec!["VER", "HAM"]);
        assert_eq!(race.player_position(), 2);
        assert_relative_eq!(race.race_progress(), 1.01 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_commands_are_rejected() {
        let mut race = race(&["VER", "HAM"], "HAM", 3);
        assert!(!race.set_mode_name("SPRINT"));
        assert_eq!(race.player().mode, DriveMode::Normal);
        assert!(race.set_mode_name("PUSH"));
        assert_eq!(race.player().mode, DriveMode::Push);

        assert!(!race.request_pit_name("SLICK"));
        assert!(!race.player().pit_requested());
        assert!(!race.cancel_pit());
        assert!(race.request_pit_name("soft"));
        assert!(!race.request_pit(Compound::Hard));
        assert_eq!(race.player().sh.next_compound(), Some(Compound::Soft));
        assert!(race.cancel_pit());
        assert!(!race.player().pit_requested());
    }

    #[test]
    fn jump_resets_field_and_estimates_clock() {
        let mut race = race(&["VER", "HAM"], "HAM", 10);
        race.request_pit(Compound::Hard);
        race.jump_to_lap(4);
        for car in race.cars() {
            assert_eq!(car.lap, 4);
            assert_relative_eq!(car.track_index, 0.0);
            assert!(!car.pit_requested());
            assert!(!car.finished);
        }
        assert_relative_eq!(race.race_time, 270.0);

        race.jump_to_lap(99);
        assert_eq!(race.player_lap(), 10);
        race.jump_to_lap(0);
        assert_eq!(race.player_lap(), 1);
    }

    #[test]
    fn full_progress_finishes_everyone() {
        let mut race = race(&["VER", "HAM"], "HAM", 10);
        race.set_race_progress(0.25);
        for car in race.cars() {
            assert_eq!(car.lap, 3);
            assert_relative_eq!(car.track_index, 50.0);
        }
        assert_relative_eq!(race.race_time, 225.0);

        race.set_race_progress(2.0);
        assert!(race.all_finished());
        assert_eq!(race.player_lap(), 10);
        // lap is clamped while the index restarts at 0
        assert_relative_eq!(race.race_progress(), 0.9);
    }
}
