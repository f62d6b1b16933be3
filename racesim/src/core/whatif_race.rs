use crate::core::car::{LapCarState, Role};
use crate::core::driver::RaceData;
use crate::core::oracle::recommend;
use crate::core::physics::PhysicsModel;
use crate::core::race::{RaceEngine, SimConstants};
use crate::core::tireset::{Compound, DriveMode};
use crate::core::weather::Weather;
use crate::error::{RacesimError, Result};
use crate::interfaces::race_state::{CarSnapshot, RaceState};
use crate::post::race_result::{ClassifiedCar, HistoricalComparison, RaceResult};
use helpers::general::{argmax, argsort, argsort_by_keys, SortOrder};
use std::collections::HashMap;

/// Race engine replaying recorded lap times. Ghosts cross the line exactly at their recorded
/// cumulative times, the player's recorded lap times are rescaled by the physics model.
#[derive(Debug)]
pub struct LapTimeRace {
    pub total_laps: u32,
    pub race_time: f64,
    pub paused: bool,
    consts: SimConstants,
    physics: PhysicsModel,
    weather: Weather,
    player_code: String,
    player_idx: usize,
    cars_list: Vec<LapCarState>,
    car_idxs: HashMap<String, usize>,
}

impl LapTimeRace {
    pub fn new(
        race_data: RaceData,
        player_code: &str,
        physics: PhysicsModel,
        weather: Weather,
        consts: SimConstants,
    ) -> Result<LapTimeRace> {
        consts.check()?;
        if race_data.drivers.is_empty() {
            return Err(RacesimError::EmptyDataset);
        }

        let mut cars_list = Vec::with_capacity(race_data.drivers.len());
        let mut car_idxs = HashMap::with_capacity(race_data.drivers.len());

        for history in race_data.drivers.into_iter() {
            if history.laps.is_empty() {
                return Err(RacesimError::NoLapRecords(history.driver_code));
            }
            if car_idxs.contains_key(&history.driver_code) {
                tracing::warn!("Skipping duplicate driver {}", history.driver_code);
                continue;
            }

            let role = if history.driver_code == player_code {
                Role::Player
            } else {
                Role::ghost(&history.driver_code)
            };

            car_idxs.insert(history.driver_code.to_owned(), cars_list.len());
            let position = cars_list.len() + 1;
            cars_list.push(LapCarState::new(history, role, position));
        }

        let player_idx = *car_idxs
            .get(player_code)
            .ok_or_else(|| RacesimError::UnknownPlayer(player_code.to_owned()))?;

        tracing::info!(
            "Lap time race set up with {} cars over {} laps, player {}",
            cars_list.len(),
            race_data.total_laps,
            player_code
        );

        let mut race = LapTimeRace {
            total_laps: race_data.total_laps,
            race_time: 0.0,
            paused: false,
            consts,
            physics,
            weather,
            player_code: player_code.to_owned(),
            player_idx,
            cars_list,
            car_idxs,
        };
        race.recalculate_positions();
        Ok(race)
    }

    pub fn cars(&self) -> &[LapCarState] {
        &self.cars_list
    }

    pub fn car(&self, driver_code: &str) -> Option<&LapCarState> {
        self.car_idxs.get(driver_code).map(|&idx| &self.cars_list[idx])
    }

    pub fn player(&self) -> &LapCarState {
        &self.cars_list[self.player_idx]
    }

    /// sorted_cars returns the cars ordered by their current position.
    pub fn sorted_cars(&self) -> Vec<&LapCarState> {
        let positions: Vec<f64> = self.cars_list.iter().map(|car| car.position as f64).collect();
        argsort(&positions, SortOrder::Ascending)
            .into_iter()
            .map(|idx| &self.cars_list[idx])
            .collect()
    }

    /// historical_comparison compares the simulated position of the player with the historical
    /// position at the player's current lap.
    pub fn historical_comparison(&self) -> HistoricalComparison {
        let player = self.player();
        let lap = player.current_lap.min(self.total_laps);
        HistoricalComparison::new(
            player.history.position_at_lap(lap),
            player.position,
            player.history.final_position,
        )
    }

    /// recalculate_positions ranks the field by covered distance, ties are broken by the
    /// accumulated time. The gap reference is the accumulated time of the first car after
    /// sorting.
    fn recalculate_positions(&mut self) {
        let distances: Vec<f64> = self.cars_list.iter().map(|car| car.race_distance()).collect();
        let times: Vec<f64> = self.cars_list.iter().map(|car| car.accumulated_time).collect();
        let order = argsort_by_keys(&distances, SortOrder::Descending, &times, SortOrder::Ascending);

        let t_leader = match order.first() {
            Some(&idx) => self.cars_list[idx].accumulated_time,
            None => return,
        };

        for (rank, &idx) in order.iter().enumerate() {
            let car = &mut self.cars_list[idx];
            car.position = rank + 1;
            car.gap_to_leader = car.accumulated_time - t_leader;
        }
    }

    /// reconstruct_at_lap restores the historical state of a car at the start of the given lap.
    /// Tire wear is not recorded and restarts at 0.0.
    fn reconstruct_at_lap(car: &mut LapCarState, lap: u32) {
        car.sh.reset();
        car.lap_progress = 0.0;
        car.cur_lap_elapsed = 0.0;
        car.finished = false;
        car.dnf = false;
        car.tireset.wear = 0.0;

        let record = car
            .history
            .lap(lap)
            .map(|rec| (rec.compound, rec.tire_life, rec.position));

        match record {
            Some((compound, tire_life, position)) => {
                car.current_lap = lap;
                car.tireset.compound = compound;
                car.tireset.age_laps = tire_life as f64;
                car.position = position as usize;
            }
            None => {
                // retired before this lap, keeps the tires of its last recorded lap
                let last_lap = car.history.laps.last().map_or(0, |rec| rec.lap_number);
                car.current_lap = (last_lap + 1).min(lap);
                car.position = car.history.final_position as usize;
                car.dnf = true;
                if let Some(compound) = car.history.compound_at_lap(last_lap) {
                    car.tireset.compound = compound;
                }
            }
        }

        car.accumulated_time = car.history.time_before_lap(car.current_lap);
        car.last_lap_time = car
            .history
            .lap(car.current_lap.saturating_sub(1))
            .map_or(0.0, |rec| rec.lap_time_seconds);
    }

    /// set_gaps_from_reconstruction sets the gaps relative to the car in the reconstructed lead,
    /// i.e. the best placed car still racing.
    fn set_gaps_from_reconstruction(&mut self) {
        let t_ref = self
            .cars_list
            .iter()
            .filter(|car| !car.dnf)
            .min_by_key(|car| car.position)
            .map_or(0.0, |car| car.accumulated_time);

        for car in self.cars_list.iter_mut() {
            car.gap_to_leader = car.accumulated_time - t_ref;
        }
    }

    fn mean_accumulated_time(&self) -> f64 {
        let sum: f64 = self.cars_list.iter().map(|car| car.accumulated_time).sum();
        sum / self.cars_list.len() as f64
    }
}

/// step_ghost advances a ghost by its recorded lap times. Time left over after crossing the line
/// is carried into the next lap in seconds, so every crossing happens at the recorded cumulative
/// time, also if a step spans several laps.
fn step_ghost(car: &mut LapCarState, dt: f64, total_laps: u32) {
    let mut t_left = dt;

    while !car.is_terminal() {
        let (lap_time, was_pit_in) = match car.history.lap(car.current_lap) {
            Some(rec) => (rec.lap_time_seconds, rec.is_pit_in),
            None => {
                car.dnf = true;
                tracing::debug!("{} retired on lap {}", car.driver_code, car.current_lap);
                return;
            }
        };

        let t_to_line = (1.0 - car.lap_progress) * lap_time;
        if t_left < t_to_line {
            car.lap_progress += t_left / lap_time;
            return;
        }

        t_left -= t_to_line;
        car.lap_progress = 0.0;
        car.last_lap_time = lap_time;
        car.accumulated_time += lap_time;
        car.current_lap += 1;

        if car.current_lap > total_laps {
            car.finished = true;
            tracing::debug!("{} finished after {:.3}s", car.driver_code, car.accumulated_time);
            return;
        }

        // tire state comes from the next record, age restarts after a recorded stop
        if let Some(next) = car.history.lap(car.current_lap) {
            car.tireset.compound = next.compound;
            car.tireset.age_laps = if was_pit_in { 0.0 } else { next.tire_life as f64 };
        }
    }
}

/// step_player advances the player by the physics-scaled recorded lap times. Pace and wear are
/// evaluated per lap segment of the step.
fn step_player(
    car: &mut LapCarState,
    dt: f64,
    physics: &PhysicsModel,
    rain_intensity: f64,
    consts: &SimConstants,
    total_laps: u32,
) {
    if car.is_terminal() {
        return;
    }

    if car.in_pit() {
        if !car.sh.increment_t_standstill(dt) {
            return;
        }

        let compound = car.sh.deact_pit_standstill().unwrap_or(car.tireset.compound);
        car.tireset.fit_new(compound);
        tracing::debug!("{} left the pit on {}", car.driver_code, compound);
    }

    let mut t_left = dt;

    loop {
        let base_lap_time = match car.history.lap(car.current_lap) {
            Some(rec) => rec.lap_time_seconds,
            None => {
                car.finished = true;
                tracing::debug!("{} has no baseline for lap {}", car.driver_code, car.current_lap);
                return;
            }
        };

        let pace_factor = physics.pace_factor(
            car.tireset.compound,
            car.tireset.wear,
            car.mode,
            rain_intensity,
        );
        let modified_lap_time = base_lap_time / pace_factor;
        let wear_increment =
            physics.tire_wear_increment(car.tireset.compound, car.tireset.wear, car.mode);

        let t_to_line = (1.0 - car.lap_progress) * modified_lap_time;
        if t_left < t_to_line {
            let lap_frac = t_left / modified_lap_time;
            car.tireset.add_wear(wear_increment, lap_frac);
            car.lap_progress += lap_frac;
            car.cur_lap_elapsed += t_left;
            return;
        }

        // the line is crossed within this step
        car.tireset.add_wear(wear_increment, 1.0 - car.lap_progress);
        car.cur_lap_elapsed += t_to_line;
        t_left -= t_to_line;

        let lap_time = car.cur_lap_elapsed;
        car.last_lap_time = lap_time;
        car.accumulated_time += lap_time;
        car.current_lap += 1;
        car.tireset.age_laps += 1.0;
        car.lap_progress = 0.0;
        car.cur_lap_elapsed = 0.0;

        if car.current_lap > total_laps {
            car.finished = true;
            tracing::debug!("{} finished after {:.3}s", car.driver_code, car.accumulated_time);
            return;
        }

        tracing::debug!(
            "{} completed lap {} in {:.3}s, tire wear {:.3}",
            car.driver_code,
            car.current_lap - 1,
            lap_time,
            car.tireset.wear
        );

        // the lap boundary is the pit entry, the stop is booked at once and the rest of the step
        // is spent entering the pit
        if car.pit_requested() && car.sh.act_pit_standstill(consts.laptime_pit_duration) {
            car.accumulated_time += consts.laptime_pit_duration;
            tracing::debug!("{} entered the pit on lap {}", car.driver_code, car.current_lap);
            return;
        }
    }
}

impl RaceEngine for LapTimeRace {
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
                ),
                Role::Ghost { .. } => step_ghost(car, sim_dt, self.total_laps),
            }
        }

        self.recalculate_positions();
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
            Self::reconstruct_at_lap(car, lap);
        }
        self.set_gaps_from_reconstruction();

        self.race_time = self.mean_accumulated_time();
        tracing::debug!("Jumped to lap {}, race time {:.1}s", lap, self.race_time);
    }

    fn set_race_progress(&mut self, progress: f64) {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };

        let distance = progress * self.total_laps as f64;
        let target_lap = distance.floor() as u32 + 1;
        let lap_frac = distance - distance.floor();

        self.jump_to_lap(target_lap.min(self.total_laps));

        let total_laps = self.total_laps;
        for car in self.cars_list.iter_mut().filter(|car| !car.dnf) {
            if target_lap > total_laps {
                car.current_lap = total_laps + 1;
                car.accumulated_time = car.history.time_before_lap(car.current_lap);
                car.position = car.history.final_position as usize;
                car.finished = true;
            } else {
                car.lap_progress = lap_frac;
                car.cur_lap_elapsed = car
                    .history
                    .lap(car.current_lap)
                    .map_or(0.0, |rec| lap_frac * rec.lap_time_seconds);
            }
        }
        self.set_gaps_from_reconstruction();

        self.race_time = self.mean_accumulated_time();
        tracing::debug!("Set race progress to {:.3}", progress);
    }

    fn player_code(&self) -> &str {
        &self.player_code
    }

    fn player_lap(&self) -> u32 {
        self.player().current_lap
    }

    fn player_position(&self) -> usize {
        self.player().position
    }

    fn race_progress(&self) -> f64 {
        let distances: Vec<f64> = self.cars_list.iter().map(|car| car.race_distance()).collect();
        let leader = &self.cars_list[argmax(&distances)];
        let progress = leader.race_distance() / self.total_laps as f64;
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
        self.cars_list.iter().all(|car| car.is_terminal())
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
            .map(|car| CarSnapshot {
                driver_code: car.driver_code.to_owned(),
                color: car.color,
                is_player: car.role.is_player(),
                position: car.position,
                lap: car.current_lap,
                lap_progress: car.lap_progress,
                gap_to_leader: Some(car.gap_to_leader),
                compound: car.tireset.compound,
                tire_wear: car.tireset.wear,
                tire_age_laps: car.tireset.age_laps,
                mode: car.mode,
                in_pit: car.in_pit(),
                pit_requested: car.pit_requested(),
                status: car.status(),
                x: None,
                y: None,
                speed: None,
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
            historical: Some(self.historical_comparison()),
            final_result: None,
        }
    }

    fn race_result(&self) -> RaceResult {
        let classification = self
            .sorted_cars()
            .into_iter()
            .map(|car| ClassifiedCar {
                position: car.position,
                driver_code: car.driver_code.to_owned(),
                is_player: car.role.is_player(),
                status: car.status(),
                laps_completed: car.laps_completed(self.total_laps),
                race_time: if car.finished && !car.dnf {
                    Some(car.accumulated_time)
                } else {
                    None
                },
                gap_to_leader: if car.dnf { None } else { Some(car.gap_to_leader) },
                compound: car.tireset.compound,
            })
            .collect();

        RaceResult {
            tot_no_laps: self.total_laps,
            player_code: self.player_code.to_owned(),
            race_time: self.race_time,
            classification,
            historical: Some(self.historical_comparison()),
        }
    }
}
