use crate::core::race::RaceEngine;
use crate::core::tireset::{Compound, DriveMode};
use crate::error::RacesimError;
use crate::interfaces::race_state::{RaceState, MAX_GUI_UPDATE_FREQUENCY};
use crate::post::race_result::RaceResult;
use anyhow::Context;
use flume::Sender;
use std::str::FromStr;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// split_call splits a strategy call of the form `<LAP>:<VALUE>`.
fn split_call(s: &str) -> Result<(u32, &str), RacesimError> {
    let (lap, value) = s
        .split_once(':')
        .ok_or_else(|| RacesimError::InvalidStrategyCall(s.to_owned()))?;
    let lap = lap
        .trim()
        .parse::<u32>()
        .map_err(|_| RacesimError::InvalidStrategyCall(s.to_owned()))?;
    Ok((lap, value))
}

/// Pit stop of the player, requested as soon as the player is on `lap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitCall {
    pub lap: u32,
    pub compound: Compound,
}

impl FromStr for PitCall {
    type Err = RacesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lap, compound) = split_call(s)?;
        Ok(PitCall {
            lap,
            compound: compound.parse()?,
        })
    }
}

/// Drive mode change of the player, applied as soon as the player is on `lap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCall {
    pub lap: u32,
    pub mode: DriveMode,
}

impl FromStr for ModeCall {
    type Err = RacesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lap, mode) = split_call(s)?;
        Ok(ModeCall {
            lap,
            mode: mode.trim().parse()?,
        })
    }
}

/// Scripted decisions of the player for a headless run.
#[derive(Debug, Clone, Default)]
pub struct PlayerStrategy {
    pub pit_calls: Vec<PitCall>,
    pub mode_calls: Vec<ModeCall>,
}

/// StrategyScript feeds the calls of a strategy to an engine in lap order. Every call is issued
/// exactly once.
struct StrategyScript {
    pit_calls: Vec<PitCall>,
    mode_calls: Vec<ModeCall>,
    next_pit: usize,
    next_mode: usize,
}

impl StrategyScript {
    fn new(strategy: &PlayerStrategy) -> StrategyScript {
        let mut pit_calls = strategy.pit_calls.clone();
        let mut mode_calls = strategy.mode_calls.clone();
        pit_calls.sort_by_key(|call| call.lap);
        mode_calls.sort_by_key(|call| call.lap);

        StrategyScript {
            pit_calls,
            mode_calls,
            next_pit: 0,
            next_mode: 0,
        }
    }

    fn apply<E: RaceEngine>(&mut self, engine: &mut E) {
        let cur_lap = engine.player_lap();

        while let Some(call) = self.mode_calls.get(self.next_mode) {
            if call.lap > cur_lap {
                break;
            }
            engine.set_mode(call.mode);
            self.next_mode += 1;
        }

        while let Some(call) = self.pit_calls.get(self.next_pit) {
            if call.lap > cur_lap {
                break;
            }
            if !engine.request_pit(call.compound) {
                tracing::warn!(
                    "Pit call for {} on lap {} rejected, a stop is already pending",
                    call.compound,
                    call.lap
                );
            }
            self.next_pit += 1;
        }
    }
}

/// handle_race simulates the race until every car reached a terminal state and returns the
/// results for post-processing. The player follows the inserted strategy.
///
/// If a sender is inserted the race is simulated in real time (scaled by `realtime_factor`) and
/// race state snapshots are sent at most `MAX_GUI_UPDATE_FREQUENCY` times per simulated second,
/// followed by one final snapshot carrying the result.
pub fn handle_race<E: RaceEngine>(
    engine: &mut E,
    strategy: &PlayerStrategy,
    timestep_size: f64,
    tx: Option<&Sender<RaceState>>,
    realtime_factor: f64,
) -> anyhow::Result<RaceResult> {
    anyhow::ensure!(
        timestep_size > 0.0,
        "Time step size must be positive, got {}!",
        timestep_size
    );
    anyhow::ensure!(
        tx.is_none() || realtime_factor > 0.0,
        "Real-time factor must be positive, got {}!",
        realtime_factor
    );
    anyhow::ensure!(!engine.is_paused(), "Cannot simulate a paused race!");

    let mut script = StrategyScript::new(strategy);
    let mut last_player_lap = engine.player_lap();
    let mut t_race_update_gui = f64::NEG_INFINITY;
    let mut warned_realtime = false;

    while !engine.all_finished() {
        let t_start = Instant::now();

        script.apply(engine);
        let t_race_before = engine.race_time();
        engine.update(timestep_size);
        anyhow::ensure!(
            engine.race_time() > t_race_before,
            "Race clock stalled at {:.3}s, the time multiplier must be positive!",
            t_race_before
        );

        if engine.player_lap() != last_player_lap {
            last_player_lap = engine.player_lap();
            tracing::debug!(
                "Race time {:.3}s, player on lap {} in P{}",
                engine.race_time(),
                last_player_lap,
                engine.player_position()
            );
        }

        let tx = match tx {
            Some(tx) => tx,
            None => continue,
        };

        if engine.race_time() > t_race_update_gui + 1.0 / MAX_GUI_UPDATE_FREQUENCY - 0.001 {
            tx.send(engine.race_state())
                .context("Failed to send race state!")?;
            t_race_update_gui = engine.race_time();
        }

        // sleep until time step is finished in real-time as well
        let t_step = Duration::from_secs_f64(timestep_size / realtime_factor);
        match t_step.checked_sub(t_start.elapsed()) {
            Some(t_sleep) => sleep(t_sleep),
            None if !warned_realtime => {
                tracing::warn!("Could not keep up with real-time!");
                warned_realtime = true;
            }
            None => {}
        }
    }

    let result = engine.race_result();
    tracing::info!(
        "Race finished after {:.3}s, player {} in P{}",
        engine.race_time(),
        engine.player_code(),
        engine.player_position()
    );

    if let Some(tx) = tx {
        let mut final_state = engine.race_state();
        final_state.final_result = Some(result.clone());
        tx.send(final_state)
            .context("Failed to send final race result!")?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::physics::PhysicsModel;
    use crate::core::race::SimConstants;
    use crate::core::weather::Weather;
    use crate::core::whatif_race::LapTimeRace;
    use crate::pre::demo_race::generate_demo_race;

    fn demo_race() -> LapTimeRace {
        LapTimeRace::new(
            generate_demo_race(7, 3).unwrap().race_data,
            "VER",
            PhysicsModel::default(),
            Weather::new(),
            SimConstants::default(),
        )
        .unwrap()
    }

    #[test]
    fn stalled_clock_ends_the_run() {
        let mut race = demo_race();
        race.set_time_multiplier(0.0);
        let err = handle_race(&mut race, &PlayerStrategy::default(), 0.1, None, 1.0).unwrap_err();
        assert!(err.to_string().contains("stalled"));

        let mut race = demo_race();
        race.toggle_pause();
        let err = handle_race(&mut race, &PlayerStrategy::default(), 0.1, None, 1.0).unwrap_err();
        assert!(err.to_string().contains("paused"));
    }

    #[test]
    fn strategy_calls_are_parsed() {
        assert_eq!(
            "12:hard".parse::<PitCall>().unwrap(),
            PitCall {
                lap: 12,
                compound: Compound::Hard
            }
        );
        assert_eq!(
            " 3:PUSH".parse::<ModeCall>().unwrap(),
            ModeCall {
                lap: 3,
                mode: DriveMode::Push
            }
        );
        assert_eq!(
            "x:HARD".parse::<PitCall>().unwrap_err(),
            RacesimError::InvalidStrategyCall("x:HARD".to_owned())
        );
        assert_eq!(
            "12".parse::<PitCall>().unwrap_err(),
            RacesimError::InvalidStrategyCall("12".to_owned())
        );
        assert_eq!(
            "4:push".parse::<ModeCall>().unwrap_err(),
            RacesimError::UnknownMode("push".to_owned())
        );
    }
}
