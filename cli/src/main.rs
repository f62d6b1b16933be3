use anyhow::Context;
use clap::Parser;
use racesim::core::driver::RaceData;
use racesim::core::handle_race::{handle_race, PitCall, PlayerStrategy};
use racesim::core::physics::{PhysicsModel, PhysicsPars};
use racesim::core::race::{RaceEngine, SimConstants};
use racesim::core::replay_race::{TelemetryEntry, TelemetryRace};
use racesim::core::tireset::Compound;
use racesim::core::track::TelemetryTrace;
use racesim::core::weather::{Weather, WeatherRecord};
use racesim::core::whatif_race::LapTimeRace;
use racesim::interfaces::race_state::RaceState;
use racesim::post::race_result::RaceResult;
use racesim::pre::demo_race::generate_demo_race;
use racesim::pre::read_sim_pars::{
    read_physics_pars, read_race_data, read_sim_constants, read_telemetry_dir,
    read_weather_timeline,
};
use racesim::pre::sim_opts::{SimOpts, Variant};
use rayon::prelude::*;
use std::collections::HashMap;
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Race time between two printed live snapshots.
const LIVE_PRINT_INTERVAL: f64 = 10.0;

/// Inputs of a simulation run, either read from files or generated.
struct RaceInputs {
    race_data: RaceData,
    traces: Option<HashMap<String, TelemetryTrace>>,
    weather_records: Vec<WeatherRecord>,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_inputs(sim_opts: &SimOpts) -> anyhow::Result<RaceInputs> {
    let mut inputs = if let Some(data_path) = &sim_opts.data_path {
        tracing::info!("Reading race data from {:?}", data_path);
        let race_data = read_race_data(data_path)?;

        let traces = match &sim_opts.telemetry_dir {
            Some(dir) => {
                let codes: Vec<&str> = race_data
                    .drivers
                    .iter()
                    .map(|drv| drv.driver_code.as_str())
                    .collect();
                Some(read_telemetry_dir(dir, &codes)?)
            }
            None => None,
        };

        RaceInputs {
            race_data,
            traces,
            weather_records: Vec::new(),
        }
    } else {
        tracing::info!("No race data provided, generating a demo race");
        let demo = generate_demo_race(sim_opts.seed, sim_opts.demo_laps)?;
        RaceInputs {
            race_data: demo.race_data,
            traces: Some(demo.traces),
            weather_records: demo.weather,
        }
    };

    if let Some(weather_path) = &sim_opts.weather_path {
        tracing::info!("Reading weather timeline from {:?}", weather_path);
        inputs.weather_records = read_weather_timeline(weather_path)?;
    }

    Ok(inputs)
}

fn build_weather(records: &[WeatherRecord], rain: Option<f64>) -> Weather {
    let mut weather = Weather::from_timeline(records);
    if let Some(intensity) = rain {
        weather.set_override(intensity);
    }
    weather
}

fn print_snapshot(state: &RaceState) {
    let player = match state.player() {
        Some(player) => player,
        None => return,
    };
    let leader = state
        .car_states
        .first()
        .map_or("-", |car| car.driver_code.as_str());

    tracing::info!(
        "{:8.1}s | lap {:2}/{} | leader {} | {} P{} on {} ({:.0}% wear, {:.1} laps){}{} | rain {:.2} | {}",
        state.race_time,
        player.lap.min(state.total_laps),
        state.total_laps,
        leader,
        player.driver_code,
        player.position,
        player.compound,
        player.tire_wear * 100.0,
        player.tire_age_laps,
        if player.pit_requested { " BOX" } else { "" },
        if player.in_pit { " IN PIT" } else { "" },
        state.rain_intensity,
        state.recommendation
    );
}

/// run_engine runs the engine headless or, in live mode, on a worker thread while the main
/// thread prints the streamed snapshots.
fn run_engine<E>(
    mut engine: E,
    sim_opts: &SimOpts,
    strategy: PlayerStrategy,
) -> anyhow::Result<RaceResult>
where
    E: RaceEngine + Send + 'static,
{
    if let Some(start_lap) = sim_opts.start_lap {
        engine.jump_to_lap(start_lap);
    }

    if !sim_opts.live {
        return handle_race(&mut engine, &strategy, sim_opts.timestep_size, None, 1.0);
    }

    let (tx, rx) = flume::unbounded();
    let timestep_size = sim_opts.timestep_size;
    let realtime_factor = sim_opts.realtime_factor;

    let sim_thread = thread::spawn(move || {
        handle_race(&mut engine, &strategy, timestep_size, Some(&tx), realtime_factor)
    });

    let mut t_last_print = f64::NEG_INFINITY;
    for state in rx.iter() {
        if state.final_result.is_some() || state.race_time >= t_last_print + LIVE_PRINT_INTERVAL {
            print_snapshot(&state);
            t_last_print = state.race_time;
        }
    }

    sim_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))?
}

fn build_lap_time_race(
    race_data: RaceData,
    player: &str,
    physics: &PhysicsModel,
    weather: &Weather,
    sim_consts: &SimConstants,
) -> anyhow::Result<LapTimeRace> {
    LapTimeRace::new(
        race_data,
        player,
        physics.clone(),
        weather.clone(),
        sim_consts.clone(),
    )
    .context("Failed to set up the lap time race!")
}

/// sweep_pit_window simulates a one-stop strategy for every possible pit lap in parallel and
/// prints the resulting positions of the player.
fn sweep_pit_window(
    inputs: &RaceInputs,
    player: &str,
    compound: Compound,
    sim_opts: &SimOpts,
    physics: &PhysicsModel,
    weather: &Weather,
    sim_consts: &SimConstants,
) -> anyhow::Result<()> {
    let total_laps = inputs.race_data.total_laps;
    tracing::info!(
        "Sweeping pit laps 1 to {} onto {} for {}",
        total_laps.saturating_sub(1),
        compound,
        player
    );

    let results = (1..total_laps)
        .into_par_iter()
        .map(|pit_lap| {
            let mut race = build_lap_time_race(
                inputs.race_data.clone(),
                player,
                physics,
                weather,
                sim_consts,
            )?;
            let strategy = PlayerStrategy {
                pit_calls: vec![PitCall { lap: pit_lap, compound }],
                mode_calls: sim_opts.mode_calls.clone(),
            };
            let result = handle_race(&mut race, &strategy, sim_opts.timestep_size, None, 1.0)?;
            let classified = result
                .player()
                .map(|car| (car.position, car.race_time))
                .unwrap_or((0, None));
            Ok::<_, anyhow::Error>((pit_lap, classified.0, classified.1))
        })
        .collect::<anyhow::Result<Vec<(u32, usize, Option<f64>)>>>()?;

    println!("RESULT: Pit window sweep ({} onto {})", player, compound);
    println!("pit lap, position, race time");
    for (pit_lap, position, race_time) in results.iter() {
        match race_time {
            Some(t) => println!("{:7}, {:8}, {:9.3}s", pit_lap, position, t),
            None => println!("{:7}, {:8}, {:>10}", pit_lap, position, "-"),
        }
    }

    // best position first, faster race time breaks ties
    let best = results
        .iter()
        .filter(|(_, position, _)| *position > 0)
        .min_by(|a, b| {
            let t_a = a.2.unwrap_or(f64::MAX);
            let t_b = b.2.unwrap_or(f64::MAX);
            a.1.cmp(&b.1).then(t_a.total_cmp(&t_b))
        });
    if let Some(best) = best {
        println!("best pit lap: {} (P{})", best.0, best.1);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    init_logging(sim_opts.debug);

    anyhow::ensure!(
        (0.001..=1.0).contains(&sim_opts.timestep_size),
        "Time step size must be in the range [0.001, 1.0], got {}!",
        sim_opts.timestep_size
    );

    let mut sim_consts = match &sim_opts.config_path {
        Some(path) => read_sim_constants(path)?,
        None => SimConstants::default(),
    };
    if let Some(time_multiplier) = sim_opts.time_multiplier {
        sim_consts.time_multiplier = time_multiplier;
    }
    sim_consts
        .check()
        .context("Invalid simulation constants!")?;
    let physics = PhysicsModel::new(match &sim_opts.physics_path {
        Some(path) => read_physics_pars(path)?,
        None => PhysicsPars::default(),
    });

    let mut inputs = load_inputs(&sim_opts)?;
    let weather = build_weather(&inputs.weather_records, sim_opts.rain);

    let player = match &sim_opts.player {
        Some(player) => player.to_owned(),
        None => inputs
            .race_data
            .drivers
            .first()
            .map(|drv| drv.driver_code.to_owned())
            .context("Race data contains no drivers!")?,
    };

    tracing::info!(
        "Simulating {} laps with {} drivers, player {}, time step size {:.3}s",
        inputs.race_data.total_laps,
        inputs.race_data.drivers.len(),
        player,
        sim_opts.timestep_size
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if let Some(compound) = sim_opts.sweep {
        anyhow::ensure!(
            sim_opts.variant == Variant::Whatif,
            "The pit window sweep requires the whatif variant!"
        );
        return sweep_pit_window(
            &inputs,
            &player,
            compound,
            &sim_opts,
            &physics,
            &weather,
            &sim_consts,
        );
    }

    let strategy = PlayerStrategy {
        pit_calls: sim_opts.pit_calls.clone(),
        mode_calls: sim_opts.mode_calls.clone(),
    };

    let t_start = Instant::now();

    let race_result = match sim_opts.variant {
        Variant::Whatif => {
            let race =
                build_lap_time_race(inputs.race_data, &player, &physics, &weather, &sim_consts)?;
            run_engine(race, &sim_opts, strategy)?
        }
        Variant::Replay => {
            let mut traces = inputs.traces.take().context(
                "The replay variant requires telemetry, use --telemetry-dir <dir>!",
            )?;

            let mut entries = Vec::with_capacity(inputs.race_data.drivers.len());
            for drv in inputs.race_data.drivers.iter() {
                let trace = traces
                    .remove(&drv.driver_code)
                    .with_context(|| format!("No telemetry for driver {}!", drv.driver_code))?;
                entries.push(TelemetryEntry {
                    driver_code: drv.driver_code.to_owned(),
                    team_color: drv.team_color.to_owned(),
                    start_compound: drv.laps.first().map_or(Compound::Medium, |lap| lap.compound),
                    trace,
                });
            }

            let race = TelemetryRace::new(
                entries,
                &player,
                inputs.race_data.total_laps,
                physics,
                weather,
                sim_consts,
            )
            .context("Failed to set up the telemetry race!")?;
            run_engine(race, &sim_opts, strategy)?
        }
    };

    tracing::info!("Execution time: {}ms", t_start.elapsed().as_millis());

    // POST-PROCESSING -----------------------------------------------------------------------------
    race_result.print_results()?;
    let out_path = race_result.write_results_to_file(sim_opts.output_path.as_deref())?;
    tracing::info!("Results written to {:?}", out_path);

    Ok(())
}
