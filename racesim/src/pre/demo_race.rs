use crate::core::driver::{DriverRaceData, LapData, RaceData};
use crate::core::tireset::Compound;
use crate::core::track::{TelemetrySample, TelemetryTrace};
use crate::core::weather::WeatherRecord;
use anyhow::Context;
use helpers::general::{argsort, stable_seed, SortOrder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Demo field: driver code, name, team, team color, base lap time (s), start compound.
const DEMO_DRIVERS: [(&str, &str, &str, &str, f64, Compound); 6] = [
    ("VER", "Max Verstappen", "Red Bull Racing", "#1e41ff", 91.0, Compound::Medium),
    ("HAM", "Lewis Hamilton", "Mercedes", "#00d2be", 91.3, Compound::Medium),
    ("LEC", "Charles Leclerc", "Ferrari", "#dc0000", 91.4, Compound::Soft),
    ("NOR", "Lando Norris", "McLaren", "#ff8700", 91.6, Compound::Medium),
    ("ALO", "Fernando Alonso", "Aston Martin", "#006f62", 92.0, Compound::Hard),
    ("SAR", "Logan Sargeant", "Williams", "#64c4ed", 92.8, Compound::Medium),
];

/// Driver that retires during the demo race.
const RETIRING_DRIVER: &str = "SAR";

const LAP_TIME_SIGMA: f64 = 0.35;
const TIRE_DEG_PER_LAP: f64 = 0.05;
const FUEL_GAIN_PER_LAP: f64 = 0.03;
const PIT_IN_LOSS: f64 = 9.0;
const PIT_OUT_LOSS: f64 = 12.0;

/// Synthetic historical race that is internally consistent: positions follow the cumulative
/// times, pit laps carry a time loss and a compound change.
///
/// * `race_data` - Lap records of all drivers
/// * `traces` - One closed-loop telemetry trace per driver, all of equal length
/// * `weather` - Weather timeline with one rain shower
#[derive(Debug, Clone)]
pub struct DemoRace {
    pub race_data: RaceData,
    pub traces: HashMap<String, TelemetryTrace>,
    pub weather: Vec<WeatherRecord>,
}

fn compound_delta(compound: Compound) -> f64 {
    match compound {
        Compound::Soft => 0.0,
        Compound::Medium => 0.5,
        Compound::Hard => 1.1,
        Compound::Intermediate => 2.0,
        Compound::Wet => 4.5,
    }
}

/// generate_demo_race creates the demo race. The same seed always produces the same race.
pub fn generate_demo_race(seed: u64, total_laps: u32) -> anyhow::Result<DemoRace> {
    let total_laps = total_laps.max(2);
    let noise = Normal::new(0.0, LAP_TIME_SIGMA).context("Invalid lap time distribution!")?;

    let mut drivers = Vec::with_capacity(DEMO_DRIVERS.len());

    for &(code, name, team, color, base_laptime, start_compound) in DEMO_DRIVERS.iter() {
        let mut rng = StdRng::seed_from_u64(seed ^ stable_seed(code));

        let no_laps = if code == RETIRING_DRIVER {
            (total_laps * 3 / 5).max(1)
        } else {
            total_laps
        };
        let pit_lap = (total_laps as i64 / 2 + rng.gen_range(-3..=3))
            .clamp(1, total_laps as i64 - 1) as u32;
        let second_compound = if start_compound == Compound::Hard {
            Compound::Medium
        } else {
            Compound::Hard
        };

        let mut laps = Vec::with_capacity(no_laps as usize);
        let mut compound = start_compound;
        let mut tire_life = 0;

        for lap_number in 1..=no_laps {
            let is_pit_out = lap_number == pit_lap + 1;
            if is_pit_out {
                compound = second_compound;
                tire_life = 0;
            }
            tire_life += 1;

            let is_pit_in = lap_number == pit_lap;
            let mut lap_time = base_laptime
                + compound_delta(compound)
                + tire_life as f64 * TIRE_DEG_PER_LAP
                - lap_number as f64 * FUEL_GAIN_PER_LAP
                + noise.sample(&mut rng);
            if is_pit_in {
                lap_time += PIT_IN_LOSS;
            }
            if is_pit_out {
                lap_time += PIT_OUT_LOSS;
            }

            laps.push(LapData {
                lap_number,
                lap_time_seconds: lap_time,
                compound,
                tire_life,
                is_pit_out,
                is_pit_in,
                position: 0,
            });
        }

        drivers.push(DriverRaceData {
            driver_code: code.to_owned(),
            driver_name: name.to_owned(),
            team: team.to_owned(),
            team_color: color.to_owned(),
            laps,
            final_position: 0,
            total_laps: no_laps,
        });
    }

    assign_positions(&mut drivers, total_laps);

    let traces = drivers
        .iter()
        .map(|drv| {
            let mut rng = StdRng::seed_from_u64(seed ^ stable_seed(&drv.driver_code) ^ 0x5eed);
            demo_trace(&mut rng).map(|trace| (drv.driver_code.to_owned(), trace))
        })
        .collect::<Option<HashMap<_, _>>>()
        .context("Failed to create demo telemetry!")?;

    let mean_laptime =
        DEMO_DRIVERS.iter().map(|drv| drv.4).sum::<f64>() / DEMO_DRIVERS.len() as f64;
    let weather = demo_weather(total_laps as f64 * mean_laptime);

    tracing::info!(
        "Generated demo race with {} drivers over {} laps (seed {})",
        drivers.len(),
        total_laps,
        seed
    );

    Ok(DemoRace {
        race_data: RaceData {
            total_laps,
            drivers,
        },
        traces,
        weather,
    })
}

/// assign_positions ranks the drivers after every lap by their cumulative time. The final
/// classification puts finishers before retirements.
fn assign_positions(drivers: &mut [DriverRaceData], total_laps: u32) {
    let mut cum_times = vec![0.0; drivers.len()];

    for lap_idx in 0..total_laps as usize {
        let running: Vec<usize> = (0..drivers.len())
            .filter(|&i| drivers[i].laps.len() > lap_idx)
            .collect();

        for &i in running.iter() {
            cum_times[i] += drivers[i].laps[lap_idx].lap_time_seconds;
        }

        let times: Vec<f64> = running.iter().map(|&i| cum_times[i]).collect();
        for (rank, idx) in argsort(&times, SortOrder::Ascending).into_iter().enumerate() {
            drivers[running[idx]].laps[lap_idx].position = rank as u32 + 1;
        }
    }

    // finishers by race time, retirements by distance
    let keys: Vec<f64> = drivers
        .iter()
        .zip(cum_times.iter())
        .map(|(drv, &t)| drv.laps.len() as f64 * 1.0e6 - t)
        .collect();
    for (rank, idx) in argsort(&keys, SortOrder::Descending).into_iter().enumerate() {
        drivers[idx].final_position = rank as u32 + 1;
    }
}

/// demo_trace creates a closed-loop telemetry trace sampled every 100ms. Speed drops in the
/// corners of the wobbly oval.
fn demo_trace(rng: &mut StdRng) -> Option<TelemetryTrace> {
    const NO_SAMPLES: usize = 910;
    let line_offset: f64 = rng.gen_range(-4.0..4.0);

    let samples = (0..NO_SAMPLES)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / NO_SAMPLES as f64;
            let radius = 600.0 + 150.0 * (3.0 * theta).sin() + line_offset;
            let speed = 310.0 - 180.0 * (3.0 * theta).cos().abs().powi(4);
            TelemetrySample {
                x: radius * theta.cos(),
                y: 0.6 * radius * theta.sin(),
                speed,
                gear: (speed / 40.0).ceil().clamp(1.0, 8.0) as u8,
            }
        })
        .collect();

    TelemetryTrace::new(samples)
}

/// demo_weather creates a timeline with a rain shower between 40% and 55% of the race.
fn demo_weather(race_duration: f64) -> Vec<WeatherRecord> {
    let rain_start = (0.40 * race_duration) as u64;
    let rain_end = (0.55 * race_duration) as u64;

    let mut records = Vec::new();
    for t in 0..race_duration.ceil() as u64 {
        let rainfall = (rain_start..rain_end).contains(&t);
        if rainfall || t % 60 == 0 {
            records.push(WeatherRecord {
                time_s: t as f64,
                rainfall,
                track_temp: Some(if rainfall { 24.0 } else { 34.0 }),
                air_temp: Some(if rainfall { 19.0 } else { 23.0 }),
            });
        }
    }
    records
}
