use approx::assert_relative_eq;
use racesim::core::handle_race::{handle_race, PlayerStrategy};
use racesim::core::physics::PhysicsModel;
use racesim::core::replay_race::{TelemetryEntry, TelemetryRace};
use racesim::core::tireset::{Compound, DriveMode};
use racesim::core::track::{TelemetrySample, TelemetryTrace};
use racesim::core::weather::Weather;
use racesim::pre::demo_race::generate_demo_race;
use racesim::{RaceEngine, SimConstants};

fn oval(len: usize) -> TelemetryTrace {
    let samples = (0..len)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / len as f64;
            TelemetrySample {
                x: 500.0 * theta.cos(),
                y: 300.0 * theta.sin(),
                speed: 250.0,
                gear: 7,
            }
        })
        .collect();
    TelemetryTrace::new(samples).unwrap()
}

fn two_car_race(total_laps: u32) -> TelemetryRace {
    let entries = ["VER", "HAM"]
        .iter()
        .map(|code| TelemetryEntry {
            driver_code: code.to_string(),
            team_color: "#1e41ff".to_owned(),
            start_compound: Compound::Medium,
            trace: oval(100),
        })
        .collect();
    TelemetryRace::new(
        entries,
        "HAM",
        total_laps,
        PhysicsModel::default(),
        Weather::new(),
        SimConstants::default(),
    )
    .unwrap()
}

#[test]
fn pit_stop_in_entry_zone() {
    let mut race = two_car_race(3);
    race.set_race_progress(0.32);
    assert_relative_eq!(race.player().lap_progress(), 0.96, epsilon = 1e-9);

    race.update(0.1);
    let worn = race.player().tireset.wear;
    assert!(worn > 0.0);

    assert!(race.request_pit(Compound::Hard));
    race.update(0.1);
    assert!(race.player().in_pit());
    assert!(!race.player().pit_requested());
    let idx_in_pit = race.player().track_index;

    // stationary during the stop
    let mut elapsed = 0.1;
    while race.player().in_pit() {
        assert_relative_eq!(race.player().track_index, idx_in_pit);
        race.update(0.1);
        elapsed += 0.1;
    }
    assert_relative_eq!(elapsed, 25.0, epsilon = 0.15);

    // the car already drove off in the exit tick
    let player = race.player();
    assert_eq!(player.tireset.compound, Compound::Hard);
    assert!(player.tireset.wear < 1e-3);
    assert!(player.tireset.age_laps < 0.02);
    assert!(!player.pit_requested());
}

#[test]
fn request_outside_entry_zone_waits() {
    let mut race = two_car_race(3);
    assert!(race.request_pit(Compound::Soft));
    race.update(0.1);
    assert!(race.player().pit_requested());
    assert!(!race.player().in_pit());

    assert!(race.cancel_pit());
    while race.player_lap() == 1 {
        race.update(0.5);
    }
    assert!(!race.player().in_pit());
    assert_eq!(race.player().tireset.compound, Compound::Medium);
}

#[test]
fn sorted_cars_is_stable_without_update() {
    let mut race = two_car_race(5);
    for _ in 0..37 {
        race.update(0.3);
    }
    let first: Vec<String> = race.sorted_cars().iter().map(|c| c.driver_code.clone()).collect();
    let second: Vec<String> = race.sorted_cars().iter().map(|c| c.driver_code.clone()).collect();
    assert_eq!(first, second);
    assert_eq!(race.player_position(), race.player_position());
}

#[test]
fn wear_is_monotonic_and_bounded() {
    let mut race = two_car_race(20);
    race.set_mode(DriveMode::Push);

    let mut last_wear = race.player().tireset.wear;
    let mut last_age = race.player().tireset.age_laps;
    while !race.player().finished {
        race.update(0.5);
        let tireset = &race.player().tireset;
        assert!(tireset.wear >= last_wear);
        assert!(tireset.wear <= 0.99);
        assert!(tireset.age_laps >= last_age);
        last_wear = tireset.wear;
        last_age = tireset.age_laps;
    }
    // the cliff drives a medium set into the clamp long before the flag
    assert_relative_eq!(last_wear, 0.99);
}

#[test]
fn finished_cars_are_frozen() {
    let mut race = two_car_race(2);
    race.set_time_multiplier(5.0);
    while !race.car("VER").unwrap().finished {
        race.update(0.1);
    }
    let ver = race.car("VER").unwrap();
    let frozen = (ver.lap, ver.track_index, ver.finish_time);
    assert_eq!(ver.lap, 3);
    assert_relative_eq!(ver.track_index, 99.0);

    for _ in 0..50 {
        race.update(0.1);
    }
    let ver = race.car("VER").unwrap();
    assert_eq!((ver.lap, ver.track_index, ver.finish_time), frozen);
}

#[test]
fn demo_race_runs_to_the_flag_with_snapshots() {
    let demo = generate_demo_race(3, 4).unwrap();
    let entries = demo
        .race_data
        .drivers
        .iter()
        .map(|drv| TelemetryEntry {
            driver_code: drv.driver_code.clone(),
            team_color: drv.team_color.clone(),
            start_compound: drv.laps[0].compound,
            trace: demo.traces[&drv.driver_code].clone(),
        })
        .collect();
    let mut race = TelemetryRace::new(
        entries,
        "LEC",
        demo.race_data.total_laps,
        PhysicsModel::default(),
        Weather::from_timeline(&demo.weather),
        SimConstants::default(),
    )
    .unwrap();

    let (tx, rx) = flume::unbounded();
    let strategy = PlayerStrategy {
        pit_calls: vec!["2:HARD".parse().unwrap()],
        mode_calls: vec!["1:PUSH".parse().unwrap()],
    };
    let result = handle_race(&mut race, &strategy, 0.5, Some(&tx), 1.0e6).unwrap();
    drop(tx);

    let states: Vec<_> = rx.iter().collect();
    assert!(states.len() > 2);
    assert!(states.iter().all(|s| s.player_code == "LEC"));
    let last = states.last().unwrap();
    assert!(last.final_result.is_some());

    assert_eq!(result.classification.len(), 6);
    assert!(race.all_finished());
    let player = result.player().unwrap();
    assert_eq!(player.compound, Compound::Hard);
    assert_eq!(player.laps_completed, 4);
    assert!(player.race_time.is_some());
    for (rank, car) in result.classification.iter().enumerate() {
        assert_eq!(car.position, rank + 1);
    }
}
