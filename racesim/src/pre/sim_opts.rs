use crate::core::handle_race::{ModeCall, PitCall};
use crate::core::tireset::Compound;
use clap::Parser;
use std::path::PathBuf;

/// Simulation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// Ghosts replay recorded telemetry, the player moves along the same trace
    Replay,
    /// Ghosts replay recorded lap times, the player's lap times are rescaled
    Whatif,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "pitwall-sandbox",
    about = "A race strategy sandbox replaying historical races with one player-controlled car"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Simulate in real time and print live race snapshots
    #[clap(short, long)]
    pub live: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Simulation variant
    #[clap(long, value_enum, default_value = "whatif")]
    pub variant: Variant,

    /// Set path to the race data file (OPTIONAL: if not set, a synthetic demo race is generated)
    #[clap(short = 'p', long = "data")]
    pub data_path: Option<PathBuf>,

    /// Set directory holding one telemetry file <CODE>.csv per driver (replay variant)
    #[clap(long = "telemetry-dir")]
    pub telemetry_dir: Option<PathBuf>,

    /// Set path to a weather timeline file
    #[clap(short, long = "weather")]
    pub weather_path: Option<PathBuf>,

    /// Set path to a simulation constants file
    #[clap(short, long = "config")]
    pub config_path: Option<PathBuf>,

    /// Set path to a physics parameter file
    #[clap(long = "physics")]
    pub physics_path: Option<PathBuf>,

    /// Set driver code of the player car (default: first driver in the data)
    #[clap(long)]
    pub player: Option<String>,

    /// Set number of laps of the demo race
    #[clap(long, default_value = "50")]
    pub demo_laps: u32,

    /// Set seed of the demo race
    #[clap(long, default_value = "42")]
    pub seed: u64,

    /// Set real-time factor (only relevant in live mode)
    #[clap(short, long, default_value = "10.0")]
    pub realtime_factor: f64,

    /// Set simulation timestep size in seconds, should be in the range [0.001, 1.0]
    #[clap(short, long, default_value = "0.1")]
    pub timestep_size: f64,

    /// Override the time multiplier of the simulation constants
    #[clap(long)]
    pub time_multiplier: Option<f64>,

    /// Override the weather with a fixed rain intensity in [0.0, 1.0]
    #[clap(long)]
    pub rain: Option<f64>,

    /// Start the race at the given lap
    #[clap(long)]
    pub start_lap: Option<u32>,

    /// Add a pit stop of the player, e.g. 25:HARD (repeatable)
    #[clap(long = "pit")]
    pub pit_calls: Vec<PitCall>,

    /// Add a drive mode change of the player, e.g. 10:PUSH (repeatable)
    #[clap(long = "mode")]
    pub mode_calls: Vec<ModeCall>,

    /// Evaluate a one-stop strategy onto the given compound for every possible pit lap (what-if
    /// variant)
    #[clap(long)]
    pub sweep: Option<Compound>,

    /// Set path of the result file
    #[clap(short, long = "output")]
    pub output_path: Option<PathBuf>,
}
