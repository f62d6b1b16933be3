use crate::core::driver::RaceData;
use crate::core::physics::PhysicsPars;
use crate::core::race::SimConstants;
use crate::core::track::{TelemetrySample, TelemetryTrace};
use crate::core::weather::WeatherRecord;
use crate::error::RacesimError;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

/// Sampling interval of resampled telemetry, matches the base rate of 10 samples per second.
pub const TELEMETRY_INTERVAL_MS: f64 = 100.0;

/// read_json opens the JSON file and decodes it into the requested type. `what` names the file
/// content in error messages.
fn read_json<T: DeserializeOwned>(filepath: &Path, what: &str) -> anyhow::Result<T> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!("Failed to open {} file {}!", what, filepath.display()))?;
    let pars = serde_json::from_reader(&fh)
        .context(format!("Failed to parse {} file {}!", what, filepath.display()))?;
    Ok(pars)
}

/// read_race_data reads the historical lap data of all drivers.
pub fn read_race_data(filepath: &Path) -> anyhow::Result<RaceData> {
    read_json(filepath, "race data")
}

/// read_weather_timeline reads a recorded weather timeline.
pub fn read_weather_timeline(filepath: &Path) -> anyhow::Result<Vec<WeatherRecord>> {
    read_json(filepath, "weather timeline")
}

/// read_sim_constants reads engine constants, missing fields keep their defaults.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let consts: SimConstants = read_json(filepath, "simulation constants")?;
    consts.check().context(format!(
        "Invalid simulation constants in {}!",
        filepath.display()
    ))?;
    Ok(consts)
}

/// read_physics_pars reads the tire and weather model coefficients, missing fields keep their
/// defaults.
pub fn read_physics_pars(filepath: &Path) -> anyhow::Result<PhysicsPars> {
    read_json(filepath, "physics parameter")
}

/// One row of a telemetry CSV file. The column names of common timing data exports (X, Y,
/// Speed, nGear, Time_ms) are accepted as well.
#[derive(Debug, Deserialize)]
struct CsvTelemetryRow {
    #[serde(default, alias = "Time_ms")]
    time_ms: Option<f64>,
    #[serde(alias = "X")]
    x: f64,
    #[serde(alias = "Y")]
    y: f64,
    #[serde(default, alias = "Speed")]
    speed: f64,
    #[serde(default = "default_gear", alias = "nGear")]
    gear: u8,
}

fn default_gear() -> u8 {
    1
}

/// read_telemetry_trace reads the telemetry CSV file of a driver. If the file contains a time
/// column the samples are resampled to a uniform interval of `TELEMETRY_INTERVAL_MS`, otherwise
/// they are expected to be uniform already.
pub fn read_telemetry_trace(filepath: &Path, driver_code: &str) -> anyhow::Result<TelemetryTrace> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!("Failed to open telemetry file {}!", filepath.display()))?;

    let mut csv_reader = csv::Reader::from_reader(&fh);
    let mut rows: Vec<CsvTelemetryRow> = vec![];

    for result in csv_reader.deserialize() {
        let row: CsvTelemetryRow =
            result.context(format!("Failed to parse telemetry file {}!", filepath.display()))?;
        rows.push(row);
    }

    let samples: Vec<TelemetrySample> = rows
        .iter()
        .map(|row| TelemetrySample {
            x: row.x,
            y: row.y,
            speed: row.speed,
            gear: row.gear,
        })
        .collect();

    let times_ms: Option<Vec<f64>> = rows.iter().map(|row| row.time_ms).collect();

    let trace = match times_ms {
        Some(times_ms) if !times_ms.is_empty() => {
            TelemetryTrace::resample(&times_ms, &samples, TELEMETRY_INTERVAL_MS)
        }
        _ => TelemetryTrace::new(samples),
    };

    trace.ok_or_else(|| RacesimError::EmptyTelemetry(driver_code.to_owned()).into())
}

/// read_telemetry_dir reads the telemetry of the given drivers from `<dir>/<CODE>.csv`.
pub fn read_telemetry_dir(
    dirpath: &Path,
    driver_codes: &[&str],
) -> anyhow::Result<HashMap<String, TelemetryTrace>> {
    let mut traces = HashMap::with_capacity(driver_codes.len());

    for &driver_code in driver_codes {
        let mut filepath = dirpath.join(driver_code);
        filepath.set_extension("csv");
        let trace = read_telemetry_trace(&filepath, driver_code)?;
        tracing::debug!("Read {} telemetry samples for {}", trace.len(), driver_code);
        traces.insert(driver_code.to_owned(), trace);
    }

    Ok(traces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tireset::Compound;
    use approx::assert_relative_eq;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut fh = std::fs::File::create(&path).unwrap();
        fh.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn race_data_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "race.json",
            r#"{"total_laps": 2, "drivers": [{
                "driver_code": "LEC",
                "laps": [
                    {"lap_number": 1, "lap_time_seconds": 95.1, "compound": "SOFT", "tire_life": 1, "position": 1},
                    {"lap_number": 2, "lap_time_seconds": 93.4, "compound": "SOFT", "tire_life": 2, "position": 1}
                ],
                "final_position": 1, "total_laps": 2}]}"#,
        );
        let data = read_race_data(&path).unwrap();
        assert_eq!(data.total_laps, 2);
        assert_eq!(data.drivers[0].laps[1].compound, Compound::Soft);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_sim_constants(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn partial_constants_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "consts.json", r#"{"base_rate": 12.0}"#);
        let consts = read_sim_constants(&path).unwrap();
        assert_relative_eq!(consts.base_rate, 12.0);
        assert_relative_eq!(consts.laptime_pit_duration, 22.0);

        let path = write_file(dir.path(), "physics.json", r#"{"cliff_wear": 0.5}"#);
        let pars = read_physics_pars(&path).unwrap();
        assert_relative_eq!(pars.cliff_wear, 0.5);
        assert_relative_eq!(pars.wear_accel, 1.5);
    }

    #[test]
    fn stalling_constants_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "consts.json", r#"{"time_multiplier": 0.0}"#);
        let err = read_sim_constants(&path).unwrap_err();
        assert!(err.to_string().contains("consts.json"));
        assert!(err.root_cause().to_string().contains("time_multiplier"));

        let path = write_file(dir.path(), "rate.json", r#"{"base_rate": 0.0}"#);
        assert!(read_sim_constants(&path).is_err());
    }

    #[test]
    fn uniform_telemetry_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "VER.csv",
            "X,Y,Speed,nGear\n0.0,0.0,100.0,3\n1.0,1.0,110.0,4\n2.0,1.5,120.0,4\n",
        );
        let traces = read_telemetry_dir(dir.path(), &["VER"]).unwrap();
        let trace = &traces["VER"];
        assert_eq!(trace.len(), 3);
        assert_relative_eq!(trace.sample_at(2.0).y, 1.5);
        assert_eq!(trace.sample_at(1.0).gear, 4);
    }

    #[test]
    fn timed_telemetry_is_resampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "HAM.csv",
            "time_ms,x,y,speed,gear\n0,0.0,0.0,100.0,3\n150,3.0,0.0,100.0,3\n400,8.0,0.0,100.0,4\n",
        );
        let trace = read_telemetry_trace(&path, "HAM").unwrap();
        assert_eq!(trace.len(), 4);
        assert_relative_eq!(trace.sample_at(1.0).x, 2.0);
        assert_relative_eq!(trace.sample_at(3.0).x, 6.0);
        // gear of the nearest recorded sample, not the preceding one
        assert_eq!(trace.sample_at(2.0).gear, 3);
        assert_eq!(trace.sample_at(3.0).gear, 4);
    }

    #[test]
    fn empty_telemetry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "NOR.csv", "X,Y,Speed,nGear\n");
        let err = read_telemetry_trace(&path, "NOR").unwrap_err();
        assert_eq!(
            err.downcast_ref::<RacesimError>(),
            Some(&RacesimError::EmptyTelemetry("NOR".to_owned()))
        );
    }
}
