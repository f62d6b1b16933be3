use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Rain intensity assigned to a historical sample that reports rainfall.
pub const HISTORICAL_RAIN_INTENSITY: f64 = 0.3;

/// One entry of a historical weather timeline.
///
/// * `time_s` - (s) Race time of the reading
/// * `rainfall` - True if it was raining at that time
/// * `track_temp` - (°C) Track temperature, if reported
/// * `air_temp` - (°C) Air temperature, if reported
#[derive(Debug, Deserialize, Clone)]
pub struct WeatherRecord {
    pub time_s: f64,
    pub rainfall: bool,
    #[serde(default)]
    pub track_temp: Option<f64>,
    #[serde(default)]
    pub air_temp: Option<f64>,
}

/// Weather oracle answering the rain intensity for a given race time. In historical mode it looks
/// up the recorded second, in sandbox mode it returns the operator-set intensity.
#[derive(Debug, Clone)]
pub struct Weather {
    historical_rain: HashMap<u64, f64>,
    sandbox_mode: bool,
    sandbox_intensity: f64,
    pub track_temp: f64,
    pub air_temp: f64,
}

impl Default for Weather {
    fn default() -> Self {
        Weather {
            historical_rain: HashMap::new(),
            sandbox_mode: false,
            sandbox_intensity: 0.0,
            track_temp: 30.0,
            air_temp: 25.0,
        }
    }
}

impl Weather {
    pub fn new() -> Weather {
        Weather::default()
    }

    /// from_timeline creates a historical weather oracle from a recorded timeline.
    pub fn from_timeline(records: &[WeatherRecord]) -> Weather {
        let mut weather = Weather::default();
        weather.load_timeline(records);
        weather
    }

    /// load_timeline fills the time -> intensity lookup from a recorded timeline. Readings are
    /// keyed by their whole second, later readings of the same second win.
    pub fn load_timeline(&mut self, records: &[WeatherRecord]) {
        for record in records.iter().filter(|r| r.time_s >= 0.0) {
            let intensity = if record.rainfall {
                HISTORICAL_RAIN_INTENSITY
            } else {
                0.0
            };
            self.historical_rain.insert(record.time_s as u64, intensity);

            if let Some(track_temp) = record.track_temp {
                self.track_temp = track_temp;
            }
            if let Some(air_temp) = record.air_temp {
                self.air_temp = air_temp;
            }
        }

        info!("Loaded {} weather points", self.historical_rain.len());
    }

    /// set_override enables sandbox mode with the given intensity, clamped to [0.0, 1.0].
    pub fn set_override(&mut self, intensity: f64) {
        self.sandbox_mode = true;
        self.sandbox_intensity = intensity.clamp(0.0, 1.0);
        debug!("Sandbox weather set to {:.2}", self.sandbox_intensity);
    }

    /// toggle_sandbox flips between sandbox and historical mode, the stored sandbox intensity is
    /// kept. Returns the new sandbox state.
    pub fn toggle_sandbox(&mut self) -> bool {
        self.sandbox_mode = !self.sandbox_mode;
        debug!("Sandbox weather mode: {}", self.sandbox_mode);
        self.sandbox_mode
    }

    pub fn sandbox_mode(&self) -> bool {
        self.sandbox_mode
    }

    pub fn sandbox_intensity(&self) -> f64 {
        self.sandbox_intensity
    }

    /// get_current_weather returns the rain intensity in [0.0, 1.0] at the given race time.
    /// Seconds without a historical reading count as dry.
    pub fn get_current_weather(&self, race_time_s: f64) -> f64 {
        if self.sandbox_mode {
            return self.sandbox_intensity;
        }

        if race_time_s < 0.0 {
            return 0.0;
        }

        self.historical_rain
            .get(&(race_time_s as u64))
            .copied()
            .unwrap_or(0.0)
    }
}
