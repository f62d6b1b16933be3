use helpers::general::lin_interp;
use serde::{Deserialize, Serialize};

/// One resampled telemetry sample of a driver's reference lap.
///
/// * `x` - (m) Track x coordinate
/// * `y` - (m) Track y coordinate
/// * `speed` - (km/h) Speed
/// * `gear` - Engaged gear
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    #[serde(alias = "X")]
    pub x: f64,
    #[serde(alias = "Y")]
    pub y: f64,
    #[serde(default, alias = "Speed")]
    pub speed: f64,
    #[serde(default = "default_gear", alias = "nGear")]
    pub gear: u8,
}

fn default_gear() -> u8 {
    1
}

/// Per-driver telemetry trace. The samples are uniformly spaced in time, so a continuous index
/// into them doubles as the position along the lap. The trace is never empty.
#[derive(Debug, Clone)]
pub struct TelemetryTrace {
    samples: Vec<TelemetrySample>,
}

impl TelemetryTrace {
    /// new returns None for an empty sample sequence.
    pub fn new(samples: Vec<TelemetrySample>) -> Option<TelemetryTrace> {
        if samples.is_empty() {
            None
        } else {
            Some(TelemetryTrace { samples })
        }
    }

    /// resample creates a trace with samples every `interval_ms` from samples recorded at the
    /// (increasing) times `times_ms`. Positions and speed are interpolated linearly, the gear is
    /// taken from the nearest recorded sample.
    pub fn resample(
        times_ms: &[f64],
        samples: &[TelemetrySample],
        interval_ms: f64,
    ) -> Option<TelemetryTrace> {
        if times_ms.len() != samples.len() || samples.is_empty() || interval_ms <= 0.0 {
            return None;
        }

        let xs: Vec<f64> = samples.iter().map(|s| s.x).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.y).collect();
        let speeds: Vec<f64> = samples.iter().map(|s| s.speed).collect();

        let t_start = times_ms[0];
        let t_end = times_ms[times_ms.len() - 1];
        let no_samples = (((t_end - t_start) / interval_ms).ceil() as usize).max(1);

        let mut resampled = Vec::with_capacity(no_samples);
        for i in 0..no_samples {
            let t = t_start + i as f64 * interval_ms;

            // nearest recorded sample for the gear
            let idx_next = times_ms.partition_point(|&t_rec| t_rec < t).min(samples.len() - 1);
            let idx_nearest =
                if idx_next > 0 && t - times_ms[idx_next - 1] < times_ms[idx_next] - t {
                    idx_next - 1
                } else {
                    idx_next
                };

            resampled.push(TelemetrySample {
                x: lin_interp(t, times_ms, &xs)?,
                y: lin_interp(t, times_ms, &ys)?,
                speed: lin_interp(t, times_ms, &speeds)?,
                gear: samples[idx_nearest].gear,
            });
        }

        TelemetryTrace::new(resampled)
    }

    /// len returns the number of samples, i.e. the track length in index units.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.samples.len() as f64
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// sample_at returns the sample at the given continuous index. The index is clamped to the
    /// valid range and truncated to an integer.
    pub fn sample_at(&self, index: f64) -> &TelemetrySample {
        &self.samples[self.clamp_index(index)]
    }

    fn clamp_index(&self, index: f64) -> usize {
        if index.is_nan() || index <= 0.0 {
            return 0;
        }
        (index as usize).min(self.samples.len() - 1)
    }
}
