use crate::core::tireset::Compound;
use serde::{Deserialize, Serialize};

/// Historical record of one lap of a driver.
///
/// * `lap_number` - Lap number (1-based)
/// * `lap_time_seconds` - (s) Recorded lap duration
/// * `compound` - Compound used on this lap
/// * `tire_life` - (laps) Age of the tire set on this lap
/// * `is_pit_out` - True if the lap started in the pit lane
/// * `is_pit_in` - True if the driver entered the pits at the end of this lap
/// * `position` - Classified position at the end of the lap
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LapData {
    pub lap_number: u32,
    pub lap_time_seconds: f64,
    pub compound: Compound,
    #[serde(default)]
    pub tire_life: u32,
    #[serde(default)]
    pub is_pit_out: bool,
    #[serde(default)]
    pub is_pit_in: bool,
    pub position: u32,
}

/// Complete historical race of one driver, ordered by lap number.
///
/// * `driver_code` - Driver abbreviation, e.g. VER
/// * `driver_name` - Full name
/// * `team` - Team name
/// * `team_color` - Team color as CSS color string, e.g. #1e41ff
/// * `laps` - Lap records ordered by lap number
/// * `final_position` - Final classified position
/// * `total_laps` - Number of laps completed
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DriverRaceData {
    pub driver_code: String,
    #[serde(default)]
    pub driver_name: String,
    #[serde(default)]
    pub team: String,
    #[serde(default = "default_team_color")]
    pub team_color: String,
    pub laps: Vec<LapData>,
    pub final_position: u32,
    pub total_laps: u32,
}

fn default_team_color() -> String {
    "#c8c8c8".to_owned()
}

impl DriverRaceData {
    /// lap returns the record of the given lap number, if the driver completed it.
    pub fn lap(&self, lap_number: u32) -> Option<&LapData> {
        self.laps.iter().find(|lap| lap.lap_number == lap_number)
    }

    /// position_at_lap returns the recorded position at the given lap, or the final position if
    /// the lap does not exist.
    pub fn position_at_lap(&self, lap_number: u32) -> u32 {
        self.lap(lap_number)
            .map(|lap| lap.position)
            .unwrap_or(self.final_position)
    }

    pub fn compound_at_lap(&self, lap_number: u32) -> Option<Compound> {
        self.lap(lap_number).map(|lap| lap.compound)
    }

    /// pit_stops returns the lap numbers on which the driver entered the pits.
    pub fn pit_stops(&self) -> Vec<u32> {
        self.laps
            .iter()
            .filter(|lap| lap.is_pit_in)
            .map(|lap| lap.lap_number)
            .collect()
    }

    /// time_before_lap returns the summed duration of all recorded laps strictly before the
    /// given lap, i.e. the race time at which the driver started it.
    pub fn time_before_lap(&self, lap_number: u32) -> f64 {
        self.laps
            .iter()
            .filter(|lap| lap.lap_number < lap_number)
            .map(|lap| lap.lap_time_seconds)
            .sum()
    }
}

/// Historical race of all drivers as handed over by the data provider.
///
/// * `total_laps` - Scheduled race distance in laps
/// * `drivers` - Race data per driver, the order is kept for deterministic iteration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceData {
    pub total_laps: u32,
    pub drivers: Vec<DriverRaceData>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    pub(crate) fn lap(lap_number: u32, lap_time_seconds: f64, compound: Compound, position: u32) -> LapData {
        LapData {
            lap_number,
            lap_time_seconds,
            compound,
            tire_life: lap_number,
            is_pit_out: false,
            is_pit_in: false,
            position,
        }
    }

    fn driver() -> DriverRaceData {
        let mut laps = vec![
            lap(1, 90.0, Compound::Medium, 2),
            lap(2, 88.0, Compound::Medium, 1),
            lap(3, 91.0, Compound::Hard, 1),
        ];
        laps[1].is_pit_in = true;
        DriverRaceData {
            driver_code: "VER".to_owned(),
            driver_name: "Max Verstappen".to_owned(),
            team: "Red Bull Racing".to_owned(),
            team_color: "#1e41ff".to_owned(),
            laps,
            final_position: 1,
            total_laps: 3,
        }
    }

    #[test]
    fn lookups_by_lap() {
        let drv = driver();
        assert_eq!(drv.position_at_lap(1), 2);
        assert_eq!(drv.position_at_lap(7), 1);
        assert_eq!(drv.compound_at_lap(3), Some(Compound::Hard));
        assert_eq!(drv.compound_at_lap(4), None);
        assert_eq!(drv.pit_stops(), vec![2]);
    }

    #[test]
    fn time_before_lap_sums_previous_laps() {
        let drv = driver();
        assert_relative_eq!(drv.time_before_lap(1), 0.0);
        assert_relative_eq!(drv.time_before_lap(3), 178.0);
        assert_relative_eq!(drv.time_before_lap(10), 269.0);
    }

    #[test]
    fn race_data_deserializes_with_defaults() {
        let json = r#"{
            "total_laps": 1,
            "drivers": [{
                "driver_code": "HAM",
                "laps": [{"lap_number": 1, "lap_time_seconds": 92.5, "compound": "SOFT", "position": 1}],
                "final_position": 1,
                "total_laps": 1
            }]
        }"#;
        let data: RaceData = serde_json::from_str(json).unwrap();
        let ham = &data.drivers[0];
        assert_eq!(ham.team_color, "#c8c8c8");
        assert_eq!(ham.laps[0].compound, Compound::Soft);
        assert!(!ham.laps[0].is_pit_in);
    }
}
