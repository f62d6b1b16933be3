use crate::core::car::CarStatus;
use crate::core::tireset::Compound;
use std::fmt::Write;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// Player result compared against the historical race.
///
/// * `real_position` - Historical position of the player at the current lap
/// * `sim_position` - Simulated position of the player
/// * `delta` - Positions gained compared to history (positive = outperforming history)
/// * `real_final_position` - Historical final position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalComparison {
    pub real_position: u32,
    pub sim_position: usize,
    pub delta: i64,
    pub real_final_position: u32,
}

impl HistoricalComparison {
    pub fn new(real_position: u32, sim_position: usize, real_final_position: u32) -> Self {
        HistoricalComparison {
            real_position,
            sim_position,
            delta: real_position as i64 - sim_position as i64,
            real_final_position,
        }
    }
}

/// ClassifiedCar is one row of the classification.
///
/// * `race_time` - (s) Total race time, only available for finished cars
/// * `gap_to_leader` - (s) Gap to the leader if it can be determined
#[derive(Debug, Clone)]
pub struct ClassifiedCar {
    pub position: usize,
    pub driver_code: String,
    pub is_player: bool,
    pub status: CarStatus,
    pub laps_completed: u32,
    pub race_time: Option<f64>,
    pub gap_to_leader: Option<f64>,
    pub compound: Compound,
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Clone)]
pub struct RaceResult {
    pub tot_no_laps: u32,
    pub player_code: String,
    pub race_time: f64,
    pub classification: Vec<ClassifiedCar>,
    pub historical: Option<HistoricalComparison>,
}

impl RaceResult {
    pub fn player(&self) -> Option<&ClassifiedCar> {
        self.classification.iter().find(|car| car.is_player)
    }

    /// format_results renders the classification as text table.
    pub fn format_results(&self) -> anyhow::Result<String> {
        let mut content = String::new();
        writeln!(
            &mut content,
            "RESULT: Classification after {:.3}s ({} laps scheduled)",
            self.race_time, self.tot_no_laps
        )?;
        writeln!(&mut content, "pos, driver, status,   laps,  race time,       gap, tires")?;

        for car in self.classification.iter() {
            let status = match car.status {
                CarStatus::Running => "RUN",
                CarStatus::Finished => "FIN",
                CarStatus::Dnf => "DNF",
            };
            let race_time = match car.race_time {
                Some(t) => format!("{:9.3}s", t),
                None => format!("{:>10}", "-"),
            };
            let gap = match car.gap_to_leader {
                Some(g) if g > 0.0 => format!("{:+8.3}s", g),
                Some(_) => format!("{:>9}", "leader"),
                None => format!("{:>9}", "-"),
            };
            writeln!(
                &mut content,
                "{:3}, {:>5}{}, {:>6}, {:6}, {}, {}, {}",
                car.position,
                car.driver_code,
                if car.is_player { "*" } else { " " },
                status,
                car.laps_completed,
                race_time,
                gap,
                car.compound
            )?;
        }

        if let Some(hist) = &self.historical {
            writeln!(&mut content)?;
            writeln!(&mut content, "RESULT: Historical comparison ({})", self.player_code)?;
            writeln!(
                &mut content,
                "real position {}, simulated position {}, delta {:+}, real final position {}",
                hist.real_position, hist.sim_position, hist.delta, hist.real_final_position
            )?;
        }

        Ok(content)
    }

    /// print_results prints the classification to the console output.
    pub fn print_results(&self) -> anyhow::Result<()> {
        print!("{}", self.format_results()?);
        Ok(())
    }

    /// write_results_to_file writes the classification to a text file. Without a path the file
    /// is placed in output/. Returns the path of the written file.
    pub fn write_results_to_file(&self, path: Option<&Path>) -> anyhow::Result<PathBuf> {
        let content = self.format_results()?;

        let out_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let out_dir = Path::new("output");
                std::fs::create_dir_all(out_dir)?;
                out_dir.join("last_run.txt")
            }
        };

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(out_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> RaceResult {
        RaceResult {
            tot_no_laps: 3,
            player_code: "HAM".to_owned(),
            race_time: 275.0,
            classification: vec![
                ClassifiedCar {
                    position: 1,
                    driver_code: "HAM".to_owned(),
                    is_player: true,
                    status: CarStatus::Finished,
                    laps_completed: 3,
                    race_time: Some(270.0),
                    gap_to_leader: Some(0.0),
                    compound: Compound::Hard,
                },
                ClassifiedCar {
                    position: 2,
                    driver_code: "VER".to_owned(),
                    is_player: false,
                    status: CarStatus::Dnf,
                    laps_completed: 1,
                    race_time: None,
                    gap_to_leader: None,
                    compound: Compound::Soft,
                },
            ],
            historical: Some(HistoricalComparison::new(2, 1, 2)),
        }
    }

    #[test]
    fn comparison_delta_is_positive_when_outperforming() {
        let cmp = HistoricalComparison::new(5, 2, 4);
        assert_eq!(cmp.delta, 3);
        assert_eq!(HistoricalComparison::new(1, 3, 1).delta, -2);
    }

    #[test]
    fn format_contains_rows_and_comparison() {
        let text = result().format_results().unwrap();
        assert!(text.starts_with("RESULT: Classification"));
        assert!(text.contains("HAM*"));
        assert!(text.contains("DNF"));
        assert!(text.contains("delta +1"));
    }

    #[test]
    fn results_are_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let written = result().write_results_to_file(Some(&path)).unwrap();
        assert_eq!(written, path);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("VER"));
    }
}
