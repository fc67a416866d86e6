use crate::core::racer::{RacerId, RacerKind};
use crate::interfaces::results_interface::RgbColor;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

/// ResultEntry is the final line of a single racer.
///
/// * `time` - (s) Real or predicted race time, 0.0 for DNF
/// * `dnf` - The racer did not finish and no time could be predicted
/// * `predicted` - `time` was predicted instead of driven
/// * `lap_times` - (s) Durations of all completed laps
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ResultEntry {
    pub racer_id: RacerId,
    pub name: String,
    pub kind: RacerKind,
    pub color: Option<RgbColor>,
    pub time: f64,
    pub dnf: bool,
    pub predicted: bool,
    pub lap_times: Vec<f64>,
}

/// RaceResult contains the ranked result entries of a race, best first.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceResult {
    pub track_name: String,
    pub tot_no_laps: u32,
    /// (s) Race time at which the human racer finished
    pub racetime: f64,
    pub entries: Vec<ResultEntry>,
}

impl RaceResult {
    pub fn winner(&self) -> Option<&ResultEntry> {
        self.entries.iter().find(|entry| !entry.dnf)
    }

    pub fn position_of(&self, racer_id: RacerId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.racer_id == racer_id)
            .map(|idx| idx + 1)
    }

    /// format_results returns the result table as text.
    pub fn format_results(&self) -> Result<String, std::fmt::Error> {
        let mut content = String::new();

        writeln!(
            &mut content,
            "RESULT: {} ({} laps)",
            self.track_name, self.tot_no_laps
        )?;
        writeln!(&mut content, "pos, name                , time      , laps")?;

        for (i, entry) in self.entries.iter().enumerate() {
            let time = if entry.dnf {
                "DNF".to_owned()
            } else if entry.predicted {
                format!("{:8.3}s*", entry.time)
            } else {
                format!("{:8.3}s ", entry.time)
            };

            write!(&mut content, "{:3}, {:20}, {:10}, ", i + 1, entry.name, time)?;

            for (lap, lap_time) in entry.lap_times.iter().enumerate() {
                if lap < entry.lap_times.len() - 1 {
                    write!(&mut content, "{:8.3}s, ", lap_time)?;
                } else {
                    write!(&mut content, "{:8.3}s", lap_time)?;
                }
            }
            writeln!(&mut content)?;
        }

        if self.entries.iter().any(|entry| entry.predicted) {
            writeln!(&mut content, "* predicted")?;
        }

        Ok(content)
    }

    /// print_results prints the result table to the log.
    pub fn print_results(&self) -> anyhow::Result<()> {
        for line in self.format_results()?.lines() {
            info!("{}", line);
        }
        Ok(())
    }

    /// write_results_to_file writes the result table to a text file, by default
    /// output/last_run.txt. Returns the path to the written file.
    pub fn write_results_to_file(&self, path: Option<&Path>) -> anyhow::Result<PathBuf> {
        let content = self.format_results()?;

        let out_path = match path {
            Some(p) => p.to_path_buf(),
            None => Path::new("output").join("last_run.txt"),
        };
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

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
