use crate::core::race::RacePars;
use crate::core::track::{Track, TrackPars};
use anyhow::Context;
use helpers::general::InputValueError;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    pub track_pars: TrackPars,
}

impl SimPars {
    /// validate checks the race parameters and the parts of the track parameters that do not
    /// require loading a waypoint file.
    pub fn validate(&self) -> Result<(), InputValueError> {
        self.race_pars.validate()?;

        if self.track_pars.waypoints_file.is_none() && self.track_pars.waypoints.len() < 2 {
            return Err(InputValueError::Inconsistent(format!(
                "track {} needs at least 2 waypoints, but has {}",
                self.track_pars.name,
                self.track_pars.waypoints.len()
            )));
        }

        if self.track_pars.checkpoints.is_empty() {
            return Err(InputValueError::Inconsistent(format!(
                "track {} needs at least 1 checkpoint",
                self.track_pars.name
            )));
        }

        Ok(())
    }

    /// create_track loads the track and makes sure that agents can be driven on it.
    pub fn create_track(&self) -> anyhow::Result<Track> {
        let track = Track::new(&self.track_pars)?;

        if !track.is_ready() {
            return Err(InputValueError::Inconsistent(format!(
                "track {} needs at least 2 waypoints, but has {}",
                track.name,
                track.len()
            )))
            .context("Invalid track parameters!");
        }

        Ok(track)
    }
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.to_string_lossy()
        ))?;
    let pars: SimPars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.to_string_lossy()
    ))?;

    pars.validate().context(format!(
        "Invalid parameters in {}!",
        filepath.to_string_lossy()
    ))?;

    Ok(pars)
}
