use crate::post::race_result::RaceResult;
use serde::{Deserialize, Serialize};

/// (Hz) Maximum rate at which live race snapshots are sent to the results consumer.
pub const MAX_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Snapshot of a single racer.
#[derive(Debug, Clone, Default)]
pub struct RacerState {
    pub racer_id: usize,
    pub name: String,
    pub color: Option<RgbColor>,
    pub position: [f64; 2],
    /// (deg)
    pub heading: f64,
    /// (m/s)
    pub speed: f64,
    pub compl_laps: u32,
    pub recovering: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RaceState {
    pub racer_states: Vec<RacerState>,
    pub racetime: f64,
    pub human_finished: bool,

    // final results payload (sent once when the human racer finished)
    pub final_result: Option<RaceResult>,
}
