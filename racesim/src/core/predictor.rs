use crate::core::racer::Racer;
use crate::core::track::Track;
use crate::post::race_result::ResultEntry;
use helpers::general::mean;
use nalgebra::distance;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Time assigned to racers that did not finish and cannot be predicted.
pub const DNF_TIME: f64 = 0.0;

/// (m/s) Floor for the speed used in the remaining distance model.
pub const MIN_PREDICTION_SPEED: f64 = 0.1;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionModel {
    /// Average lap duration times the number of laps, DNF without a completed lap.
    LapAverage,
    /// Current race time plus the remaining path length divided by the current speed.
    RemainingDistance,
}

impl Default for PredictionModel {
    fn default() -> Self {
        PredictionModel::LapAverage
    }
}

/// predict_time returns the predicted final race time of an unfinished racer, or None if no
/// prediction is possible (DNF).
pub fn predict_time(
    racer: &Racer,
    track: &Track,
    elapsed: f64,
    model: PredictionModel,
) -> Option<f64> {
    match model {
        PredictionModel::LapAverage => {
            mean(racer.laps.lap_durations()).map(|avg| avg * racer.laps.total_laps() as f64)
        }
        PredictionModel::RemainingDistance => {
            let agent = &racer.agent;
            let laps_left = racer
                .laps
                .total_laps()
                .saturating_sub(racer.laps.compl_laps())
                .max(1);

            let to_front = agent
                .queue
                .front()
                .map_or(0.0, |front| distance(&agent.position, front));
            let remaining = to_front
                + track.remaining_lap_distance(agent.queue.track_index())
                + track.lap_length() * (laps_left - 1) as f64;

            Some(elapsed + remaining / agent.forward_speed().max(MIN_PREDICTION_SPEED))
        }
    }
}

/// predict_results creates the result entries of all racers once the human racer finished.
/// Finished racers keep their recorded time, the human racer gets the race time `elapsed`,
/// all others are predicted.
pub fn predict_results(
    racers: &[Racer],
    track: &Track,
    elapsed: f64,
    model: PredictionModel,
) -> Vec<ResultEntry> {
    racers
        .iter()
        .map(|racer| {
            let (time, predicted) = if racer.laps.is_finished() {
                (racer.laps.finish_time(), false)
            } else if racer.is_human() {
                (Some(elapsed), false)
            } else {
                (predict_time(racer, track, elapsed, model), true)
            };

            ResultEntry {
                racer_id: racer.id,
                name: racer.name.to_owned(),
                kind: racer.kind,
                color: racer.color.to_owned(),
                time: time.unwrap_or(DNF_TIME),
                dnf: time.is_none(),
                predicted: predicted && time.is_some(),
                lap_times: racer.laps.lap_durations().to_vec(),
            }
        })
        .collect()
}

/// sort_results sorts the entries ascending by time. DNF entries are always placed last and
/// keep their relative order.
pub fn sort_results(entries: &mut [ResultEntry]) {
    entries.sort_by(|a, b| match (a.dnf, b.dnf) {
        (false, false) => a.time.total_cmp(&b.time),
        (true, true) => Ordering::Equal,
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
    });
}
