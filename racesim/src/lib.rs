//! `racesim` drives autonomous racers around a 2D waypoint track, tracks their laps and, once
//! the human racer finishes, predicts the final times of everyone still on track.

pub mod core;
pub mod interfaces;
pub mod post;
pub mod pre;
