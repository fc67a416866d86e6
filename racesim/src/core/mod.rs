pub mod agent;
pub mod controller;
pub mod handle_race;
pub mod lap_tracker;
pub mod predictor;
pub mod race;
pub mod racer;
pub mod recovery;
pub mod speed;
pub mod steering;
pub mod target_queue;
pub mod track;
pub mod world;
