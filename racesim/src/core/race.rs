use crate::core::agent::Agent;
use crate::core::controller::{AgentController, ControllerPars};
use crate::core::lap_tracker::{LapEvent, LapTracker};
use crate::core::predictor::{predict_results, sort_results, PredictionModel};
use crate::core::racer::{parse_color, Racer, RacerId, RacerKind, RacerPars};
use crate::core::target_queue::TargetQueue;
use crate::core::track::Track;
use crate::core::world::PhysicsWorld;
use crate::post::race_result::RaceResult;
use anyhow::Context;
use helpers::general::InputValueError;
use log::{debug, info};
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// * `position` - (m) Spawn position
/// * `heading` - (deg) Initial compass heading
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub position: [f64; 2],
    pub heading: f64,
}

/// * `tot_no_laps` - Number of laps
/// * `countdown` - (s) Frozen start phase before the race clock runs
/// * `max_racetime` - (s) The race is aborted if the human racer did not finish until then
/// * `prediction_model` - Model used to predict the times of unfinished racers
/// * `spawn_points` - Possible spawn points, each racer gets a different one
/// * `human` - The human racer
/// * `ai` - The AI racers
/// * `ai_palette` - Colors assigned in order to AI racers without an own color
/// * `controller` - Default controller parameters of all racers
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RacePars {
    pub tot_no_laps: u32,
    #[serde(default = "default_countdown")]
    pub countdown: f64,
    #[serde(default = "default_max_racetime")]
    pub max_racetime: f64,
    #[serde(default)]
    pub prediction_model: PredictionModel,
    pub spawn_points: Vec<SpawnPoint>,
    pub human: RacerPars,
    #[serde(default)]
    pub ai: Vec<RacerPars>,
    #[serde(default)]
    pub ai_palette: Vec<String>,
    #[serde(default)]
    pub controller: ControllerPars,
}

fn default_countdown() -> f64 {
    3.0
}

fn default_max_racetime() -> f64 {
    900.0
}

/// merge_fields writes all `overrides` into `base`. Nested maps are merged key by key.
fn merge_fields(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        if let (Some(Value::Object(nested)), Value::Object(nested_overrides)) =
            (base.get_mut(key), value)
        {
            merge_fields(nested, nested_overrides);
            continue;
        }
        base.insert(key.to_owned(), value.to_owned());
    }
}

impl RacePars {
    pub fn no_racers(&self) -> usize {
        1 + self.ai.len()
    }

    /// controller_pars returns the controller parameters of a racer. Fields set in the racer's
    /// own controller object replace the race defaults, all others are kept.
    pub fn controller_pars(
        &self,
        racer_pars: &RacerPars,
    ) -> Result<ControllerPars, InputValueError> {
        let overrides = match &racer_pars.controller {
            Some(overrides) => overrides,
            None => return Ok(self.controller.to_owned()),
        };

        let invalid = |e: serde_json::Error| {
            InputValueError::Inconsistent(format!(
                "invalid controller parameters of racer {}: {}",
                racer_pars.name, e
            ))
        };

        let mut merged = match serde_json::to_value(&self.controller).map_err(invalid)? {
            Value::Object(fields) => fields,
            other => {
                return Err(InputValueError::Inconsistent(format!(
                    "race controller parameters are not a map: {}",
                    other
                )))
            }
        };
        merge_fields(&mut merged, overrides);
        serde_json::from_value(Value::Object(merged)).map_err(invalid)
    }

    pub fn validate(&self) -> Result<(), InputValueError> {
        if self.tot_no_laps == 0 {
            return Err(InputValueError::OutOfRange {
                name: "tot_no_laps",
                value: 0.0,
                expected: "at least 1",
            });
        }
        helpers::general::check_non_negative("countdown", self.countdown)?;
        helpers::general::check_positive("max_racetime", self.max_racetime)?;

        if self.spawn_points.len() < self.no_racers() {
            return Err(InputValueError::Inconsistent(format!(
                "{} racers need as many spawn points, but only {} are given",
                self.no_racers(),
                self.spawn_points.len()
            )));
        }

        self.controller.validate()?;
        for racer_pars in std::iter::once(&self.human).chain(self.ai.iter()) {
            if racer_pars.controller.is_some() {
                self.controller_pars(racer_pars)?.validate()?;
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Race {
    pub timestep_size: f64,
    pub tot_no_laps: u32,
    /// Remaining time steps of the countdown
    countdown_ticks: u64,
    /// (s) Race time, runs after the countdown and stops once the human racer finished
    pub cur_racetime: f64,
    pub prediction_model: PredictionModel,
    pub track: Track,
    pub racers: Vec<Racer>,
    human_finished: bool,
    final_result: Option<RaceResult>,
    result_taken: bool,
    rng: StdRng,
}

impl Race {
    pub fn new(
        race_pars: &RacePars,
        track: Track,
        timestep_size: f64,
        seed: u64,
    ) -> anyhow::Result<Race> {
        race_pars
            .validate()
            .context("Invalid race parameters!")?;
        helpers::general::check_positive("timestep_size", timestep_size)?;

        let mut rng = StdRng::seed_from_u64(seed);

        // each racer gets its own randomly chosen spawn point
        let spawn_points: Vec<SpawnPoint> = race_pars
            .spawn_points
            .choose_multiple(&mut rng, race_pars.no_racers())
            .copied()
            .collect();

        let mut racers = Vec::with_capacity(race_pars.no_racers());
        let mut palette = race_pars.ai_palette.iter().cycle();

        for (id, racer_pars) in std::iter::once(&race_pars.human)
            .chain(race_pars.ai.iter())
            .enumerate()
        {
            let kind = if id == 0 {
                RacerKind::Human
            } else {
                RacerKind::Ai
            };

            let color_str = match (&racer_pars.color, kind) {
                (Some(color), _) => Some(color.as_str()),
                (None, RacerKind::Ai) => palette.next().map(|c| c.as_str()),
                (None, RacerKind::Human) => None,
            };
            let color = color_str.and_then(|c| parse_color(&racer_pars.name, c));

            let controller_pars = race_pars.controller_pars(racer_pars)?;
            let controller = match kind {
                RacerKind::Ai => Some(AgentController::new(&controller_pars)),
                RacerKind::Human if racer_pars.controller.is_some() => {
                    Some(AgentController::new(&controller_pars))
                }
                RacerKind::Human => None,
            };

            let lane_offset = controller_pars.draw_lane_offset(&mut rng);
            let mut queue = TargetQueue::new(controller_pars.lookahead_window, lane_offset);
            queue.refill(&track, 0, controller_pars.lookahead_window, &mut rng);

            let spawn = spawn_points[id];
            racers.push(Racer {
                id,
                name: racer_pars.name.to_owned(),
                kind,
                color,
                agent: Agent::new(
                    Point2::new(spawn.position[0], spawn.position[1]),
                    spawn.heading,
                    queue,
                ),
                laps: LapTracker::new(track.total_checkpoints(), race_pars.tot_no_laps),
                controller,
            });
        }

        Ok(Race {
            timestep_size,
            tot_no_laps: race_pars.tot_no_laps,
            countdown_ticks: (race_pars.countdown / timestep_size).round() as u64,
            cur_racetime: 0.0,
            prediction_model: race_pars.prediction_model,
            track,
            racers,
            human_finished: false,
            final_result: None,
            result_taken: false,
            rng,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_timestep runs the controllers of all racers for one time step. During the
    /// countdown nobody moves.
    pub fn simulate_timestep(&mut self, world: &dyn PhysicsWorld) {
        if self.countdown_ticks > 0 {
            self.countdown_ticks -= 1;
            if self.countdown_ticks == 0 {
                info!("Go!");
            }
            return;
        }

        if !self.human_finished {
            self.cur_racetime += self.timestep_size;
        }

        let dt = self.timestep_size;

        for racer in self.racers.iter_mut() {
            if let Some(controller) = racer.controller.as_mut() {
                controller.drive(
                    racer.id,
                    &mut racer.agent,
                    &self.track,
                    world,
                    dt,
                    &mut self.rng,
                );
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // EVENTS --------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn on_checkpoint(&mut self, racer: RacerId, index: usize) {
        if let Some(r) = self.racers.get_mut(racer) {
            if r.laps.on_checkpoint(index) {
                debug!("{} passed checkpoint {}", r.name, index);
            }
        }
    }

    pub fn on_finish_line(&mut self, racer: RacerId) {
        let elapsed = self.cur_racetime;
        let (event, is_human) = match self.racers.get_mut(racer) {
            Some(r) => (r.laps.on_finish_line(elapsed), r.is_human()),
            None => return,
        };
        let name = &self.racers[racer].name;

        match event {
            LapEvent::LapCompleted { lap, duration } => {
                info!("{} completed lap {} in {:.3}s", name, lap, duration);
            }
            LapEvent::Finished {
                lap,
                duration,
                finish_time,
            } => {
                info!(
                    "{} completed lap {} in {:.3}s and finished after {:.3}s",
                    name, lap, duration, finish_time
                );
                if is_human {
                    self.finish_race();
                }
            }
            LapEvent::Ignored | LapEvent::AlreadyFinished => {}
        }
    }

    /// finish_race freezes the race clock and predicts the final result. Only the first call
    /// has an effect.
    fn finish_race(&mut self) {
        if self.human_finished {
            return;
        }
        self.human_finished = true;

        let mut entries = predict_results(
            &self.racers,
            &self.track,
            self.cur_racetime,
            self.prediction_model,
        );
        sort_results(&mut entries);

        self.final_result = Some(RaceResult {
            track_name: self.track.name.to_owned(),
            tot_no_laps: self.tot_no_laps,
            racetime: self.cur_racetime,
            entries,
        });
    }

    /// take_final_result returns the final result exactly once after the human racer finished.
    pub fn take_final_result(&mut self) -> Option<RaceResult> {
        if self.result_taken {
            return None;
        }
        let result = self.final_result.take();
        self.result_taken = result.is_some();
        result
    }

    pub fn get_human_finished(&self) -> bool {
        self.human_finished
    }

    pub fn get_racetime(&self) -> f64 {
        self.cur_racetime
    }

    pub fn human(&self) -> &Racer {
        &self.racers[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::SpeedModel;
    use crate::core::racer::RacerPars;
    use crate::core::track::{Rect, Waypoint};
    use nalgebra::Vector2;
    use test_log::test;

    struct NoWorld;

    impl PhysicsWorld for NoWorld {
        fn is_off_track(&self, _position: &Point2<f64>) -> bool {
            false
        }

        fn racer_ahead(
            &self,
            _racer: RacerId,
            _origin: &Point2<f64>,
            _dir: &Vector2<f64>,
            _distance: f64,
        ) -> bool {
            false
        }
    }

    fn racer_pars(name: &str) -> RacerPars {
        RacerPars {
            name: name.to_owned(),
            color: None,
            controller: None,
        }
    }

    fn race_pars(no_ai: usize, no_spawn_points: usize) -> RacePars {
        RacePars {
            tot_no_laps: 2,
            countdown: 0.1,
            max_racetime: 900.0,
            prediction_model: PredictionModel::LapAverage,
            spawn_points: (0..no_spawn_points)
                .map(|i| SpawnPoint {
                    position: [2.0 * i as f64, -5.0],
                    heading: 0.0,
                })
                .collect(),
            human: racer_pars("human"),
            ai: (0..no_ai).map(|i| racer_pars(&format!("ai {}", i))).collect(),
            ai_palette: vec!["#FF0000".to_owned(), "#00FF00".to_owned()],
            controller: ControllerPars::default(),
        }
    }

    fn track() -> Track {
        Track::from_waypoints(
            "line",
            vec![
                Waypoint {
                    index: 0,
                    position: Point2::new(0.0, 0.0),
                    region: None,
                },
                Waypoint {
                    index: 1,
                    position: Point2::new(0.0, 50.0),
                    region: None,
                },
            ],
            vec![Rect::new(Point2::new(0.0, 25.0), [5.0, 1.0])],
            Rect::new(Point2::origin(), [5.0, 1.0]),
            vec![],
        )
    }

    #[test]
    fn too_few_spawn_points_are_rejected() {
        assert!(Race::new(&race_pars(3, 3), track(), 0.02, 0).is_err());
    }

    #[test]
    fn racers_are_set_up() {
        let race = Race::new(&race_pars(3, 6), track(), 0.02, 0).unwrap();
        assert_eq!(race.racers.len(), 4);
        assert!(race.human().is_human());
        assert!(race.human().controller.is_none());
        assert!(race.racers[1..].iter().all(|r| r.controller.is_some()));

        // palette colors are handed out in order and wrap around
        assert_eq!(race.racers[1].color.as_ref().unwrap().r, 255);
        assert_eq!(race.racers[2].color.as_ref().unwrap().g, 255);
        assert_eq!(race.racers[3].color.as_ref().unwrap().r, 255);
        assert!(race.human().color.is_none());

        let mut positions: Vec<(i64, i64)> = race
            .racers
            .iter()
            .map(|r| (r.agent.position.x as i64, r.agent.position.y as i64))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions.len(), 4);
    }

    #[test]
    fn nobody_moves_during_countdown() {
        let mut race = Race::new(&race_pars(1, 2), track(), 0.02, 0).unwrap();
        for _ in 0..4 {
            race.simulate_timestep(&NoWorld);
            assert_eq!(race.get_racetime(), 0.0);
            assert_eq!(race.racers[1].agent.velocity, Vector2::zeros());
        }

        for _ in 0..3 {
            race.simulate_timestep(&NoWorld);
        }
        assert!(race.get_racetime() > 0.0);
        assert!(race.racers[1].agent.speed() > 0.0);
    }

    #[test]
    fn countdown_lasts_whole_time_steps() {
        let mut pars = race_pars(1, 2);
        pars.countdown = 3.0;
        let mut race = Race::new(&pars, track(), 0.02, 0).unwrap();

        for _ in 0..150 {
            race.simulate_timestep(&NoWorld);
        }
        assert_eq!(race.get_racetime(), 0.0);

        race.simulate_timestep(&NoWorld);
        assert_eq!(race.get_racetime(), 0.02);
    }

    #[test]
    fn racer_controller_overrides_single_fields() {
        let mut pars = race_pars(2, 3);
        pars.controller.max_speed = 20.0;
        pars.controller.waypoint_reached_dist = 3.0;
        pars.controller.recovery.teleport_distance = 40.0;
        let overrides = r#"{"speed_model": "turn_angle_limit", "recovery": {"enabled": false}}"#;
        pars.ai[0].controller = Some(serde_json::from_str(overrides).unwrap());

        let merged = pars.controller_pars(&pars.ai[0]).unwrap();
        assert_eq!(merged.speed_model, SpeedModel::TurnAngleLimit);
        assert!(!merged.recovery.enabled);
        assert_eq!(merged.max_speed, 20.0);
        assert_eq!(merged.waypoint_reached_dist, 3.0);
        assert_eq!(merged.recovery.teleport_distance, 40.0);

        // racers without overrides get the race defaults unchanged
        assert_eq!(pars.controller_pars(&pars.ai[1]).unwrap(), pars.controller);

        // overrides are validated after merging
        pars.ai[1].controller = Some(serde_json::from_str(r#"{"max_speed": -1.0}"#).unwrap());
        assert!(pars.validate().is_err());
        pars.ai[1].controller = Some(serde_json::from_str(r#"{"max_speed": "fast"}"#).unwrap());
        assert!(pars.validate().is_err());
    }

    #[test]
    fn human_finish_freezes_clock_and_emits_result_once() {
        let mut race = Race::new(&race_pars(1, 2), track(), 0.02, 0).unwrap();
        race.countdown_ticks = 0;
        for _ in 0..500 {
            race.simulate_timestep(&NoWorld);
        }

        // AI completes one lap at 10 s
        race.on_checkpoint(1, 0);
        race.on_finish_line(1);
        assert!(race.take_final_result().is_none());

        // human finishes two laps, the second one without the checkpoint is ignored first
        race.on_checkpoint(0, 0);
        race.on_finish_line(0);
        race.on_finish_line(0);
        assert!(!race.get_human_finished());
        race.on_checkpoint(0, 0);
        race.on_finish_line(0);
        assert!(race.get_human_finished());

        let frozen = race.get_racetime();
        race.simulate_timestep(&NoWorld);
        assert_eq!(race.get_racetime(), frozen);

        let result = race.take_final_result().unwrap();
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].racer_id, 0);
        assert!(!result.entries[0].predicted);
        assert!(result.entries[1].predicted);
        assert!(race.take_final_result().is_none());
    }
}
