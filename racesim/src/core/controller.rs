use crate::core::agent::Agent;
use crate::core::racer::RacerId;
use crate::core::recovery::{RecoveryMonitor, RecoveryPars};
use crate::core::speed::{ease_speed, CornerInput, CornerMultiplier, SpeedStrategy, TurnAngleLimit};
use crate::core::steering::{PursuitSteering, SteeringInput, SteeringStrategy};
use crate::core::track::Track;
use crate::core::world::PhysicsWorld;
use helpers::general::{check_non_negative, check_positive, InputValueError};
use helpers::geometry::signed_angle_deg;
use nalgebra::distance;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeedModel {
    CornerMultiplier,
    TurnAngleLimit,
}

impl Default for SpeedModel {
    fn default() -> Self {
        SpeedModel::CornerMultiplier
    }
}

/// * `acceleration` - (m/s^2) Maximum speed increase per second
/// * `deceleration` - (m/s^2) Maximum speed decrease per second, must not be smaller than
/// `acceleration`
/// * `max_speed` - (m/s) Top speed
/// * `max_turn_angle` - (deg) Angle to the target that results in a full steering command
/// * `turn_rate` - (deg/s) Heading change rate at full steering command
/// * `turn_factor` - (-) Reduction of the turn rate at top speed
/// * `lookahead_window` - Number of queued target points
/// * `lookahead_base_distance` - (m) Look-ahead distance at standstill
/// * `lookahead_speed_gain` - (s) Additional look-ahead distance per m/s of speed
/// * `waypoint_reached_dist` - (m) Distance below which the front target counts as reached
/// * `off_track_slow_factor` - (-) Velocity factor applied inside off-track zones
/// * `avoidance_ray_distance` - (m) Range of the forward ray that looks for other racers
/// * `avoidance_strength` - (-) Steering command added when another racer is ahead
/// * `lane_offset_range` - (m) Lane offsets are drawn uniformly from +- this value
/// * `speed_model` - Strategy that derives the target speed
/// * `recovery` - Wrong-way and stuck recovery parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ControllerPars {
    pub acceleration: f64,
    pub deceleration: f64,
    pub max_speed: f64,
    pub max_turn_angle: f64,
    pub turn_rate: f64,
    pub turn_factor: f64,
    pub lookahead_window: usize,
    pub lookahead_base_distance: f64,
    pub lookahead_speed_gain: f64,
    pub waypoint_reached_dist: f64,
    pub off_track_slow_factor: f64,
    pub avoidance_ray_distance: f64,
    pub avoidance_strength: f64,
    pub lane_offset_range: f64,
    pub speed_model: SpeedModel,
    pub recovery: RecoveryPars,
}

impl Default for ControllerPars {
    fn default() -> Self {
        ControllerPars {
            acceleration: 8.0,
            deceleration: 12.0,
            max_speed: 12.0,
            max_turn_angle: 45.0,
            turn_rate: 200.0,
            turn_factor: 0.5,
            lookahead_window: 5,
            lookahead_base_distance: 3.0,
            lookahead_speed_gain: 0.25,
            waypoint_reached_dist: 0.5,
            off_track_slow_factor: 0.5,
            avoidance_ray_distance: 2.0,
            avoidance_strength: 1.5,
            lane_offset_range: 0.5,
            speed_model: SpeedModel::default(),
            recovery: RecoveryPars::default(),
        }
    }
}

impl ControllerPars {
    pub fn validate(&self) -> Result<(), InputValueError> {
        check_positive("acceleration", self.acceleration)?;
        check_positive("deceleration", self.deceleration)?;
        check_positive("max_speed", self.max_speed)?;
        check_positive("max_turn_angle", self.max_turn_angle)?;
        check_positive("turn_rate", self.turn_rate)?;
        check_non_negative("lookahead_base_distance", self.lookahead_base_distance)?;
        check_non_negative("lookahead_speed_gain", self.lookahead_speed_gain)?;
        check_positive("waypoint_reached_dist", self.waypoint_reached_dist)?;
        check_non_negative("avoidance_ray_distance", self.avoidance_ray_distance)?;
        check_non_negative("avoidance_strength", self.avoidance_strength)?;
        check_non_negative("lane_offset_range", self.lane_offset_range)?;

        if !(0.0..=1.0).contains(&self.turn_factor) {
            return Err(InputValueError::OutOfRange {
                name: "turn_factor",
                value: self.turn_factor,
                expected: "in [0, 1]",
            });
        }

        if !(self.off_track_slow_factor > 0.0 && self.off_track_slow_factor <= 1.0) {
            return Err(InputValueError::OutOfRange {
                name: "off_track_slow_factor",
                value: self.off_track_slow_factor,
                expected: "in (0, 1]",
            });
        }

        if self.lookahead_window == 0 {
            return Err(InputValueError::OutOfRange {
                name: "lookahead_window",
                value: 0.0,
                expected: "at least 1",
            });
        }

        if self.deceleration < self.acceleration {
            return Err(InputValueError::Inconsistent(format!(
                "deceleration ({}) must not be smaller than acceleration ({})",
                self.deceleration, self.acceleration
            )));
        }

        if self.recovery.enabled {
            check_positive("recovery_turn_rate", self.recovery.recovery_turn_rate)?;
            check_positive("stuck_time_limit", self.recovery.stuck_time_limit)?;
            check_positive("teleport_distance", self.recovery.teleport_distance)?;
            check_non_negative("recovery_exit_angle", self.recovery.recovery_exit_angle)?;
            check_non_negative(
                "recovery_speed_fraction",
                self.recovery.recovery_speed_fraction,
            )?;
        }

        Ok(())
    }

    /// lookahead_distance returns the look-ahead distance (m) at the given speed.
    pub fn lookahead_distance(&self, speed: f64) -> f64 {
        self.lookahead_base_distance + self.lookahead_speed_gain * speed.abs()
    }

    /// draw_lane_offset returns a random lane offset within the configured range.
    pub fn draw_lane_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.lane_offset_range > 0.0 {
            rng.gen_range(-self.lane_offset_range..=self.lane_offset_range)
        } else {
            0.0
        }
    }
}

/// AgentController drives a single agent along the track. The steering and speed strategies
/// are picked from the parameters at construction, the recovery monitor is optional.
#[derive(Debug)]
pub struct AgentController {
    pub pars: ControllerPars,
    steering: Box<dyn SteeringStrategy>,
    speed: Box<dyn SpeedStrategy>,
    recovery: Option<RecoveryMonitor>,
}

impl AgentController {
    pub fn new(pars: &ControllerPars) -> AgentController {
        let steering: Box<dyn SteeringStrategy> = Box::new(PursuitSteering {
            max_turn_angle: pars.max_turn_angle,
            turn_rate: pars.turn_rate,
            turn_factor: pars.turn_factor,
            max_speed: pars.max_speed,
        });

        let speed: Box<dyn SpeedStrategy> = match pars.speed_model {
            SpeedModel::CornerMultiplier => Box::new(CornerMultiplier {
                max_speed: pars.max_speed,
            }),
            SpeedModel::TurnAngleLimit => Box::new(TurnAngleLimit {
                max_speed: pars.max_speed,
                max_turn_angle: pars.max_turn_angle,
            }),
        };

        let recovery = if pars.recovery.enabled {
            Some(RecoveryMonitor::new(&pars.recovery, pars.max_speed))
        } else {
            None
        };

        AgentController {
            pars: pars.to_owned(),
            steering,
            speed,
            recovery,
        }
    }

    pub fn is_recovering(&self) -> bool {
        self.recovery
            .as_ref()
            .map_or(false, |monitor| monitor.is_recovering())
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// drive runs the controller for one tick: it advances the target queue, lets the recovery
    /// monitor take over if required, and otherwise updates heading and velocity of the agent.
    /// Nothing happens as long as the track is not ready.
    pub fn drive(
        &mut self,
        id: RacerId,
        agent: &mut Agent,
        track: &Track,
        world: &dyn PhysicsWorld,
        dt: f64,
        rng: &mut dyn RngCore,
    ) {
        if !track.is_ready() {
            return;
        }

        if agent.queue.is_empty() {
            let window = self.pars.lookahead_window;
            agent.queue.refill(track, 0, window, rng);
        }

        // advance the queue once the front target is reached
        if let Some(front) = agent.queue.front() {
            if distance(&agent.position, front) < self.pars.waypoint_reached_dist {
                agent.queue.advance(track, rng);
            }
        }

        let lookahead_dist = self.pars.lookahead_distance(agent.forward_speed());
        let lookahead = agent.queue.lookahead_point(&agent.position, lookahead_dist);

        if let Some(monitor) = self.recovery.as_mut() {
            if monitor.update(agent, &lookahead, dt) {
                return;
            }
        }

        // STEERING --------------------------------------------------------------------------------
        let bias = if world.racer_ahead(
            id,
            &agent.position,
            &agent.forward(),
            self.pars.avoidance_ray_distance,
        ) {
            if rng.gen_bool(0.5) {
                self.pars.avoidance_strength
            } else {
                -self.pars.avoidance_strength
            }
        } else {
            0.0
        };

        let delta = self.steering.heading_delta(
            &SteeringInput {
                heading: agent.heading,
                position: agent.position,
                target: lookahead,
                speed: agent.forward_speed(),
                bias,
            },
            dt,
        );
        agent.rotate(delta);

        // SPEED -----------------------------------------------------------------------------------
        let target = agent.queue.front().copied().unwrap_or(lookahead);
        let next_target = agent.queue.get(1).copied().unwrap_or(target);

        let target_speed = self.speed.target_speed(&CornerInput {
            position: agent.position,
            target,
            next_target,
            angle_to_target: signed_angle_deg(agent.heading, &(lookahead - agent.position)),
        });

        let speed = ease_speed(
            agent.forward_speed(),
            target_speed,
            self.pars.acceleration,
            self.pars.deceleration,
            dt,
        );
        agent.set_forward_speed(speed);

        if world.is_off_track(&agent.position) {
            agent.velocity *= self.pars.off_track_slow_factor;
        }
    }
}
