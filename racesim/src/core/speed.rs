use helpers::general::move_towards;
use helpers::geometry::unsigned_angle_deg;
use nalgebra::Point2;
use std::fmt;

/// Angles below this floor are treated as the floor when dividing by the angle to the target.
pub const MIN_TURN_ANGLE: f64 = 1.0;

/// Geometry of the upcoming path as seen by a speed strategy.
#[derive(Debug, Clone, Copy)]
pub struct CornerInput {
    pub position: Point2<f64>,
    /// Current queued target point
    pub target: Point2<f64>,
    /// Queued target point after `target`
    pub next_target: Point2<f64>,
    /// (deg) Signed angle between the heading and the look-ahead direction
    pub angle_to_target: f64,
}

impl CornerInput {
    /// corner_angle returns the unsigned angle between the incoming direction (agent towards
    /// target) and the outgoing direction (target towards next target).
    pub fn corner_angle(&self) -> f64 {
        unsigned_angle_deg(
            &(self.target - self.position),
            &(self.next_target - self.target),
        )
    }
}

pub trait SpeedStrategy: fmt::Debug {
    /// target_speed returns the speed (m/s) the agent should drive at for the given geometry.
    fn target_speed(&self, input: &CornerInput) -> f64;
}

/// CornerMultiplier scales the maximum speed by a fixed table depending on the corner angle:
/// more than 45° -> 0.6, more than 20° -> 0.8, otherwise full speed.
#[derive(Debug, Clone)]
pub struct CornerMultiplier {
    pub max_speed: f64,
}

impl CornerMultiplier {
    pub fn multiplier(corner_angle: f64) -> f64 {
        if corner_angle > 45.0 {
            0.6
        } else if corner_angle > 20.0 {
            0.8
        } else {
            1.0
        }
    }
}

impl SpeedStrategy for CornerMultiplier {
    fn target_speed(&self, input: &CornerInput) -> f64 {
        self.max_speed * CornerMultiplier::multiplier(input.corner_angle())
    }
}

/// TurnAngleLimit derives the safe speed from the angle to the target:
/// `max_speed * max_turn_angle / max(|angle|, 1°)`, clamped to `max_speed`.
#[derive(Debug, Clone)]
pub struct TurnAngleLimit {
    pub max_speed: f64,
    pub max_turn_angle: f64,
}

impl SpeedStrategy for TurnAngleLimit {
    fn target_speed(&self, input: &CornerInput) -> f64 {
        let angle = input.angle_to_target.abs().max(MIN_TURN_ANGLE);
        (self.max_speed * self.max_turn_angle / angle).min(self.max_speed)
    }
}

/// ease_speed moves the current speed towards the target speed, by at most `acceleration * dt`
/// when speeding up and at most `deceleration * dt` when slowing down.
pub fn ease_speed(current: f64, target: f64, acceleration: f64, deceleration: f64, dt: f64) -> f64 {
    if target >= current {
        move_towards(current, target, acceleration * dt)
    } else {
        move_towards(current, target, deceleration * dt)
    }
}
