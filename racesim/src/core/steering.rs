use helpers::geometry::signed_angle_deg;
use nalgebra::Point2;
use std::fmt;

/// Everything a steering strategy may look at in one tick.
#[derive(Debug, Clone, Copy)]
pub struct SteeringInput {
    /// (deg) Current heading
    pub heading: f64,
    pub position: Point2<f64>,
    pub target: Point2<f64>,
    /// (m/s) Current forward speed
    pub speed: f64,
    /// Extra steering command added before attenuation, e.g. for avoidance
    pub bias: f64,
}

pub trait SteeringStrategy: fmt::Debug {
    /// heading_delta returns the heading change (deg) to apply for a tick of length `dt`.
    fn heading_delta(&self, input: &SteeringInput, dt: f64) -> f64;
}

/// PursuitSteering steers proportionally towards the target point and turns less sharply the
/// faster the agent drives.
///
/// * `max_turn_angle` - (deg) Target angle that results in a full steering command
/// * `turn_rate` - (deg/s) Heading change rate at full steering command
/// * `turn_factor` - (-) Reduction of the turn rate at maximum speed, in [0, 1]
/// * `max_speed` - (m/s) Speed at which the full reduction applies
#[derive(Debug, Clone)]
pub struct PursuitSteering {
    pub max_turn_angle: f64,
    pub turn_rate: f64,
    pub turn_factor: f64,
    pub max_speed: f64,
}

impl PursuitSteering {
    /// steering_command normalizes the signed angle to the target into [-1, 1].
    pub fn steering_command(&self, angle_to_target: f64) -> f64 {
        (angle_to_target / self.max_turn_angle).clamp(-1.0, 1.0)
    }

    /// attenuation returns the factor the turn rate is scaled with at the given speed.
    pub fn attenuation(&self, speed: f64) -> f64 {
        let speed_ratio = if self.max_speed > 0.0 {
            (speed.abs() / self.max_speed).min(1.0)
        } else {
            1.0
        };
        1.0 - self.turn_factor * speed_ratio
    }
}

impl SteeringStrategy for PursuitSteering {
    fn heading_delta(&self, input: &SteeringInput, dt: f64) -> f64 {
        let angle_to_target = signed_angle_deg(input.heading, &(input.target - input.position));
        let command = self.steering_command(angle_to_target) + input.bias;

        command * self.turn_rate * dt * self.attenuation(input.speed)
    }
}
