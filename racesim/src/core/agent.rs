use crate::core::target_queue::TargetQueue;
use helpers::geometry::{heading_to_vector, wrap_angle_deg};
use nalgebra::{Point2, Vector2};

/// Agent holds the kinematic state of a racer as seen by the controller. Position, heading
/// and velocity are the physics layer's rigid body state; the target queue is the controller's
/// own look-ahead state.
#[derive(Debug, Clone)]
pub struct Agent {
    pub position: Point2<f64>,
    /// (deg) Compass heading, 0° along +y, clockwise positive
    pub heading: f64,
    pub velocity: Vector2<f64>,
    pub queue: TargetQueue,
}

impl Agent {
    pub fn new(position: Point2<f64>, heading: f64, queue: TargetQueue) -> Agent {
        Agent {
            position,
            heading: wrap_angle_deg(heading),
            velocity: Vector2::zeros(),
            queue,
        }
    }

    /// forward returns the unit vector the agent is facing.
    pub fn forward(&self) -> Vector2<f64> {
        heading_to_vector(self.heading)
    }

    /// forward_speed returns the signed velocity component along the heading.
    pub fn forward_speed(&self) -> f64 {
        self.velocity.dot(&self.forward())
    }

    /// speed returns the magnitude of the velocity.
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn rotate(&mut self, delta: f64) {
        self.heading = wrap_angle_deg(self.heading + delta);
    }

    pub fn set_forward_speed(&mut self, speed: f64) {
        self.velocity = self.forward() * speed;
    }

    /// The method places the agent at the given position with zero velocity.
    pub fn teleport(&mut self, position: Point2<f64>) {
        self.position = position;
        self.velocity = Vector2::zeros();
    }
}
