use crate::core::agent::Agent;
use helpers::geometry::signed_angle_deg;
use log::{debug, warn};
use nalgebra::{distance, Point2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Driving,
    Recovering,
}

/// * `enabled` - Activates the recovery monitor
/// * `wrong_way_angle` - (deg) Angle between heading and look-ahead direction that triggers a
/// recovery
/// * `stuck_speed_threshold` - (m/s) Speeds below this count as standing still
/// * `stuck_time_limit` - (s) Time an agent may stand still before a recovery is triggered
/// * `recovery_turn_rate` - (deg/s) Heading change rate while recovering
/// * `recovery_exit_angle` - (deg) Recovery ends once the angle drops below this value
/// * `recovery_speed_fraction` - (-) Fraction of the maximum speed driven while recovering
/// * `teleport_distance` - (m) Distance to the current target that forces a teleport
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RecoveryPars {
    pub enabled: bool,
    pub wrong_way_angle: f64,
    pub stuck_speed_threshold: f64,
    pub stuck_time_limit: f64,
    pub recovery_turn_rate: f64,
    pub recovery_exit_angle: f64,
    pub recovery_speed_fraction: f64,
    pub teleport_distance: f64,
}

impl Default for RecoveryPars {
    fn default() -> Self {
        RecoveryPars {
            enabled: true,
            wrong_way_angle: 100.0,
            stuck_speed_threshold: 1.0,
            stuck_time_limit: 2.0,
            recovery_turn_rate: 150.0,
            recovery_exit_angle: 30.0,
            recovery_speed_fraction: 0.5,
            teleport_distance: 25.0,
        }
    }
}

/// RecoveryMonitor overrides the normal control of an agent that faces away from its target or
/// got stuck, until it points at the target again.
#[derive(Debug, Clone)]
pub struct RecoveryMonitor {
    pars: RecoveryPars,
    max_speed: f64,
    state: RecoveryState,
    t_stuck: f64,
}

impl RecoveryMonitor {
    pub fn new(pars: &RecoveryPars, max_speed: f64) -> RecoveryMonitor {
        RecoveryMonitor {
            pars: pars.to_owned(),
            max_speed,
            state: RecoveryState::Driving,
            t_stuck: 0.0,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn is_recovering(&self) -> bool {
        self.state == RecoveryState::Recovering
    }

    /// check_state_transition enters the recovery state if the agent is facing the wrong way or
    /// has been standing still for too long.
    fn check_state_transition(&mut self, angle_to_target: f64, speed: f64, dt: f64) {
        if speed < self.pars.stuck_speed_threshold {
            self.t_stuck += dt;
        } else {
            self.t_stuck = 0.0;
        }

        if let RecoveryState::Driving = self.state {
            if angle_to_target.abs() > self.pars.wrong_way_angle {
                debug!("Agent faces the wrong way ({:.1}°), recovering", angle_to_target);
                self.state = RecoveryState::Recovering;
            } else if self.t_stuck > self.pars.stuck_time_limit {
                debug!("Agent stuck for {:.2}s, recovering", self.t_stuck);
                self.state = RecoveryState::Recovering;
            }
        }
    }

    fn exit(&mut self) {
        self.state = RecoveryState::Driving;
        self.t_stuck = 0.0;
    }

    /// update runs the monitor for one tick. It returns true if the tick was handled by the
    /// recovery, in which case the normal steering and speed control must be skipped.
    pub fn update(&mut self, agent: &mut Agent, lookahead: &Point2<f64>, dt: f64) -> bool {
        let angle_to_target = signed_angle_deg(agent.heading, &(lookahead - agent.position));
        self.check_state_transition(angle_to_target, agent.speed(), dt);

        if let RecoveryState::Driving = self.state {
            return false;
        }

        // runaway agents are put back onto their current target
        if let Some(target) = agent.queue.front().copied() {
            let dist = distance(&agent.position, &target);
            if dist > self.pars.teleport_distance {
                warn!(
                    "Agent is {:.1}m away from its target, teleporting it to ({:.1}, {:.1})",
                    dist, target.x, target.y
                );
                agent.teleport(target);
                self.exit();
                return true;
            }
        }

        let turn = (self.pars.recovery_turn_rate * dt).min(angle_to_target.abs());
        agent.rotate(turn * angle_to_target.signum());
        agent.set_forward_speed(self.max_speed * self.pars.recovery_speed_fraction);

        if angle_to_target.abs() - turn < self.pars.recovery_exit_angle {
            debug!("Agent recovered");
            self.exit();
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target_queue::TargetQueue;
    use nalgebra::Vector2;
    use test_log::test;

    fn agent_facing(heading: f64) -> Agent {
        Agent::new(Point2::origin(), heading, TargetQueue::new(5, 0.0))
    }

    #[test]
    fn driving_agent_is_not_touched() {
        let mut monitor = RecoveryMonitor::new(&RecoveryPars::default(), 12.0);
        let mut agent = agent_facing(10.0);
        agent.set_forward_speed(5.0);
        assert!(!monitor.update(&mut agent, &Point2::new(0.0, 10.0), 0.02));
        assert_eq!(agent.heading, 10.0);
    }

    #[test]
    fn wrong_way_recovers_within_bounded_ticks() {
        let pars = RecoveryPars::default();
        let mut monitor = RecoveryMonitor::new(&pars, 12.0);
        // target straight north, agent faces 150° away from it
        let mut agent = agent_facing(150.0);
        agent.set_forward_speed(5.0);
        let target = Point2::new(0.0, 10.0);
        let dt = 0.02;
        let bound = ((150.0 - pars.recovery_exit_angle) / (pars.recovery_turn_rate * dt)).floor()
            as usize
            + 1;

        let mut ticks = 0;
        while monitor.update(&mut agent, &target, dt) {
            ticks += 1;
            // position stays put, only heading and velocity are overridden
            assert!(ticks <= bound);
            if monitor.state() == RecoveryState::Recovering {
                assert!((agent.speed() - 6.0).abs() < 1e-9);
            }
        }

        assert_eq!(ticks, bound);
        assert!(agent.heading.abs() < pars.recovery_exit_angle);
        assert_eq!(monitor.state(), RecoveryState::Driving);
    }

    #[test]
    fn standing_still_triggers_recovery_after_time_limit() {
        let mut monitor = RecoveryMonitor::new(&RecoveryPars::default(), 12.0);
        let mut agent = agent_facing(0.0);
        let target = Point2::new(0.0, 10.0);
        let dt = 0.25;

        // 2.0 s of standing still are tolerated
        for _ in 0..8 {
            assert!(!monitor.update(&mut agent, &target, dt));
            agent.velocity = Vector2::zeros();
        }
        assert!(monitor.update(&mut agent, &target, dt));
        // aligned with the target, the recovery ends immediately but the push was applied
        assert_eq!(monitor.state(), RecoveryState::Driving);
        assert!((agent.forward_speed() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn moving_resets_stuck_timer() {
        let mut monitor = RecoveryMonitor::new(&RecoveryPars::default(), 12.0);
        let mut agent = agent_facing(0.0);
        let target = Point2::new(0.0, 10.0);

        for i in 0..100 {
            agent.velocity = if i % 10 == 0 {
                Vector2::new(0.0, 5.0)
            } else {
                Vector2::zeros()
            };
            assert!(!monitor.update(&mut agent, &target, 0.1));
        }
    }

    #[test]
    fn runaway_agent_is_teleported() {
        let mut monitor = RecoveryMonitor::new(&RecoveryPars::default(), 12.0);
        let mut agent = agent_facing(180.0);
        agent.queue = {
            use crate::core::track::{Rect, Track, Waypoint};
            let track = Track::from_waypoints(
                "far",
                vec![
                    Waypoint { index: 0, position: Point2::new(0.0, 100.0), region: None },
                    Waypoint { index: 1, position: Point2::new(0.0, 200.0), region: None },
                ],
                vec![],
                Rect { center: [0.0, 0.0], half_extents: [1.0, 1.0] },
                vec![],
            );
            let mut queue = TargetQueue::new(2, 0.0);
            queue.refill(&track, 0, 2, &mut rand::thread_rng());
            queue
        };
        agent.set_forward_speed(3.0);

        assert!(monitor.update(&mut agent, &Point2::new(0.0, 100.0), 0.02));
        assert_eq!(agent.position, Point2::new(0.0, 100.0));
        assert_eq!(agent.velocity, Vector2::zeros());
        assert_eq!(monitor.state(), RecoveryState::Driving);
    }
}
