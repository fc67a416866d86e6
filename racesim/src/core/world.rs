use crate::core::racer::{Racer, RacerId};
use crate::core::track::{Rect, Track};
use nalgebra::{Point2, Vector2};
use std::collections::HashSet;

/// Radius (m) of the circle that represents a racer in ray queries.
pub const RACER_RADIUS: f64 = 0.5;

/// PhysicsWorld is the part of the physics layer the controller depends on.
pub trait PhysicsWorld {
    /// is_off_track returns true if the position lies inside an off-track zone.
    fn is_off_track(&self, position: &Point2<f64>) -> bool;

    /// racer_ahead returns true if a racer other than `racer` is hit by the ray from `origin`
    /// along the unit vector `dir` within `distance`.
    fn racer_ahead(
        &self,
        racer: RacerId,
        origin: &Point2<f64>,
        dir: &Vector2<f64>,
        distance: f64,
    ) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Checkpoint(usize),
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub racer: RacerId,
    pub kind: TriggerKind,
}

/// KinematicWorld is a minimal physics layer: racers move with their velocity, trigger zones
/// and off-track zones are rectangles, and racers are circles in ray queries. Trigger events
/// fire once when a racer enters a zone.
#[derive(Debug, Clone)]
pub struct KinematicWorld {
    triggers: Vec<(TriggerKind, Rect)>,
    off_track: Vec<Rect>,
    positions: Vec<Point2<f64>>,
    inside: HashSet<(RacerId, TriggerKind)>,
}

impl KinematicWorld {
    pub fn new(track: &Track, racers: &[Racer]) -> KinematicWorld {
        let mut triggers: Vec<(TriggerKind, Rect)> = track
            .checkpoints
            .iter()
            .enumerate()
            .map(|(i, rect)| (TriggerKind::Checkpoint(i), *rect))
            .collect();
        triggers.push((TriggerKind::Finish, track.finish_line));

        let mut world = KinematicWorld {
            triggers,
            off_track: track.off_track.to_owned(),
            positions: racers.iter().map(|racer| racer.agent.position).collect(),
            inside: HashSet::new(),
        };

        // racers spawning inside a zone must leave it before it triggers
        for (id, position) in world.positions.iter().enumerate() {
            for (kind, rect) in world.triggers.iter() {
                if rect.contains(position) {
                    world.inside.insert((id, *kind));
                }
            }
        }

        world
    }

    /// step integrates the racer positions over `dt` and returns the trigger zones entered.
    pub fn step(&mut self, racers: &mut [Racer], dt: f64) -> Vec<TriggerEvent> {
        let mut events = vec![];
        self.positions.resize(racers.len(), Point2::origin());

        for racer in racers.iter_mut() {
            let agent = &mut racer.agent;
            agent.position += agent.velocity * dt;
            self.positions[racer.id] = agent.position;

            for (kind, rect) in self.triggers.iter() {
                let key = (racer.id, *kind);

                if rect.contains(&agent.position) {
                    if self.inside.insert(key) {
                        events.push(TriggerEvent {
                            racer: racer.id,
                            kind: *kind,
                        });
                    }
                } else {
                    self.inside.remove(&key);
                }
            }
        }

        events
    }
}

impl PhysicsWorld for KinematicWorld {
    fn is_off_track(&self, position: &Point2<f64>) -> bool {
        self.off_track.iter().any(|rect| rect.contains(position))
    }

    fn racer_ahead(
        &self,
        racer: RacerId,
        origin: &Point2<f64>,
        dir: &Vector2<f64>,
        distance: f64,
    ) -> bool {
        self.positions.iter().enumerate().any(|(id, position)| {
            if id == racer {
                return false;
            }
            let rel = position - origin;
            let along = rel.dot(dir);
            let across = (rel - dir * along).norm();
            along > 0.0 && along <= distance + RACER_RADIUS && across <= RACER_RADIUS
        })
    }
}
