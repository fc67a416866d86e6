use crate::core::track::Track;
use helpers::general::lin_interp;
use nalgebra::{distance, Point2};
use rand::Rng;
use std::collections::VecDeque;

/// TargetQueue is the sliding window of upcoming target points of a single agent. The front of
/// the queue belongs to waypoint `track_idx`, the following points to its successors.
#[derive(Debug, Clone)]
pub struct TargetQueue {
    points: VecDeque<Point2<f64>>,
    window: usize,
    track_idx: usize,
    lane_offset: f64,
}

impl TargetQueue {
    pub fn new(window: usize, lane_offset: f64) -> TargetQueue {
        TargetQueue {
            points: VecDeque::with_capacity(window),
            window,
            track_idx: 0,
            lane_offset,
        }
    }

    /// refill replaces the queue content by `count` consecutive sampled waypoints starting at
    /// `start_idx`.
    pub fn refill<R: Rng + ?Sized>(
        &mut self,
        track: &Track,
        start_idx: usize,
        count: usize,
        rng: &mut R,
    ) {
        self.points.clear();
        self.window = count;

        if track.is_empty() {
            self.track_idx = 0;
            return;
        }

        self.track_idx = start_idx % track.len();

        for i in 0..count {
            let idx = (self.track_idx + i) % track.len();
            self.points
                .push_back(track.sample_with_lane_offset(idx, self.lane_offset, rng));
        }
    }

    /// advance drops the reached front point and appends a freshly sampled point for the
    /// waypoint that is now `window` steps ahead.
    pub fn advance<R: Rng + ?Sized>(&mut self, track: &Track, rng: &mut R) {
        if track.is_empty() || self.points.is_empty() {
            return;
        }

        self.points.pop_front();
        self.track_idx = (self.track_idx + 1) % track.len();

        let idx_new = (self.track_idx + self.window - 1) % track.len();
        self.points
            .push_back(track.sample_with_lane_offset(idx_new, self.lane_offset, rng));
    }

    /// lookahead_point walks along the polyline from `position` through all queued points and
    /// returns the point at path length `lookahead_dist`. The last queued point is returned if
    /// the queued path is shorter than that.
    pub fn lookahead_point(&self, position: &Point2<f64>, lookahead_dist: f64) -> Point2<f64> {
        if self.points.is_empty() {
            return *position;
        }

        let mut s_cum = Vec::with_capacity(self.points.len() + 1);
        let mut xs = Vec::with_capacity(self.points.len() + 1);
        let mut ys = Vec::with_capacity(self.points.len() + 1);

        s_cum.push(0.0);
        xs.push(position.x);
        ys.push(position.y);

        let mut prev = *position;
        for p in self.points.iter() {
            s_cum.push(s_cum[s_cum.len() - 1] + distance(&prev, p));
            xs.push(p.x);
            ys.push(p.y);
            prev = *p;
        }

        Point2::new(
            lin_interp(lookahead_dist, &s_cum, &xs),
            lin_interp(lookahead_dist, &s_cum, &ys),
        )
    }

    /// path_length returns the length of the polyline from `position` through all queued points.
    pub fn path_length(&self, position: &Point2<f64>) -> f64 {
        let mut prev = *position;
        let mut length = 0.0;
        for p in self.points.iter() {
            length += distance(&prev, p);
            prev = *p;
        }
        length
    }

    pub fn front(&self) -> Option<&Point2<f64>> {
        self.points.front()
    }

    pub fn get(&self, i: usize) -> Option<&Point2<f64>> {
        self.points.get(i)
    }

    pub fn points(&self) -> impl Iterator<Item = &Point2<f64>> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// track_index returns the index of the waypoint the front point was sampled from.
    pub fn track_index(&self) -> usize {
        self.track_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::track::{Rect, Waypoint};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line_track(n: usize) -> Track {
        let waypoints = (0..n)
            .map(|i| Waypoint {
                index: i,
                position: Point2::new(0.0, 10.0 * (i as f64 + 1.0)),
                region: None,
            })
            .collect();
        Track::from_waypoints(
            "line",
            waypoints,
            vec![],
            Rect {
                center: [0.0, 0.0],
                half_extents: [1.0, 1.0],
            },
            vec![],
        )
    }

    #[test]
    fn window_size_and_index_survive_many_advances() {
        let track = line_track(7);
        let mut rng = StdRng::seed_from_u64(3);
        let mut queue = TargetQueue::new(5, 0.0);
        queue.refill(&track, 4, 5, &mut rng);

        for n in 1..=50 {
            queue.advance(&track, &mut rng);
            assert_eq!(queue.len(), 5);
            assert_eq!(queue.track_index(), (4 + n) % 7);
            assert_eq!(
                *queue.front().unwrap(),
                track.waypoint(queue.track_index() as isize).position
            );
        }
    }

    #[test]
    fn window_larger_than_track_wraps() {
        let track = line_track(2);
        let mut rng = StdRng::seed_from_u64(3);
        let mut queue = TargetQueue::new(5, 0.0);
        queue.refill(&track, 1, 5, &mut rng);
        let ys: Vec<f64> = queue.points().map(|p| p.y).collect();
        assert_eq!(ys, vec![20.0, 10.0, 20.0, 10.0, 20.0]);
    }

    #[test]
    fn lookahead_interpolates_along_polyline() {
        let track = line_track(4);
        let mut rng = StdRng::seed_from_u64(3);
        let mut queue = TargetQueue::new(3, 0.0);
        queue.refill(&track, 0, 3, &mut rng);

        let pos = Point2::new(0.0, 0.0);
        assert_relative_eq!(queue.lookahead_point(&pos, 0.0).y, 0.0);
        assert_relative_eq!(queue.lookahead_point(&pos, 4.0).y, 4.0);
        assert_relative_eq!(queue.lookahead_point(&pos, 25.0).y, 25.0);
        // beyond the queued path the last point is returned
        assert_relative_eq!(queue.lookahead_point(&pos, 100.0).y, 30.0);
        assert_relative_eq!(queue.path_length(&pos), 30.0);
    }

    /// arc_length_of returns the arc length at which `p` lies on the polyline (panics if it
    /// does not lie on it).
    fn arc_length_of(polyline: &[Point2<f64>], p: &Point2<f64>) -> f64 {
        let mut s = 0.0;
        for seg in polyline.windows(2) {
            let len = distance(&seg[0], &seg[1]);
            let d0 = distance(&seg[0], p);
            if (d0 + distance(p, &seg[1]) - len).abs() < 1e-9 {
                return s + d0;
            }
            s += len;
        }
        panic!("point {:?} is not on the polyline", p);
    }

    #[test]
    fn lookahead_moves_forward_monotonically() {
        let waypoints = vec![
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 5.0),
        ]
        .into_iter()
        .enumerate()
        .map(|(index, position)| Waypoint {
            index,
            position,
            region: None,
        })
        .collect();
        let track = Track::from_waypoints(
            "zigzag",
            waypoints,
            vec![],
            Rect {
                center: [0.0, 0.0],
                half_extents: [1.0, 1.0],
            },
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(3);
        let mut queue = TargetQueue::new(4, 0.0);
        queue.refill(&track, 0, 4, &mut rng);

        let pos = Point2::new(0.0, 0.0);
        let mut polyline = vec![pos];
        polyline.extend(queue.points().cloned());
        let total = queue.path_length(&pos);
        let steps = 200;
        let mut prev_s = -1.0;

        for i in 0..=steps {
            let d = total * i as f64 / steps as f64;
            let s = arc_length_of(&polyline, &queue.lookahead_point(&pos, d));
            // the returned point lies on the polyline at exactly the requested arc length
            assert_relative_eq!(s, d, epsilon = 1e-9);
            assert!(s > prev_s);
            prev_s = s;
        }
    }
}
