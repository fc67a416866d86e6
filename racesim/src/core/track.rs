use anyhow::{Context, Result};
use helpers::geometry::left_normal;
use nalgebra::{distance, Point2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Axis-aligned rectangle given by its center and half extents. Used for waypoint sampling
/// regions as well as for checkpoint, finish line and off-track zones.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: [f64; 2],
    pub half_extents: [f64; 2],
}

impl Rect {
    pub fn new(center: Point2<f64>, half_extents: [f64; 2]) -> Rect {
        Rect {
            center: [center.x, center.y],
            half_extents,
        }
    }

    pub fn contains(&self, p: &Point2<f64>) -> bool {
        (p.x - self.center[0]).abs() <= self.half_extents[0]
            && (p.y - self.center[1]).abs() <= self.half_extents[1]
    }

    /// The method returns a uniformly distributed random point inside the rectangle.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Point2<f64> {
        let hx = self.half_extents[0].abs();
        let hy = self.half_extents[1].abs();
        Point2::new(
            rng.gen_range(self.center[0] - hx..=self.center[0] + hx),
            rng.gen_range(self.center[1] - hy..=self.center[1] + hy),
        )
    }
}

/// * `offset` - (m) Offset of the region center relative to the waypoint position
/// * `half_extents` - (m) Half width and half height of the region
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RegionPars {
    #[serde(default)]
    pub offset: [f64; 2],
    pub half_extents: [f64; 2],
}

/// * `x` - (m) x coordinate of the waypoint
/// * `y` - (m) y coordinate of the waypoint
/// * `region` - Optional sampling region, targets are drawn uniformly from it
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WaypointPars {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub region: Option<RegionPars>,
}

/// * `name` - Track name
/// * `waypoints` - Ordered waypoints of the racing line (circular, waypoint 0 sits at the
/// finish line)
/// * `waypoints_file` - Alternatively, a CSV file containing the waypoints
/// * `checkpoints` - Checkpoint trigger zones in the order they must be passed
/// * `finish_line` - Finish line trigger zone
/// * `off_track` - Zones that slow racers down
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackPars {
    pub name: String,
    #[serde(default)]
    pub waypoints: Vec<WaypointPars>,
    #[serde(default)]
    pub waypoints_file: Option<PathBuf>,
    pub checkpoints: Vec<Rect>,
    pub finish_line: Rect,
    #[serde(default)]
    pub off_track: Vec<Rect>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsvWaypointEl {
    pub x_m: f64,
    pub y_m: f64,
    pub half_w_m: f64,
    pub half_h_m: f64,
}

/// read_waypoints_csv reads the waypoints of a racing line from a CSV file. Zero half
/// extents mean that the waypoint has no sampling region.
pub fn read_waypoints_csv(filepath: &Path) -> Result<Vec<WaypointPars>> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open waypoint file {}!",
            filepath.to_string_lossy()
        ))?;

    let mut csv_reader = csv::Reader::from_reader(&fh);
    let mut waypoints = vec![];

    for result in csv_reader.deserialize() {
        let el: CsvWaypointEl = result.context(format!(
            "Failed to parse waypoint file {}!",
            filepath.to_string_lossy()
        ))?;

        let region = if el.half_w_m > 0.0 || el.half_h_m > 0.0 {
            Some(RegionPars {
                offset: [0.0, 0.0],
                half_extents: [el.half_w_m, el.half_h_m],
            })
        } else {
            None
        };

        waypoints.push(WaypointPars {
            x: el.x_m,
            y: el.y_m,
            region,
        });
    }

    Ok(waypoints)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub index: usize,
    pub position: Point2<f64>,
    pub region: Option<Rect>,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    waypoints: Vec<Waypoint>,
    pub checkpoints: Vec<Rect>,
    pub finish_line: Rect,
    pub off_track: Vec<Rect>,
    lap_length: f64,
}

impl Track {
    /// The method creates the track, reading the waypoints from the CSV file if the parameters
    /// do not list them inline.
    pub fn new(track_pars: &TrackPars) -> Result<Track> {
        let waypoint_pars = match &track_pars.waypoints_file {
            Some(path) if track_pars.waypoints.is_empty() => read_waypoints_csv(path)?,
            _ => track_pars.waypoints.to_owned(),
        };

        let waypoints = waypoint_pars
            .iter()
            .enumerate()
            .map(|(index, wp)| {
                let position = Point2::new(wp.x, wp.y);
                Waypoint {
                    index,
                    position,
                    region: wp.region.as_ref().map(|region| Rect {
                        center: [position.x + region.offset[0], position.y + region.offset[1]],
                        half_extents: region.half_extents,
                    }),
                }
            })
            .collect();

        Ok(Track::from_waypoints(
            &track_pars.name,
            waypoints,
            track_pars.checkpoints.to_owned(),
            track_pars.finish_line,
            track_pars.off_track.to_owned(),
        ))
    }

    pub fn from_waypoints(
        name: &str,
        waypoints: Vec<Waypoint>,
        checkpoints: Vec<Rect>,
        finish_line: Rect,
        off_track: Vec<Rect>,
    ) -> Track {
        let mut track = Track {
            name: name.to_owned(),
            waypoints,
            checkpoints,
            finish_line,
            off_track,
            lap_length: 0.0,
        };
        track.lap_length = (0..track.len()).map(|i| track.segment_length(i)).sum();
        track
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// A track needs at least two waypoints before any agent can be driven on it.
    pub fn is_ready(&self) -> bool {
        self.waypoints.len() >= 2
    }

    pub fn total_checkpoints(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// The method returns the waypoint at the given index, wrapping around at both ends.
    pub fn waypoint(&self, index: isize) -> &Waypoint {
        let n = self.waypoints.len() as isize;
        &self.waypoints[index.rem_euclid(n) as usize]
    }

    /// The method returns a target point for the waypoint: a uniformly random point inside its
    /// sampling region if it has one, its exact position otherwise.
    pub fn sample_waypoint<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Point2<f64> {
        let wp = self.waypoint(index as isize);
        match &wp.region {
            Some(region) => region.sample(rng),
            None => wp.position,
        }
    }

    /// Same as `sample_waypoint`, additionally shifted sideways by `lane_offset` along the left
    /// normal of the segment leading to the waypoint.
    pub fn sample_with_lane_offset<R: Rng + ?Sized>(
        &self,
        index: usize,
        lane_offset: f64,
        rng: &mut R,
    ) -> Point2<f64> {
        let target = self.sample_waypoint(index, rng);

        if lane_offset == 0.0 {
            return target;
        }

        let cur = self.waypoint(index as isize).position;
        let prev = self.waypoint(index as isize - 1).position;
        target + left_normal(&(cur - prev)) * lane_offset
    }

    /// The method returns the length of the segment between waypoint `index` and its successor.
    pub fn segment_length(&self, index: usize) -> f64 {
        if self.waypoints.is_empty() {
            return 0.0;
        }
        distance(
            &self.waypoint(index as isize).position,
            &self.waypoint(index as isize + 1).position,
        )
    }

    pub fn lap_length(&self) -> f64 {
        self.lap_length
    }

    /// The method returns the path length from waypoint `index` until the lap closes at
    /// waypoint 0. For `index == 0` the lap is about to close and 0.0 is returned.
    pub fn remaining_lap_distance(&self, index: usize) -> f64 {
        if index == 0 || index >= self.len() {
            return 0.0;
        }
        (index..self.len()).map(|i| self.segment_length(i)).sum()
    }
}
