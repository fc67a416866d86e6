use log::debug;

/// Outcome of a finish line crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LapEvent {
    /// Not all checkpoints were passed since the last valid lap, nothing changed.
    Ignored,
    LapCompleted { lap: u32, duration: f64 },
    /// The final lap was completed, `finish_time` is the recorded race time.
    Finished {
        lap: u32,
        duration: f64,
        finish_time: f64,
    },
    /// The racer finished before, later crossings are no-ops.
    AlreadyFinished,
}

/// LapTracker enforces the checkpoint order of a single racer and records its lap durations.
///
/// * `total_checkpoints` - Number of checkpoints that must be passed per lap
/// * `total_laps` - Number of laps of the race
/// * `next_checkpoint` - Index of the next expected checkpoint
/// * `compl_laps` - Number of valid laps so far
/// * `lap_durations` - (s) Durations of all valid laps
/// * `lap_start_time` - (s) Race time at which the current lap started
/// * `finish_time` - (s) Race time at which the last lap was completed
#[derive(Debug, Clone)]
pub struct LapTracker {
    total_checkpoints: usize,
    total_laps: u32,
    next_checkpoint: usize,
    compl_laps: u32,
    lap_durations: Vec<f64>,
    lap_start_time: f64,
    finish_time: Option<f64>,
}

impl LapTracker {
    pub fn new(total_checkpoints: usize, total_laps: u32) -> LapTracker {
        LapTracker {
            total_checkpoints,
            total_laps,
            next_checkpoint: 0,
            compl_laps: 0,
            lap_durations: Vec::with_capacity(total_laps as usize),
            lap_start_time: 0.0,
            finish_time: None,
        }
    }

    /// on_checkpoint advances the expected checkpoint if `index` is the expected one. It
    /// returns true if the hit counted.
    pub fn on_checkpoint(&mut self, index: usize) -> bool {
        if index != self.next_checkpoint || self.next_checkpoint >= self.total_checkpoints {
            debug!(
                "Ignoring checkpoint {} (expected {})",
                index, self.next_checkpoint
            );
            return false;
        }
        self.next_checkpoint += 1;
        true
    }

    /// on_finish_line counts a lap if all checkpoints were passed in order since the last valid
    /// lap. `elapsed` is the current race time.
    pub fn on_finish_line(&mut self, elapsed: f64) -> LapEvent {
        if self.finish_time.is_some() {
            return LapEvent::AlreadyFinished;
        }

        if self.next_checkpoint != self.total_checkpoints {
            debug!(
                "Ignoring finish line crossing after {}/{} checkpoints",
                self.next_checkpoint, self.total_checkpoints
            );
            return LapEvent::Ignored;
        }

        let duration = elapsed - self.lap_start_time;
        self.compl_laps += 1;
        self.next_checkpoint = 0;
        self.lap_durations.push(duration);
        self.lap_start_time = elapsed;

        if self.compl_laps >= self.total_laps {
            self.finish_time = Some(elapsed);
            LapEvent::Finished {
                lap: self.compl_laps,
                duration,
                finish_time: elapsed,
            }
        } else {
            LapEvent::LapCompleted {
                lap: self.compl_laps,
                duration,
            }
        }
    }

    pub fn next_checkpoint(&self) -> usize {
        self.next_checkpoint
    }

    pub fn compl_laps(&self) -> u32 {
        self.compl_laps
    }

    pub fn total_laps(&self) -> u32 {
        self.total_laps
    }

    pub fn lap_durations(&self) -> &[f64] {
        &self.lap_durations
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_log::test;

    fn full_lap(tracker: &mut LapTracker, elapsed: f64) -> LapEvent {
        for i in 0..3 {
            assert!(tracker.on_checkpoint(i));
        }
        tracker.on_finish_line(elapsed)
    }

    #[test]
    fn checkpoints_must_come_in_order() {
        let mut tracker = LapTracker::new(3, 2);
        assert!(!tracker.on_checkpoint(1));
        assert!(tracker.on_checkpoint(0));
        assert!(!tracker.on_checkpoint(0));
        assert!(!tracker.on_checkpoint(2));
        assert!(tracker.on_checkpoint(1));
        assert_eq!(tracker.next_checkpoint(), 2);
    }

    #[test]
    fn unearned_finish_changes_nothing() {
        let mut tracker = LapTracker::new(3, 2);
        tracker.on_checkpoint(0);
        tracker.on_checkpoint(1);

        assert_eq!(tracker.on_finish_line(5.0), LapEvent::Ignored);
        assert_eq!(tracker.compl_laps(), 0);
        assert_eq!(tracker.next_checkpoint(), 2);
        assert!(tracker.lap_durations().is_empty());

        // the lap can still be completed afterwards, timed from the race start
        tracker.on_checkpoint(2);
        assert_eq!(
            tracker.on_finish_line(12.0),
            LapEvent::LapCompleted {
                lap: 1,
                duration: 12.0
            }
        );
    }

    #[test]
    fn records_durations_and_finish_time_once() {
        let mut tracker = LapTracker::new(3, 3);
        assert!(matches!(
            full_lap(&mut tracker, 10.0),
            LapEvent::LapCompleted { lap: 1, .. }
        ));
        assert!(matches!(
            full_lap(&mut tracker, 22.0),
            LapEvent::LapCompleted { lap: 2, .. }
        ));
        match full_lap(&mut tracker, 35.0) {
            LapEvent::Finished {
                lap,
                duration,
                finish_time,
            } => {
                assert_eq!(lap, 3);
                assert_relative_eq!(duration, 13.0);
                assert_relative_eq!(finish_time, 35.0);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(tracker.lap_durations(), &[10.0, 12.0, 13.0]);
        assert_eq!(tracker.on_finish_line(50.0), LapEvent::AlreadyFinished);
        assert_eq!(tracker.finish_time(), Some(35.0));
        assert_eq!(tracker.compl_laps(), 3);
    }

    #[test]
    fn track_without_checkpoints_counts_every_crossing() {
        let mut tracker = LapTracker::new(0, 2);
        assert!(!tracker.on_checkpoint(0));
        assert!(matches!(
            tracker.on_finish_line(4.0),
            LapEvent::LapCompleted { lap: 1, .. }
        ));
    }
}
