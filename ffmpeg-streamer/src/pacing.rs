//! Real-time frame pacing.
//!
//! Frame `i` is due at `i / fps` seconds after the pacer started. A frame that
//! is more than one frame period late is skipped. A frame that is early is
//! held back until its slot.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaceDecision {
    /// On time: generate and emit now.
    Emit,
    /// Early: wait this long, then generate and emit.
    Wait(Duration),
    /// More than one frame period late: drop this index.
    Skip,
}

/// Wall-clock offset of frame `index` at `fps`.
pub fn frame_target(index: u64, fps: u32) -> Duration {
    let nanos = index as u128 * 1_000_000_000 / fps.max(1) as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

pub fn frame_period(fps: u32) -> Duration {
    frame_target(1, fps)
}

/// Pacing decision for frame `index` given the time elapsed since the loop started.
pub fn pace(index: u64, fps: u32, elapsed: Duration) -> PaceDecision {
    let target = frame_target(index, fps);
    if elapsed > target + frame_period(fps) {
        PaceDecision::Skip
    } else if elapsed < target {
        PaceDecision::Wait(target - elapsed)
    } else {
        PaceDecision::Emit
    }
}

/// Pacer anchored at a start instant, for loops driven by the caller.
#[derive(Clone, Debug)]
pub struct FramePacer {
    fps: u32,
    start: Instant,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            fps,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn pace(&self, index: u64) -> PaceDecision {
        pace(index, self.fps, self.elapsed())
    }

    /// Blocking convenience: waits if early, returns `false` if the frame should be skipped.
    pub fn wait_for(&self, index: u64) -> bool {
        match self.pace(index) {
            PaceDecision::Skip => {
                log::debug!("frame {} is late, skipping", index);
                false
            }
            PaceDecision::Wait(delay) => {
                std::thread::sleep(delay);
                true
            }
            PaceDecision::Emit => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_target() {
        assert_eq!(frame_target(0, 30), Duration::ZERO);
        assert_eq!(frame_target(30, 30), Duration::from_secs(1));
        assert_eq!(frame_target(1, 25), Duration::from_millis(40));
        assert_eq!(frame_period(50), Duration::from_millis(20));
    }

    #[test]
    fn test_early_frame_waits() {
        assert_eq!(
            pace(10, 25, Duration::from_millis(300)),
            PaceDecision::Wait(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_on_time_frame_emits() {
        assert_eq!(pace(10, 25, Duration::from_millis(400)), PaceDecision::Emit);
        // up to one full period late is still emitted
        assert_eq!(pace(10, 25, Duration::from_millis(440)), PaceDecision::Emit);
    }

    #[test]
    fn test_late_frame_skips() {
        assert_eq!(pace(10, 25, Duration::from_millis(441)), PaceDecision::Skip);
        assert_eq!(pace(0, 30, Duration::from_secs(1)), PaceDecision::Skip);
    }

    #[test]
    fn test_emitted_count_tracks_elapsed_time() {
        // simulated loop where every frame costs 70ms at 30fps
        let fps = 30;
        let cost = Duration::from_millis(70);
        let mut now = Duration::ZERO;
        let mut emitted = 0u64;
        let mut index = 0u64;
        while now < Duration::from_secs(3) {
            match pace(index, fps, now) {
                PaceDecision::Skip => {}
                PaceDecision::Wait(delay) => {
                    now += delay + cost;
                    emitted += 1;
                }
                PaceDecision::Emit => {
                    now += cost;
                    emitted += 1;
                }
            }
            index += 1;
        }
        // slow callback: fewer frames, but the index keeps up with real time
        let expected_index = now.as_secs_f64() * fps as f64;
        assert!((index as f64 - expected_index).abs() <= fps as f64);
        assert!(emitted < index);
    }

    #[test]
    fn test_pacer_waits_until_slot() {
        let started = Instant::now();
        let pacer = FramePacer::new(100);
        for i in 0..5 {
            assert!(pacer.wait_for(i));
        }
        assert!(started.elapsed() >= frame_target(4, 100));
    }
}
