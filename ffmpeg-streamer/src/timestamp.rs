//! Presentation timestamp bookkeeping.
//!
//! All arithmetic here is exact integer math on `i128`, so comparing or
//! rescaling timestamps between unrelated time bases never drifts.

use std::{cmp::Ordering, time::Duration};

use ffmpeg_next::{Rational, util::mathematics::rescale::TIME_BASE};

/// Rescale `ts` from `from` into `to`, rounding to the nearest tick (ties away from zero).
pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
    let num = ts as i128 * from.numerator() as i128 * to.denominator() as i128;
    let den = from.denominator() as i128 * to.numerator() as i128;
    div_round(num, den) as i64
}

/// Compare two timestamps expressed in different time bases.
pub fn compare_ts(a: i64, a_tb: Rational, b: i64, b_tb: Rational) -> Ordering {
    let lhs = a as i128 * a_tb.numerator() as i128 * b_tb.denominator() as i128;
    let rhs = b as i128 * b_tb.numerator() as i128 * a_tb.denominator() as i128;
    // time bases always carry a positive denominator
    lhs.cmp(&rhs)
}

/// Convert a wall-clock duration into ticks of `time_base`.
pub fn duration_to_ts(elapsed: Duration, time_base: Rational) -> i64 {
    let micros = i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX);
    rescale(micros, TIME_BASE, time_base)
}

fn div_round(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    if num >= 0 {
        (num + den / 2) / den
    } else {
        -((-num + den / 2) / den)
    }
}

/// Where a track's timestamps come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampMode {
    /// Running counter: one tick per video frame, one tick per audio sample.
    Counter,
    /// Elapsed wall-clock time since the stream started.
    WallClock,
}

/// Per-track timestamp cursor.
///
/// `next_pts` is the earliest timestamp the next frame on this track may carry.
/// It is what interleave selection compares.
#[derive(Clone, Debug)]
pub struct TrackClock {
    mode: TimestampMode,
    time_base: Rational,
    next_pts: i64,
    frames: u64,
}

impl TrackClock {
    pub fn new(mode: TimestampMode, time_base: Rational) -> Self {
        Self {
            mode,
            time_base,
            next_pts: 0,
            frames: 0,
        }
    }

    pub fn mode(&self) -> TimestampMode {
        self.mode
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn next_pts(&self) -> i64 {
        self.next_pts
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stamp a frame that spans `duration` ticks and move the cursor past it.
    ///
    /// In wall-clock mode the stamp is the elapsed time, but never earlier than
    /// the end of the previous frame, so timestamps stay strictly increasing.
    pub fn stamp(&mut self, duration: i64, elapsed: Duration) -> i64 {
        let pts = match self.mode {
            TimestampMode::Counter => self.next_pts,
            TimestampMode::WallClock => {
                duration_to_ts(elapsed, self.time_base).max(self.next_pts)
            }
        };
        self.next_pts = pts + duration.max(1);
        self.frames += 1;
        pts
    }

    /// In wall-clock mode, move the cursor up to `elapsed` so that `next_pts`
    /// is the stamp the next frame will get. No-op for counters.
    pub fn catch_up(&mut self, elapsed: Duration) {
        if self.mode == TimestampMode::WallClock {
            self.skip_to(duration_to_ts(elapsed, self.time_base));
        }
    }

    /// Move the cursor forward to `pts`. Never moves backwards.
    pub fn skip_to(&mut self, pts: i64) {
        self.next_pts = self.next_pts.max(pts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_between_time_bases() {
        // one frame at 30fps in microseconds
        assert_eq!(rescale(1, Rational::new(1, 30), TIME_BASE), 33_333);
        // 1024 samples at 44.1kHz in milliseconds
        assert_eq!(rescale(1024, Rational::new(1, 44_100), Rational::new(1, 1000)), 23);
        assert_eq!(rescale(90_000, Rational::new(1, 90_000), Rational::new(1, 25)), 25);
    }

    #[test]
    fn test_rescale_rounds_half_away_from_zero() {
        assert_eq!(rescale(1, Rational::new(1, 2), Rational::new(1, 1)), 1);
        assert_eq!(rescale(-1, Rational::new(1, 2), Rational::new(1, 1)), -1);
        assert_eq!(rescale(1, Rational::new(1, 3), Rational::new(1, 1)), 0);
    }

    #[test]
    fn test_compare_ts_is_exact() {
        let video = Rational::new(1, 30);
        let audio = Rational::new(1, 44_100);
        // 1 frame at 30fps == 1470 samples at 44.1kHz exactly
        assert_eq!(compare_ts(1, video, 1470, audio), Ordering::Equal);
        assert_eq!(compare_ts(1, video, 1469, audio), Ordering::Greater);
        assert_eq!(compare_ts(1, video, 1471, audio), Ordering::Less);
    }

    #[test]
    fn test_duration_to_ts() {
        assert_eq!(duration_to_ts(Duration::from_millis(1500), Rational::new(1, 1000)), 1500);
        assert_eq!(duration_to_ts(Duration::from_secs(2), Rational::new(1, 30)), 60);
    }

    #[test]
    fn test_counter_clock_advances_by_duration() {
        let mut clock = TrackClock::new(TimestampMode::Counter, Rational::new(1, 25));
        let stamps: Vec<i64> = (0..5).map(|_| clock.stamp(1, Duration::ZERO)).collect();
        assert_eq!(stamps, vec![0, 1, 2, 3, 4]);
        assert_eq!(clock.next_pts(), 5);
        assert_eq!(clock.frames(), 5);
    }

    #[test]
    fn test_wall_clock_uses_elapsed_time() {
        let mut clock = TrackClock::new(TimestampMode::WallClock, TIME_BASE);
        assert_eq!(clock.stamp(33_333, Duration::from_millis(100)), 100_000);
        assert_eq!(clock.next_pts(), 133_333);
        assert_eq!(clock.stamp(33_333, Duration::from_millis(500)), 500_000);
    }

    #[test]
    fn test_wall_clock_never_goes_backwards() {
        let mut clock = TrackClock::new(TimestampMode::WallClock, Rational::new(1, 1000));
        assert_eq!(clock.stamp(40, Duration::from_millis(100)), 100);
        // elapsed lands inside the previous frame: pushed to its end
        assert_eq!(clock.stamp(40, Duration::from_millis(110)), 140);
        assert_eq!(clock.stamp(40, Duration::from_millis(110)), 180);
    }

    #[test]
    fn test_catch_up_predicts_wall_clock_stamp() {
        let mut clock = TrackClock::new(TimestampMode::WallClock, Rational::new(1, 1000));
        clock.stamp(33, Duration::from_millis(10));
        clock.catch_up(Duration::from_millis(70));
        assert_eq!(clock.next_pts(), 70);
        assert_eq!(clock.stamp(33, Duration::from_millis(70)), 70);
        // inside the previous frame: the cursor stays at its end
        clock.catch_up(Duration::from_millis(80));
        assert_eq!(clock.next_pts(), 103);

        let mut counter = TrackClock::new(TimestampMode::Counter, Rational::new(1, 30));
        counter.catch_up(Duration::from_secs(5));
        assert_eq!(counter.next_pts(), 0);
    }

    #[test]
    fn test_skip_to_only_moves_forward() {
        let mut clock = TrackClock::new(TimestampMode::Counter, Rational::new(1, 30));
        clock.skip_to(10);
        assert_eq!(clock.stamp(1, Duration::ZERO), 10);
        clock.skip_to(3);
        assert_eq!(clock.next_pts(), 11);
    }
}
