use std::cmp::Ordering;

use crate::timestamp::{TrackClock, compare_ts};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Track {
    Video,
    Audio,
}

impl Track {
    pub fn name(&self) -> &'static str {
        match self {
            Track::Video => "video",
            Track::Audio => "audio",
        }
    }
}

/// Pick the track whose next frame should be encoded.
///
/// Video goes first when there is no audio track or when its next timestamp is
/// not later than audio's. Ties go to video.
pub fn select_next(video: Option<&TrackClock>, audio: Option<&TrackClock>) -> Option<Track> {
    match (video, audio) {
        (None, None) => None,
        (Some(_), None) => Some(Track::Video),
        (None, Some(_)) => Some(Track::Audio),
        (Some(video), Some(audio)) => {
            let order = compare_ts(
                video.next_pts(),
                video.time_base(),
                audio.next_pts(),
                audio.time_base(),
            );
            if order != Ordering::Greater {
                Some(Track::Video)
            } else {
                Some(Track::Audio)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ffmpeg_next::Rational;

    use super::*;
    use crate::timestamp::TimestampMode;

    fn video_clock() -> TrackClock {
        TrackClock::new(TimestampMode::Counter, Rational::new(1, 30))
    }

    fn audio_clock() -> TrackClock {
        TrackClock::new(TimestampMode::Counter, Rational::new(1, 44_100))
    }

    #[test]
    fn test_single_track() {
        let video = video_clock();
        let audio = audio_clock();
        assert_eq!(select_next(Some(&video), None), Some(Track::Video));
        assert_eq!(select_next(None, Some(&audio)), Some(Track::Audio));
        assert_eq!(select_next(None, None), None);
    }

    #[test]
    fn test_tie_goes_to_video() {
        let video = video_clock();
        let audio = audio_clock();
        assert_eq!(select_next(Some(&video), Some(&audio)), Some(Track::Video));
    }

    #[test]
    fn test_lagging_track_is_selected() {
        let mut video = video_clock();
        let mut audio = audio_clock();
        video.stamp(1, Duration::ZERO);
        // video next = 1/30s, audio next = 0
        assert_eq!(select_next(Some(&video), Some(&audio)), Some(Track::Audio));
        audio.stamp(1024, Duration::ZERO);
        audio.stamp(1024, Duration::ZERO);
        // audio next = 2048/44100 > 1/30
        assert_eq!(select_next(Some(&video), Some(&audio)), Some(Track::Video));
    }

    #[test]
    fn test_no_track_is_starved() {
        let mut video = video_clock();
        let mut audio = audio_clock();
        let mut picks = Vec::new();
        for _ in 0..500 {
            let track = select_next(Some(&video), Some(&audio)).unwrap();
            match track {
                Track::Video => video.stamp(1, Duration::ZERO),
                Track::Audio => audio.stamp(1152, Duration::ZERO),
            };
            picks.push(track);
        }

        // every window of consecutive picks contains both tracks
        assert!(picks.windows(4).all(|w| w.contains(&Track::Video)));
        assert!(picks.windows(4).all(|w| w.contains(&Track::Audio)));

        // cursors never drift apart by more than one frame of either track
        let video_secs = video.next_pts() as f64 / 30.0;
        let audio_secs = audio.next_pts() as f64 / 44_100.0;
        assert!((video_secs - audio_secs).abs() <= 1152.0 / 44_100.0 + 1.0 / 30.0);
    }

    #[test]
    fn test_selection_flips_when_cursor_overtakes() {
        let mut video = video_clock();
        let mut audio = audio_clock();
        for _ in 0..200 {
            let before = select_next(Some(&video), Some(&audio)).unwrap();
            match before {
                Track::Video => video.stamp(1, Duration::ZERO),
                Track::Audio => audio.stamp(1024, Duration::ZERO),
            };
            let video_ahead = compare_ts(
                video.next_pts(),
                video.time_base(),
                audio.next_pts(),
                audio.time_base(),
            ) == Ordering::Greater;
            let after = select_next(Some(&video), Some(&audio)).unwrap();
            if video_ahead {
                assert_eq!(after, Track::Audio);
            } else {
                assert_eq!(after, Track::Video);
            }
        }
    }
}
