use std::sync::{Arc, Mutex};

use ffmpeg_next::Rational;

use crate::{
    interleave::Track,
    sink::{AudioFormat, FrameSink, SinkStats},
};

#[derive(Clone, Debug, Default)]
pub struct Recorded {
    pub opened_with_audio: Option<bool>,
    /// Every write in arrival order.
    pub writes: Vec<(Track, i64)>,
    pub audio_lengths: Vec<usize>,
    pub finished: bool,
}

impl Recorded {
    pub fn pts(&self, track: Track) -> Vec<i64> {
        self.writes
            .iter()
            .filter(|(t, _)| *t == track)
            .map(|(_, pts)| *pts)
            .collect()
    }
}

/// In-memory sink that records what the streamer wrote.
pub struct RecordingSink {
    video_time_base: Option<Rational>,
    audio: Option<AudioFormat>,
    open: bool,
    log: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new(
        video_time_base: Rational,
        audio: Option<AudioFormat>,
    ) -> (Self, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        (
            Self {
                video_time_base: Some(video_time_base),
                audio,
                open: false,
                log: log.clone(),
            },
            log,
        )
    }

    pub fn audio_only(audio: AudioFormat) -> (Self, Arc<Mutex<Recorded>>) {
        let (mut sink, log) = Self::new(Rational::new(1, 1), Some(audio));
        sink.video_time_base = None;
        (sink, log)
    }
}

impl FrameSink for RecordingSink {
    fn open(&mut self, with_audio: bool) -> anyhow::Result<()> {
        if self.open {
            anyhow::bail!("already open");
        }
        self.open = true;
        if !with_audio {
            self.audio = None;
        }
        self.log.lock().unwrap().opened_with_audio = Some(with_audio);
        Ok(())
    }

    fn video_time_base(&self) -> Option<Rational> {
        if self.open { self.video_time_base } else { None }
    }

    fn audio_format(&self) -> Option<AudioFormat> {
        if self.open { self.audio } else { None }
    }

    fn write_video(&mut self, _pixels: &[u32], pts: i64) -> anyhow::Result<()> {
        self.log.lock().unwrap().writes.push((Track::Video, pts));
        Ok(())
    }

    fn write_audio(&mut self, samples: &[i16], pts: i64) -> anyhow::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.writes.push((Track::Audio, pts));
        log.audio_lengths.push(samples.len());
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<SinkStats> {
        let mut log = self.log.lock().unwrap();
        log.finished = true;
        Ok(SinkStats {
            video_packets: log.pts(Track::Video).len() as u64,
            audio_packets: log.pts(Track::Audio).len() as u64,
        })
    }
}
