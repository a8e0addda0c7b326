use std::time::{Duration, Instant};

use ffmpeg_next::{Rational, util::mathematics::rescale::TIME_BASE};

use crate::{
    config::StreamerConfig,
    control::LoopControl,
    interleave::{Track, select_next},
    pacing::{FramePacer, PaceDecision},
    sink::{AudioFormat, AvSink, FrameSink},
    timestamp::{TimestampMode, TrackClock, rescale},
};

/// `(elapsed_seconds, frame_rate, channels)`: fill one sample per channel.
pub type AudioCallback = Box<dyn FnMut(f32, u32, &mut [i16]) + Send>;

/// `(pixels, width, height)`: fill the frame in place.
pub type VideoCallback = Box<dyn FnMut(&mut [u32], u32, u32) + Send>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub video_frames: u64,
    pub audio_frames: u64,
    /// Frame slots the real-time loop dropped to catch up.
    pub skipped_frames: u64,
    pub video_packets: u64,
    pub audio_packets: u64,
}

struct VideoTrack {
    clock: TrackClock,
    /// Ticks of the video time base per frame period.
    ticks: i64,
}

struct AudioTrack {
    clock: TrackClock,
    format: AudioFormat,
    samples: Vec<i16>,
    /// Sample frames produced so far.
    produced: u64,
}

/// Feeds caller-generated video and audio into a [`FrameSink`], keeping both
/// tracks interleaved by timestamp.
pub struct FrameStreamer<S: FrameSink = AvSink> {
    config: StreamerConfig,
    sink: S,
    control: LoopControl,
    audio_callback: Option<AudioCallback>,
    video_callback: Option<VideoCallback>,
    video: Option<VideoTrack>,
    audio: Option<AudioTrack>,
    started: Option<Instant>,
    pixels: Vec<u32>,
    skipped_frames: u64,
    finished: bool,
}

impl FrameStreamer<AvSink> {
    pub fn new(config: StreamerConfig) -> anyhow::Result<Self> {
        let sink = AvSink::new(config.clone());
        Self::with_sink(config, sink)
    }
}

impl<S: FrameSink> FrameStreamer<S> {
    pub fn with_sink(config: StreamerConfig, sink: S) -> anyhow::Result<Self> {
        config.validate()?;
        let pixels = vec![0; config.pixel_count()];
        Ok(Self {
            config,
            sink,
            control: LoopControl::new(),
            audio_callback: None,
            video_callback: None,
            video: None,
            audio: None,
            started: None,
            pixels,
            skipped_frames: 0,
            finished: false,
        })
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_open(&self) -> bool {
        self.started.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Time since `open`.
    pub fn elapsed(&self) -> Duration {
        self.started
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub fn set_audio_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f32, u32, &mut [i16]) + Send + 'static,
    {
        if self.is_open() && self.audio.is_none() {
            log::warn!("audio callback set after open, the stream has no audio track");
        }
        self.audio_callback = Some(Box::new(callback));
    }

    pub fn set_video_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut [u32], u32, u32) + Send + 'static,
    {
        self.video_callback = Some(Box::new(callback));
    }

    /// Open the sink and start the stream clock.
    pub fn open(&mut self) -> anyhow::Result<()> {
        if self.is_open() {
            anyhow::bail!("stream is already open");
        }
        let with_audio = self.audio_callback.is_some();
        self.sink.open(with_audio)?;

        let audio_format = self.sink.audio_format();
        if let Some(format) = audio_format.filter(|_| with_audio) {
            if format.sample_rate == 0 || format.channels == 0 || format.frame_size == 0 {
                if let Err(e) = self.sink.finish() {
                    log::warn!("failed to close sink: {:#}", e);
                }
                anyhow::bail!(
                    "unusable audio format: {}Hz, {} channels, {} samples per frame",
                    format.sample_rate,
                    format.channels,
                    format.frame_size
                );
            }
        }

        let mode = self.config.mode.timestamp_mode();
        self.video = self.sink.video_time_base().map(|time_base| VideoTrack {
            clock: TrackClock::new(mode, time_base),
            ticks: rescale(1, Rational::new(1, self.config.fps as i32), time_base).max(1),
        });
        self.audio = match (with_audio, audio_format) {
            (true, Some(format)) => Some(AudioTrack {
                // audio pts follow the sample count in every mode
                clock: TrackClock::new(TimestampMode::Counter, format.time_base()),
                format,
                samples: vec![0; format.frame_size as usize * format.channels as usize],
                produced: 0,
            }),
            (true, None) => {
                log::warn!("output has no audio track, audio callback will not be called");
                None
            }
            (false, _) => None,
        };

        log::info!(
            "stream opened: {}x{} @ {}fps, {:?} timestamps, audio: {}",
            self.config.width,
            self.config.height,
            self.config.fps,
            mode,
            self.audio.is_some()
        );
        self.started = Some(Instant::now());
        Ok(())
    }

    fn ensure_open(&mut self) -> anyhow::Result<()> {
        if self.finished {
            anyhow::bail!("stream is already finalized");
        }
        if !self.is_open() {
            self.open()?;
        }
        Ok(())
    }

    /// Encode one caller-produced frame, preceded by whatever audio is due before it.
    pub fn add_frame(&mut self, pixels: &[u32]) -> anyhow::Result<()> {
        if pixels.len() != self.config.pixel_count() {
            anyhow::bail!(
                "frame holds {} pixels, expected {}x{}",
                pixels.len(),
                self.config.width,
                self.config.height
            );
        }
        self.ensure_open()?;
        let elapsed = self.elapsed();
        self.write_due_audio(elapsed)?;
        self.write_video(pixels, elapsed)
    }

    /// Same as [`add_frame`](Self::add_frame) for a packed buffer of 4 bytes per pixel.
    pub fn add_frame_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        if bytes.len() != self.config.pixel_count() * 4 {
            anyhow::bail!(
                "frame holds {} bytes, expected {} for {}x{}",
                bytes.len(),
                self.config.pixel_count() * 4,
                self.config.width,
                self.config.height
            );
        }
        let mut pixels = std::mem::take(&mut self.pixels);
        bytemuck::cast_slice_mut::<u32, u8>(&mut pixels).copy_from_slice(bytes);
        let result = self.add_frame(&pixels);
        self.pixels = pixels;
        result
    }

    /// Audio-only run: emit audio frames until stopped.
    ///
    /// Live outputs are paced to the wall clock, files are written as fast as possible.
    pub fn record(&mut self) -> anyhow::Result<()> {
        if self.audio_callback.is_none() {
            anyhow::bail!("record needs an audio callback");
        }
        self.ensure_open()?;
        let Some(audio) = self.audio.as_ref() else {
            anyhow::bail!("stream has no audio track to record");
        };
        if !self.control.begin() {
            return Ok(());
        }

        let live = self.config.mode.is_streaming();
        let time_base = audio.clock.time_base();
        let result = loop {
            if !self.control.is_running() {
                break Ok(());
            }
            if live {
                let next_pts = self.audio.as_ref().map_or(0, |a| a.clock.next_pts());
                let due_micros = rescale(next_pts, time_base, TIME_BASE).max(0) as u64;
                let due = Duration::from_micros(due_micros);
                let elapsed = self.elapsed();
                if due > elapsed && !self.control.wait(due - elapsed) {
                    break Ok(());
                }
            }
            if let Err(e) = self.write_audio_frame() {
                break Err(e);
            }
        };
        self.control.finish();
        result
    }

    /// Real-time loop: pull frames from the video callback at the configured rate
    /// until stopped. Late frames are skipped, early ones wait for their slot.
    pub fn run_loop(&mut self) -> anyhow::Result<()> {
        let mut callback = self
            .video_callback
            .take()
            .ok_or_else(|| anyhow::anyhow!("run_loop needs a video callback"))?;
        let result = self.paced_loop(&mut callback);
        self.video_callback = Some(callback);
        result
    }

    fn paced_loop(&mut self, callback: &mut VideoCallback) -> anyhow::Result<()> {
        self.ensure_open()?;
        if self.video.is_none() {
            anyhow::bail!("stream has no video track");
        }
        if !self.control.begin() {
            return Ok(());
        }

        let (width, height) = (self.config.width, self.config.height);
        let fixed_rate = self.config.mode.timestamp_mode() == TimestampMode::Counter;
        let pacer = FramePacer::new(self.config.fps);
        let mut pixels = std::mem::take(&mut self.pixels);
        let mut index = 0u64;

        let result = loop {
            if !self.control.is_running() {
                break Ok(());
            }
            match pacer.pace(index) {
                PaceDecision::Skip => {
                    log::debug!("frame {} is late, skipping", index);
                    self.skipped_frames += 1;
                    index += 1;
                    continue;
                }
                PaceDecision::Wait(delay) => {
                    if !self.control.wait(delay) {
                        break Ok(());
                    }
                }
                PaceDecision::Emit => {}
            }

            callback(pixels.as_mut_slice(), width, height);
            if fixed_rate {
                if let Some(video) = self.video.as_mut() {
                    video.clock.skip_to(index as i64 * video.ticks);
                }
            }
            let elapsed = self.elapsed();
            if let Err(e) = self
                .write_due_audio(elapsed)
                .and_then(|_| self.write_video(&pixels, elapsed))
            {
                break Err(e);
            }
            index += 1;
        };

        self.pixels = pixels;
        self.control.finish();
        log::debug!(
            "run loop ended after {} frame slots, {} skipped",
            index,
            self.skipped_frames
        );
        result
    }

    /// Request a stop. Takes effect at the next frame boundary, or immediately
    /// if the loop is waiting for a frame slot.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Handle for stopping the stream from another thread or from inside a callback.
    pub fn stop_handle(&self) -> LoopControl {
        self.control.clone()
    }

    /// Flush encoders and close the output.
    pub fn finalize(mut self) -> anyhow::Result<StreamStats> {
        if !self.is_open() {
            log::warn!("finalize called on a stream that was never opened");
        }
        self.finished = true;
        self.control.finish();
        let sink_stats = self.sink.finish()?;
        let stats = StreamStats {
            video_frames: self.video.as_ref().map_or(0, |v| v.clock.frames()),
            audio_frames: self.audio.as_ref().map_or(0, |a| a.clock.frames()),
            skipped_frames: self.skipped_frames,
            video_packets: sink_stats.video_packets,
            audio_packets: sink_stats.audio_packets,
        };
        log::info!(
            "stream finalized: {} video frames ({} skipped), {} audio frames",
            stats.video_frames,
            stats.skipped_frames,
            stats.audio_frames
        );
        Ok(stats)
    }

    fn next_track(&self) -> Option<Track> {
        select_next(
            self.video.as_ref().map(|video| &video.clock),
            self.audio.as_ref().map(|audio| &audio.clock),
        )
    }

    /// Write every audio frame that starts before the video frame stamped at `elapsed`.
    fn write_due_audio(&mut self, elapsed: Duration) -> anyhow::Result<()> {
        let Some(video) = self.video.as_mut() else {
            return Ok(());
        };
        video.clock.catch_up(elapsed);
        while self.next_track() == Some(Track::Audio) {
            self.write_audio_frame()?;
        }
        Ok(())
    }

    fn write_video(&mut self, pixels: &[u32], elapsed: Duration) -> anyhow::Result<()> {
        let video = self
            .video
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("stream has no video track"))?;
        let pts = video.clock.stamp(video.ticks, elapsed);
        self.sink.write_video(pixels, pts)
    }

    fn write_audio_frame(&mut self) -> anyhow::Result<()> {
        let (Some(audio), Some(callback)) = (self.audio.as_mut(), self.audio_callback.as_mut())
        else {
            anyhow::bail!("stream has no audio track");
        };
        let rate = audio.format.sample_rate;
        let channels = audio.format.channels as usize;
        for (i, frame) in audio.samples.chunks_exact_mut(channels).enumerate() {
            let seconds = (audio.produced + i as u64) as f64 / rate as f64;
            callback(seconds as f32, self.config.fps, frame);
        }
        let frame_size = audio.format.frame_size as u64;
        audio.produced += frame_size;
        let pts = audio.clock.stamp(frame_size as i64, Duration::ZERO);
        self.sink.write_audio(&audio.samples, pts)
    }
}

impl<S: FrameSink> Drop for FrameStreamer<S> {
    fn drop(&mut self) {
        if self.is_open() && !self.finished {
            log::warn!("stream dropped without finalize, closing output");
            if let Err(e) = self.sink.finish() {
                log::error!("failed to close output: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
#[path = "streamer_test.rs"]
mod streamer_test;
