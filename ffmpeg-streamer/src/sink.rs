use std::sync::Arc;

use anyhow::Context;
use ffmpeg_next::{Rational, codec, media};

use crate::{
    config::{OutputMode, StreamerConfig},
    encoder::{AudioSettings, Encoder, VideoSettings},
    frame::{RawFrame, audio_from_samples, video_from_pixels},
    interleave::Track,
    observer::{LogObserver, PacketObserver},
    output::AvOutput,
};

/// Negotiated shape of the audio track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample frames per encoded audio frame.
    pub frame_size: u32,
}

impl AudioFormat {
    pub fn time_base(&self) -> Rational {
        Rational::new(1, self.sample_rate as i32)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub video_packets: u64,
    pub audio_packets: u64,
}

/// Where timestamped frames end up.
///
/// `AvSink` encodes and muxes through FFmpeg. The streaming loop only talks to
/// this trait.
pub trait FrameSink: Send {
    /// Open encoders and the output target. Audio is added only if `with_audio` is set
    /// and the target can carry it.
    fn open(&mut self, with_audio: bool) -> anyhow::Result<()>;

    /// Time base video pts are expressed in. `None` before `open` or without a video track.
    fn video_time_base(&self) -> Option<Rational>;

    /// `None` when there is no audio track.
    fn audio_format(&self) -> Option<AudioFormat>;

    fn write_video(&mut self, pixels: &[u32], pts: i64) -> anyhow::Result<()>;

    /// `samples` are interleaved, `audio_format().frame_size` sample frames long.
    fn write_audio(&mut self, samples: &[i16], pts: i64) -> anyhow::Result<()>;

    /// Flush encoders and close the target.
    fn finish(&mut self) -> anyhow::Result<SinkStats>;
}

pub struct AvSink {
    config: StreamerConfig,
    observer: Arc<dyn PacketObserver>,
    output: Option<AvOutput>,
    video: Option<Encoder>,
    audio: Option<Encoder>,
    stats: SinkStats,
}

impl AvSink {
    pub fn new(config: StreamerConfig) -> Self {
        let observer = config
            .observer
            .clone()
            .unwrap_or_else(|| Arc::new(LogObserver));
        Self {
            config,
            observer,
            output: None,
            video: None,
            audio: None,
            stats: SinkStats::default(),
        }
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    fn video_settings(&self) -> VideoSettings {
        VideoSettings {
            width: self.config.width,
            height: self.config.height,
            fps: self.config.fps,
            bit_rate: self.config.bitrate,
            gop_size: self.config.gop_size,
            time_base: self.config.video_time_base(),
            source_format: self.config.pixel_layout.pixel(),
            codec: self.config.video_codec.clone(),
        }
    }

    fn audio_settings(&self) -> AudioSettings {
        AudioSettings {
            sample_rate: self.config.audio.sample_rate,
            channels: self.config.audio.channels,
            bit_rate: self.config.audio.bit_rate,
            codec: self.config.audio_codec.clone(),
        }
    }

    fn drain(&mut self, track: Track) -> anyhow::Result<()> {
        let encoder = match track {
            Track::Video => self.video.as_mut(),
            Track::Audio => self.audio.as_mut(),
        }
        .ok_or_else(|| anyhow::anyhow!("no {} track", track.name()))?;
        let output = self
            .output
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("sink is not open"))?;

        while let Some(packet) = encoder.encoder_receive_packet()? {
            let info = output.write_packet(packet, encoder.stream_index())?;
            self.observer.on_packet(&info);
            match track {
                Track::Video => self.stats.video_packets += 1,
                Track::Audio => self.stats.audio_packets += 1,
            }
        }
        Ok(())
    }
}

impl FrameSink for AvSink {
    fn open(&mut self, with_audio: bool) -> anyhow::Result<()> {
        if self.output.is_some() {
            anyhow::bail!("sink is already open");
        }
        if self.config.mode == OutputMode::Rtmp {
            ffmpeg_next::format::network::init();
        }

        let mut output = AvOutput::new(&self.config.url, self.config.mode.format_name())?;

        let video_id = output.default_codec(media::Type::Video);
        let video = if video_id == codec::Id::None && self.config.video_codec.is_none() {
            log::info!("output format {} carries no video", output.format_name());
            None
        } else {
            Some(
                Encoder::video(
                    output.context_mut(),
                    video_id,
                    &self.video_settings(),
                    self.config.video_encoder_options(),
                )
                .context("failed to add video stream")?,
            )
        };

        let audio = if with_audio {
            let audio_id = output.default_codec(media::Type::Audio);
            if audio_id == codec::Id::None && self.config.audio_codec.is_none() {
                log::warn!(
                    "output format {} has no audio codec, audio disabled",
                    output.format_name()
                );
                None
            } else {
                Some(
                    Encoder::audio(output.context_mut(), audio_id, &self.audio_settings())
                        .context("failed to add audio stream")?,
                )
            }
        } else {
            None
        };

        if video.is_none() && audio.is_none() {
            anyhow::bail!(
                "output format {} has no usable video or audio codec",
                output.format_name()
            );
        }

        output.write_header(self.config.muxer_options())?;
        log::info!(
            "streaming to {} ({}), video: {}, audio: {}",
            output.url(),
            output.format_name(),
            video.is_some(),
            audio.is_some()
        );

        self.output = Some(output);
        self.video = video;
        self.audio = audio;
        Ok(())
    }

    fn video_time_base(&self) -> Option<Rational> {
        self.video.as_ref().map(|encoder| encoder.time_base())
    }

    fn audio_format(&self) -> Option<AudioFormat> {
        self.audio.as_ref().map(|encoder| AudioFormat {
            sample_rate: encoder.sample_rate(),
            channels: encoder.channels(),
            frame_size: encoder.frame_size(),
        })
    }

    fn write_video(&mut self, pixels: &[u32], pts: i64) -> anyhow::Result<()> {
        let encoder = self
            .video
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no video track"))?;
        let mut frame = video_from_pixels(
            pixels,
            self.config.width,
            self.config.height,
            self.config.pixel_layout.pixel(),
        )?;
        frame.set_pts(Some(pts));
        encoder
            .send_frame(RawFrame::Video(frame))
            .context("error encoding video frame")?;
        self.drain(Track::Video)
    }

    fn write_audio(&mut self, samples: &[i16], pts: i64) -> anyhow::Result<()> {
        let encoder = self
            .audio
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no audio track"))?;
        let mut frame = audio_from_samples(samples, encoder.channels(), encoder.sample_rate())?;
        frame.set_pts(Some(pts));
        encoder
            .send_frame(RawFrame::Audio(frame))
            .context("error encoding audio frame")?;
        self.drain(Track::Audio)
    }

    fn finish(&mut self) -> anyhow::Result<SinkStats> {
        if self.output.is_none() {
            return Ok(self.stats);
        }
        if let Some(video) = self.video.as_mut() {
            video.send_eof()?;
            self.drain(Track::Video)?;
        }
        if let Some(audio) = self.audio.as_mut() {
            audio.send_eof()?;
            self.drain(Track::Audio)?;
        }
        if let Some(mut output) = self.output.take() {
            output.finish()?;
        }
        self.video = None;
        self.audio = None;
        log::info!(
            "output closed: {} video packets, {} audio packets",
            self.stats.video_packets,
            self.stats.audio_packets
        );
        Ok(self.stats)
    }
}
