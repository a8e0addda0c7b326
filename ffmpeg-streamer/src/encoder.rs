use ffmpeg_next::{
    ChannelLayout, Dictionary, Rational,
    codec::{self, Capabilities},
    format::{Pixel, Sample, sample},
};

use crate::{
    frame::RawFrame, interleave::Track, packet::EncodedPacket, resampler::Resampler,
    scaler::Scaler,
};

/// Samples per frame for codecs that accept any frame size.
pub const VARIABLE_FRAME_SIZE: u32 = 10_000;

pub enum EncoderType {
    Video(ffmpeg_next::codec::encoder::Video),
    Audio(ffmpeg_next::codec::encoder::Audio),
}

impl EncoderType {
    pub fn send_frame(&mut self, frame: &RawFrame) -> anyhow::Result<()> {
        match (self, frame) {
            (EncoderType::Video(encoder), RawFrame::Video(frame)) => encoder.send_frame(frame)?,
            (EncoderType::Audio(encoder), RawFrame::Audio(frame)) => encoder.send_frame(frame)?,
            _ => anyhow::bail!("invalid frame type"),
        };
        Ok(())
    }

    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        match self {
            EncoderType::Video(encoder) => encoder.send_eof()?,
            EncoderType::Audio(encoder) => encoder.send_eof()?,
        }
        Ok(())
    }

    pub fn encoder_receive_packet(
        &mut self,
        time_base: Rational,
        track: Track,
    ) -> anyhow::Result<Option<EncodedPacket>> {
        let mut packet = ffmpeg_next::codec::packet::Packet::empty();
        let encode_result = match self {
            EncoderType::Video(encoder) => encoder.receive_packet(&mut packet),
            EncoderType::Audio(encoder) => encoder.receive_packet(&mut packet),
        };

        match encode_result {
            Ok(()) => Ok(Some(EncodedPacket::new(packet, time_base, track))),
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(None)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bit_rate: usize,
    pub gop_size: u32,
    pub time_base: Rational,
    /// Format of the frames handed to `send_frame`.
    pub source_format: Pixel,
    pub codec: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: usize,
    pub codec: Option<String>,
}

fn find_codec(name: Option<&str>, id: codec::Id) -> anyhow::Result<codec::Codec> {
    match name {
        Some(name) => ffmpeg_next::encoder::find_by_name(name)
            .ok_or_else(|| anyhow::anyhow!("could not find encoder for '{}'", name)),
        None => ffmpeg_next::encoder::find(id)
            .ok_or_else(|| anyhow::anyhow!("could not find encoder for '{:?}'", id)),
    }
}

fn wants_global_header(octx: &ffmpeg_next::format::context::Output) -> bool {
    octx.format()
        .flags()
        .contains(ffmpeg_next::format::flag::Flags::GLOBAL_HEADER)
}

/// Encoder bound to one output stream.
pub struct Encoder {
    inner: EncoderType,
    track: Track,
    stream_index: usize,
    encoder_time_base: Rational,
    frame_size: u32,
    sample_rate: u32,
    channels: u16,
    scaler: Option<Scaler>,
    resampler: Option<Resampler>,
}

impl Encoder {
    /// Open a video encoder and add its stream to `octx`.
    pub fn video(
        octx: &mut ffmpeg_next::format::context::Output,
        codec_id: codec::Id,
        settings: &VideoSettings,
        options: Dictionary,
    ) -> anyhow::Result<Self> {
        let codec = find_codec(settings.codec.as_deref(), codec_id)?;
        let global_header = wants_global_header(octx);

        let pixel_format = codec
            .video()
            .ok()
            .and_then(|video| video.formats())
            .map(|formats| {
                let supported: Vec<Pixel> = formats.collect();
                if supported.contains(&Pixel::YUV420P) {
                    Pixel::YUV420P
                } else {
                    supported.first().copied().unwrap_or(Pixel::YUV420P)
                }
            })
            .unwrap_or(Pixel::YUV420P);

        let mut encoder = ffmpeg_next::codec::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(pixel_format);
        encoder.set_bit_rate(settings.bit_rate);
        encoder.set_gop(settings.gop_size);
        encoder.set_frame_rate(Some(Rational::new(settings.fps as i32, 1)));
        encoder.set_time_base(settings.time_base);
        match codec.id() {
            codec::Id::MPEG2VIDEO => encoder.set_max_b_frames(2),
            // avoid macroblocks in which some coeffs overflow
            codec::Id::MPEG1VIDEO => {
                encoder.set_mb_decision(ffmpeg_next::encoder::Decision::RateDistortion)
            }
            _ => {}
        }
        if global_header {
            encoder.set_flags(ffmpeg_next::codec::flag::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_with(options)
            .map_err(|e| anyhow::anyhow!("could not open video codec '{}': {}", codec.name(), e))?;
        let encoder_time_base: Rational = unsafe { (*encoder.0.as_ptr()).time_base.into() };

        let mut ost = octx.add_stream(codec)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(encoder_time_base);
        let stream_index = ost.index();

        let scaler = if settings.source_format != pixel_format {
            Some(Scaler::new(
                settings.source_format,
                settings.width,
                settings.height,
                pixel_format,
                settings.width,
                settings.height,
            )?)
        } else {
            None
        };

        log::info!(
            "video encoder {} opened: {}x{} {:?} @ {}fps, {} bps, stream {}",
            codec.name(),
            settings.width,
            settings.height,
            pixel_format,
            settings.fps,
            settings.bit_rate,
            stream_index
        );

        Ok(Self {
            inner: EncoderType::Video(encoder),
            track: Track::Video,
            stream_index,
            encoder_time_base,
            frame_size: 1,
            sample_rate: 0,
            channels: 0,
            scaler,
            resampler: None,
        })
    }

    /// Open an audio encoder and add its stream to `octx`.
    pub fn audio(
        octx: &mut ffmpeg_next::format::context::Output,
        codec_id: codec::Id,
        settings: &AudioSettings,
    ) -> anyhow::Result<Self> {
        let codec = find_codec(settings.codec.as_deref(), codec_id)?;
        let global_header = wants_global_header(octx);
        let audio_codec = codec.audio()?;

        let sample_format = audio_codec
            .formats()
            .and_then(|mut formats| formats.next())
            .unwrap_or(Sample::I16(sample::Type::Packed));
        let sample_rate = match audio_codec.rates() {
            Some(rates) => {
                let supported: Vec<i32> = rates.collect();
                if supported.is_empty() || supported.contains(&(settings.sample_rate as i32)) {
                    settings.sample_rate
                } else {
                    log::warn!(
                        "{} does not support {}Hz, using {}Hz",
                        codec.name(),
                        settings.sample_rate,
                        supported[0]
                    );
                    supported[0] as u32
                }
            }
            None => settings.sample_rate,
        };
        let layout = ChannelLayout::default(settings.channels as i32);
        let time_base = Rational::new(1, sample_rate as i32);

        let mut encoder = ffmpeg_next::codec::Context::new_with_codec(codec)
            .encoder()
            .audio()?;
        encoder.set_format(sample_format);
        encoder.set_rate(sample_rate as i32);
        encoder.set_channel_layout(layout);
        encoder.set_bit_rate(settings.bit_rate);
        encoder.set_time_base(time_base);
        if global_header {
            encoder.set_flags(ffmpeg_next::codec::flag::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_with(Dictionary::new())
            .map_err(|e| anyhow::anyhow!("could not open audio codec '{}': {}", codec.name(), e))?;
        let encoder_time_base: Rational = unsafe { (*encoder.0.as_ptr()).time_base.into() };

        let frame_size = if codec
            .capabilities()
            .contains(Capabilities::VARIABLE_FRAME_SIZE)
            || encoder.frame_size() == 0
        {
            VARIABLE_FRAME_SIZE
        } else {
            encoder.frame_size()
        };

        let mut ost = octx.add_stream(codec)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(encoder_time_base);
        let stream_index = ost.index();

        let source_format = Sample::I16(sample::Type::Packed);
        let resampler = if sample_format != source_format {
            Some(Resampler::new(
                source_format,
                layout,
                sample_rate,
                sample_format,
                layout,
                sample_rate,
            )?)
        } else {
            None
        };

        log::info!(
            "audio encoder {} opened: {}Hz {}ch {:?}, {} samples/frame, stream {}",
            codec.name(),
            sample_rate,
            settings.channels,
            sample_format,
            frame_size,
            stream_index
        );

        Ok(Self {
            inner: EncoderType::Audio(encoder),
            track: Track::Audio,
            stream_index,
            encoder_time_base,
            frame_size,
            sample_rate,
            channels: settings.channels,
            scaler: None,
            resampler,
        })
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    pub fn time_base(&self) -> Rational {
        self.encoder_time_base
    }

    /// Samples per audio frame. Always 1 for video.
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Convert `frame` to the encoder's format if needed and submit it.
    pub fn send_frame(&mut self, frame: RawFrame) -> anyhow::Result<()> {
        let frame = match frame {
            RawFrame::Video(video) => match self.scaler.as_mut() {
                Some(scaler) => RawFrame::Video(scaler.run(&video)?),
                None => RawFrame::Video(video),
            },
            RawFrame::Audio(audio) => match self.resampler.as_mut() {
                Some(resampler) => RawFrame::Audio(resampler.run(&audio)?),
                None => RawFrame::Audio(audio),
            },
        };
        self.inner.send_frame(&frame)
    }

    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()
    }

    pub fn encoder_receive_packet(&mut self) -> anyhow::Result<Option<EncodedPacket>> {
        self.inner
            .encoder_receive_packet(self.encoder_time_base, self.track)
    }
}

unsafe impl Send for Encoder {}
