use ffmpeg_next::{ChannelLayout, format::Sample};

/// swresample context converting interleaved i16 into the encoder's sample format.
pub struct Resampler {
    context: ffmpeg_next::software::resampling::Context,
}

impl Resampler {
    pub fn new(
        src: Sample,
        src_layout: ChannelLayout,
        src_rate: u32,
        dst: Sample,
        dst_layout: ChannelLayout,
        dst_rate: u32,
    ) -> anyhow::Result<Self> {
        let context = ffmpeg_next::software::resampling::Context::get(
            src, src_layout, src_rate, dst, dst_layout, dst_rate,
        )?;
        Ok(Self { context })
    }

    pub fn run(
        &mut self,
        frame: &ffmpeg_next::frame::Audio,
    ) -> anyhow::Result<ffmpeg_next::frame::Audio> {
        let mut converted = ffmpeg_next::frame::Audio::empty();
        self.context.run(frame, &mut converted)?;
        converted.set_pts(frame.pts());
        Ok(converted)
    }
}

unsafe impl Send for Resampler {}
