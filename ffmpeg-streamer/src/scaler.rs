use ffmpeg_next::format::Pixel;

/// swscale context converting caller pixels into the encoder's format.
pub struct Scaler {
    context: ffmpeg_next::software::scaling::Context,
}

impl Scaler {
    pub fn new(
        src: Pixel,
        src_width: u32,
        src_height: u32,
        dst: Pixel,
        dst_width: u32,
        dst_height: u32,
    ) -> anyhow::Result<Self> {
        let context = ffmpeg_next::software::scaling::Context::get(
            src,
            src_width,
            src_height,
            dst,
            dst_width,
            dst_height,
            ffmpeg_next::software::scaling::flag::Flags::BICUBIC,
        )?;
        Ok(Self { context })
    }

    pub fn run(
        &mut self,
        frame: &ffmpeg_next::frame::Video,
    ) -> anyhow::Result<ffmpeg_next::frame::Video> {
        let mut converted = ffmpeg_next::frame::Video::empty();
        self.context.run(frame, &mut converted)?;
        converted.set_pts(frame.pts());
        Ok(converted)
    }
}

unsafe impl Send for Scaler {}
