use std::sync::Arc;

use ffmpeg_next::{Dictionary, Rational, format::Pixel};

use crate::{observer::PacketObserver, timestamp::TimestampMode};

/// Video time base for live outputs. Fits every codec's time base limits.
pub const LIVE_TIME_BASE: Rational = Rational(1, 1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Local file, container guessed from the extension.
    File,
    /// Live push to an rtmp:// url.
    Rtmp,
    /// Local `.m3u8` playlist with rolling `.ts` segments.
    Hls,
}

impl OutputMode {
    /// Format hint passed to the muxer. `None` lets ffmpeg guess from the url.
    pub fn format_name(&self) -> Option<&'static str> {
        match self {
            OutputMode::File => None,
            OutputMode::Rtmp => Some("flv"),
            OutputMode::Hls => Some("hls"),
        }
    }

    pub fn is_streaming(&self) -> bool {
        !matches!(self, OutputMode::File)
    }

    pub fn timestamp_mode(&self) -> TimestampMode {
        if self.is_streaming() {
            TimestampMode::WallClock
        } else {
            TimestampMode::Counter
        }
    }
}

/// How a `u32` pixel is packed in the caller's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// `r << 24 | g << 16 | b << 8 | a`
    Rgba,
    /// `a << 24 | r << 16 | g << 8 | b` (SDL ARGB8888, Allegro)
    Argb,
}

impl PixelLayout {
    /// Packed ffmpeg pixel format matching this layout in native byte order.
    pub fn pixel(&self) -> Pixel {
        let little = cfg!(target_endian = "little");
        match (self, little) {
            (PixelLayout::Rgba, true) => Pixel::ABGR,
            (PixelLayout::Rgba, false) => Pixel::RGBA,
            (PixelLayout::Argb, true) => Pixel::BGRA,
            (PixelLayout::Argb, false) => Pixel::ARGB,
        }
    }

    pub fn pack(&self, r: u8, g: u8, b: u8, a: u8) -> u32 {
        let (r, g, b, a) = (r as u32, g as u32, b as u32, a as u32);
        match self {
            PixelLayout::Rgba => (r << 24) | (g << 16) | (b << 8) | a,
            PixelLayout::Argb => (a << 24) | (r << 16) | (g << 8) | b,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioConfig {
    /// Preferred rate; the codec's first supported rate is used if it rejects this one.
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bit_rate: 64_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HlsOptions {
    /// Entries kept in the live playlist.
    pub list_size: u32,
    /// Target segment length in seconds.
    pub segment_seconds: u32,
    /// Delete segments that dropped out of the playlist.
    pub delete_segments: bool,
    /// Never write `#EXT-X-ENDLIST`.
    pub omit_endlist: bool,
    /// Segment filename pattern; defaults to `<playlist>_%d.ts`.
    pub segment_pattern: Option<String>,
}

impl Default for HlsOptions {
    fn default() -> Self {
        Self {
            list_size: 10,
            segment_seconds: 1,
            delete_segments: true,
            omit_endlist: true,
            segment_pattern: None,
        }
    }
}

impl HlsOptions {
    pub fn segment_filename(&self, playlist: &str) -> String {
        self.segment_pattern
            .clone()
            .unwrap_or_else(|| format!("{}_%d.ts", playlist))
    }

    pub fn flags(&self) -> String {
        let mut flags = Vec::new();
        if self.omit_endlist {
            flags.push("omit_endlist");
        }
        if self.delete_segments {
            flags.push("delete_segments");
        }
        flags.join("+")
    }

    pub fn muxer_options(&self, playlist: &str) -> Vec<(String, String)> {
        let mut options = vec![
            ("hls_segment_filename".to_string(), self.segment_filename(playlist)),
            ("hls_list_size".to_string(), self.list_size.to_string()),
            ("hls_time".to_string(), self.segment_seconds.to_string()),
        ];
        let flags = self.flags();
        if !flags.is_empty() {
            options.push(("hls_flags".to_string(), flags));
        }
        options
    }
}

#[derive(Clone)]
pub struct StreamerConfig {
    pub url: String,
    pub mode: OutputMode,
    /// Video bit rate in bits per second.
    pub bitrate: usize,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_layout: PixelLayout,
    /// Encoder name overriding the container default, e.g. "libx264".
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub gop_size: u32,
    pub audio: AudioConfig,
    pub hls: HlsOptions,
    /// Extra options handed to the video encoder on open.
    pub encoder_options: Vec<(String, String)>,
    pub observer: Option<Arc<dyn PacketObserver>>,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            url: "test.ts".to_string(),
            mode: OutputMode::File,
            bitrate: 400_000,
            fps: 25,
            width: 352,
            height: 288,
            pixel_layout: PixelLayout::Rgba,
            video_codec: None,
            audio_codec: None,
            gop_size: 12,
            audio: AudioConfig::default(),
            hls: HlsOptions::default(),
            encoder_options: Vec::new(),
            observer: None,
        }
    }
}

impl StreamerConfig {
    pub fn new(url: &str, mode: OutputMode) -> Self {
        Self {
            url: url.to_string(),
            mode,
            ..Default::default()
        }
    }

    pub fn file(path: &str) -> Self {
        Self::new(path, OutputMode::File)
    }

    pub fn rtmp(url: &str) -> Self {
        Self::new(url, OutputMode::Rtmp)
    }

    pub fn hls(playlist: &str) -> Self {
        Self::new(playlist, OutputMode::Hls)
    }

    pub fn with_bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_pixel_layout(mut self, layout: PixelLayout) -> Self {
        self.pixel_layout = layout;
        self
    }

    pub fn with_video_codec(mut self, codec: &str) -> Self {
        self.video_codec = Some(codec.to_string());
        self
    }

    pub fn with_audio_codec(mut self, codec: &str) -> Self {
        self.audio_codec = Some(codec.to_string());
        self
    }

    pub fn with_gop_size(mut self, gop_size: u32) -> Self {
        self.gop_size = gop_size;
        self
    }

    pub fn with_audio(mut self, audio: AudioConfig) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_hls(mut self, hls: HlsOptions) -> Self {
        self.hls = hls;
        self
    }

    pub fn with_encoder_option(mut self, key: &str, value: &str) -> Self {
        self.encoder_options.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PacketObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            anyhow::bail!("output url is empty");
        }
        if self.fps == 0 || self.fps > i32::MAX as u32 {
            anyhow::bail!("fps must be between 1 and {}, got {}", i32::MAX, self.fps);
        }
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("invalid video size {}x{}", self.width, self.height);
        }
        // 4:2:0 chroma subsampling
        if self.width % 2 != 0 || self.height % 2 != 0 {
            anyhow::bail!(
                "video size must be a multiple of two, got {}x{}",
                self.width,
                self.height
            );
        }
        if self.audio.channels == 0 {
            anyhow::bail!("audio channel count must be positive");
        }
        if self.audio.sample_rate == 0 || self.audio.sample_rate > i32::MAX as u32 {
            anyhow::bail!(
                "audio sample rate must be between 1 and {}, got {}",
                i32::MAX,
                self.audio.sample_rate
            );
        }
        if self.gop_size == 0 {
            anyhow::bail!("gop size must be positive");
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Encoder time base for video: one tick per frame for files, milliseconds when live.
    pub fn video_time_base(&self) -> Rational {
        match self.mode.timestamp_mode() {
            TimestampMode::Counter => Rational::new(1, self.fps as i32),
            TimestampMode::WallClock => LIVE_TIME_BASE,
        }
    }

    pub fn muxer_options(&self) -> Dictionary<'static> {
        let mut options = Dictionary::new();
        if self.mode == OutputMode::Hls {
            for (key, value) in self.hls.muxer_options(&self.url) {
                options.set(&key, &value);
            }
        }
        options
    }

    pub fn video_encoder_options(&self) -> Dictionary<'static> {
        let mut options = Dictionary::new();
        for (key, value) in &self.encoder_options {
            options.set(key, value);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_format_names() {
        assert_eq!(OutputMode::File.format_name(), None);
        assert_eq!(OutputMode::Rtmp.format_name(), Some("flv"));
        assert_eq!(OutputMode::Hls.format_name(), Some("hls"));
        assert!(!OutputMode::File.is_streaming());
        assert_eq!(OutputMode::Hls.timestamp_mode(), TimestampMode::WallClock);
        assert_eq!(OutputMode::File.timestamp_mode(), TimestampMode::Counter);
    }

    #[test]
    fn test_hls_defaults() {
        let hls = HlsOptions::default();
        let options = hls.muxer_options("live/test_stream.m3u8");
        assert!(options.contains(&(
            "hls_segment_filename".to_string(),
            "live/test_stream.m3u8_%d.ts".to_string()
        )));
        assert!(options.contains(&("hls_list_size".to_string(), "10".to_string())));
        assert!(options.contains(&("hls_time".to_string(), "1".to_string())));
        assert!(options.contains(&(
            "hls_flags".to_string(),
            "omit_endlist+delete_segments".to_string()
        )));
    }

    #[test]
    fn test_hls_without_flags() {
        let hls = HlsOptions {
            delete_segments: false,
            omit_endlist: false,
            segment_pattern: Some("seg_%03d.ts".to_string()),
            ..Default::default()
        };
        let options = hls.muxer_options("out.m3u8");
        assert!(options.iter().all(|(key, _)| key != "hls_flags"));
        assert_eq!(hls.segment_filename("out.m3u8"), "seg_%03d.ts");
    }

    #[test]
    fn test_builder() {
        let config = StreamerConfig::hls("test_stream.m3u8")
            .with_bitrate(1_000_000)
            .with_fps(30)
            .with_size(400, 300)
            .with_video_codec("libx264")
            .with_encoder_option("preset", "ultrafast");
        assert_eq!(config.mode, OutputMode::Hls);
        assert_eq!(config.bitrate, 1_000_000);
        assert_eq!(config.pixel_count(), 120_000);
        assert_eq!(config.video_codec.as_deref(), Some("libx264"));
        assert_eq!(config.encoder_options.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(StreamerConfig::file("out.mp4").with_fps(0).validate().is_err());
        assert!(StreamerConfig::file("out.mp4").with_size(0, 240).validate().is_err());
        assert!(StreamerConfig::file("out.mp4").with_size(321, 240).validate().is_err());
        assert!(StreamerConfig::file("").validate().is_err());
        let silent = StreamerConfig::file("out.mp4").with_audio(AudioConfig {
            channels: 0,
            ..Default::default()
        });
        assert!(silent.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_rates_beyond_rational_range() {
        let too_fast = StreamerConfig::file("out.mp4").with_fps(i32::MAX as u32 + 1);
        assert!(too_fast.validate().is_err());
        assert!(StreamerConfig::file("out.mp4").with_fps(i32::MAX as u32).validate().is_ok());

        let too_dense = StreamerConfig::file("out.mp4").with_audio(AudioConfig {
            sample_rate: u32::MAX,
            ..Default::default()
        });
        assert!(too_dense.validate().is_err());
    }

    #[test]
    fn test_video_time_base() {
        let file = StreamerConfig::file("out.mp4").with_fps(30);
        assert_eq!(file.video_time_base(), Rational::new(1, 30));
        let live = StreamerConfig::rtmp("rtmp://localhost/live/stream").with_fps(30);
        assert_eq!(live.video_time_base(), Rational::new(1, 1000));
    }

    #[test]
    fn test_pixel_layout_pack() {
        assert_eq!(PixelLayout::Rgba.pack(0x11, 0x22, 0x33, 0xff), 0x112233ff);
        assert_eq!(PixelLayout::Argb.pack(0x11, 0x22, 0x33, 0xff), 0xff112233);
    }
}
