//! Demo helpers shared by the example programs: pattern renderers, tone
//! generators and the logging setup.

pub mod config;
pub mod patterns;
pub mod tones;

pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .filter_module("ffmpeg_streamer", log::LevelFilter::Info)
        .init();
}

/// Logging and FFmpeg setup every demo starts with.
pub fn init() -> anyhow::Result<()> {
    init_logging();
    ffmpeg_streamer::init()
}
