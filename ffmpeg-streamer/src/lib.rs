use ffmpeg_next::util::log::Level;

/// Registers FFmpeg components and aligns FFmpeg's log level with the `log`
/// crate's max level. Call once at startup, after the logger is installed.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))?;
    ffmpeg_next::util::log::set_level(ffmpeg_log_level(log::max_level()));
    Ok(())
}

fn ffmpeg_log_level(level: log::LevelFilter) -> Level {
    match level {
        log::LevelFilter::Off => Level::Quiet,
        log::LevelFilter::Error => Level::Error,
        log::LevelFilter::Warn => Level::Warning,
        log::LevelFilter::Info => Level::Info,
        log::LevelFilter::Debug => Level::Verbose,
        log::LevelFilter::Trace => Level::Debug,
    }
}

pub mod config;
pub mod control;
pub mod encoder;
pub mod frame;
pub mod interleave;
pub mod observer;
pub mod output;
pub mod packet;
pub mod pacing;
pub mod resampler;
pub mod scaler;
pub mod sink;
pub mod streamer;
pub mod task;
pub mod timestamp;

#[cfg(test)]
mod testing;

pub use config::{AudioConfig, HlsOptions, OutputMode, PixelLayout, StreamerConfig};
pub use control::{LoopControl, LoopState};
pub use observer::{LogObserver, PacketInfo, PacketObserver};
pub use pacing::{FramePacer, PaceDecision};
pub use sink::{AudioFormat, AvSink, FrameSink, SinkStats};
pub use streamer::{AudioCallback, FrameStreamer, StreamStats, VideoCallback};
pub use task::StreamerTask;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert!(matches!(ffmpeg_log_level(log::LevelFilter::Off), Level::Quiet));
        assert!(matches!(ffmpeg_log_level(log::LevelFilter::Warn), Level::Warning));
        assert!(matches!(ffmpeg_log_level(log::LevelFilter::Trace), Level::Debug));
    }

    #[test]
    fn test_init() -> anyhow::Result<()> {
        init()?;
        init()
    }
}
