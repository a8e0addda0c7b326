//! Real-time HLS stream: the streamer pulls frames from a callback and paces
//! itself. Runs until Ctrl-C or the configured duration.

use std::time::Instant;

use ffmpeg_streamer::{FrameStreamer, StreamerConfig, StreamerTask};
use frame_streamer::{config::config, patterns, tones};

const FPS: u32 = 30;
const WIDTH: u32 = 400;
const HEIGHT: u32 = 300;

async fn run() -> anyhow::Result<()> {
    let demo = config();
    let stream_config = StreamerConfig::hls(demo.hls_playlist())
        .with_bitrate(1_000_000)
        .with_fps(FPS)
        .with_size(WIDTH, HEIGHT);
    let mut streamer = FrameStreamer::new(stream_config)?;

    streamer.set_audio_callback(|seconds, _, channels| {
        channels.fill(tones::square(seconds, 440.0, 5000.0));
    });
    let start = Instant::now();
    streamer.set_video_callback(move |pixels, width, height| {
        patterns::wave(pixels, width, height, start.elapsed().as_secs_f32());
    });

    let task = StreamerTask::new();
    let mut handle = task.start(streamer);

    let stats = tokio::select! {
        result = &mut handle => result??,
        _ = tokio::time::sleep(demo.live_duration()) => {
            task.stop();
            handle.await??
        },
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupted");
            task.stop();
            handle.await??
        },
    };
    log::info!(
        "streamed {} frames ({} skipped) to {}",
        stats.video_frames,
        stats.skipped_frames,
        demo.hls_playlist()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = frame_streamer::init() {
        log::error!("ffmpeg init failed: {:#}", e);
        std::process::exit(1);
    }
    if let Err(e) = run().await {
        log::error!("stream failed: {:#}", e);
        std::process::exit(1);
    }
}
