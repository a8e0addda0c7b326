//! Push a live stream to an RTMP server until Ctrl-C.

use ffmpeg_streamer::{FrameStreamer, StreamerConfig, StreamerTask};
use frame_streamer::{config::config, patterns, tones};

const FPS: u32 = 30;
const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

async fn run() -> anyhow::Result<()> {
    let demo = config();
    let stream_config = StreamerConfig::rtmp(demo.rtmp_url())
        .with_bitrate(1_500_000)
        .with_fps(FPS)
        .with_size(WIDTH, HEIGHT)
        .with_video_codec("libx264")
        .with_audio_codec("aac")
        .with_gop_size(FPS * 2)
        .with_encoder_option("preset", "ultrafast")
        .with_encoder_option("tune", "zerolatency");
    let mut streamer = FrameStreamer::new(stream_config)?;

    streamer.set_audio_callback(|seconds, _, channels| {
        channels.fill(tones::beep(seconds, 369.0, 8_000.0));
    });
    let mut frame = 0u32;
    streamer.set_video_callback(move |pixels, width, height| {
        patterns::spiral(pixels, width, height, frame as f32 / FPS as f32);
        frame += 1;
    });

    let task = StreamerTask::new();
    let mut handle = task.start(streamer);
    log::info!("pushing to {}, press Ctrl-C to stop", demo.rtmp_url());

    let stats = tokio::select! {
        result = &mut handle => result??,
        _ = tokio::signal::ctrl_c() => {
            task.stop();
            handle.await??
        },
    };
    log::info!(
        "pushed {} video frames ({} skipped), {} audio frames",
        stats.video_frames,
        stats.skipped_frames,
        stats.audio_frames
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = frame_streamer::init() {
        log::error!("video_rtmp_stream failed: {:#}", e);
        std::process::exit(1);
    }
    if let Err(e) = run().await {
        log::error!("video_rtmp_stream failed: {:#}", e);
        std::process::exit(1);
    }
}
