use ffmpeg_streamer::{FrameStreamer, StreamerConfig};
use frame_streamer::{patterns, tones};

const FPS: u32 = 30;
const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const SECONDS: u32 = 5;

fn run() -> anyhow::Result<()> {
    let config = StreamerConfig::file("video-and-audio.mp4")
        .with_bitrate(100_000_000)
        .with_fps(FPS)
        .with_size(WIDTH, HEIGHT);
    let mut streamer = FrameStreamer::new(config)?;

    // beep every second
    streamer.set_audio_callback(|seconds, _, channels| {
        channels.fill(tones::beep(seconds, 369.0, 10_000.0));
    });

    let mut pixels = vec![0u32; (WIDTH * HEIGHT) as usize];
    for i in 0..FPS * SECONDS {
        patterns::spiral(&mut pixels, WIDTH, HEIGHT, i as f32 * 0.1);
        streamer.add_frame(&pixels)?;
    }

    let stats = streamer.finalize()?;
    log::info!(
        "wrote {} video frames, {} audio frames",
        stats.video_frames,
        stats.audio_frames
    );
    Ok(())
}

fn main() {
    if let Err(e) = frame_streamer::init().and_then(|_| run()) {
        log::error!("video_with_audio failed: {:#}", e);
        std::process::exit(1);
    }
}
