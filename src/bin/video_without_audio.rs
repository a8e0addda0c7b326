use ffmpeg_streamer::{FrameStreamer, StreamerConfig};
use frame_streamer::patterns;

const FPS: u32 = 30;
const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const SECONDS: u32 = 5;

fn run() -> anyhow::Result<()> {
    let config = StreamerConfig::file("video-without-audio.mp4")
        .with_bitrate(100_000_000)
        .with_fps(FPS)
        .with_size(WIDTH, HEIGHT);
    let mut streamer = FrameStreamer::new(config)?;

    let mut pixels = vec![0u32; (WIDTH * HEIGHT) as usize];
    for i in 0..FPS * SECONDS {
        patterns::wave(&mut pixels, WIDTH, HEIGHT, i as f32 * 0.1);
        streamer.add_frame(&pixels)?;
    }

    let stats = streamer.finalize()?;
    log::info!("wrote {} video frames", stats.video_frames);
    Ok(())
}

fn main() {
    if let Err(e) = frame_streamer::init().and_then(|_| run()) {
        log::error!("video_without_audio failed: {:#}", e);
        std::process::exit(1);
    }
}
