//! HLS stream paced by the caller: frames are generated in real time, late
//! frames are skipped and early ones wait for their slot.

use ffmpeg_streamer::{FramePacer, FrameStreamer, PaceDecision, StreamerConfig};
use frame_streamer::{config::config, patterns, tones};

const FPS: u32 = 30;
const WIDTH: u32 = 400;
const HEIGHT: u32 = 300;

fn run() -> anyhow::Result<()> {
    let demo = config();
    let seconds = demo.live_duration().as_secs() as u32;
    let stream_config = StreamerConfig::hls(demo.hls_playlist())
        .with_bitrate(1_000_000)
        .with_fps(FPS)
        .with_size(WIDTH, HEIGHT);
    let mut streamer = FrameStreamer::new(stream_config)?;

    streamer.set_audio_callback(|seconds, _, channels| {
        channels.fill(tones::enveloped_beep(seconds, 369.0, 10_000.0));
    });
    streamer.open()?;

    let pacer = FramePacer::new(FPS);
    let mut pixels = vec![0u32; (WIDTH * HEIGHT) as usize];
    let mut skipped = 0;
    for i in 0..(FPS * seconds) as u64 {
        match pacer.pace(i) {
            PaceDecision::Skip => {
                skipped += 1;
                continue;
            }
            PaceDecision::Wait(delay) => std::thread::sleep(delay),
            PaceDecision::Emit => {}
        }
        patterns::spiral(&mut pixels, WIDTH, HEIGHT, i as f32 * 0.1);
        streamer.add_frame(&pixels)?;
    }

    let stats = streamer.finalize()?;
    log::info!(
        "streamed {} frames to {}, {} skipped",
        stats.video_frames,
        demo.hls_playlist(),
        skipped
    );
    Ok(())
}

fn main() {
    if let Err(e) = frame_streamer::init().and_then(|_| run()) {
        log::error!("video_hls_stream failed: {:#}", e);
        std::process::exit(1);
    }
}
