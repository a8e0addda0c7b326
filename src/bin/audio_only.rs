use ffmpeg_streamer::{FrameStreamer, StreamerConfig};
use frame_streamer::tones;

fn run() -> anyhow::Result<()> {
    let config = StreamerConfig::file("hello_world.wav")
        .with_bitrate(100_000_000)
        .with_fps(30)
        .with_size(800, 600);
    let mut streamer = FrameStreamer::new(config)?;

    let stop = streamer.stop_handle();
    streamer.set_audio_callback(move |seconds, _, channels| {
        channels.fill(tones::square(seconds, 440.0, 5000.0));
        if seconds >= 2.0 {
            stop.stop();
        }
    });

    streamer.record()?;
    let stats = streamer.finalize()?;
    log::info!("wrote {} audio frames to hello_world.wav", stats.audio_frames);
    Ok(())
}

fn main() {
    if let Err(e) = frame_streamer::init().and_then(|_| run()) {
        log::error!("audio_only failed: {:#}", e);
        std::process::exit(1);
    }
}
