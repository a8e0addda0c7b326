//! Moving circle with the audio track taken from a WAV file, looped.

use ffmpeg_streamer::{FrameStreamer, PixelLayout, StreamerConfig};
use frame_streamer::patterns;

const FPS: u32 = 30;
const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const SECONDS: u32 = 10;

struct WavTrack {
    samples: Vec<i16>,
    channels: usize,
    sample_rate: u32,
}

impl WavTrack {
    fn load(path: &str) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| anyhow::anyhow!("could not open wav file '{}': {}", path, e))?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!(
                "'{}' is {:?} {}-bit, only 16-bit integer wav is supported",
                path,
                spec.sample_format,
                spec.bits_per_sample
            );
        }
        let samples = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
        if spec.channels == 0 || samples.len() < spec.channels as usize {
            anyhow::bail!("'{}' has no samples", path);
        }
        log::info!(
            "loaded {}: {}Hz, {} channels, {:.2}s",
            path,
            spec.sample_rate,
            spec.channels,
            samples.len() as f32 / spec.channels as f32 / spec.sample_rate as f32
        );
        Ok(Self {
            samples,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
        })
    }

    /// Fill one output sample frame from the wav position at `seconds`, looping.
    fn fill(&self, seconds: f32, out: &mut [i16]) {
        let frames = self.samples.len() / self.channels;
        let index = (seconds as f64 * self.sample_rate as f64) as usize % frames;
        let frame = &self.samples[index * self.channels..(index + 1) * self.channels];
        for (c, sample) in out.iter_mut().enumerate() {
            *sample = frame[c.min(self.channels - 1)];
        }
    }
}

fn run() -> anyhow::Result<()> {
    let wav_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hello_world.wav".to_string());
    let track = WavTrack::load(&wav_path)?;

    let config = StreamerConfig::file("video-with-wav.mp4")
        .with_bitrate(4_000_000)
        .with_fps(FPS)
        .with_size(WIDTH, HEIGHT);
    let mut streamer = FrameStreamer::new(config)?;
    streamer.set_audio_callback(move |seconds, _, channels| track.fill(seconds, channels));

    let color = PixelLayout::Rgba.pack(0xff, 0xa0, 0x20, 0xff);
    let background = PixelLayout::Rgba.pack(0x10, 0x10, 0x30, 0xff);
    let mut pixels = vec![0u32; (WIDTH * HEIGHT) as usize];
    for i in 0..FPS * SECONDS {
        let seconds = i as f32 / FPS as f32;
        let center = patterns::bounce(WIDTH, HEIGHT, 40.0, 200.0, seconds);
        patterns::circle(&mut pixels, WIDTH, HEIGHT, center, 40.0, color, background);
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
        log::error!("video_with_wav failed: {:#}", e);
        std::process::exit(1);
    }
}
