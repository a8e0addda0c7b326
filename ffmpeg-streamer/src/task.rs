use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    sink::FrameSink,
    streamer::{FrameStreamer, StreamStats},
};

/// Runs a streamer's real-time loop on a blocking worker.
///
/// Cancelling the token stops the loop, after which the stream is finalized
/// and its stats returned through the join handle.
pub struct StreamerTask {
    cancel: CancellationToken,
}

impl Default for StreamerTask {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamerTask {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_token(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn start<S>(
        &self,
        mut streamer: FrameStreamer<S>,
    ) -> JoinHandle<anyhow::Result<StreamStats>>
    where
        S: FrameSink + 'static,
    {
        let control = streamer.stop_handle();
        let cancel = self.cancel.clone();
        let watcher = tokio::spawn(async move {
            cancel.cancelled().await;
            log::debug!("stream task cancelled");
            control.stop();
        });

        tokio::task::spawn_blocking(move || {
            log::info!("stream loop started");
            let result = streamer.run_loop();
            watcher.abort();
            let stats = streamer.finalize();
            log::info!("stream loop finished");
            result?;
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ffmpeg_next::Rational;

    use super::*;
    use crate::{config::StreamerConfig, interleave::Track, testing::RecordingSink};

    #[tokio::test]
    async fn test_cancel_stops_loop() -> anyhow::Result<()> {
        let config = StreamerConfig::file("memory.ts")
            .with_fps(50)
            .with_size(16, 16);
        let (sink, log) = RecordingSink::new(Rational::new(1, 50), None);
        let mut streamer = FrameStreamer::with_sink(config, sink)?;
        streamer.set_video_callback(|pixels, _, _| pixels.fill(0));

        let task = StreamerTask::new();
        let handle = task.start(streamer);
        tokio::time::sleep(Duration::from_millis(300)).await;
        task.stop();

        let stats = tokio::time::timeout(Duration::from_secs(5), handle).await???;
        assert!(stats.video_frames > 0);
        let log = log.lock().unwrap();
        assert!(log.finished);
        assert_eq!(log.pts(Track::Video).len() as u64, stats.video_frames);
        Ok(())
    }

    #[tokio::test]
    async fn test_loop_error_is_returned() -> anyhow::Result<()> {
        let config = StreamerConfig::file("memory.ts").with_size(16, 16);
        let (sink, log) = RecordingSink::new(Rational::new(1, 25), None);
        // no video callback
        let streamer = FrameStreamer::with_sink(config, sink)?;
        let handle = StreamerTask::new().start(streamer);
        assert!(handle.await?.is_err());
        assert!(log.lock().unwrap().finished);
        Ok(())
    }
}
