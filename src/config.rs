use std::{sync::LazyLock, time::Duration};

pub struct DemoConfig {
    smoke_test: bool,
    rtmp_url: String,
    hls_playlist: String,
}

impl DemoConfig {
    fn from_env() -> Self {
        Self {
            smoke_test: std::env::var_os("SMOKE_TEST").is_some(),
            rtmp_url: std::env::var("RTMP_URL")
                .unwrap_or_else(|_| "rtmp://localhost/live/stream".to_string()),
            hls_playlist: "test_stream.m3u8".to_string(),
        }
    }

    /// Run length for live demos, shortened under `SMOKE_TEST`.
    pub fn live_duration(&self) -> Duration {
        if self.smoke_test {
            Duration::from_secs(5)
        } else {
            Duration::from_secs(60)
        }
    }

    pub fn rtmp_url(&self) -> &str {
        &self.rtmp_url
    }

    pub fn hls_playlist(&self) -> &str {
        &self.hls_playlist
    }
}

pub fn config() -> &'static DemoConfig {
    static CONFIG: LazyLock<DemoConfig> = LazyLock::new(DemoConfig::from_env);
    &CONFIG
}
