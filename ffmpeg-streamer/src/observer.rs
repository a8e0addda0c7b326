use ffmpeg_next::Rational;

use crate::interleave::Track;

/// What the muxer saw for one written packet, in the output stream's time base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketInfo {
    pub track: Track,
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub time_base: Rational,
}

impl PacketInfo {
    pub fn pts_time(&self) -> Option<f64> {
        self.pts.map(|pts| to_seconds(pts, self.time_base))
    }

    pub fn dts_time(&self) -> Option<f64> {
        self.dts.map(|dts| to_seconds(dts, self.time_base))
    }

    pub fn duration_time(&self) -> f64 {
        to_seconds(self.duration, self.time_base)
    }
}

fn to_seconds(ts: i64, time_base: Rational) -> f64 {
    if time_base.denominator() == 0 {
        return 0.0;
    }
    ts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Receives every packet handed to the muxer.
pub trait PacketObserver: Send + Sync {
    fn on_packet(&self, packet: &PacketInfo);
}

/// Default observer: one trace line per packet.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl PacketObserver for LogObserver {
    fn on_packet(&self, packet: &PacketInfo) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        log::trace!(
            "{} pts:{} pts_time:{} dts:{} dts_time:{} duration:{} duration_time:{:.6} stream_index:{}",
            packet.track.name(),
            fmt_ts(packet.pts),
            fmt_time(packet.pts_time()),
            fmt_ts(packet.dts),
            fmt_time(packet.dts_time()),
            packet.duration,
            packet.duration_time(),
            packet.stream_index
        );
    }
}

fn fmt_ts(ts: Option<i64>) -> String {
    ts.map(|ts| ts.to_string())
        .unwrap_or_else(|| "NOPTS".to_string())
}

fn fmt_time(time: Option<f64>) -> String {
    time.map(|time| format!("{:.6}", time))
        .unwrap_or_else(|| "NOPTS".to_string())
}
