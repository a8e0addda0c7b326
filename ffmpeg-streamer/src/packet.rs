use ffmpeg_next::Rational;

use crate::interleave::Track;

/// An encoder output packet tagged with the time base its timestamps are in.
pub struct EncodedPacket {
    packet: ffmpeg_next::codec::packet::Packet,
    time_base: Rational,
    track: Track,
}

impl EncodedPacket {
    pub fn new(
        packet: ffmpeg_next::codec::packet::Packet,
        time_base: Rational,
        track: Track,
    ) -> Self {
        Self {
            packet,
            time_base,
            track,
        }
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn track(&self) -> Track {
        self.track
    }

    pub fn get_mut(&mut self) -> &mut ffmpeg_next::codec::packet::Packet {
        &mut self.packet
    }
}
