use ffmpeg_next::{Dictionary, codec, media};

use crate::{observer::PacketInfo, packet::EncodedPacket};

/// Container the guessed format falls back to when the url has no known extension.
const FALLBACK_FORMAT: &str = "mpeg";

pub struct AvOutput {
    inner: ffmpeg_next::format::context::Output,
    url: String,
    have_written_header: bool,
    have_written_trailer: bool,
}

impl AvOutput {
    /// Allocate the output context. Without a format hint the container is
    /// deduced from `url`, then falls back to MPEG.
    pub fn new(url: &str, format: Option<&str>) -> anyhow::Result<Self> {
        let output = match format {
            Some(format) => ffmpeg_next::format::output_as(url, format)
                .map_err(|e| anyhow::anyhow!("could not open '{}' as {}: {}", url, format, e))?,
            None => match ffmpeg_next::format::output(url) {
                Ok(output) => output,
                Err(e) => {
                    log::warn!(
                        "could not deduce output format from '{}' ({}), using {}",
                        url,
                        e,
                        FALLBACK_FORMAT
                    );
                    ffmpeg_next::format::output_as(url, FALLBACK_FORMAT).map_err(|e| {
                        anyhow::anyhow!("could not open '{}' as {}: {}", url, FALLBACK_FORMAT, e)
                    })?
                }
            },
        };
        Ok(Self {
            inner: output,
            url: url.to_string(),
            have_written_header: false,
            have_written_trailer: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn format_name(&self) -> String {
        self.inner.format().name().to_string()
    }

    /// The container's default codec for `kind`, `codec::Id::None` when it has none.
    pub fn default_codec(&self, kind: media::Type) -> codec::Id {
        self.inner.format().codec(&self.url, kind)
    }

    pub fn context_mut(&mut self) -> &mut ffmpeg_next::format::context::Output {
        &mut self.inner
    }

    pub fn write_header(&mut self, options: Dictionary) -> anyhow::Result<()> {
        if self.have_written_header {
            return Ok(());
        }
        ffmpeg_next::format::context::output::dump(&self.inner, 0, Some(self.url.as_str()));
        let unused = self.inner.write_header_with(options).map_err(|e| {
            anyhow::anyhow!("error occurred when opening output '{}': {}", self.url, e)
        })?;
        for (key, value) in unused.iter() {
            log::warn!("muxer option {}={} was not used", key, value);
        }
        self.have_written_header = true;
        Ok(())
    }

    /// Rescale `packet` into its stream's time base and hand it to the interleaving muxer.
    pub fn write_packet(
        &mut self,
        mut packet: EncodedPacket,
        stream_index: usize,
    ) -> anyhow::Result<PacketInfo> {
        if !self.have_written_header {
            anyhow::bail!("write_packet called before write_header");
        }
        let out_time_base = self
            .inner
            .stream(stream_index)
            .ok_or_else(|| anyhow::anyhow!("stream {} not found", stream_index))?
            .time_base();
        let time_base = packet.time_base();
        let track = packet.track();

        let p = packet.get_mut();
        p.set_stream(stream_index);
        p.set_position(-1);
        p.rescale_ts(time_base, out_time_base);
        let info = PacketInfo {
            track,
            stream_index,
            pts: p.pts(),
            dts: p.dts(),
            duration: p.duration(),
            time_base: out_time_base,
        };
        p.write_interleaved(&mut self.inner)
            .map_err(|e| anyhow::anyhow!("error while writing {} packet: {}", track.name(), e))?;
        Ok(info)
    }

    pub fn finish(&mut self) -> anyhow::Result<()> {
        if self.have_written_header && !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner.write_trailer()?;
        }
        Ok(())
    }
}

unsafe impl Send for AvOutput {}
