use ffmpeg_next::{
    ChannelLayout,
    format::{Pixel, Sample, sample},
};

/// A raw frame on its way into an encoder.
pub enum RawFrame {
    Video(ffmpeg_next::frame::Video),
    Audio(ffmpeg_next::frame::Audio),
}

/// Pack caller pixels into a frame of `format`, honouring the frame's line stride.
pub fn video_from_pixels(
    pixels: &[u32],
    width: u32,
    height: u32,
    format: Pixel,
) -> anyhow::Result<ffmpeg_next::frame::Video> {
    let row_len = width as usize;
    if pixels.len() != row_len * height as usize {
        anyhow::bail!(
            "pixel buffer holds {} pixels, expected {}x{}",
            pixels.len(),
            width,
            height
        );
    }
    let mut frame = ffmpeg_next::frame::Video::new(format, width, height);
    let stride = frame.stride(0);
    let data = frame.data_mut(0);
    for (y, row) in pixels.chunks_exact(row_len).enumerate() {
        let bytes: &[u8] = bytemuck::cast_slice(row);
        let start = y * stride;
        data[start..start + bytes.len()].copy_from_slice(bytes);
    }
    Ok(frame)
}

/// Interleaved signed 16-bit samples as a packed audio frame.
pub fn audio_from_samples(
    samples: &[i16],
    channels: u16,
    rate: u32,
) -> anyhow::Result<ffmpeg_next::frame::Audio> {
    if channels == 0 || samples.len() % channels as usize != 0 {
        anyhow::bail!(
            "{} samples do not split into {} channels",
            samples.len(),
            channels
        );
    }
    let count = samples.len() / channels as usize;
    let mut frame = ffmpeg_next::frame::Audio::new(
        Sample::I16(sample::Type::Packed),
        count,
        ChannelLayout::default(channels as i32),
    );
    frame.set_rate(rate);
    let bytes: &[u8] = bytemuck::cast_slice(samples);
    frame.data_mut(0)[..bytes.len()].copy_from_slice(bytes);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_rows_respect_stride() -> anyhow::Result<()> {
        let (width, height) = (6u32, 4u32);
        let pixels: Vec<u32> = (0..width * height).collect();
        let frame = video_from_pixels(&pixels, width, height, Pixel::RGBA)?;
        let stride = frame.stride(0);
        assert!(stride >= width as usize * 4);
        for y in 0..height as usize {
            let row = &frame.data(0)[y * stride..y * stride + width as usize * 4];
            let expected: &[u8] = bytemuck::cast_slice(&pixels[y * 6..(y + 1) * 6]);
            assert_eq!(row, expected);
        }
        Ok(())
    }

    #[test]
    fn test_video_rejects_wrong_length() {
        assert!(video_from_pixels(&[0u32; 10], 4, 4, Pixel::RGBA).is_err());
    }

    #[test]
    fn test_audio_from_samples() -> anyhow::Result<()> {
        let samples: Vec<i16> = (0..2048).map(|i| i as i16).collect();
        let frame = audio_from_samples(&samples, 2, 44_100)?;
        assert_eq!(frame.samples(), 1024);
        assert_eq!(frame.rate(), 44_100);
        let expected: &[u8] = bytemuck::cast_slice(&samples);
        assert_eq!(&frame.data(0)[..expected.len()], expected);
        assert!(audio_from_samples(&samples[..3], 2, 44_100).is_err());
        Ok(())
    }
}
