//! Software-drawn test patterns. Pixels are packed as `r<<24 | g<<16 | b<<8 | a`.

use ffmpeg_streamer::PixelLayout;

fn unit(v: f32) -> u8 {
    (255.0 * v.clamp(0.0, 1.0)) as u8
}

/// Diagonal grey wave drifting with `time`.
pub fn wave(pixels: &mut [u32], width: u32, height: u32, time: f32) {
    for y in 0..height {
        for x in 0..width {
            let v = (x as f32 * 0.03 + y as f32 * 0.03 + time).sin() * 0.5 + 0.5;
            let val = unit(v);
            pixels[(y * width + x) as usize] = PixelLayout::Rgba.pack(val, val, val, 0xff);
        }
    }
}

/// Spinning colour spiral with pulsing rings.
pub fn spiral(pixels: &mut [u32], width: u32, height: u32, time: f32) {
    let (half_w, half_h) = ((width / 2) as f32, (height / 2) as f32);
    for y in 0..height {
        for x in 0..width {
            let cx = x as f32 - half_w;
            let cy = y as f32 - half_h;
            let dist = (cx * cx + cy * cy).sqrt();
            let angle = cy.atan2(cx);

            let wave = ((dist * 0.03 + angle * 2.0 + time) * 3.0).sin() * 0.5 + 0.5;
            let ring_in = (dist * 0.05 - time * 2.0).sin() * 0.5 + 0.5;
            let ring_out = (dist * 0.03 + time).sin() * 0.5 + 0.5;

            pixels[(y * width + x) as usize] = PixelLayout::Rgba.pack(
                unit(wave * ring_in),
                unit(wave * 0.5 + ring_out * 0.5),
                unit(ring_out),
                0xff,
            );
        }
    }
}

/// Filled circle over a solid background.
pub fn circle(
    pixels: &mut [u32],
    width: u32,
    height: u32,
    center: (f32, f32),
    radius: f32,
    color: u32,
    background: u32,
) {
    let r2 = radius * radius;
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 + 0.5 - center.0;
            let dy = y as f32 + 0.5 - center.1;
            pixels[(y * width + x) as usize] = if dx * dx + dy * dy <= r2 {
                color
            } else {
                background
            };
        }
    }
}

/// Center of a circle bouncing around the frame, `speed` pixels per second on each axis.
pub fn bounce(width: u32, height: u32, radius: f32, speed: f32, seconds: f32) -> (f32, f32) {
    fn fold(pos: f32, span: f32) -> f32 {
        if span <= 0.0 {
            return 0.0;
        }
        let p = pos.rem_euclid(2.0 * span);
        if p > span { 2.0 * span - p } else { p }
    }
    let x = fold(speed * seconds, width as f32 - 2.0 * radius) + radius;
    let y = fold(speed * 0.7 * seconds, height as f32 - 2.0 * radius) + radius;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_is_opaque_grey() {
        let mut pixels = vec![0u32; 16 * 8];
        wave(&mut pixels, 16, 8, 0.0);
        for pixel in pixels {
            let [r, g, b, a] = pixel.to_be_bytes();
            assert_eq!(a, 0xff);
            assert!(r == g && g == b);
        }
    }

    #[test]
    fn test_spiral_changes_over_time() {
        let mut first = vec![0u32; 32 * 32];
        let mut second = vec![0u32; 32 * 32];
        spiral(&mut first, 32, 32, 0.0);
        spiral(&mut second, 32, 32, 0.5);
        assert_ne!(first, second);
        assert!(first.iter().all(|p| p & 0xff == 0xff));
    }

    #[test]
    fn test_circle() {
        let mut pixels = vec![0u32; 20 * 20];
        circle(&mut pixels, 20, 20, (10.0, 10.0), 4.0, 0xff0000ff, 0x000000ff);
        assert_eq!(pixels[10 * 20 + 10], 0xff0000ff);
        assert_eq!(pixels[0], 0x000000ff);
        assert_eq!(pixels[19 * 20 + 19], 0x000000ff);
    }

    #[test]
    fn test_bounce_stays_inside() {
        for step in 0..500 {
            let (x, y) = bounce(320, 240, 20.0, 150.0, step as f32 * 0.05);
            assert!((20.0..=300.0).contains(&x), "x = {}", x);
            assert!((20.0..=220.0).contains(&y), "y = {}", y);
        }
    }
}
