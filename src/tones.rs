//! Sample generators for the demo audio callbacks.

use std::f32::consts::PI;

/// Square wave at `frequency` Hz.
pub fn square(seconds: f32, frequency: f32, amplitude: f32) -> i16 {
    if (seconds * frequency * 2.0) % 2.0 < 1.0 {
        amplitude as i16
    } else {
        -amplitude as i16
    }
}

/// Sine tone during the first half of every second, silence otherwise.
pub fn beep(seconds: f32, frequency: f32, amplitude: f32) -> i16 {
    if seconds % 1.0 < 0.5 {
        (amplitude * (2.0 * PI * frequency * seconds).sin()) as i16
    } else {
        0
    }
}

/// Raised-cosine attack/release envelope over `[0, total]`.
pub fn smooth_envelope(t: f32, attack: f32, release: f32, total: f32) -> f32 {
    if !(0.0..=total).contains(&t) {
        return 0.0;
    }
    if t < attack {
        return (1.0 - (PI * t / attack).cos()) * 0.5;
    }
    if t > total - release {
        let release_t = (total - t) / release;
        return (1.0 - (PI * release_t).cos()) * 0.5;
    }
    1.0
}

/// Short click-free beep at the start of every second.
pub fn enveloped_beep(seconds: f32, frequency: f32, amplitude: f32) -> i16 {
    const BEEP: f32 = 0.1;
    const ATTACK: f32 = 0.002;
    const RELEASE: f32 = 0.01;
    let t = seconds % 1.0;
    if t >= BEEP {
        return 0;
    }
    let env = smooth_envelope(t, ATTACK, RELEASE, BEEP);
    (amplitude * env * (2.0 * PI * frequency * seconds).sin()) as i16
}
