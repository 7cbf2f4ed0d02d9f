//! Waveform helpers for the engine simulation
//!
//! `core` has no transcendental functions, so these are small
//! approximations. Accuracy is far below what the wire quantization can
//! show.

use core::f32::consts::{LN_2, PI, TAU};

/// Floor for values within `i32` range
fn floor(x: f32) -> f32 {
    let truncated = x as i32 as f32;
    if truncated > x {
        truncated - 1.0
    } else {
        truncated
    }
}

/// Sine, absolute error below 0.002
///
/// Bhaskara I's rational approximation over `[0, π]`, extended by
/// symmetry.
pub fn sin(x: f32) -> f32 {
    let mut r = x - floor(x / TAU) * TAU;
    let mut sign = 1.0;
    if r > PI {
        r -= PI;
        sign = -1.0;
    }
    let p = r * (PI - r);
    sign * 16.0 * p / (5.0 * PI * PI - 4.0 * p)
}

/// Natural exponential, relative error below 1e-5 for |x| < 80
pub fn exp(x: f32) -> f32 {
    if x.is_nan() {
        return x;
    }
    // exp(x) = 2^n * exp(r), |r| <= ln2 / 2
    let n = floor(x / LN_2 + 0.5);
    if n < -126.0 {
        return 0.0;
    }
    if n > 127.0 {
        return f32::INFINITY;
    }
    let r = x - n * LN_2;
    let series = 1.0 + r * (1.0 + r * (0.5 + r * (1.0 / 6.0 + r * (1.0 / 24.0 + r / 120.0))));
    let scale = f32::from_bits(((n as i32 + 127) as u32) << 23);
    series * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sin_against_std() {
        let mut x = -20.0f32;
        while x < 20.0 {
            assert!((sin(x) - x.sin()).abs() < 0.002, "sin({})", x);
            x += 0.037;
        }
    }

    #[test]
    fn test_sin_landmarks() {
        assert!(sin(0.0).abs() < 1e-6);
        assert!((sin(PI / 2.0) - 1.0).abs() < 1e-6);
        assert!((sin(-PI / 2.0) + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_exp_against_std() {
        for x in [-10.0f32, -3.0, -1.0, -0.5, 0.0, 0.25, 1.0, 5.0] {
            let expected = x.exp();
            assert!(((exp(x) - expected) / expected).abs() < 1e-5, "exp({})", x);
        }
        assert_eq!(exp(-200.0), 0.0);
    }
}
