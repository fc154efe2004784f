//! Sample format conversion around the resampler.
//!
//! ```text
//! i16 ──normalize_i16──▶ f32 [-1, 1) ──(resample)──▶ apply_volume ──▶ clip ──▶ quantize ──▶ u8
//! ```
//!
//! The 8-bit mapping is `x = (v + 1) × 127.5`, rounded to the nearest integer
//! with exact halves rounded **down**, then saturated to `[0, 255]`:
//!
//! | v     | x      | byte |
//! |-------|--------|------|
//! | -1.0  | 0.0    | 0    |
//! | 0.0   | 127.5  | 127  |
//! | 0.5   | 191.25 | 191  |
//! | 1.0   | 255.0  | 255  |
//!
//! Plain truncation of `x` would give a byte one lower for about half of all
//! inputs (-0.5 → 63 instead of 64); rounding keeps silence at 127 and full
//! scale at 255.

/// Full-scale divisor for signed 16-bit PCM.
pub const I16_SCALE: f32 = 32_768.0;

/// Half the width of the unsigned 8-bit range.
const U8_HALF_RANGE: f32 = 127.5;

/// Convert signed 16-bit samples to `f32` by dividing by 32 768.
///
/// ```rust
/// use mic_to_serial::audio::quantize::normalize_i16;
///
/// assert_eq!(normalize_i16(&[-32768, 0, 16384]), vec![-1.0, 0.0, 0.5]);
/// ```
pub fn normalize_i16(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / I16_SCALE).collect()
}

/// Multiply every sample by `volume` in place.
pub fn apply_volume(samples: &mut [f32], volume: f32) {
    for s in samples.iter_mut() {
        *s *= volume;
    }
}

/// Clamp every sample to `[-1.0, 1.0]` in place.
pub fn clip(samples: &mut [f32]) {
    for s in samples.iter_mut() {
        *s = s.clamp(-1.0, 1.0);
    }
}

/// Map one sample in `[-1.0, 1.0]` to an unsigned byte.
///
/// Out-of-range input saturates; NaN maps to 0.
///
/// ```rust
/// use mic_to_serial::audio::quantize::to_u8;
///
/// assert_eq!(to_u8(-1.0), 0);
/// assert_eq!(to_u8(0.0), 127);
/// assert_eq!(to_u8(1.0), 255);
/// ```
pub fn to_u8(sample: f32) -> u8 {
    let x = (sample + 1.0) * U8_HALF_RANGE;
    // round-half-down
    let rounded = (x - 0.5).ceil();
    // `as` saturates; NaN becomes 0
    rounded.clamp(0.0, 255.0) as u8
}

/// Map a clipped block of samples to unsigned bytes.
pub fn quantize(samples: &[f32]) -> Vec<u8> {
    samples.iter().map(|&s| to_u8(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_extremes() {
        let out = normalize_i16(&[i16::MIN, i16::MAX, 0]);
        assert_eq!(out[0], -1.0);
        assert!(out[1] < 1.0 && out[1] > 0.9999);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn normalize_preserves_length() {
        assert_eq!(normalize_i16(&[1; 1024]).len(), 1024);
        assert!(normalize_i16(&[]).is_empty());
    }

    #[test]
    fn volume_is_a_pure_multiplier() {
        let mut s = vec![0.25_f32, -0.5, 0.0];
        apply_volume(&mut s, 4.0);
        assert_eq!(s, vec![1.0, -2.0, 0.0]);
    }

    #[test]
    fn larger_volume_never_shrinks_magnitude() {
        let base: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin() * 0.8).collect();
        let volumes = [0.0_f32, 0.5, 1.0, 1.5, 4.0, 10.0];

        for pair in volumes.windows(2) {
            let mut lo = base.clone();
            let mut hi = base.clone();
            apply_volume(&mut lo, pair[0]);
            apply_volume(&mut hi, pair[1]);
            for (a, b) in lo.iter().zip(&hi) {
                assert!(b.abs() >= a.abs(), "{} < {} at volume {:?}", b, a, pair);
            }
        }
    }

    #[test]
    fn clip_bounds_samples() {
        let mut s = vec![-3.0_f32, -1.0, 0.3, 1.0, 7.5];
        clip(&mut s);
        assert_eq!(s, vec![-1.0, -1.0, 0.3, 1.0, 1.0]);
    }

    #[test]
    fn to_u8_reference_points() {
        assert_eq!(to_u8(-1.0), 0);
        assert_eq!(to_u8(0.0), 127);
        assert_eq!(to_u8(0.5), 191);
        assert_eq!(to_u8(-0.5), 64); // 63.75 → 64
        assert_eq!(to_u8(-0.5 - 1.0 / 255.0), 63); // 63.25 → 63
        assert_eq!(to_u8(1.0), 255);
    }

    #[test]
    fn to_u8_midpoint_rounds_down() {
        // 0.0 is the only input landing exactly on a half step
        assert_eq!(to_u8(0.0), 127);
        assert_eq!(to_u8(0.001), 128);
        assert_eq!(to_u8(-0.001), 127);
    }

    #[test]
    fn to_u8_near_full_scale_is_255() {
        let v = i16::MAX as f32 / I16_SCALE;
        assert_eq!(to_u8(v), 255);
    }

    #[test]
    fn to_u8_saturates_out_of_range() {
        assert_eq!(to_u8(-5.0), 0);
        assert_eq!(to_u8(5.0), 255);
        assert_eq!(to_u8(f32::INFINITY), 255);
        assert_eq!(to_u8(f32::NEG_INFINITY), 0);
        assert_eq!(to_u8(f32::NAN), 0);
    }

    #[test]
    fn heavy_gain_saturates_to_rails() {
        let mut s = vec![-0.9_f32, -0.1, 0.1, 0.9];
        apply_volume(&mut s, 50.0);
        clip(&mut s);
        assert_eq!(quantize(&s), vec![0, 0, 255, 255]);
    }

    #[test]
    fn quantize_is_monotonic() {
        let s: Vec<f32> = (0..=200).map(|i| i as f32 / 100.0 - 1.0).collect();
        let bytes = quantize(&s);
        assert!(bytes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(bytes[0], 0);
        assert_eq!(*bytes.last().unwrap(), 255);
    }
}
