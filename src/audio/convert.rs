//! Full i16 → u8 conversion for one chunk.
//!
//! [`PcmConverter`] owns the [`Downsampler`] (the only state carried between
//! chunks) and the volume setting, and runs each chunk through normalize →
//! resample → volume → clip → quantize.

use crate::config::{AudioConfig, ResamplerConfig};

use super::quantize::{apply_volume, clip, normalize_i16, quantize};
use super::resample::{ConvertError, Downsampler};

/// Resampler/quantizer for the serial stream.
///
/// ```rust
/// use mic_to_serial::audio::PcmConverter;
/// use mic_to_serial::config::{AudioConfig, ResamplerConfig};
///
/// let mut conv = PcmConverter::new(&AudioConfig::default(), &ResamplerConfig::default()).unwrap();
/// let bytes = conv.convert(&[0_i16; 1024]).unwrap();
/// assert!(bytes.iter().all(|&b| b == 127));
/// ```
pub struct PcmConverter {
    resampler: Downsampler,
    volume: f32,
}

impl PcmConverter {
    /// Build a converter for `audio.input_rate → audio.output_rate` with
    /// `audio.chunk_size` frames per filter pass.
    pub fn new(audio: &AudioConfig, filter: &ResamplerConfig) -> Result<Self, ConvertError> {
        let resampler =
            Downsampler::new(audio.input_rate, audio.output_rate, audio.chunk_size, filter)?;
        Ok(Self {
            resampler,
            volume: audio.volume,
        })
    }

    /// Resample and scale `samples` without quantizing.
    ///
    /// Returned values are the pre-clip floats: `resampled × volume`.
    pub fn resample_scaled(&mut self, samples: &[i16]) -> Result<Vec<f32>, ConvertError> {
        let normalized = normalize_i16(samples);
        let mut resampled = self.resampler.process(&normalized)?;
        apply_volume(&mut resampled, self.volume);
        Ok(resampled)
    }

    /// Convert one chunk of signed 16-bit input into unsigned 8-bit output.
    pub fn convert(&mut self, samples: &[i16]) -> Result<Vec<u8>, ConvertError> {
        let mut scaled = self.resample_scaled(samples)?;
        clip(&mut scaled);
        Ok(quantize(&scaled))
    }

    /// Clear the filter history.
    pub fn reset(&mut self) -> Result<(), ConvertError> {
        self.resampler.reset()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn resampler(&self) -> &Downsampler {
        &self.resampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(volume: f32) -> AudioConfig {
        AudioConfig {
            volume,
            ..AudioConfig::default()
        }
    }

    fn converter(volume: f32) -> PcmConverter {
        PcmConverter::new(&audio(volume), &ResamplerConfig::default()).expect("valid config")
    }

    /// Feed `chunks` copies of `input` and return every output chunk.
    fn run(conv: &mut PcmConverter, input: &[i16], chunks: usize) -> Vec<Vec<u8>> {
        (0..chunks)
            .map(|_| conv.convert(input).expect("convert"))
            .collect()
    }

    #[test]
    fn output_length_matches_rate_ratio() {
        let mut conv = converter(4.0);
        let input: Vec<i16> = (0..1024).map(|i| ((i * 37) % 2000) as i16 - 1000).collect();
        for out in run(&mut conv, &input, 10) {
            assert!(out.len().abs_diff(186) <= 1, "got {}", out.len());
        }
    }

    #[test]
    fn small_chunks_keep_the_rate_ratio() {
        let audio = AudioConfig {
            chunk_size: 100,
            ..AudioConfig::default()
        };
        let expected = audio.output_chunk_len();
        let mut conv = PcmConverter::new(&audio, &ResamplerConfig::default()).expect("valid");
        for out in run(&mut conv, &[1000; 100], 8) {
            assert!(out.len().abs_diff(expected) <= 1, "got {}", out.len());
        }
    }

    #[test]
    fn silence_quantizes_to_midpoint() {
        let mut conv = converter(4.0);
        for out in run(&mut conv, &[0; 1024], 3) {
            assert!(out.iter().all(|&b| b == 127));
        }
    }

    #[test]
    fn full_scale_with_unity_or_more_gain_is_255() {
        for volume in [1.0_f32, 2.0, 4.0] {
            let mut conv = converter(volume);
            let chunks = run(&mut conv, &[i16::MAX; 1024], 4);
            let settled = chunks.last().expect("chunks");
            assert!(
                settled.iter().all(|&b| b == 255),
                "volume {volume}: {:?}",
                &settled[..8]
            );
        }
    }

    #[test]
    fn half_scale_at_unity_gain_lands_near_191() {
        let mut conv = converter(1.0);
        let chunks = run(&mut conv, &[16_384; 1024], 4);

        for out in &chunks {
            assert!(out.len().abs_diff(186) <= 1);
        }
        let settled = chunks.last().expect("chunks");
        for &b in settled {
            assert!(b.abs_diff(191) <= 1, "byte {b} too far from 191");
        }
    }

    #[test]
    fn heavy_gain_on_noise_stays_finite() {
        // deterministic LCG noise at full scale, heavy gain
        let mut state: u32 = 0x2545_F491;
        let mut conv = converter(10.0);
        for _ in 0..8 {
            let input: Vec<i16> = (0..1024)
                .map(|_| {
                    state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    (state >> 16) as i16
                })
                .collect();
            let scaled = conv.resample_scaled(&input).expect("resample");
            assert!(scaled.iter().all(|v| v.is_finite()));
        }
        let out = conv.convert(&[i16::MIN; 1024]).expect("convert");
        assert!(!out.is_empty());
    }

    #[test]
    fn larger_volume_never_shrinks_pre_clip_values() {
        let input: Vec<i16> = (0..1024)
            .map(|i| ((i as f32 * 0.05).sin() * 12_000.0) as i16)
            .collect();

        let mut quiet = converter(1.0);
        let mut loud = converter(3.0);
        for _ in 0..3 {
            let a = quiet.resample_scaled(&input).expect("resample");
            let b = loud.resample_scaled(&input).expect("resample");
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(&b) {
                assert!(y.abs() >= x.abs());
            }
        }
    }

    #[test]
    fn identical_runs_produce_identical_bytes() {
        let input: Vec<i16> = (0..1024).map(|i| (i as i16).wrapping_mul(97)).collect();

        let mut first = converter(4.0);
        let mut second = converter(4.0);
        assert_eq!(run(&mut first, &input, 5), run(&mut second, &input, 5));
    }

    #[test]
    fn reset_restarts_the_byte_stream() {
        let input: Vec<i16> = (0..1024).map(|i| ((i % 64) as i16 - 32) * 500).collect();

        let mut conv = converter(2.0);
        let before = run(&mut conv, &input, 3);
        conv.reset().expect("reset");
        let after = run(&mut conv, &input, 3);
        assert_eq!(before, after);
    }

    #[test]
    fn reports_volume() {
        assert_eq!(converter(2.5).volume(), 2.5);
        assert_eq!(converter(1.0).resampler().chunk_size(), 1024);
    }
}
