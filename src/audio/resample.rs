//! Sample-rate conversion and channel mixing.
//!
//! 1. [`stereo_to_mono`] — downmix interleaved `i16` frames during capture.
//! 2. [`Downsampler`] — stateful polyphase resampler from the capture rate to
//!    the serial output rate.
//!
//! ## Filter
//!
//! [`Downsampler`] wraps `rubato::SincFixedIn`: a windowed-sinc filter bank
//! with `oversampling_factor` phases of `sinc_len` taps each. When
//! downsampling, rubato scales `f_cutoff` by the ratio, so the pass band ends
//! just below the Nyquist frequency of the *output* rate and content above it
//! is rejected before decimation.
//!
//! The filter history lives inside the rubato instance and carries over from
//! one [`Downsampler::process`] call to the next, so a stream split into
//! chunks is filtered exactly as if it were one continuous signal.

use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use thiserror::Error;

use crate::config::{Interpolation, ResamplerConfig, Window};

// ---------------------------------------------------------------------------
// ConvertError
// ---------------------------------------------------------------------------

/// Errors from the resampling / quantization stage.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid resampler parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to build resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
}

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel `i16` audio down to mono by averaging.
///
/// The output length is `samples.len() / channels`; a trailing partial frame
/// is dropped.
///
/// * `channels == 1` returns the input as an owned `Vec`.
/// * `channels == 0` returns an empty vector.
///
/// ```rust
/// use mic_to_serial::audio::stereo_to_mono;
///
/// let stereo = vec![1000_i16, -1000, 200, 400]; // L R L R
/// assert_eq!(stereo_to_mono(&stereo, 2), vec![0, 300]);
/// ```
pub fn stereo_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / n as i32) as i16
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// rubato parameter mapping
// ---------------------------------------------------------------------------

impl From<Interpolation> for SincInterpolationType {
    fn from(value: Interpolation) -> Self {
        match value {
            Interpolation::Nearest => SincInterpolationType::Nearest,
            Interpolation::Linear => SincInterpolationType::Linear,
            Interpolation::Quadratic => SincInterpolationType::Quadratic,
            Interpolation::Cubic => SincInterpolationType::Cubic,
        }
    }
}

impl From<Window> for WindowFunction {
    fn from(value: Window) -> Self {
        match value {
            Window::Blackman => WindowFunction::Blackman,
            Window::Blackman2 => WindowFunction::Blackman2,
            Window::BlackmanHarris => WindowFunction::BlackmanHarris,
            Window::BlackmanHarris2 => WindowFunction::BlackmanHarris2,
            Window::Hann => WindowFunction::Hann,
            Window::Hann2 => WindowFunction::Hann2,
        }
    }
}

// ---------------------------------------------------------------------------
// Downsampler
// ---------------------------------------------------------------------------

/// Mono polyphase resampler with persistent filter state.
///
/// Input of any length may be passed to [`process`](Self::process); it is
/// staged internally and filtered in blocks of exactly `chunk_size` frames.
/// When every call supplies one chunk, every call performs one filter pass
/// and returns `round(chunk_size × output_rate / input_rate) ± 1` frames.
///
/// ```rust
/// use mic_to_serial::audio::Downsampler;
/// use mic_to_serial::config::ResamplerConfig;
///
/// let mut ds = Downsampler::new(44_100, 8_000, 1024, &ResamplerConfig::default()).unwrap();
/// let out = ds.process(&vec![0.0_f32; 1024]).unwrap();
/// assert!(out.len().abs_diff(186) <= 1);
/// ```
pub struct Downsampler {
    inner: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    chunk_size: usize,
    params: ResamplerConfig,
    /// Input not yet filtered (always shorter than `chunk_size` between calls).
    pending: Vec<f32>,
}

impl Downsampler {
    /// Build a resampler converting `input_rate` → `output_rate` in blocks of
    /// `chunk_size` input frames.
    ///
    /// # Errors
    ///
    /// [`ConvertError::InvalidParameters`] for zero rates, chunk size or
    /// filter length, [`ConvertError::Construction`] when rubato rejects the
    /// configuration.
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        chunk_size: usize,
        params: &ResamplerConfig,
    ) -> Result<Self, ConvertError> {
        if input_rate == 0 || output_rate == 0 {
            return Err(ConvertError::InvalidParameters(format!(
                "sample rates must be non-zero ({input_rate} → {output_rate})"
            )));
        }
        if chunk_size == 0 {
            return Err(ConvertError::InvalidParameters(
                "chunk size must be non-zero".into(),
            ));
        }
        if params.sinc_len == 0 || params.oversampling_factor == 0 {
            return Err(ConvertError::InvalidParameters(
                "sinc_len and oversampling_factor must be non-zero".into(),
            ));
        }

        let inner = Self::build(input_rate, output_rate, chunk_size, params)?;
        Ok(Self {
            inner,
            input_rate,
            output_rate,
            chunk_size,
            params: params.clone(),
            pending: Vec::with_capacity(chunk_size),
        })
    }

    /// Silence passes needed before a fresh `SincFixedIn` returns full-length
    /// output: its history must cover about one and a half filter lengths.
    fn priming_passes(chunk_size: usize, sinc_len: usize) -> usize {
        (sinc_len + sinc_len / 2 + 1).div_ceil(chunk_size) + 1
    }

    /// Create the rubato instance and run silence through it until its
    /// history is full.
    ///
    /// The first passes of a fresh `SincFixedIn` return less than a full
    /// chunk of output while the history fills; priming absorbs them so
    /// every caller-visible chunk has the steady-state length.
    fn build(
        input_rate: u32,
        output_rate: u32,
        chunk_size: usize,
        params: &ResamplerConfig,
    ) -> Result<SincFixedIn<f32>, ConvertError> {
        let sinc = SincInterpolationParameters {
            sinc_len: params.sinc_len,
            f_cutoff: params.f_cutoff,
            interpolation: params.interpolation.into(),
            oversampling_factor: params.oversampling_factor,
            window: params.window.into(),
        };

        let mut inner = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // fixed ratio
            sinc,
            chunk_size,
            1,
        )?;

        let silence = vec![0.0_f32; chunk_size];
        let passes = Self::priming_passes(chunk_size, params.sinc_len);
        for _ in 0..passes {
            let _ = inner.process(std::slice::from_ref(&silence), None)?;
        }

        log::debug!(
            "resampler ready: {input_rate} Hz → {output_rate} Hz, chunk {chunk_size}, \
             {} taps × {} phases, primed with {passes} passes",
            params.sinc_len,
            params.oversampling_factor
        );
        Ok(inner)
    }

    /// Filter `input` and return every output frame that is now complete.
    ///
    /// Frames left over after the last full chunk stay staged for the next
    /// call.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>, ConvertError> {
        self.pending.extend_from_slice(input);

        let chunks = self.pending.len() / self.chunk_size;
        let mut output = Vec::with_capacity(chunks * self.inner.output_frames_max());

        for i in 0..chunks {
            let start = i * self.chunk_size;
            let block = &self.pending[start..start + self.chunk_size];
            let frames = self.inner.process(std::slice::from_ref(&block), None)?;
            output.extend_from_slice(&frames[0]);
        }

        self.pending.drain(..chunks * self.chunk_size);
        Ok(output)
    }

    /// Discard the filter history and any staged input.
    ///
    /// After a reset the resampler produces exactly the output a freshly
    /// constructed one would.
    pub fn reset(&mut self) -> Result<(), ConvertError> {
        self.inner = Self::build(
            self.input_rate,
            self.output_rate,
            self.chunk_size,
            &self.params,
        )?;
        self.pending.clear();
        Ok(())
    }

    /// `output_rate / input_rate`.
    pub fn ratio(&self) -> f64 {
        self.output_rate as f64 / self.input_rate as f64
    }

    /// Input frames per filter pass.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Input frames staged but not yet filtered.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
