//! Audio pipeline — microphone capture → resampling → 8-bit quantization.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → i16 → stereo_to_mono → CaptureShared (ring)
//!           → CpalSource::read (chunk) → PcmConverter::convert → Vec<u8>
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mic_to_serial::audio::{AudioCapture, FrameSource, PcmConverter};
//! use mic_to_serial::config::StreamerConfig;
//!
//! let config = StreamerConfig::default();
//! let mut source = AudioCapture::new(config.audio.device.as_deref(), config.audio.input_rate)
//!     .unwrap()
//!     .start(config.audio.chunk_size * config.audio.buffer_chunks)
//!     .unwrap();
//! let mut converter = PcmConverter::new(&config.audio, &config.resampler).unwrap();
//!
//! if let Ok(chunk) = source.read(config.audio.chunk_size) {
//!     let bytes = converter.convert(&chunk).unwrap();
//!     println!("{} bytes @ {} Hz", bytes.len(), config.audio.output_rate);
//! }
//! ```

pub mod buffer;
pub mod capture;
pub mod convert;
pub mod quantize;
pub mod resample;
pub mod source;

pub use buffer::RingBuffer;
pub use capture::{AudioCapture, CaptureError, CaptureShared, CpalSource};
pub use convert::PcmConverter;
pub use resample::{stereo_to_mono, ConvertError, Downsampler};
pub use source::{FrameSource, SourceError};

#[cfg(test)]
pub use source::MockSource;
