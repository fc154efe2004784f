//! Streamer settings structs, defaults, validation and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every table carries `#[serde(default)]` so a settings file only needs the
//! keys it wants to change.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A setting that cannot drive the pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("audio.{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("audio.channels must be 1 (got {0})")]
    Channels(u16),

    #[error("audio.volume must be a finite, non-negative number (got {0})")]
    Volume(f32),

    #[error("resampler.f_cutoff must be in (0, 1] (got {0})")]
    Cutoff(f32),

    #[error("resampler.{field} must be greater than zero")]
    ZeroFilter { field: &'static str },

    #[error("serial.port is empty — set it in settings.toml or pass --port")]
    NoPort,

    #[error("serial.baud_rate must be greater than zero")]
    Baud,
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Capture and conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; `None` means the system default.
    pub device: Option<String>,
    /// Rate the microphone is opened at, in Hz.
    pub input_rate: u32,
    /// Rate of the 8-bit stream sent to the sink, in Hz.
    pub output_rate: u32,
    /// Input frames per loop iteration.
    pub chunk_size: usize,
    /// Channel count of the stream delivered to the converter. Only mono is
    /// supported; multi-channel devices are downmixed during capture.
    pub channels: u16,
    /// Linear gain applied after resampling, before clipping.
    pub volume: f32,
    /// Capacity of the capture ring buffer, in chunks.
    pub buffer_chunks: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            input_rate: 44_100,
            output_rate: 8_000,
            chunk_size: 1024,
            channels: 1,
            volume: 4.0,
            buffer_chunks: 8,
        }
    }
}

impl AudioConfig {
    /// Expected output samples for one full input chunk, rounded.
    pub fn output_chunk_len(&self) -> usize {
        (self.chunk_size as f64 * self.output_rate as f64 / self.input_rate as f64).round()
            as usize
    }
}

// ---------------------------------------------------------------------------
// ResamplerConfig
// ---------------------------------------------------------------------------

/// Interpolation between the oversampled sinc phases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    Linear,
    Quadratic,
    Cubic,
}

impl Default for Interpolation {
    fn default() -> Self {
        Self::Linear
    }
}

/// Window applied to the sinc kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Window {
    Blackman,
    Blackman2,
    BlackmanHarris,
    BlackmanHarris2,
    Hann,
    Hann2,
}

impl Default for Window {
    fn default() -> Self {
        Self::BlackmanHarris2
    }
}

/// Polyphase filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerConfig {
    /// Taps per polyphase branch.
    pub sinc_len: usize,
    /// Cutoff relative to the Nyquist frequency of the lower rate.
    pub f_cutoff: f32,
    /// Number of phases in the precomputed filter bank.
    pub oversampling_factor: usize,
    pub interpolation: Interpolation,
    pub window: Window,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            sinc_len: 256,
            f_cutoff: 0.95,
            oversampling_factor: 256,
            interpolation: Interpolation::default(),
            window: Window::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SerialConfig
// ---------------------------------------------------------------------------

/// Byte sink connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device (`/dev/ttyUSB0`, `COM3`, …) or `"-"` for stdout.
    pub port: String,
    pub baud_rate: u32,
    /// Pause after opening the port. Many boards reset when the port opens
    /// and drop anything sent before their bootloader hands over.
    pub settle_ms: u64,
    /// Per-write timeout on the serial port.
    pub write_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 1_000_000,
            settle_ms: 2_000,
            write_timeout_ms: 1_000,
        }
    }
}

impl SerialConfig {
    /// `true` when the stream goes to stdout instead of a serial device.
    pub fn is_stdout(&self) -> bool {
        self.port == "-"
    }
}

// ---------------------------------------------------------------------------
// StreamerConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use mic_to_serial::config::StreamerConfig;
///
/// let mut config = StreamerConfig::load().unwrap();
/// config.serial.port = "/dev/ttyUSB0".into();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    pub audio: AudioConfig,
    pub resampler: ResamplerConfig,
    pub serial: SerialConfig,
}

impl StreamerConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(StreamerConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Effective configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field the pipeline depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;
        if audio.input_rate == 0 {
            return Err(ConfigError::Zero { field: "input_rate" });
        }
        if audio.output_rate == 0 {
            return Err(ConfigError::Zero { field: "output_rate" });
        }
        if audio.chunk_size == 0 {
            return Err(ConfigError::Zero { field: "chunk_size" });
        }
        if audio.buffer_chunks == 0 {
            return Err(ConfigError::Zero { field: "buffer_chunks" });
        }
        if audio.channels != 1 {
            return Err(ConfigError::Channels(audio.channels));
        }
        if !audio.volume.is_finite() || audio.volume < 0.0 {
            return Err(ConfigError::Volume(audio.volume));
        }

        let rs = &self.resampler;
        if !(rs.f_cutoff > 0.0 && rs.f_cutoff <= 1.0) {
            return Err(ConfigError::Cutoff(rs.f_cutoff));
        }
        if rs.sinc_len == 0 {
            return Err(ConfigError::ZeroFilter { field: "sinc_len" });
        }
        if rs.oversampling_factor == 0 {
            return Err(ConfigError::ZeroFilter {
                field: "oversampling_factor",
            });
        }

        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::NoPort);
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Baud);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
