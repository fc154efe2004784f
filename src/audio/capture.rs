//! Microphone capture via `cpal`, exposed as a blocking [`FrameSource`].
//!
//! [`AudioCapture`] picks an input device (the host default, or one named in
//! the config) and a stream configuration at the requested rate. [`AudioCapture::start`] opens the
//! stream and returns a [`CpalSource`]; dropping it stops the hardware stream.
//!
//! The cpal callback runs on its own audio thread. It converts whatever
//! sample format the device delivers to `i16`, downmixes to mono and pushes
//! into a [`CaptureShared`] ring. [`CpalSource::read`] blocks on a condvar
//! until a full chunk is buffered.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use thiserror::Error;

use super::buffer::RingBuffer;
use super::resample::stereo_to_mono;
use super::source::{FrameSource, SourceError};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("no input device named '{0}'")]
    DeviceNotFound(String),

    #[error("failed to list input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query supported input configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("input device does not support {rate} Hz in a usable sample format")]
    UnsupportedRate { rate: u32 },

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// CaptureShared
// ---------------------------------------------------------------------------

struct CaptureState {
    ring: RingBuffer<i16>,
    /// Samples overwritten since the last read reported them.
    dropped: usize,
    closed: bool,
}

/// Ring buffer shared between the audio callback (producer) and the driver
/// loop (consumer).
#[derive(Clone)]
pub struct CaptureShared {
    inner: Arc<(Mutex<CaptureState>, Condvar)>,
}

impl CaptureShared {
    /// Create a buffer holding at most `capacity` mono samples.
    pub fn new(capacity: usize) -> Self {
        let state = CaptureState {
            ring: RingBuffer::new(capacity),
            dropped: 0,
            closed: false,
        };
        Self {
            inner: Arc::new((Mutex::new(state), Condvar::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CaptureState> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Downmix interleaved `samples` and append them, counting any overwrite.
    pub fn push(&self, samples: &[i16], channels: u16) {
        let mono = stereo_to_mono(samples, channels);
        {
            let mut state = self.lock();
            let lost = state.ring.push_slice(&mono);
            state.dropped += lost;
        }
        self.inner.1.notify_one();
    }

    /// Mark the stream finished and wake the reader.
    pub fn close(&self) {
        self.lock().closed = true;
        self.inner.1.notify_all();
    }

    /// Block until `chunk_size` samples are buffered and take them.
    ///
    /// A pending overrun is reported before any data: the samples that
    /// survived stay buffered for the following read. Requests larger than
    /// the ring are capped at its capacity.
    pub fn read(&self, chunk_size: usize) -> Result<Vec<i16>, SourceError> {
        let mut state = self.lock();
        let wanted = chunk_size.min(state.ring.capacity());
        loop {
            if state.dropped > 0 {
                let dropped = std::mem::take(&mut state.dropped);
                return Err(SourceError::Overrun { dropped });
            }
            if state.ring.len() >= wanted {
                return Ok(state.ring.pop_front(wanted));
            }
            if state.closed {
                return Err(SourceError::Closed);
            }
            state = self
                .inner
                .1
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Samples currently buffered.
    pub fn buffered(&self) -> usize {
        self.lock().ring.len()
    }
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Input device opened at a fixed sample rate.
pub struct AudioCapture {
    device: cpal::Device,
    device_name: String,
    config: cpal::StreamConfig,
    sample_format: SampleFormat,
}

impl AudioCapture {
    /// Select an input device and a configuration running at `sample_rate` Hz.
    ///
    /// `device` picks an input by name (case-insensitive); `None` uses the
    /// host default.
    ///
    /// Among the supported configurations covering the rate, the one with the
    /// fewest channels wins; ties go to `i16`, then `f32`.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] when there is no default input device,
    /// [`CaptureError::DeviceNotFound`] when no input matches `device`,
    /// [`CaptureError::UnsupportedRate`] when no supported configuration
    /// covers `sample_rate` with a convertible sample format.
    pub fn new(device: Option<&str>, sample_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match device {
            Some(wanted) => find_input_device(&host, wanted)?,
            None => host
                .default_input_device()
                .ok_or(CaptureError::NoDevice)?,
        };
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".into());

        let rate = cpal::SampleRate(sample_rate);
        let supported = device
            .supported_input_configs()?
            .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
            .filter_map(|range| format_rank(range.sample_format()).map(|rank| (range, rank)))
            .min_by_key(|(range, rank)| (range.channels(), *rank))
            .map(|(range, _)| range.with_sample_rate(rate))
            .ok_or(CaptureError::UnsupportedRate { rate: sample_rate })?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        log::info!(
            "input device '{device_name}': {} Hz, {} ch, {:?}",
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(Self {
            device,
            device_name,
            config,
            sample_format,
        })
    }

    /// Open the stream and return a source buffering up to `capacity` mono
    /// samples.
    pub fn start(self, capacity: usize) -> Result<CpalSource, CaptureError> {
        let shared = CaptureShared::new(capacity);

        let stream = match self.sample_format {
            SampleFormat::I16 => self.build::<i16>(shared.clone())?,
            SampleFormat::U16 => self.build::<u16>(shared.clone())?,
            SampleFormat::I32 => self.build::<i32>(shared.clone())?,
            SampleFormat::F32 => self.build::<f32>(shared.clone())?,
            _ => {
                return Err(CaptureError::UnsupportedRate {
                    rate: self.config.sample_rate.0,
                })
            }
        };
        stream.play()?;

        Ok(CpalSource {
            _stream: stream,
            shared,
            device_name: self.device_name,
        })
    }

    fn build<T>(&self, shared: CaptureShared) -> Result<cpal::Stream, CaptureError>
    where
        T: SizedSample,
        i16: FromSample<T>,
    {
        let channels = self.config.channels;
        let on_error = shared.clone();

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data.iter().map(|&s| i16::from_sample(s)).collect();
                shared.push(&samples, channels);
            },
            move |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
                if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                    on_error.close();
                }
            },
            None, // no timeout
        )?;
        Ok(stream)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Channels delivered by the device before downmixing.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}

/// First input device on `host` whose name matches `wanted`.
fn find_input_device(host: &cpal::Host, wanted: &str) -> Result<cpal::Device, CaptureError> {
    let mut seen = Vec::new();
    for device in host.input_devices()? {
        let Ok(name) = device.name() else { continue };
        if device_name_matches(&name, wanted) {
            return Ok(device);
        }
        seen.push(name);
    }
    log::warn!("available input devices: {}", seen.join(", "));
    Err(CaptureError::DeviceNotFound(wanted.to_owned()))
}

fn device_name_matches(name: &str, wanted: &str) -> bool {
    name.trim().eq_ignore_ascii_case(wanted.trim())
}

/// Preference order for device sample formats; `None` if unsupported.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::I32 => Some(2),
        SampleFormat::U16 => Some(3),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CpalSource
// ---------------------------------------------------------------------------

/// Running capture stream. Dropping it stops the hardware stream.
pub struct CpalSource {
    _stream: cpal::Stream,
    shared: CaptureShared,
    device_name: String,
}

impl FrameSource for CpalSource {
    fn read(&mut self, chunk_size: usize) -> Result<Vec<i16>, SourceError> {
        self.shared.read(chunk_size)
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        log::info!(
            "releasing input device '{}' ({} samples unread)",
            self.device_name,
            self.shared.buffered()
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
