//! Byte sinks — where the 8-bit stream goes.
//!
//! [`ByteSink`] is the seam the driver loop writes to. Two implementations:
//!
//! * [`SerialSink`] — a serial port opened with `serialport`.
//! * [`WriterSink`] — any `std::io::Write` (stdout, a file, a `Vec<u8>`).
//!
//! [`open_sink`] picks one from [`SerialConfig`]: the port name `"-"` selects
//! stdout, anything else is opened as a serial device.

pub mod serial;

use std::io::Write;

use thiserror::Error;

use crate::config::SerialConfig;

pub use serial::SerialSink;

// ---------------------------------------------------------------------------
// SinkError
// ---------------------------------------------------------------------------

/// Errors from opening or writing to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot open serial port '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// ByteSink trait
// ---------------------------------------------------------------------------

/// A blocking consumer of raw bytes.
///
/// `write` returns once every byte has been accepted; it may block while the
/// link applies backpressure.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError>;
}

// Compile-time assertion: Box<dyn ByteSink> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ByteSink>) {}
};

// ---------------------------------------------------------------------------
// WriterSink
// ---------------------------------------------------------------------------

/// [`ByteSink`] over any `std::io::Write`.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ByteSink for WriterSink<W> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Open the sink described by `config`.
///
/// # Errors
///
/// [`SinkError::Open`] when the serial port cannot be opened.
pub fn open_sink(config: &SerialConfig) -> Result<Box<dyn ByteSink>, SinkError> {
    if config.is_stdout() {
        log::info!("streaming to stdout");
        return Ok(Box::new(WriterSink::new(std::io::stdout())));
    }
    Ok(Box::new(SerialSink::open(config)?))
}

// ---------------------------------------------------------------------------
// MockSink (test only)
// ---------------------------------------------------------------------------

/// Records every write; optionally fails the writes whose index is listed.
#[cfg(test)]
#[derive(Default)]
pub struct MockSink {
    pub writes: Vec<Vec<u8>>,
    pub fail_on: Vec<usize>,
    attempts: usize,
}

#[cfg(test)]
impl MockSink {
    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        Self {
            fail_on,
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl ByteSink for MockSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_on.contains(&attempt) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "mock timeout",
            )));
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
