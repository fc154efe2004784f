//! Serial-port sink built on `serialport`.

use std::io::Write;
use std::time::Duration;

use crate::config::SerialConfig;

use super::{ByteSink, SinkError};

/// An open serial port receiving the 8-bit stream.
///
/// Closing happens on drop.
pub struct SerialSink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialSink {
    /// Open `config.port` at `config.baud_rate`, then wait `config.settle_ms`.
    ///
    /// # Errors
    ///
    /// [`SinkError::Open`] when the device is missing, busy, or rejects the
    /// baud rate.
    pub fn open(config: &SerialConfig) -> Result<Self, SinkError> {
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(Duration::from_millis(config.write_timeout_ms))
            .open()
            .map_err(|source| SinkError::Open {
                port: config.port.clone(),
                source,
            })?;

        log::info!("opened serial port {} at {} baud", config.port, config.baud_rate);

        if config.settle_ms > 0 {
            log::debug!("waiting {} ms for the receiver to settle", config.settle_ms);
            std::thread::sleep(Duration::from_millis(config.settle_ms));
        }

        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }
}

impl ByteSink for SerialSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.port.write_all(bytes)?;
        Ok(())
    }
}

impl Drop for SerialSink {
    fn drop(&mut self) {
        log::info!("closing serial port {}", self.name);
    }
}
