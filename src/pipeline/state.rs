//! Driver-loop lifecycle, stop signal and counters.
//!
//! [`PipelineState`] tracks where the loop is in its lifecycle.
//! [`StopSignal`] is the cooperative cancellation flag raised from the signal
//! thread. [`RunStats`] counts what happened and is logged at shutdown.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// Lifecycle of the driver loop.
///
/// ```text
/// Idle ──run()──▶ Streaming ──stop signal──▶ Stopping ──▶ Stopped
///                     └──────source closed──────────────▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, not yet running.
    Idle,
    /// Reading, converting and writing chunks.
    Streaming,
    /// Stop requested; the current iteration is finishing.
    Stopping,
    /// Loop has exited.
    Stopped,
}

impl PipelineState {
    /// Returns `true` while the loop is running.
    ///
    /// ```
    /// use mic_to_serial::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_active());
    /// assert!(PipelineState::Streaming.is_active());
    /// assert!(PipelineState::Stopping.is_active());
    /// assert!(!PipelineState::Stopped.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, PipelineState::Streaming | PipelineState::Stopping)
    }

    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Streaming => "Streaming",
            PipelineState::Stopping => "Stopping",
            PipelineState::Stopped => "Stopped",
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        PipelineState::Idle
    }
}

// ---------------------------------------------------------------------------
// StopSignal
// ---------------------------------------------------------------------------

/// Cloneable cooperative stop flag.
///
/// Raising it never interrupts a blocking read or write; the loop checks it
/// between iterations.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Counters for one run of the driver loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub chunks_read: u64,
    pub chunks_written: u64,
    pub bytes_written: u64,
    pub overruns: u64,
    /// Input samples the source reported as lost.
    pub samples_dropped: u64,
    pub convert_errors: u64,
    pub sink_errors: u64,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chunks read, {} written ({} bytes), {} overruns ({} samples dropped), \
             {} conversion errors, {} sink errors",
            self.chunks_read,
            self.chunks_written,
            self.bytes_written,
            self.overruns,
            self.samples_dropped,
            self.convert_errors,
            self.sink_errors
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
