//! Driver loop for mic-to-serial.
//!
//! # Architecture
//!
//! ```text
//!   signal thread ──request_stop()──▶ StopSignal
//!                                         │ checked between iterations
//!                                         ▼
//!   FrameSource ──read──▶ PipelineRunner::run ──write──▶ ByteSink
//!                           │
//!                           └─ PcmConverter (filter history)
//! ```
//!
//! The loop is synchronous and owns nothing but the converter; the caller
//! owns the source and sink and releases them when they go out of scope.

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::PipelineRunner;
pub use state::{PipelineState, RunStats, StopSignal};
