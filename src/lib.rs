//! mic-to-serial — stream microphone audio as 8-bit PCM over a serial link.
//!
//! # Pipeline
//!
//! ```text
//! FrameSource (cpal) ─ i16 chunk ─▶ PcmConverter ─ u8 chunk ─▶ ByteSink (serial)
//!                                    │
//!                                    ├─ normalize  (÷ 32768)
//!                                    ├─ Downsampler (rubato polyphase sinc)
//!                                    ├─ volume + clip
//!                                    └─ to_u8      (round-half-down, saturate)
//! ```
//!
//! [`pipeline::PipelineRunner`] drives the loop on the calling thread until
//! its [`pipeline::StopSignal`] is raised or the source closes.

pub mod audio;
pub mod config;
pub mod pipeline;
pub mod sink;
