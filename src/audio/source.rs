//! The [`FrameSource`] seam between audio capture and the driver loop.

use thiserror::Error;

/// Why a read produced no chunk.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// The source fell behind and `dropped` samples were lost. The stream
    /// continues; the next read returns fresh audio.
    #[error("input overrun: {dropped} samples dropped")]
    Overrun { dropped: usize },

    /// The source will never deliver more samples (device lost, end of input).
    #[error("audio source closed")]
    Closed,
}

/// A blocking provider of signed 16-bit mono samples at a fixed rate.
///
/// `read` blocks until `chunk_size` samples are available and returns exactly
/// that many. An [`SourceError::Overrun`] is informational; callers keep
/// reading.
pub trait FrameSource {
    fn read(&mut self, chunk_size: usize) -> Result<Vec<i16>, SourceError>;
}

// ---------------------------------------------------------------------------
// MockSource (test only)
// ---------------------------------------------------------------------------

/// Scripted source replaying a fixed sequence of read results, then `Closed`.
#[cfg(test)]
pub struct MockSource {
    script: std::collections::VecDeque<Result<Vec<i16>, SourceError>>,
    /// Chunk sizes requested so far.
    pub requests: Vec<usize>,
}

#[cfg(test)]
impl MockSource {
    pub fn new(script: Vec<Result<Vec<i16>, SourceError>>) -> Self {
        Self {
            script: script.into(),
            requests: Vec::new(),
        }
    }
}

#[cfg(test)]
impl FrameSource for MockSource {
    fn read(&mut self, chunk_size: usize) -> Result<Vec<i16>, SourceError> {
        self.requests.push(chunk_size);
        self.script.pop_front().unwrap_or(Err(SourceError::Closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_replays_then_closes() {
        let mut src = MockSource::new(vec![
            Ok(vec![1, 2]),
            Err(SourceError::Overrun { dropped: 7 }),
        ]);
        assert_eq!(src.read(2), Ok(vec![1, 2]));
        assert_eq!(src.read(2), Err(SourceError::Overrun { dropped: 7 }));
        assert_eq!(src.read(2), Err(SourceError::Closed));
        assert_eq!(src.requests, vec![2, 2, 2]);
    }

    #[test]
    fn frame_source_is_object_safe() {
        let mut src: Box<dyn FrameSource> = Box::new(MockSource::new(vec![]));
        assert_eq!(src.read(16), Err(SourceError::Closed));
    }

    #[test]
    fn overrun_message_mentions_count() {
        let msg = SourceError::Overrun { dropped: 42 }.to_string();
        assert!(msg.contains("42"));
    }
}
