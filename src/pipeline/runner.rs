//! Driver loop — pulls chunks from the source, converts, writes to the sink.
//!
//! ```text
//! loop until StopSignal
//!   source.read(chunk_size)
//!     ├─ Ok(samples)          → converter.convert → sink.write
//!     │                            ├─ Ok   → count
//!     │                            └─ Err  → warn, count, next chunk
//!     ├─ Err(Overrun{..})     → warn, count, next chunk
//!     └─ Err(Closed)          → exit
//! ```
//!
//! Everything runs on the calling thread. The only state carried between
//! iterations is the converter's filter history and the counters.

use crate::audio::{FrameSource, PcmConverter, SourceError};
use crate::sink::ByteSink;

use super::state::{PipelineState, RunStats, StopSignal};

/// Single-threaded blocking driver for the conversion pipeline.
///
/// ```rust,no_run
/// use mic_to_serial::audio::{AudioCapture, PcmConverter};
/// use mic_to_serial::config::StreamerConfig;
/// use mic_to_serial::pipeline::{PipelineRunner, StopSignal};
/// use mic_to_serial::sink::open_sink;
///
/// let config = StreamerConfig::default();
/// let converter = PcmConverter::new(&config.audio, &config.resampler).unwrap();
/// let mut source = AudioCapture::new(config.audio.device.as_deref(), config.audio.input_rate)
///     .unwrap()
///     .start(8192)
///     .unwrap();
/// let mut sink = open_sink(&config.serial).unwrap();
///
/// let stop = StopSignal::new();
/// let mut runner = PipelineRunner::new(converter, config.audio.chunk_size, stop.clone());
/// let stats = runner.run(&mut source, sink.as_mut());
/// println!("{stats}");
/// ```
pub struct PipelineRunner {
    converter: PcmConverter,
    chunk_size: usize,
    stop: StopSignal,
    state: PipelineState,
}

impl PipelineRunner {
    pub fn new(converter: PcmConverter, chunk_size: usize, stop: StopSignal) -> Self {
        Self {
            converter,
            chunk_size,
            stop,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("pipeline: {} → {}", self.state.label(), next.label());
        self.state = next;
    }

    /// Run until the stop signal is raised or the source closes.
    ///
    /// Per-chunk failures (overruns, sink write errors) are logged and
    /// counted; the loop keeps going.
    pub fn run(&mut self, source: &mut dyn FrameSource, sink: &mut dyn ByteSink) -> RunStats {
        let mut stats = RunStats::default();
        self.transition(PipelineState::Streaming);

        while !self.stop.is_stop_requested() {
            let samples = match source.read(self.chunk_size) {
                Ok(samples) => samples,
                Err(SourceError::Overrun { dropped }) => {
                    log::warn!("input overrun: {dropped} samples lost");
                    stats.overruns += 1;
                    stats.samples_dropped += dropped as u64;
                    continue;
                }
                Err(SourceError::Closed) => {
                    log::info!("pipeline: audio source closed");
                    break;
                }
            };
            stats.chunks_read += 1;

            let bytes = match self.converter.convert(&samples) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("dropping chunk {}: {e}", stats.chunks_read);
                    stats.convert_errors += 1;
                    continue;
                }
            };

            match sink.write(&bytes) {
                Ok(()) => {
                    stats.chunks_written += 1;
                    stats.bytes_written += bytes.len() as u64;
                    log::debug!(
                        "chunk {}: {} samples → {} bytes",
                        stats.chunks_read,
                        samples.len(),
                        bytes.len()
                    );
                }
                Err(e) => {
                    log::warn!("sink write failed for chunk {}: {e}", stats.chunks_read);
                    stats.sink_errors += 1;
                }
            }
        }

        if self.stop.is_stop_requested() {
            self.transition(PipelineState::Stopping);
        }
        self.transition(PipelineState::Stopped);
        log::info!("pipeline stopped: {stats}");
        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockSource;
    use crate::config::{AudioConfig, ResamplerConfig};
    use crate::sink::{MockSink, SinkError, WriterSink};

    const CHUNK: usize = 1024;

    fn runner(volume: f32, stop: StopSignal) -> PipelineRunner {
        let audio = AudioConfig {
            volume,
            ..AudioConfig::default()
        };
        let converter =
            PcmConverter::new(&audio, &ResamplerConfig::default()).expect("valid config");
        PipelineRunner::new(converter, CHUNK, stop)
    }

    fn chunks(values: &[i16]) -> Vec<Result<Vec<i16>, SourceError>> {
        values.iter().map(|&v| Ok(vec![v; CHUNK])).collect()
    }

    #[test]
    fn streams_until_source_closes() {
        let mut source = MockSource::new(chunks(&[0, 0, 0]));
        let mut sink = MockSink::default();
        let mut runner = runner(4.0, StopSignal::new());

        let stats = runner.run(&mut source, &mut sink);

        assert_eq!(stats.chunks_read, 3);
        assert_eq!(stats.chunks_written, 3);
        assert_eq!(sink.writes.len(), 3);
        assert_eq!(
            stats.bytes_written,
            sink.writes.iter().map(|w| w.len() as u64).sum::<u64>()
        );
        assert!(source.requests.iter().all(|&n| n == CHUNK));
        assert_eq!(runner.state(), PipelineState::Stopped);
    }

    #[test]
    fn writes_arrive_in_source_order() {
        // silence, then full scale, then silence: bytes must follow that order
        let mut source = MockSource::new(chunks(&[0, 0, i16::MAX, i16::MAX, i16::MAX, 0, 0, 0]));
        let mut sink = MockSink::default();
        runner(4.0, StopSignal::new()).run(&mut source, &mut sink);

        assert_eq!(sink.writes.len(), 8);
        assert!(sink.writes[1].iter().all(|&b| b == 127));
        assert!(sink.writes[4].iter().all(|&b| b == 255));
        assert!(sink.writes[7].iter().all(|&b| b == 127));
    }

    #[test]
    fn overrun_is_not_fatal() {
        let mut script = chunks(&[0]);
        script.push(Err(SourceError::Overrun { dropped: 300 }));
        script.extend(chunks(&[0, 0]));

        let mut source = MockSource::new(script);
        let mut sink = MockSink::default();
        let stats = runner(4.0, StopSignal::new()).run(&mut source, &mut sink);

        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.samples_dropped, 300);
        assert_eq!(stats.chunks_read, 3);
        assert_eq!(sink.writes.len(), 3);
    }

    #[test]
    fn sink_errors_are_swallowed() {
        let mut source = MockSource::new(chunks(&[0, 0, 0, 0]));
        let mut sink = MockSink::failing_on(vec![1, 2]);
        let stats = runner(4.0, StopSignal::new()).run(&mut source, &mut sink);

        assert_eq!(stats.chunks_read, 4);
        assert_eq!(stats.chunks_written, 2);
        assert_eq!(stats.sink_errors, 2);
        assert_eq!(sink.writes.len(), 2);
    }

    #[test]
    fn raised_stop_signal_skips_the_loop() {
        let stop = StopSignal::new();
        stop.request_stop();

        let mut source = MockSource::new(chunks(&[0; 5]));
        let mut sink = MockSink::default();
        let mut runner = runner(4.0, stop);
        let stats = runner.run(&mut source, &mut sink);

        assert_eq!(stats, RunStats::default());
        assert!(source.requests.is_empty());
        assert_eq!(runner.state(), PipelineState::Stopped);
    }

    /// Sink that raises the stop signal after a number of writes.
    struct StopAfter {
        inner: MockSink,
        remaining: usize,
        stop: StopSignal,
    }

    impl ByteSink for StopAfter {
        fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
            self.inner.write(bytes)?;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.stop.request_stop();
            }
            Ok(())
        }
    }

    #[test]
    fn stop_finishes_the_in_flight_write_then_exits() {
        let stop = StopSignal::new();
        let mut source = MockSource::new(chunks(&[0; 10]));
        let mut sink = StopAfter {
            inner: MockSink::default(),
            remaining: 3,
            stop: stop.clone(),
        };

        let stats = runner(4.0, stop).run(&mut source, &mut sink);

        assert_eq!(stats.chunks_written, 3);
        assert_eq!(sink.inner.writes.len(), 3);
        assert_eq!(source.requests.len(), 3);
    }

    #[test]
    fn reference_scenario_half_scale_at_unity_gain() {
        // 44.1 kHz → 8 kHz, 1024-sample chunks of 16384 at volume 1.0
        let mut source = MockSource::new(chunks(&[16_384; 4]));
        let mut sink = WriterSink::new(Vec::new());
        let stats = runner(1.0, StopSignal::new()).run(&mut source, &mut sink);

        assert_eq!(stats.chunks_written, 4);
        let bytes = sink.into_inner();
        assert!((bytes.len() as i64 - 4 * 186).abs() <= 4);

        let tail = &bytes[bytes.len() - 186..];
        assert!(tail.iter().all(|&b| b.abs_diff(191) <= 1));
    }

    #[test]
    fn identical_runs_produce_identical_streams() {
        let input: Vec<i16> = (0..CHUNK as i32).map(|i| ((i * 131) % 20_000 - 10_000) as i16).collect();
        let script = || -> Vec<Result<Vec<i16>, SourceError>> {
            (0..6).map(|_| Ok(input.clone())).collect()
        };

        let mut a = WriterSink::new(Vec::new());
        runner(4.0, StopSignal::new()).run(&mut MockSource::new(script()), &mut a);
        let mut b = WriterSink::new(Vec::new());
        runner(4.0, StopSignal::new()).run(&mut MockSource::new(script()), &mut b);

        assert_eq!(a.into_inner(), b.into_inner());
    }
}
