//! mic-to-serial entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`StreamerConfig`] (default file or `--config`), apply CLI
//!    overrides, validate.
//! 3. Build the [`PcmConverter`].
//! 4. Open the byte sink (serial port or stdout) and let it settle.
//! 5. Open the microphone.
//! 6. Spawn the signal thread (Ctrl-C / SIGTERM → [`StopSignal`]).
//! 7. Run the [`PipelineRunner`] on the main thread until stopped.
//!
//! Any failure in steps 2–6 is fatal and exits before streaming starts.
//! Source and sink are dropped (stream stopped, port closed) when `run`
//! returns, on every path.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use mic_to_serial::{
    audio::{AudioCapture, PcmConverter},
    config::StreamerConfig,
    pipeline::{PipelineRunner, StopSignal},
    sink::open_sink,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "mic-to-serial")]
#[command(about = "Stream microphone audio as 8-bit PCM over a serial port")]
#[command(version)]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(short, long, env = "MIC_TO_SERIAL_CONFIG")]
    config: Option<PathBuf>,

    /// Serial device, or "-" for stdout
    #[arg(short, long, env = "MIC_TO_SERIAL_PORT")]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, env = "MIC_TO_SERIAL_BAUD")]
    baud: Option<u32>,

    /// Gain applied after resampling
    #[arg(short, long, env = "MIC_TO_SERIAL_VOLUME")]
    volume: Option<f32>,

    /// Input device name (defaults to the system default input)
    #[arg(short, long, env = "MIC_TO_SERIAL_DEVICE")]
    device: Option<String>,

    /// Microphone sample rate in Hz
    #[arg(long)]
    input_rate: Option<u32>,

    /// Output sample rate in Hz
    #[arg(long)]
    output_rate: Option<u32>,

    /// Input frames per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Overwrite config fields that were given on the command line.
    fn apply(&self, config: &mut StreamerConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(volume) = self.volume {
            config.audio.volume = volume;
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(rate) = self.input_rate {
            config.audio.input_rate = rate;
        }
        if let Some(rate) = self.output_rate {
            config.audio.output_rate = rate;
        }
        if let Some(chunk) = self.chunk_size {
            config.audio.chunk_size = chunk;
        }
    }
}

// ---------------------------------------------------------------------------
// Signal handling
// ---------------------------------------------------------------------------

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("received Ctrl-C, stopping"),
        _ = terminate => log::info!("received terminate signal, stopping"),
    }
}

/// Exit status after a second interrupt.
const FORCED_EXIT_CODE: i32 = 130;

/// Run [`shutdown_signal`] on a dedicated thread and raise `stop` when it
/// fires. A second signal exits the process immediately, for when the loop
/// is stuck in a blocking read.
fn spawn_signal_listener(stop: StopSignal) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create signal runtime")?;

    std::thread::Builder::new()
        .name("signal".into())
        .spawn(move || {
            rt.block_on(async {
                shutdown_signal().await;
                stop.request_stop();
                shutdown_signal().await;
            });
            log::warn!("second signal received, exiting without cleanup");
            std::process::exit(FORCED_EXIT_CODE);
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn load_config(args: &Args) -> Result<StreamerConfig> {
    let mut config = match &args.config {
        Some(path) => StreamerConfig::load_from(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => StreamerConfig::load().context("failed to read settings.toml")?,
    };
    args.apply(&mut config);
    Ok(config)
}

fn main() -> Result<()> {
    // 1. Logging (stderr, so stdout stays clean for `--port -`)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    config.validate().context("invalid configuration")?;

    let audio = &config.audio;
    log::info!(
        "mic-to-serial: {} Hz → {} Hz, chunk {} → ~{} bytes, volume {}",
        audio.input_rate,
        audio.output_rate,
        audio.chunk_size,
        audio.output_chunk_len(),
        audio.volume
    );

    // 3. Converter
    let converter =
        PcmConverter::new(audio, &config.resampler).context("failed to build resampler")?;

    // 4. Sink
    let mut sink = open_sink(&config.serial).context("byte sink unavailable")?;

    // 5. Source
    let capture = AudioCapture::new(audio.device.as_deref(), audio.input_rate)
        .context("audio input unavailable")?;
    log::debug!(
        "capturing from '{}' ({} ch, downmixed to mono)",
        capture.device_name(),
        capture.channels()
    );
    let mut source = capture
        .start(audio.chunk_size * audio.buffer_chunks)
        .context("failed to start audio capture")?;

    // 6. Stop signal
    let stop = StopSignal::new();
    spawn_signal_listener(stop.clone())?;

    // 7. Stream
    log::info!("streaming... press Ctrl+C to stop");
    let mut runner = PipelineRunner::new(converter, audio.chunk_size, stop);
    runner.run(&mut source, sink.as_mut());

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
