//! Configuration module for mic-to-serial.
//!
//! Provides [`StreamerConfig`] (top-level settings) with one sub-config per
//! pipeline stage, [`AppPaths`] for the platform config directory, and TOML
//! persistence via [`StreamerConfig::load`] / [`StreamerConfig::save_to`].

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AudioConfig, ConfigError, Interpolation, ResamplerConfig, SerialConfig, StreamerConfig,
    Window,
};
