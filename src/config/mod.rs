//! Configuration: typed settings structs with TOML persistence and
//! platform path resolution.
//!
//! [`AppConfig`] is the single configuration surface the core consumes:
//! audio capture parameters, pipeline tuning (batch size, queue capacity,
//! inactivity timeout), recognition backend selection, output target
//! selection and the hotkey binding. Values come from
//! `<config dir>/voice-typing/settings.toml`, with every field defaulting so
//! a missing or partial file still yields a working configuration.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, HotkeyConfig, OutputConfig, PipelineConfig, RecognitionConfig,
};
