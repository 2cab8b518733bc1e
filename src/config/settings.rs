//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every field carries a serde default, so a partial settings file merges
//! cleanly over the built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for the audio capture device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono).
    pub channels: u16,
    /// Frames per device callback, one [`crate::audio::AudioChunk`] each.
    pub block_size: u32,
    /// Input device name; `None` means the system default.
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            block_size: 8_000,
            device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Tuning for the capture → buffer → recognition pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chunk count that triggers a buffer flush.
    pub buffer_size: usize,
    /// Capacity of each inter-stage queue.
    pub queue_capacity: usize,
    /// Seconds of silence after which listening auto-disables.
    pub inactivity_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10,
            queue_capacity: 100,
            inactivity_timeout_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Settings for the speech recognition backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Backend name, `"whisper"` or `"null"`. Unknown names fall back to
    /// the default backend with a warning.
    pub backend: String,
    /// Path to the GGML model file; `None` resolves against the models
    /// directory from [`AppPaths`].
    pub model_path: Option<PathBuf>,
    /// Speech language as an ISO-639-1 code, or `"auto"` for detection.
    pub language: String,
    /// Sample rate of the PCM bytes fed to the backend; must match
    /// [`AudioConfig::sample_rate`].
    pub sample_rate: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            backend: "whisper".into(),
            model_path: None,
            language: "en".into(),
            sample_rate: 16_000,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Settings for recognized-text delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Target names to register with the dispatcher at startup.
    /// Known names: `"keyboard"`, `"clipboard"`, `"file"`.
    pub targets: Vec<String>,
    /// Append a trailing space after each delivered utterance.
    pub append_space: bool,
    /// Destination for the `"file"` target.
    pub transcript_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            targets: vec!["keyboard".into()],
            append_space: true,
            transcript_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Settings for the global toggle hotkey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Key name understood by [`crate::hotkey::parse_key`] (e.g. `"F9"`).
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self { key: "F9".into() }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Root configuration object, the full surface the core consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub pipeline: PipelineConfig,
    pub recognition: RecognitionConfig,
    pub output: OutputConfig,
    pub hotkey: HotkeyConfig,
}

impl AppConfig {
    /// Load settings from the platform settings file, falling back to
    /// defaults when the file does not exist.
    pub fn load(paths: &AppPaths) -> Result<Self> {
        Self::load_from(&paths.settings_file)
    }

    /// Load settings from an explicit path (used by tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Persist settings, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.block_size, 8_000);
        assert_eq!(config.pipeline.buffer_size, 10);
        assert_eq!(config.pipeline.queue_capacity, 100);
        assert_eq!(config.pipeline.inactivity_timeout_secs, 5);
        assert_eq!(config.recognition.backend, "whisper");
        assert_eq!(config.output.targets, vec!["keyboard".to_string()]);
        assert!(config.output.append_space);
        assert_eq!(config.hotkey.key, "F9");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/settings.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut config = AppConfig::default();
        config.pipeline.buffer_size = 3;
        config.pipeline.inactivity_timeout_secs = 8;
        config.recognition.backend = "null".into();
        config.hotkey.key = "F12".into();

        config.save_to(&path).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[pipeline]\nbuffer_size = 4\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.pipeline.buffer_size, 4);
        // Untouched sections keep their defaults.
        assert_eq!(loaded.pipeline.queue_capacity, 100);
        assert_eq!(loaded.audio.sample_rate, 16_000);
    }
}
