//! Transcript file target.
//!
//! Appends one line per utterance to the configured transcript file,
//! creating it (and its parent directory) on first delivery.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::OutputConfig;

use super::{OutputActionTarget, OutputMetadata, OutputType};

pub struct FileOutputTarget {
    path: Mutex<Option<PathBuf>>,
}

impl FileOutputTarget {
    pub fn new() -> Self {
        Self {
            path: Mutex::new(None),
        }
    }

    /// Build a target writing to an explicit path, bypassing config.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Mutex::new(Some(path)),
        }
    }
}

impl Default for FileOutputTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputActionTarget for FileOutputTarget {
    fn initialize(&self, config: &OutputConfig) -> bool {
        let Some(path) = &config.transcript_file else {
            log::error!("file output: no transcript_file configured");
            return false;
        };
        *self.path.lock().unwrap() = Some(path.clone());
        true
    }

    fn deliver_text(&self, text: &str, _metadata: &OutputMetadata) -> bool {
        let Some(path) = self.path.lock().unwrap().clone() else {
            return false;
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && std::fs::create_dir_all(parent).is_err() {
                log::error!("file output: cannot create {}", parent.display());
                return false;
            }
        }
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{text}"));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("file output: write to {} failed: {e}", path.display());
                false
            }
        }
    }

    fn is_available(&self) -> bool {
        self.path.lock().unwrap().is_some()
    }

    fn get_output_type(&self) -> OutputType {
        OutputType::File
    }

    fn supports_formatting(&self) -> bool {
        false
    }

    fn cleanup(&self) {
        self.path.lock().unwrap().take();
    }
}
