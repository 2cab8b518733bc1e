//! No-op recognition backend.
//!
//! Accepts and discards all audio, never produces a result. Useful for
//! running the full pipeline without a model, e.g. to verify capture and
//! buffering on a new machine.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::AudioChunk;
use crate::config::RecognitionConfig;

use super::{RecognitionError, RecognitionResult, VoiceRecognitionSource};

pub struct NullRecognitionSource {
    initialized: AtomicBool,
}

impl NullRecognitionSource {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
        }
    }
}

impl Default for NullRecognitionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceRecognitionSource for NullRecognitionSource {
    fn initialize(&self, _config: &RecognitionConfig) -> bool {
        self.initialized.store(true, Ordering::SeqCst);
        true
    }

    fn process_audio_chunk(&self, chunk: &AudioChunk) -> Result<(), RecognitionError> {
        log::trace!("null backend: discarding {} bytes", chunk.len());
        Ok(())
    }

    fn get_result(&self) -> Option<RecognitionResult> {
        None
    }

    fn is_available(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn cleanup(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }
}
