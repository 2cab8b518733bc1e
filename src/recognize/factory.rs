//! Backend selection by configured name.

use std::sync::Arc;

use super::{NullRecognitionSource, VoiceRecognitionSource, WhisperRecognitionSource};

// ---------------------------------------------------------------------------
// RecognitionBackend
// ---------------------------------------------------------------------------

/// Known recognition backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionBackend {
    Whisper,
    Null,
}

impl RecognitionBackend {
    /// Parse a configured backend name, falling back to whisper with a
    /// warning on anything unrecognized. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "whisper" => Self::Whisper,
            "null" | "none" => Self::Null,
            other => {
                log::warn!("recognition: unknown backend {other:?}, using whisper");
                Self::Whisper
            }
        }
    }
}

/// Build the recognition source for a configured backend name.
///
/// The returned source is not yet initialized; callers run
/// [`VoiceRecognitionSource::initialize`] with the full config.
pub fn create_recognition_source(name: &str) -> Arc<dyn VoiceRecognitionSource> {
    match RecognitionBackend::from_name(name) {
        RecognitionBackend::Whisper => Arc::new(WhisperRecognitionSource::new()),
        RecognitionBackend::Null => Arc::new(NullRecognitionSource::new()),
    }
}
