//! Speech recognition backends.
//!
//! [`VoiceRecognitionSource`] is the seam between the pipeline and an
//! actual speech-to-text engine: the recognition stage feeds it PCM chunks
//! in arrival order and polls [`get_result`](VoiceRecognitionSource::get_result)
//! for finished utterances. Backends are selected by name through
//! [`factory::create_recognition_source`].

pub mod factory;
pub mod null;
pub mod whisper;

pub use factory::{create_recognition_source, RecognitionBackend};
pub use null::NullRecognitionSource;
pub use whisper::WhisperRecognitionSource;

use crate::audio::AudioChunk;
use crate::config::RecognitionConfig;

// ---------------------------------------------------------------------------
// RecognitionResult
// ---------------------------------------------------------------------------

/// One recognized utterance produced by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Recognized text. Backends never emit empty text.
    pub text: String,
    /// Backend confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Whether the text is a finalized utterance rather than a partial.
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn new(text: impl Into<String>, confidence: f32, is_final: bool) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final,
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionError
// ---------------------------------------------------------------------------

/// Failures a backend can report while consuming audio.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// Backend has no loaded engine (missing model, failed init).
    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The supplied chunk cannot be interpreted as valid PCM.
    #[error("invalid audio data: {0}")]
    InvalidAudio(String),

    /// The engine accepted the audio but failed while decoding it.
    #[error("decode failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// VoiceRecognitionSource
// ---------------------------------------------------------------------------

/// Abstraction over a speech-to-text engine.
///
/// # Contract
///
/// - `process_audio_chunk` is called with chunks in capture order; the
///   backend may buffer internally before producing anything.
/// - `get_result` returns at most one finished utterance per call and
///   `None` when nothing is ready. Returned text is never empty.
/// - `flush` is the end-of-session counterpart: it decodes whatever is
///   still buffered regardless of thresholds.
/// - All methods may be called from a worker task; implementations must be
///   internally synchronized.
pub trait VoiceRecognitionSource: Send + Sync {
    /// Prepare the engine. Returns `false` when the backend cannot come up
    /// (missing model file, unsupported configuration).
    fn initialize(&self, config: &RecognitionConfig) -> bool;

    /// Feed one chunk of 16-bit little-endian PCM.
    fn process_audio_chunk(&self, chunk: &AudioChunk) -> Result<(), RecognitionError>;

    /// Poll for a finished utterance.
    fn get_result(&self) -> Option<RecognitionResult>;

    /// Decode any audio still buffered below the backend's normal batching
    /// threshold. Called once when a listening session drains, so the
    /// final fraction of an utterance is not lost. The default has no
    /// internal buffer and returns `None`.
    fn flush(&self) -> Option<RecognitionResult> {
        None
    }

    /// Whether the engine is initialized and ready to accept audio.
    fn is_available(&self) -> bool;

    /// Release engine resources. Safe to call more than once.
    fn cleanup(&self);
}
