//! Whisper speech recognition backend via `whisper-rs`.
//!
//! Audio arrives as 16-bit PCM chunks, is converted to the f32 mono samples
//! whisper expects, and accumulates until at least one second is pending.
//! `get_result` then runs a full decode over the pending window and drains
//! it, so each utterance is transcribed exactly once. `flush` decodes a
//! sub-second remainder at session end, padded with silence to the minimum
//! window.

use std::sync::Mutex;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::AudioChunk;
use crate::config::RecognitionConfig;

use super::{RecognitionError, RecognitionResult, VoiceRecognitionSource};

/// Minimum pending audio before a decode is attempted. Whisper produces
/// garbage on very short windows, so anything under this stays buffered.
const MIN_DECODE_SECS: usize = 1;

// ---------------------------------------------------------------------------
// WhisperRecognitionSource
// ---------------------------------------------------------------------------

struct WhisperInner {
    ctx: Option<WhisperContext>,
    language: String,
    sample_rate: u32,
    /// Mono f32 samples awaiting a decode pass.
    pending: Vec<f32>,
}

/// [`VoiceRecognitionSource`] backed by a local GGML whisper model.
pub struct WhisperRecognitionSource {
    inner: Mutex<WhisperInner>,
}

impl WhisperRecognitionSource {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(WhisperInner {
                ctx: None,
                language: "en".into(),
                sample_rate: 16_000,
                pending: Vec::new(),
            }),
        }
    }
}

impl Default for WhisperRecognitionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceRecognitionSource for WhisperRecognitionSource {
    fn initialize(&self, config: &RecognitionConfig) -> bool {
        let Some(model_path) = &config.model_path else {
            log::error!("whisper: no model path configured");
            return false;
        };
        let Some(path_str) = model_path.to_str() else {
            log::error!("whisper: model path is not valid UTF-8");
            return false;
        };
        if !model_path.exists() {
            log::error!("whisper: model file not found: {}", model_path.display());
            return false;
        }

        match WhisperContext::new_with_params(path_str, WhisperContextParameters::default()) {
            Ok(ctx) => {
                let mut inner = self.inner.lock().unwrap();
                inner.ctx = Some(ctx);
                inner.language = config.language.clone();
                inner.sample_rate = config.sample_rate;
                inner.pending.clear();
                log::info!("whisper: model loaded from {}", model_path.display());
                true
            }
            Err(e) => {
                log::error!("whisper: failed to load model: {e}");
                false
            }
        }
    }

    fn process_audio_chunk(&self, chunk: &AudioChunk) -> Result<(), RecognitionError> {
        let bytes = chunk.as_bytes();
        if bytes.len() % 2 != 0 {
            return Err(RecognitionError::InvalidAudio(format!(
                "odd byte count {} for 16-bit PCM",
                bytes.len()
            )));
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.ctx.is_none() {
            return Err(RecognitionError::EngineUnavailable(
                "model not loaded".into(),
            ));
        }
        inner.pending.reserve(bytes.len() / 2);
        for pair in bytes.chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            inner.pending.push(sample as f32 / i16::MAX as f32);
        }
        Ok(())
    }

    fn get_result(&self) -> Option<RecognitionResult> {
        let mut inner = self.inner.lock().unwrap();
        let min_samples = inner.sample_rate as usize * MIN_DECODE_SECS;
        if inner.pending.len() < min_samples {
            return None;
        }

        let samples = std::mem::take(&mut inner.pending);
        decode(&mut inner, samples)
    }

    fn flush(&self) -> Option<RecognitionResult> {
        let mut inner = self.inner.lock().unwrap();
        if inner.pending.is_empty() {
            return None;
        }

        let min_samples = inner.sample_rate as usize * MIN_DECODE_SECS;
        let mut samples = std::mem::take(&mut inner.pending);
        // Whisper mis-decodes very short windows; pad the session tail
        // with silence up to the minimum.
        if samples.len() < min_samples {
            samples.resize(min_samples, 0.0);
        }
        decode(&mut inner, samples)
    }

    fn is_available(&self) -> bool {
        self.inner.lock().unwrap().ctx.is_some()
    }

    fn cleanup(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.ctx = None;
        inner.pending.clear();
    }
}

/// Run one full decode over `samples` and join the segment texts.
fn decode(inner: &mut WhisperInner, samples: Vec<f32>) -> Option<RecognitionResult> {
    let language = inner.language.clone();
    let ctx = inner.ctx.as_ref()?;

    let mut state = match ctx.create_state() {
        Ok(state) => state,
        Err(e) => {
            log::error!("whisper: failed to create decode state: {e}");
            return None;
        }
    };

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    if language != "auto" {
        params.set_language(Some(language.as_str()));
    }
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_print_special(false);

    if let Err(e) = state.full(params, &samples) {
        log::error!("whisper: decode failed: {e}");
        return None;
    }

    let segments = state.full_n_segments().unwrap_or(0);
    let mut text = String::new();
    for i in 0..segments {
        if let Ok(segment) = state.full_get_segment_text(i) {
            text.push_str(segment.trim());
            if i + 1 < segments {
                text.push(' ');
            }
        }
    }

    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }
    log::debug!("whisper: decoded {} samples -> {:?}", samples.len(), text);
    Some(RecognitionResult::new(text, 1.0, true))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_before_initialize_is_rejected() {
        let source = WhisperRecognitionSource::new();
        let chunk = AudioChunk::new(vec![0u8; 4]);
        assert!(matches!(
            source.process_audio_chunk(&chunk),
            Err(RecognitionError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn odd_byte_count_is_invalid_audio() {
        let source = WhisperRecognitionSource::new();
        let chunk = AudioChunk::new(vec![0u8; 3]);
        assert!(matches!(
            source.process_audio_chunk(&chunk),
            Err(RecognitionError::InvalidAudio(_))
        ));
    }

    #[test]
    fn initialize_fails_without_model_file() {
        let source = WhisperRecognitionSource::new();
        let config = RecognitionConfig {
            model_path: Some("/nonexistent/model.bin".into()),
            ..Default::default()
        };
        assert!(!source.initialize(&config));
        assert!(!source.is_available());
    }

    #[test]
    fn no_result_while_unavailable() {
        let source = WhisperRecognitionSource::new();
        assert!(source.get_result().is_none());
    }

    #[test]
    fn flush_without_pending_audio_is_none() {
        let source = WhisperRecognitionSource::new();
        assert!(source.flush().is_none());
    }
}
