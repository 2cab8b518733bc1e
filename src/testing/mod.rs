//! Test doubles for the pipeline seams.
//!
//! These mocks are part of the public API so integration tests (and
//! downstream users embedding the pipeline) can exercise the full
//! capture -> recognize -> dispatch path without a microphone, a model or
//! a display server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::{AudioChunk, AudioInputSource, ChunkCallback, DeviceInfo};
use crate::config::{AudioConfig, OutputConfig, RecognitionConfig};
use crate::output::{OutputActionTarget, OutputMetadata, OutputType};
use crate::recognize::{RecognitionError, RecognitionResult, VoiceRecognitionSource};

// ---------------------------------------------------------------------------
// MockAudioInputSource
// ---------------------------------------------------------------------------

/// In-memory audio input. Tests push chunks with [`emit_chunk`], which
/// invokes the callback the capture stage registered, exactly as a device
/// thread would.
///
/// [`emit_chunk`]: MockAudioInputSource::emit_chunk
pub struct MockAudioInputSource {
    available: AtomicBool,
    callback: Mutex<Option<Arc<dyn Fn(AudioChunk) + Send + Sync>>>,
    config: Mutex<Option<AudioConfig>>,
}

impl MockAudioInputSource {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            callback: Mutex::new(None),
            config: Mutex::new(None),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Deliver a chunk through the registered capture callback. Does
    /// nothing when capture is not running.
    pub fn emit_chunk(&self, chunk: AudioChunk) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(chunk);
        }
    }

    pub fn configured(&self) -> Option<AudioConfig> {
        self.config.lock().unwrap().clone()
    }
}

impl Default for MockAudioInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioInputSource for MockAudioInputSource {
    fn initialize(&self, config: &AudioConfig) -> bool {
        *self.config.lock().unwrap() = Some(config.clone());
        true
    }

    fn start_capture(&self, callback: ChunkCallback) -> bool {
        if !self.available.load(Ordering::SeqCst) {
            return false;
        }
        let mut slot = self.callback.lock().unwrap();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::from(callback));
        true
    }

    fn stop_capture(&self) {
        self.callback.lock().unwrap().take();
    }

    fn is_capturing(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn cleanup(&self) {
        self.stop_capture();
    }

    fn get_device_info(&self) -> Option<DeviceInfo> {
        Some(DeviceInfo {
            name: "mock".into(),
            sample_rate: 16_000,
            channels: 1,
        })
    }
}

// ---------------------------------------------------------------------------
// MockRecognitionSource
// ---------------------------------------------------------------------------

/// Scripted recognition engine. Queue results up front; each
/// `get_result` poll (or end-of-session `flush`) pops one.
pub struct MockRecognitionSource {
    available: AtomicBool,
    fail_next_chunk: AtomicBool,
    results: Mutex<VecDeque<RecognitionResult>>,
    chunks: Mutex<Vec<AudioChunk>>,
}

impl MockRecognitionSource {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            fail_next_chunk: AtomicBool::new(false),
            results: Mutex::new(VecDeque::new()),
            chunks: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make the next `process_audio_chunk` call fail with a decode error.
    pub fn fail_next_chunk(&self) {
        self.fail_next_chunk.store(true, Ordering::SeqCst);
    }

    pub fn queue_result(&self, result: RecognitionResult) {
        self.results.lock().unwrap().push_back(result);
    }

    /// Number of chunks accepted so far (failed chunks are not counted).
    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    pub fn received_chunks(&self) -> Vec<AudioChunk> {
        self.chunks.lock().unwrap().clone()
    }
}

impl Default for MockRecognitionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceRecognitionSource for MockRecognitionSource {
    fn initialize(&self, _config: &RecognitionConfig) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn process_audio_chunk(&self, chunk: &AudioChunk) -> Result<(), RecognitionError> {
        if self.fail_next_chunk.swap(false, Ordering::SeqCst) {
            return Err(RecognitionError::Decode("scripted failure".into()));
        }
        self.chunks.lock().unwrap().push(chunk.clone());
        Ok(())
    }

    fn get_result(&self) -> Option<RecognitionResult> {
        self.results.lock().unwrap().pop_front()
    }

    fn flush(&self) -> Option<RecognitionResult> {
        self.results.lock().unwrap().pop_front()
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn cleanup(&self) {
        self.results.lock().unwrap().clear();
        self.chunks.lock().unwrap().clear();
    }
}

// ---------------------------------------------------------------------------
// MockOutputTarget
// ---------------------------------------------------------------------------

/// Output target that records every delivery.
pub struct MockOutputTarget {
    output_type: OutputType,
    available: AtomicBool,
    fail_delivery: AtomicBool,
    deliveries: Mutex<Vec<(String, OutputMetadata)>>,
}

impl MockOutputTarget {
    pub fn new(output_type: OutputType) -> Self {
        Self {
            output_type,
            available: AtomicBool::new(true),
            fail_delivery: AtomicBool::new(false),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every subsequent delivery report failure (while still
    /// recording it).
    pub fn fail_deliveries(&self, fail: bool) {
        self.fail_delivery.store(fail, Ordering::SeqCst);
    }

    pub fn deliveries(&self) -> Vec<(String, OutputMetadata)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

impl OutputActionTarget for MockOutputTarget {
    fn initialize(&self, _config: &OutputConfig) -> bool {
        true
    }

    fn deliver_text(&self, text: &str, metadata: &OutputMetadata) -> bool {
        self.deliveries
            .lock()
            .unwrap()
            .push((text.to_string(), metadata.clone()));
        !self.fail_delivery.load(Ordering::SeqCst)
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn get_output_type(&self) -> OutputType {
        self.output_type
    }

    fn supports_formatting(&self) -> bool {
        false
    }

    fn cleanup(&self) {}
}
