//! Audio data types and the capture-side interface.
//!
//! [`AudioChunk`] is one opaque, immutable unit of PCM bytes as delivered by
//! a device callback; [`AudioBuffer`] is an ordered batch of chunks produced
//! by the buffering stage. [`AudioInputSource`] is the contract a concrete
//! capture backend (see [`CpalAudioInput`]) must fulfil to feed the pipeline.

pub mod cpal_input;

pub use cpal_input::CpalAudioInput;

use crate::config::AudioConfig;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One unit of raw audio produced per device-callback invocation.
///
/// The payload is an opaque byte sequence (16-bit little-endian PCM for the
/// built-in backends). Chunks are immutable after creation; `Clone` shares
/// the underlying allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    data: std::sync::Arc<[u8]>,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AudioBuffer
// ---------------------------------------------------------------------------

/// An ordered batch of [`AudioChunk`]s, flushed by the buffering stage either
/// on reaching the configured size or after an idle timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBuffer {
    chunks: Vec<AudioChunk>,
}

impl AudioBuffer {
    pub fn new(chunks: Vec<AudioChunk>) -> Self {
        Self { chunks }
    }

    /// Chunks in original capture order.
    pub fn chunks(&self) -> &[AudioChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total payload size across all chunks, in bytes.
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(AudioChunk::len).sum()
    }
}

impl From<Vec<AudioChunk>> for AudioBuffer {
    fn from(chunks: Vec<AudioChunk>) -> Self {
        Self::new(chunks)
    }
}

impl<'a> IntoIterator for &'a AudioBuffer {
    type Item = &'a AudioChunk;
    type IntoIter = std::slice::Iter<'a, AudioChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

// ---------------------------------------------------------------------------
// AudioInputSource
// ---------------------------------------------------------------------------

/// Callback handed to [`AudioInputSource::start_capture`].
///
/// Invoked from the backend's own capture thread for every chunk; it must
/// never block that thread.
pub type ChunkCallback = Box<dyn Fn(AudioChunk) + Send + Sync>;

/// Information about the active capture device, for status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Contract for audio capture backends.
///
/// Implementations are shared as `Arc<dyn AudioInputSource>` between the
/// capture stage and the application shell, so every method takes `&self`
/// and implementations use interior mutability.
///
/// # Contract
///
/// - `start_capture` on an already-capturing source returns `false`.
/// - `stop_capture` blocks until no further chunks will be delivered; after
///   it returns, the callback passed to `start_capture` is never invoked
///   again.
/// - Expected unavailability (no device, not initialized) is a boolean
///   `false` at the `initialize`/`start_capture` boundary, not a panic.
pub trait AudioInputSource: Send + Sync {
    /// Idempotent setup from configuration; must not start capture.
    fn initialize(&self, config: &AudioConfig) -> bool;

    /// Begin pushing chunks to `callback` from the backend's capture thread.
    fn start_capture(&self, callback: ChunkCallback) -> bool;

    /// Stop capture and wait until the callback can no longer fire.
    fn stop_capture(&self);

    fn is_capturing(&self) -> bool;

    fn is_available(&self) -> bool;

    /// Stop capture if running and release the underlying device.
    fn cleanup(&self);

    fn get_device_info(&self) -> Option<DeviceInfo>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
