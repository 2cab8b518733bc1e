//! Microphone capture backend built on `cpal`.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream lives
//! entirely on a dedicated capture thread: `start_capture` spawns the
//! thread, waits for it to report whether the stream came up, and
//! `stop_capture` signals the thread and joins it. After `stop_capture`
//! returns the stream has been dropped, so the chunk callback can never
//! fire again, which is the guarantee the capture stage relies on.

use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::AudioConfig;

use super::{AudioChunk, AudioInputSource, ChunkCallback, DeviceInfo};

// ---------------------------------------------------------------------------
// CpalAudioInput
// ---------------------------------------------------------------------------

struct CaptureWorker {
    /// Dropping the sender wakes the capture thread out of its park.
    stop_tx: mpsc::Sender<()>,
    handle: std::thread::JoinHandle<()>,
}

struct InputState {
    config: Option<AudioConfig>,
    worker: Option<CaptureWorker>,
}

/// [`AudioInputSource`] implementation over the system default (or a named)
/// cpal input device.
///
/// Samples are converted to 16-bit little-endian PCM bytes before being
/// wrapped in an [`AudioChunk`], one chunk per device callback.
pub struct CpalAudioInput {
    state: Mutex<InputState>,
}

impl CpalAudioInput {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InputState {
                config: None,
                worker: None,
            }),
        }
    }
}

impl Default for CpalAudioInput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioInputSource for CpalAudioInput {
    fn initialize(&self, config: &AudioConfig) -> bool {
        let mut state = self.state.lock().unwrap();
        state.config = Some(config.clone());
        true
    }

    fn start_capture(&self, callback: ChunkCallback) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.worker.is_some() {
            return false;
        }
        let Some(config) = state.config.clone() else {
            log::warn!("audio: start_capture before initialize");
            return false;
        };

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<bool>();

        let handle = match std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || capture_thread(config, callback, stop_rx, ready_tx))
        {
            Ok(h) => h,
            Err(e) => {
                log::error!("audio: failed to spawn capture thread: {e}");
                return false;
            }
        };

        // The thread reports once the stream is playing (or failed to build).
        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(true) => {
                state.worker = Some(CaptureWorker { stop_tx, handle });
                true
            }
            _ => {
                let _ = handle.join();
                false
            }
        }
    }

    fn stop_capture(&self) {
        let worker = self.state.lock().unwrap().worker.take();
        if let Some(worker) = worker {
            drop(worker.stop_tx);
            if worker.handle.join().is_err() {
                log::error!("audio: capture thread panicked");
            }
        }
    }

    fn is_capturing(&self) -> bool {
        self.state.lock().unwrap().worker.is_some()
    }

    fn is_available(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn cleanup(&self) {
        self.stop_capture();
    }

    fn get_device_info(&self) -> Option<DeviceInfo> {
        let device = cpal::default_host().default_input_device()?;
        let supported = device.default_input_config().ok()?;
        Some(DeviceInfo {
            name: device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
        })
    }
}

// ---------------------------------------------------------------------------
// Capture thread
// ---------------------------------------------------------------------------

/// Owns the cpal stream for its entire lifetime.
///
/// Reports `true`/`false` on `ready_tx` once the stream is playing or has
/// failed, then parks on `stop_rx` until the owner drops the sender.
fn capture_thread(
    config: AudioConfig,
    callback: ChunkCallback,
    stop_rx: mpsc::Receiver<()>,
    ready_tx: mpsc::Sender<bool>,
) {
    let host = cpal::default_host();
    let device = match &config.device {
        Some(name) => host
            .input_devices()
            .ok()
            .and_then(|mut devices| devices.find(|d| d.name().map(|n| n == *name).unwrap_or(false))),
        None => host.default_input_device(),
    };
    let Some(device) = device else {
        log::error!("audio: no input device found");
        let _ = ready_tx.send(false);
        return;
    };

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(config.block_size),
    };

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            callback(AudioChunk::new(pcm16_bytes(data)));
        },
        |err: cpal::StreamError| {
            log::error!("audio: stream error: {err}");
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            log::error!("audio: failed to build input stream: {e}");
            let _ = ready_tx.send(false);
            return;
        }
    };

    if let Err(e) = stream.play() {
        log::error!("audio: failed to start stream: {e}");
        let _ = ready_tx.send(false);
        return;
    }

    let _ = ready_tx.send(true);

    // Park until stop_capture drops the sender; recv returns Err then.
    let _ = stop_rx.recv();
    drop(stream);
}

/// Convert `f32` samples in `[-1.0, 1.0]` to 16-bit little-endian PCM bytes.
fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
