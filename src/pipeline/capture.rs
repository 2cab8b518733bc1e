//! Capture stage: audio device -> chunk queue.
//!
//! This stage has no worker loop of its own. The input source delivers
//! chunks on its device thread and the registered callback pushes them
//! straight onto the output queue. Backpressure drops the oldest chunk so
//! a stalled consumer costs the start of the utterance, not the end.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::audio::{AudioChunk, AudioInputSource};
use crate::config::AppConfig;

use super::queue::{BoundedQueue, PushOutcome};
use super::stage::PipelineStage;

// ---------------------------------------------------------------------------
// CaptureStage
// ---------------------------------------------------------------------------

pub struct CaptureStage {
    input: Arc<dyn AudioInputSource>,
    output: Option<Arc<BoundedQueue<AudioChunk>>>,
    running: Arc<AtomicBool>,
}

impl CaptureStage {
    pub fn new(input: Arc<dyn AudioInputSource>) -> Self {
        Self {
            input,
            output: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl PipelineStage for CaptureStage {
    type Input = ();
    type Output = AudioChunk;

    async fn initialize(&mut self, config: &AppConfig) -> bool {
        if self.output.is_none() {
            log::error!("capture: no output queue installed");
            return false;
        }
        self.input.initialize(&config.audio)
    }

    async fn start(&mut self) -> bool {
        let Some(output) = self.output.clone() else {
            return false;
        };
        // Starting a running stage is a no-op success; there is never a
        // second callback registration.
        if self.running.load(Ordering::SeqCst) {
            return true;
        }
        if !self.input.is_available() {
            log::error!("capture: audio input unavailable");
            return false;
        }

        let running = Arc::clone(&self.running);
        let callback = Box::new(move |chunk: AudioChunk| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            if output.push_drop_oldest(chunk) == PushOutcome::DroppedOldest {
                log::debug!("capture: chunk queue full, dropped oldest chunk");
            }
        });

        self.running.store(true, Ordering::SeqCst);
        if self.input.start_capture(callback) {
            log::debug!("pipeline: capture stage started");
            true
        } else {
            self.running.store(false, Ordering::SeqCst);
            false
        }
    }

    async fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        // Blocks until the device thread is gone, so no chunk can be
        // enqueued after this returns.
        self.input.stop_capture();
        log::debug!("pipeline: capture stage stopped");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.input.is_capturing()
    }

    async fn cleanup(&mut self) {
        self.stop().await;
        self.input.cleanup();
    }

    fn set_output_queue(&mut self, queue: Arc<BoundedQueue<AudioChunk>>) {
        self.output = Some(queue);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAudioInputSource;

    fn stage_with_queue(capacity: usize) -> (CaptureStage, Arc<MockAudioInputSource>, Arc<BoundedQueue<AudioChunk>>) {
        let input = Arc::new(MockAudioInputSource::new());
        let queue = Arc::new(BoundedQueue::new(capacity));
        let mut stage = CaptureStage::new(Arc::clone(&input) as Arc<dyn AudioInputSource>);
        stage.set_output_queue(Arc::clone(&queue));
        (stage, input, queue)
    }

    #[tokio::test]
    async fn initialize_requires_an_output_queue() {
        let input = Arc::new(MockAudioInputSource::new());
        let mut stage = CaptureStage::new(input);
        assert!(!stage.initialize(&AppConfig::default()).await);
    }

    #[tokio::test]
    async fn chunks_flow_to_the_output_queue() {
        let (mut stage, input, queue) = stage_with_queue(8);
        assert!(stage.initialize(&AppConfig::default()).await);
        assert!(stage.start().await);
        assert!(stage.is_running());

        input.emit_chunk(AudioChunk::new(vec![1, 2]));
        input.emit_chunk(AudioChunk::new(vec![3, 4]));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().as_bytes(), &[1, 2]);

        stage.stop().await;
        assert!(!stage.is_running());
    }

    #[tokio::test]
    async fn overflow_keeps_the_most_recent_chunks() {
        let (mut stage, input, queue) = stage_with_queue(2);
        assert!(stage.initialize(&AppConfig::default()).await);
        assert!(stage.start().await);

        input.emit_chunk(AudioChunk::new(vec![1]));
        input.emit_chunk(AudioChunk::new(vec![2]));
        input.emit_chunk(AudioChunk::new(vec![3]));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().as_bytes(), &[2]);
        assert_eq!(queue.try_pop().unwrap().as_bytes(), &[3]);
        stage.stop().await;
    }

    #[tokio::test]
    async fn chunks_after_stop_are_ignored() {
        let (mut stage, input, queue) = stage_with_queue(8);
        assert!(stage.initialize(&AppConfig::default()).await);
        assert!(stage.start().await);
        stage.stop().await;

        input.emit_chunk(AudioChunk::new(vec![9]));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn unavailable_device_fails_start() {
        let (mut stage, input, _queue) = stage_with_queue(8);
        input.set_available(false);
        assert!(stage.initialize(&AppConfig::default()).await);
        assert!(!stage.start().await);
        assert!(!stage.is_running());
    }

    #[tokio::test]
    async fn start_on_a_running_stage_is_idempotent() {
        let (mut stage, input, queue) = stage_with_queue(8);
        assert!(stage.initialize(&AppConfig::default()).await);
        assert!(stage.start().await);
        assert!(stage.start().await);
        assert!(stage.is_running());

        // Still a single delivery path per chunk.
        input.emit_chunk(AudioChunk::new(vec![1]));
        assert_eq!(queue.len(), 1);
        stage.stop().await;
    }
}
