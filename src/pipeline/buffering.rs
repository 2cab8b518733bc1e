//! Buffering stage: chunk queue -> batched buffer queue.
//!
//! A worker task accumulates chunks and flushes a batch downstream either
//! when `buffer_size` chunks have arrived or when the input goes quiet for
//! one poll interval while chunks are pending. The timeout flush keeps the
//! tail of an utterance from sitting here until more speech arrives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::audio::{AudioBuffer, AudioChunk};
use crate::config::AppConfig;

use super::queue::BoundedQueue;
use super::stage::PipelineStage;

/// How long the worker waits for a chunk before flushing what it holds.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// BufferingStage
// ---------------------------------------------------------------------------

pub struct BufferingStage {
    buffer_size: usize,
    input: Option<Arc<BoundedQueue<AudioChunk>>>,
    output: Option<Arc<BoundedQueue<AudioBuffer>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl BufferingStage {
    pub fn new() -> Self {
        Self {
            buffer_size: 0,
            input: None,
            output: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Default for BufferingStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStage for BufferingStage {
    type Input = AudioChunk;
    type Output = AudioBuffer;

    async fn initialize(&mut self, config: &AppConfig) -> bool {
        if self.input.is_none() || self.output.is_none() {
            log::error!("buffering: queues not installed");
            return false;
        }
        self.buffer_size = config.pipeline.buffer_size.max(1);
        true
    }

    async fn start(&mut self) -> bool {
        let (Some(input), Some(output)) = (self.input.clone(), self.output.clone()) else {
            return false;
        };
        if self.buffer_size == 0 {
            return false;
        }
        // Starting a running stage is a no-op success; the existing worker
        // keeps running and no second one is spawned.
        if self.running.swap(true, Ordering::SeqCst) {
            return true;
        }

        let running = Arc::clone(&self.running);
        let buffer_size = self.buffer_size;
        self.worker = Some(tokio::spawn(async move {
            worker_loop(input, output, buffer_size, running).await;
        }));
        log::debug!("pipeline: buffering stage started");
        true
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.await.is_err() {
                log::error!("buffering: worker task panicked");
            }
        }
        log::debug!("pipeline: buffering stage stopped");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn cleanup(&mut self) {
        self.stop().await;
    }

    fn set_input_queue(&mut self, queue: Arc<BoundedQueue<AudioChunk>>) {
        self.input = Some(queue);
    }

    fn set_output_queue(&mut self, queue: Arc<BoundedQueue<AudioBuffer>>) {
        self.output = Some(queue);
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

async fn worker_loop(
    input: Arc<BoundedQueue<AudioChunk>>,
    output: Arc<BoundedQueue<AudioBuffer>>,
    buffer_size: usize,
    running: Arc<AtomicBool>,
) {
    let mut pending: Vec<AudioChunk> = Vec::with_capacity(buffer_size);

    while running.load(Ordering::SeqCst) {
        match input.recv_timeout(POLL_INTERVAL).await {
            Some(chunk) => {
                pending.push(chunk);
                if pending.len() >= buffer_size {
                    flush(&output, &mut pending);
                }
            }
            // Quiet tick: ship whatever is pending so the utterance tail
            // reaches recognition promptly.
            None => {
                if !pending.is_empty() {
                    flush(&output, &mut pending);
                }
            }
        }
    }

    // Final flush so stopping never strands audio in the accumulator.
    if !pending.is_empty() {
        flush(&output, &mut pending);
    }
}

fn flush(output: &BoundedQueue<AudioBuffer>, pending: &mut Vec<AudioChunk>) {
    let buffer = AudioBuffer::from(std::mem::take(pending));
    if output.try_push(buffer).is_err() {
        log::warn!("buffering: buffer queue full, discarding batch");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
