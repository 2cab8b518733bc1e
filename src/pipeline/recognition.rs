//! Recognition stage: buffer queue -> recognized text.
//!
//! The worker feeds each buffer's chunks to the recognition source in
//! arrival order, then polls for a result. The output callback fires on
//! EVERY loop pass, with `Some` only when the engine produced non-empty
//! text; the `None` ticks let the downstream inactivity policy observe
//! silence and time out a stuck session.
//!
//! Result polls run under `spawn_blocking`: a backend decode can take
//! seconds, and running it inline would pin a runtime worker and stall
//! the other stages' flush ticks. On stop the worker drains whatever the
//! upstream flush left queued and asks the source to flush its own
//! sub-batch tail, so the end of an utterance is not lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::audio::AudioBuffer;
use crate::config::AppConfig;
use crate::recognize::{RecognitionResult, VoiceRecognitionSource};

use super::queue::BoundedQueue;
use super::stage::PipelineStage;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Invoked once per worker pass with the pass's recognition outcome.
pub type RecognitionCallback = Arc<dyn Fn(Option<RecognitionResult>) + Send + Sync>;

// ---------------------------------------------------------------------------
// RecognitionStage
// ---------------------------------------------------------------------------

pub struct RecognitionStage {
    source: Arc<dyn VoiceRecognitionSource>,
    callback: RecognitionCallback,
    input: Option<Arc<BoundedQueue<AudioBuffer>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RecognitionStage {
    pub fn new(source: Arc<dyn VoiceRecognitionSource>, callback: RecognitionCallback) -> Self {
        Self {
            source,
            callback,
            input: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait]
impl PipelineStage for RecognitionStage {
    type Input = AudioBuffer;
    type Output = ();

    async fn initialize(&mut self, config: &AppConfig) -> bool {
        if self.input.is_none() {
            log::error!("recognition: no input queue installed");
            return false;
        }
        self.source.initialize(&config.recognition)
    }

    async fn start(&mut self) -> bool {
        let Some(input) = self.input.clone() else {
            return false;
        };
        // Starting a running stage is a no-op success.
        if self.running.load(Ordering::SeqCst) {
            return true;
        }
        if !self.source.is_available() {
            log::error!("recognition: source unavailable");
            return false;
        }
        self.running.store(true, Ordering::SeqCst);

        let source = Arc::clone(&self.source);
        let callback = Arc::clone(&self.callback);
        let running = Arc::clone(&self.running);
        self.worker = Some(tokio::spawn(async move {
            worker_loop(input, source, callback, running).await;
        }));
        log::debug!("pipeline: recognition stage started");
        true
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.await.is_err() {
                log::error!("recognition: worker task panicked");
            }
        }
        log::debug!("pipeline: recognition stage stopped");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn cleanup(&mut self) {
        self.stop().await;
        self.source.cleanup();
    }

    fn set_input_queue(&mut self, queue: Arc<BoundedQueue<AudioBuffer>>) {
        self.input = Some(queue);
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

async fn worker_loop(
    input: Arc<BoundedQueue<AudioBuffer>>,
    source: Arc<dyn VoiceRecognitionSource>,
    callback: RecognitionCallback,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        if let Some(buffer) = input.recv_timeout(POLL_INTERVAL).await {
            feed_buffer(&source, &buffer);
        }

        let result = poll_result(&source).await;
        if let Some(result) = &result {
            log::debug!("recognition: result {:?}", result.text);
        }
        callback(result);
    }

    // Session drain: the upstream stages were stopped first, so anything
    // still queued is the final audio of the session.
    while let Some(buffer) = input.try_pop() {
        feed_buffer(&source, &buffer);
    }
    let flush_source = Arc::clone(&source);
    let tail = match tokio::task::spawn_blocking(move || flush_source.flush()).await {
        Ok(tail) => tail,
        Err(e) => {
            log::error!("recognition: flush task failed: {e}");
            None
        }
    };
    if let Some(result) = tail.filter(|result| !result.text.trim().is_empty()) {
        log::debug!("recognition: flushed tail {:?}", result.text);
        callback(Some(result));
    }
}

fn feed_buffer(source: &Arc<dyn VoiceRecognitionSource>, buffer: &AudioBuffer) {
    for chunk in buffer {
        if let Err(e) = source.process_audio_chunk(chunk) {
            // Skip the rest of this buffer and move on; one bad batch
            // must not kill the worker.
            log::error!("recognition: failed to process chunk: {e}");
            break;
        }
    }
}

/// Poll the source off the runtime; a decode can block for seconds.
async fn poll_result(source: &Arc<dyn VoiceRecognitionSource>) -> Option<RecognitionResult> {
    let source = Arc::clone(source);
    match tokio::task::spawn_blocking(move || source.get_result()).await {
        Ok(result) => result.filter(|result| !result.text.trim().is_empty()),
        Err(e) => {
            log::error!("recognition: result poll task failed: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
