//! Pipeline coordinator: owns the stages and the queues between them.
//!
//! ```text
//!   CaptureStage ──chunk queue──▶ BufferingStage ──buffer queue──▶ RecognitionStage
//! ```
//!
//! Startup is downstream-first (recognition, buffering, capture) so no
//! producer runs before its consumer; shutdown is upstream-first (capture,
//! buffering, recognition) so in-flight audio drains forward instead of
//! piling up behind a stopped consumer. A partial startup is rolled back
//! before `start_pipeline` reports failure.

use std::sync::Arc;

use crate::audio::{AudioBuffer, AudioChunk, AudioInputSource};
use crate::config::AppConfig;
use crate::recognize::VoiceRecognitionSource;

use super::buffering::BufferingStage;
use super::capture::CaptureStage;
use super::queue::BoundedQueue;
use super::recognition::{RecognitionCallback, RecognitionStage};
use super::stage::PipelineStage;

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

/// Per-stage running flags, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStatus {
    pub capture: bool,
    pub buffering: bool,
    pub recognition: bool,
}

// ---------------------------------------------------------------------------
// AudioPipelineCoordinator
// ---------------------------------------------------------------------------

pub struct AudioPipelineCoordinator {
    capture: CaptureStage,
    buffering: BufferingStage,
    recognition: RecognitionStage,
    chunk_queue: Arc<BoundedQueue<AudioChunk>>,
    buffer_queue: Arc<BoundedQueue<AudioBuffer>>,
    initialized: bool,
}

impl AudioPipelineCoordinator {
    pub fn new(
        input: Arc<dyn AudioInputSource>,
        source: Arc<dyn VoiceRecognitionSource>,
        callback: RecognitionCallback,
        config: &AppConfig,
    ) -> Self {
        let chunk_queue = Arc::new(BoundedQueue::new(config.pipeline.queue_capacity));
        let buffer_queue = Arc::new(BoundedQueue::new(config.pipeline.queue_capacity));

        let mut capture = CaptureStage::new(input);
        capture.set_output_queue(Arc::clone(&chunk_queue));

        let mut buffering = BufferingStage::new();
        buffering.set_input_queue(Arc::clone(&chunk_queue));
        buffering.set_output_queue(Arc::clone(&buffer_queue));

        let mut recognition = RecognitionStage::new(source, callback);
        recognition.set_input_queue(Arc::clone(&buffer_queue));

        Self {
            capture,
            buffering,
            recognition,
            chunk_queue,
            buffer_queue,
            initialized: false,
        }
    }

    /// Initialize every stage, downstream-first. Returns `false` on the
    /// first failure; already-initialized stages are left for `cleanup`.
    pub async fn initialize(&mut self, config: &AppConfig) -> bool {
        if !self.recognition.initialize(config).await {
            log::error!("pipeline: recognition stage failed to initialize");
            return false;
        }
        if !self.buffering.initialize(config).await {
            log::error!("pipeline: buffering stage failed to initialize");
            return false;
        }
        if !self.capture.initialize(config).await {
            log::error!("pipeline: capture stage failed to initialize");
            return false;
        }
        self.initialized = true;
        log::info!("pipeline: initialized");
        true
    }

    /// Start all stages, consumers before producers. On partial failure
    /// the started stages are stopped again and `false` is returned.
    pub async fn start_pipeline(&mut self) -> bool {
        if !self.initialized {
            log::error!("pipeline: start before initialize");
            return false;
        }
        // Starting a running pipeline is a no-op success; the stage-level
        // idempotence guarantees no duplicate workers either way.
        if self.is_pipeline_running() {
            return true;
        }

        if !self.recognition.start().await {
            log::error!("pipeline: recognition stage failed to start");
            return false;
        }
        if !self.buffering.start().await {
            log::error!("pipeline: buffering stage failed to start, rolling back");
            self.recognition.stop().await;
            return false;
        }
        if !self.capture.start().await {
            log::error!("pipeline: capture stage failed to start, rolling back");
            self.buffering.stop().await;
            self.recognition.stop().await;
            return false;
        }

        log::info!("pipeline: running");
        true
    }

    /// Stop all stages, producers before consumers, so queued audio drains
    /// forward before each consumer shuts down.
    pub async fn stop_pipeline(&mut self) {
        self.capture.stop().await;
        self.buffering.stop().await;
        self.recognition.stop().await;
        log::info!("pipeline: stopped");
    }

    /// True only when every stage is running.
    pub fn is_pipeline_running(&self) -> bool {
        self.capture.is_running() && self.buffering.is_running() && self.recognition.is_running()
    }

    pub fn get_stage_status(&self) -> StageStatus {
        StageStatus {
            capture: self.capture.is_running(),
            buffering: self.buffering.is_running(),
            recognition: self.recognition.is_running(),
        }
    }

    /// Stop everything, release stage resources and drain both queues.
    pub async fn cleanup(&mut self) {
        self.capture.cleanup().await;
        self.buffering.cleanup().await;
        self.recognition.cleanup().await;
        self.chunk_queue.clear();
        self.buffer_queue.clear();
        self.initialized = false;
        log::debug!("pipeline: cleaned up");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
