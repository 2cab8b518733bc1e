//! Stage abstraction for the audio pipeline.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;

use super::queue::BoundedQueue;

/// One stage of the capture -> buffer -> recognize pipeline.
///
/// # Contract
///
/// - `initialize` is called once before `start`; both return `false` on
///   failure instead of panicking so the coordinator can roll back.
/// - `stop` is idempotent and must not return until the stage's worker has
///   fully exited; no stage output may be produced after `stop` returns.
/// - `cleanup` releases resources and is safe after a failed `initialize`.
///
/// Queues are installed by the coordinator before `initialize`. A stage at
/// the edge of the pipeline leaves the corresponding setter as the default
/// no-op (capture has no input queue, recognition no output queue).
#[async_trait]
pub trait PipelineStage: Send {
    type Input: Send + 'static;
    type Output: Send + 'static;

    async fn initialize(&mut self, config: &AppConfig) -> bool;

    async fn start(&mut self) -> bool;

    async fn stop(&mut self);

    fn is_running(&self) -> bool;

    async fn cleanup(&mut self);

    fn set_input_queue(&mut self, _queue: Arc<BoundedQueue<Self::Input>>) {}

    fn set_output_queue(&mut self, _queue: Arc<BoundedQueue<Self::Output>>) {}
}
