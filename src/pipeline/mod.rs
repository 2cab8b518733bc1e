//! Asynchronous audio processing pipeline.
//!
//! Three stages connected by bounded queues:
//!
//! ```text
//!   microphone ─▶ CaptureStage ─▶ BufferingStage ─▶ RecognitionStage ─▶ text
//! ```
//!
//! [`AudioPipelineCoordinator`] owns the stages and enforces lifecycle
//! ordering; [`BoundedQueue`] carries the backpressure policies; the
//! [`PipelineStage`] trait is the seam each stage implements.

pub mod buffering;
pub mod capture;
pub mod coordinator;
pub mod queue;
pub mod recognition;
pub mod stage;

pub use buffering::BufferingStage;
pub use capture::CaptureStage;
pub use coordinator::{AudioPipelineCoordinator, StageStatus};
pub use queue::{BoundedQueue, PushOutcome};
pub use recognition::{RecognitionCallback, RecognitionStage};
pub use stage::PipelineStage;
