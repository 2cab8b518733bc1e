//! Voice typing core.
//!
//! A push-to-talk dictation engine: a global hotkey drives a small state
//! machine, an async capture -> buffer -> recognize pipeline turns
//! microphone audio into text, and a dispatcher fans each utterance out to
//! output targets (keyboard injection, clipboard, transcript file).
//!
//! ```text
//!   hotkey ─▶ StateManager ─▶ VoiceTypingApp ─▶ AudioPipelineCoordinator
//!                                                      │
//!                              OutputDispatcher ◀── AudioProcessor
//! ```

pub mod app;
pub mod audio;
pub mod config;
pub mod hotkey;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod recognize;
pub mod state;
pub mod testing;

pub use app::VoiceTypingApp;
pub use audio::{AudioBuffer, AudioChunk, AudioInputSource, CpalAudioInput};
pub use config::{AppConfig, AppPaths};
pub use output::{OutputDispatcher, OutputMetadata, OutputType};
pub use pipeline::AudioPipelineCoordinator;
pub use processor::AudioProcessor;
pub use recognize::{RecognitionResult, VoiceRecognitionSource};
pub use state::{StateManager, StateTransition, VoiceTypingState};
