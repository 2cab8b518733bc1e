//! Application supervisor.
//!
//! Owns the state machine, the pipeline coordinator and the output
//! dispatcher, and keeps them consistent: the pipeline runs exactly while
//! the session is in `Listening` or `FinishListening`, and the hotkey
//! walks the state machine forward one step per press.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::audio::AudioInputSource;
use crate::config::AppConfig;
use crate::hotkey::{HotkeyEvent, HotkeyListener};
use crate::output::OutputDispatcher;
use crate::pipeline::AudioPipelineCoordinator;
use crate::processor::AudioProcessor;
use crate::recognize::VoiceRecognitionSource;
use crate::state::{StateManager, StateMetadata, VoiceTypingState};

/// Supervisor poll interval.
const TICK: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// VoiceTypingApp
// ---------------------------------------------------------------------------

pub struct VoiceTypingApp {
    config: AppConfig,
    state: Arc<StateManager>,
    dispatcher: Arc<OutputDispatcher>,
    processor: Arc<AudioProcessor>,
    coordinator: AudioPipelineCoordinator,
}

impl VoiceTypingApp {
    pub fn new(
        config: AppConfig,
        input: Arc<dyn AudioInputSource>,
        source: Arc<dyn VoiceRecognitionSource>,
    ) -> Self {
        let state = Arc::new(StateManager::new(VoiceTypingState::Idle));
        let dispatcher = Arc::new(OutputDispatcher::new());
        let processor = Arc::new(AudioProcessor::new(
            Arc::clone(&state),
            Arc::clone(&dispatcher),
            Duration::from_secs(config.pipeline.inactivity_timeout_secs),
        ));

        // Each entry into Listening re-arms the inactivity timer.
        let timer_owner = Arc::clone(&processor);
        state.register_state_listener(Arc::new(move |transition| {
            if transition.to_state == VoiceTypingState::Listening {
                timer_owner.start_listening();
            }
        }));

        let coordinator = AudioPipelineCoordinator::new(
            input,
            source,
            processor.recognition_callback(),
            &config,
        );

        Self {
            config,
            state,
            dispatcher,
            processor,
            coordinator,
        }
    }

    pub fn state_manager(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn dispatcher(&self) -> &Arc<OutputDispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn processor(&self) -> &Arc<AudioProcessor> {
        &self.processor
    }

    /// Initialize the pipeline stages. Must succeed before `run`.
    pub async fn initialize(&mut self) -> bool {
        let config = self.config.clone();
        self.coordinator.initialize(&config).await
    }

    /// Advance the state machine one step, as the hotkey does.
    pub fn handle_toggle(&self) {
        let mut metadata = StateMetadata::new();
        metadata.insert("source".into(), "hotkey".into());

        let target = match self.state.get_current_state() {
            VoiceTypingState::Idle => VoiceTypingState::Listening,
            VoiceTypingState::Listening => VoiceTypingState::FinishListening,
            VoiceTypingState::Error => VoiceTypingState::Idle,
            // Mid-flight states ignore the hotkey.
            other => {
                log::debug!("app: hotkey ignored in state {other}");
                return;
            }
        };
        self.state.set_state(target, Some(metadata));
    }

    /// Reconcile the pipeline with the current state: start it when a
    /// session is active, stop it otherwise. A failed start moves the
    /// state machine to `Error`.
    pub async fn tick(&mut self) {
        let active = matches!(
            self.state.get_current_state(),
            VoiceTypingState::Listening | VoiceTypingState::FinishListening
        );
        let running = self.coordinator.is_pipeline_running();

        if active && !running {
            if !self.coordinator.start_pipeline().await {
                let mut metadata = StateMetadata::new();
                metadata.insert("source".into(), "pipeline_start_failed".into());
                self.state.set_state(VoiceTypingState::Error, Some(metadata));
            }
        } else if !active && running {
            self.coordinator.stop_pipeline().await;
        }
    }

    /// Main loop: poll the hotkey and reconcile until Ctrl-C.
    pub async fn run(&mut self, hotkey: Option<HotkeyListener>) -> Result<()> {
        log::info!("app: ready, press the hotkey to start listening");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(TICK) => {
                    if let Some(listener) = &hotkey {
                        while let Some(event) = listener.try_recv() {
                            if event == HotkeyEvent::Released {
                                self.handle_toggle();
                            }
                        }
                    }
                    self.tick().await;
                }
            }
        }
        log::info!("app: shutting down");
        self.shutdown().await;
        Ok(())
    }

    /// Stop the pipeline and release every component.
    pub async fn shutdown(&mut self) {
        self.coordinator.cleanup().await;
        self.dispatcher.cleanup();
        self.state.reset_state();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
