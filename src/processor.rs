//! Glue between recognition output, the state machine and text delivery.
//!
//! [`AudioProcessor::process`] runs once per recognition pass. Text arrival
//! refreshes the activity timer BEFORE the timeout check runs, so an
//! utterance landing exactly at the deadline keeps the session alive. The
//! timeout check itself runs on every pass, silent or not, which is what
//! lets a forgotten-open microphone disable itself.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use crate::output::{OutputDispatcher, OutputMetadata};
use crate::recognize::RecognitionResult;
use crate::state::{StateManager, StateMetadata, VoiceTypingState};

// ---------------------------------------------------------------------------
// AudioProcessor
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Timers {
    listening_started_at: Option<Instant>,
    last_text_at: Option<Instant>,
}

pub struct AudioProcessor {
    state: Arc<StateManager>,
    dispatcher: Arc<OutputDispatcher>,
    inactivity_timeout: Duration,
    timers: Mutex<Timers>,
}

impl AudioProcessor {
    pub fn new(
        state: Arc<StateManager>,
        dispatcher: Arc<OutputDispatcher>,
        inactivity_timeout: Duration,
    ) -> Self {
        Self {
            state,
            dispatcher,
            inactivity_timeout,
            timers: Mutex::new(Timers::default()),
        }
    }

    /// Arm the inactivity timer for a fresh listening session. Call on
    /// every entry into `Listening`.
    pub fn start_listening(&self) {
        let mut timers = self.timers.lock().unwrap();
        timers.listening_started_at = Some(Instant::now());
        timers.last_text_at = None;
    }

    /// Handle one recognition pass: deliver any text, then run the
    /// inactivity check against the current state.
    pub fn process(&self, result: Option<RecognitionResult>) {
        if let Some(result) = result {
            if !result.text.trim().is_empty() {
                self.handle_text(&result);
            }
        }
        self.check_inactivity();
    }

    /// Build the callback handed to the recognition stage.
    pub fn recognition_callback(self: &Arc<Self>) -> crate::pipeline::RecognitionCallback {
        let processor = Arc::clone(self);
        Arc::new(move |result| processor.process(result))
    }

    fn handle_text(&self, result: &RecognitionResult) {
        // Refresh activity before the timeout check so this pass's text
        // counts as activity for this pass.
        self.timers.lock().unwrap().last_text_at = Some(Instant::now());

        let metadata = OutputMetadata {
            confidence: Some(result.confidence),
            timestamp: Some(SystemTime::now()),
            source: Some("recognition".into()),
        };
        if !self.dispatcher.dispatch_text(&result.text, Some(metadata)) {
            log::warn!("processor: no output target accepted {:?}", result.text);
        }
    }

    fn check_inactivity(&self) {
        let current = self.state.get_current_state();
        let timers = self.timers.lock().unwrap();

        let (reference, source) = match current {
            // While listening, silence is measured from the last text, or
            // from session start when nothing was recognized yet.
            VoiceTypingState::Listening => (
                timers.last_text_at.or(timers.listening_started_at),
                "inactivity_timeout",
            ),
            // After finish was requested only real text arms the timer; a
            // session that never produced text waits for the final flush.
            VoiceTypingState::FinishListening => (timers.last_text_at, "finish_listening_timeout"),
            _ => return,
        };

        let Some(reference) = reference else {
            return;
        };
        if reference.elapsed() < self.inactivity_timeout {
            return;
        }
        drop(timers);

        log::info!("processor: auto-disabling after {source}");
        let mut metadata = StateMetadata::new();
        metadata.insert("source".into(), source.into());
        if !self.state.set_state(VoiceTypingState::Idle, Some(metadata)) {
            log::warn!("processor: auto-disable transition rejected from {current}");
        }
    }

    #[cfg(test)]
    fn backdate_listening_started(&self, age: Duration) {
        let mut timers = self.timers.lock().unwrap();
        timers.listening_started_at = Instant::now().checked_sub(age);
    }

    #[cfg(test)]
    fn backdate_last_text(&self, age: Duration) {
        let mut timers = self.timers.lock().unwrap();
        timers.last_text_at = Instant::now().checked_sub(age);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputType;
    use crate::testing::MockOutputTarget;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn processor_in(state: VoiceTypingState) -> (Arc<AudioProcessor>, Arc<MockOutputTarget>) {
        let manager = Arc::new(StateManager::new(VoiceTypingState::Idle));
        if state == VoiceTypingState::Listening {
            assert!(manager.set_state(VoiceTypingState::Listening, None));
        } else if state == VoiceTypingState::FinishListening {
            assert!(manager.set_state(VoiceTypingState::Listening, None));
            assert!(manager.set_state(VoiceTypingState::FinishListening, None));
        }

        let dispatcher = Arc::new(OutputDispatcher::new());
        let target = Arc::new(MockOutputTarget::new(OutputType::Callback));
        dispatcher.add_target(Arc::clone(&target) as Arc<dyn crate::output::OutputActionTarget>);

        let processor = Arc::new(AudioProcessor::new(manager, dispatcher, TIMEOUT));
        processor.start_listening();
        (processor, target)
    }

    #[test]
    fn text_is_dispatched_with_confidence_and_source() {
        let (processor, target) = processor_in(VoiceTypingState::Listening);
        processor.process(Some(RecognitionResult::new("hello", 0.8, true)));

        let deliveries = target.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "hello");
        assert_eq!(deliveries[0].1.confidence, Some(0.8));
        assert_eq!(deliveries[0].1.source.as_deref(), Some("recognition"));
        assert!(deliveries[0].1.timestamp.is_some());
    }

    #[test]
    fn whitespace_text_is_not_dispatched() {
        let (processor, target) = processor_in(VoiceTypingState::Listening);
        processor.process(Some(RecognitionResult::new("   ", 1.0, true)));
        assert_eq!(target.delivery_count(), 0);
    }

    #[test]
    fn silent_session_times_out_from_session_start() {
        let (processor, _target) = processor_in(VoiceTypingState::Listening);
        processor.backdate_listening_started(Duration::from_secs(6));
        processor.process(None);

        assert_eq!(
            processor.state.get_current_state(),
            VoiceTypingState::Idle
        );
        assert_eq!(
            processor.state.get_state_metadata().get("source").map(String::as_str),
            Some("inactivity_timeout")
        );
    }

    #[test]
    fn recent_text_keeps_an_old_session_alive() {
        let (processor, _target) = processor_in(VoiceTypingState::Listening);
        processor.backdate_listening_started(Duration::from_secs(7));
        processor.backdate_last_text(Duration::from_secs(2));
        processor.process(None);

        assert_eq!(
            processor.state.get_current_state(),
            VoiceTypingState::Listening
        );
    }

    #[test]
    fn text_arriving_on_the_deadline_pass_prevents_timeout() {
        let (processor, _target) = processor_in(VoiceTypingState::Listening);
        processor.backdate_listening_started(Duration::from_secs(10));
        // Text in the same pass refreshes the timer before the check.
        processor.process(Some(RecognitionResult::new("still here", 1.0, true)));

        assert_eq!(
            processor.state.get_current_state(),
            VoiceTypingState::Listening
        );
    }

    #[test]
    fn finish_listening_times_out_after_the_last_text() {
        let (processor, _target) = processor_in(VoiceTypingState::FinishListening);
        processor.backdate_last_text(Duration::from_secs(6));
        processor.process(None);

        assert_eq!(processor.state.get_current_state(), VoiceTypingState::Idle);
        assert_eq!(
            processor.state.get_state_metadata().get("source").map(String::as_str),
            Some("finish_listening_timeout")
        );
    }

    #[test]
    fn finish_listening_without_any_text_never_times_out() {
        let (processor, _target) = processor_in(VoiceTypingState::FinishListening);
        processor.backdate_listening_started(Duration::from_secs(60));
        processor.process(None);

        assert_eq!(
            processor.state.get_current_state(),
            VoiceTypingState::FinishListening
        );
    }

    #[test]
    fn idle_state_is_left_untouched() {
        let (processor, _target) = processor_in(VoiceTypingState::Idle);
        processor.backdate_listening_started(Duration::from_secs(60));
        processor.process(None);

        assert_eq!(processor.state.get_current_state(), VoiceTypingState::Idle);
    }

    #[test]
    fn start_listening_resets_the_timers() {
        let (processor, _target) = processor_in(VoiceTypingState::Listening);
        processor.backdate_listening_started(Duration::from_secs(10));
        processor.start_listening();
        processor.process(None);

        assert_eq!(
            processor.state.get_current_state(),
            VoiceTypingState::Listening
        );
    }
}
