//! Voice-typing state machine.
//!
//! [`VoiceTypingState`] enumerates the lifecycle phases and carries the
//! transition table as a pure function ([`VoiceTypingState::can_transition_to`]).
//! [`StateManager`] owns the single current state, validates every transition
//! against the table, records an append-only [`StateTransition`] history, and
//! notifies registered listeners synchronously on every accepted transition.
//!
//! ```text
//! IDLE ──hotkey──▶ LISTENING ──hotkey──▶ FINISH_LISTENING ──▶ PROCESSING ──▶ IDLE
//!   ▲                  │ (inactivity timeout)     │ (drain timeout)
//!   └──────────────────┴─────────────────────────┘
//! any state ──error──▶ ERROR ──▶ IDLE
//! ```

pub mod manager;

pub use manager::{StateListener, StateManager};

use std::collections::HashMap;
use std::time::SystemTime;

// ---------------------------------------------------------------------------
// VoiceTypingState
// ---------------------------------------------------------------------------

/// Lifecycle phases of the voice-typing system.
///
/// Exactly one value is current at any time, owned exclusively by
/// [`StateManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceTypingState {
    /// Waiting for the user to activate listening.
    Idle,
    /// Microphone is live; the pipeline is capturing and recognizing.
    Listening,
    /// Listening was stopped manually; remaining audio is being drained.
    FinishListening,
    /// Recognition of buffered audio is in progress.
    Processing,
    /// A recoverable error occurred; the next transition returns to `Idle`.
    Error,
}

impl VoiceTypingState {
    /// Destination states reachable from `self`.
    pub fn allowed_transitions(self) -> &'static [VoiceTypingState] {
        use VoiceTypingState::*;
        match self {
            Idle => &[Listening, Error],
            Listening => &[FinishListening, Idle, Error],
            FinishListening => &[Processing, Idle, Error],
            Processing => &[Idle, Error],
            Error => &[Idle],
        }
    }

    /// Pure predicate against the transition table.
    pub fn can_transition_to(self, to: VoiceTypingState) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// A short human-readable label for logs and status display.
    pub fn label(&self) -> &'static str {
        match self {
            VoiceTypingState::Idle => "idle",
            VoiceTypingState::Listening => "listening",
            VoiceTypingState::FinishListening => "finish_listening",
            VoiceTypingState::Processing => "processing",
            VoiceTypingState::Error => "error",
        }
    }
}

impl Default for VoiceTypingState {
    fn default() -> Self {
        VoiceTypingState::Idle
    }
}

impl std::fmt::Display for VoiceTypingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// StateMetadata
// ---------------------------------------------------------------------------

/// Key→value annotations attached to a transition (e.g. the transition
/// source: `"inactivity_timeout"`).
pub type StateMetadata = HashMap<String, String>;

// ---------------------------------------------------------------------------
// StateTransition
// ---------------------------------------------------------------------------

/// Immutable record of one accepted state transition.
///
/// Created inside [`StateManager::set_state`], appended to the history list,
/// and handed to every listener. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from_state: VoiceTypingState,
    pub to_state: VoiceTypingState,
    /// Wall-clock time the transition was accepted.
    pub timestamp: SystemTime,
    pub metadata: StateMetadata,
}

impl StateTransition {
    pub fn new(
        from_state: VoiceTypingState,
        to_state: VoiceTypingState,
        metadata: StateMetadata,
    ) -> Self {
        Self {
            from_state,
            to_state,
            timestamp: SystemTime::now(),
            metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
