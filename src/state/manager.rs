//! Centralized state manager with validated transitions and listener fan-out.
//!
//! [`StateManager`] is the single owner of the current [`VoiceTypingState`].
//! `set_state` executes check → mutate → record → notify as one logical
//! atomic section: concurrent callers (hotkey thread, inactivity-timeout
//! path) serialize on an internal mutex, and listeners always observe a
//! self-consistent, already-updated current state.
//!
//! # Re-entrant transitions
//!
//! A listener reacting to a transition may itself call `set_state` (e.g.
//! reacting to `FinishListening` by requesting `Processing`). Such re-entrant
//! requests are **deferred**: they are validated against the in-progress
//! state, queued, and applied (each with its own notification pass) after
//! the current pass finishes. This keeps notification ordering strictly
//! sequential: no listener ever observes transition N+1 before every listener
//! has seen transition N.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use super::{StateMetadata, StateTransition, VoiceTypingState};

// ---------------------------------------------------------------------------
// StateListener
// ---------------------------------------------------------------------------

/// Callback invoked synchronously on every accepted transition.
///
/// Registration uses `Arc` identity for set semantics: registering the same
/// `Arc` twice has no additional effect, and unregistering an unknown one is
/// a no-op.
pub type StateListener = Arc<dyn Fn(&StateTransition) + Send + Sync>;

/// Compare two listeners by the address of their underlying allocation.
///
/// `Arc::ptr_eq` on trait objects also compares vtable pointers, which is not
/// a stable notion of identity across codegen units; the data pointer is.
fn same_listener(a: &StateListener, b: &StateListener) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

// ---------------------------------------------------------------------------
// StateManager
// ---------------------------------------------------------------------------

struct Inner {
    current: VoiceTypingState,
    history: Vec<StateTransition>,
    metadata: StateMetadata,
    listeners: Vec<StateListener>,
    /// True while a notification pass is running on some thread.
    notifying: bool,
    /// Transitions requested during a notification pass, applied afterwards.
    pending: VecDeque<(VoiceTypingState, StateMetadata)>,
}

/// Finite-state machine owner for the voice-typing lifecycle.
///
/// Cheap to share via `Arc<StateManager>`; all methods take `&self`.
pub struct StateManager {
    inner: Mutex<Inner>,
}

impl StateManager {
    /// Create a manager starting in the given state (normally `Idle`).
    pub fn new(initial_state: VoiceTypingState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial_state,
                history: Vec::new(),
                metadata: StateMetadata::new(),
                listeners: Vec::new(),
                notifying: false,
                pending: VecDeque::new(),
            }),
        }
    }

    /// O(1) read of the current state.
    pub fn get_current_state(&self) -> VoiceTypingState {
        self.inner.lock().unwrap().current
    }

    /// Whether a transition to `state` is valid from the current state.
    pub fn can_transition_to(&self, state: VoiceTypingState) -> bool {
        self.inner.lock().unwrap().current.can_transition_to(state)
    }

    /// Request a transition to `new_state`.
    ///
    /// Returns `false`, with no side effects, no history entry and no
    /// listener notification, when the transition table rejects the request.
    /// On success the state is updated, the metadata merged (last write
    /// wins), a [`StateTransition`] appended to history, and every listener
    /// invoked exactly once with that transition. A listener panic is caught
    /// and logged; remaining listeners still run.
    ///
    /// Called re-entrantly from inside a listener, a valid request is
    /// deferred (see module docs) and `true` means "accepted for deferral";
    /// a deferred request that is no longer valid when its turn comes is
    /// dropped with a warning.
    pub fn set_state(&self, new_state: VoiceTypingState, metadata: Option<StateMetadata>) -> bool {
        let metadata = metadata.unwrap_or_default();
        let mut inner = self.inner.lock().unwrap();

        if !inner.current.can_transition_to(new_state) {
            return false;
        }

        if inner.notifying {
            inner.pending.push_back((new_state, metadata));
            return true;
        }

        inner.notifying = true;
        let mut transition = Self::apply(&mut inner, new_state, metadata);

        loop {
            let listeners = inner.listeners.clone();
            drop(inner);

            for listener in &listeners {
                let result = catch_unwind(AssertUnwindSafe(|| listener(&transition)));
                if result.is_err() {
                    log::error!(
                        "state: listener panicked during {} -> {} notification",
                        transition.from_state,
                        transition.to_state
                    );
                }
            }

            inner = self.inner.lock().unwrap();

            // Apply deferred transitions one at a time, revalidating each
            // against the state it will actually leave from.
            let next = loop {
                match inner.pending.pop_front() {
                    Some((state, meta)) if inner.current.can_transition_to(state) => {
                        break Some((state, meta));
                    }
                    Some((state, _)) => {
                        log::warn!(
                            "state: dropping deferred transition {} -> {} (no longer valid)",
                            inner.current,
                            state
                        );
                    }
                    None => break None,
                }
            };

            match next {
                Some((state, meta)) => transition = Self::apply(&mut inner, state, meta),
                None => {
                    inner.notifying = false;
                    break;
                }
            }
        }

        true
    }

    /// Mutate `inner` for an already-validated transition and return the
    /// record to notify with.
    fn apply(
        inner: &mut Inner,
        new_state: VoiceTypingState,
        metadata: StateMetadata,
    ) -> StateTransition {
        let from = inner.current;
        inner.current = new_state;
        inner
            .metadata
            .extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));

        let transition = StateTransition::new(from, new_state, metadata);
        inner.history.push(transition.clone());

        log::debug!("state: {} -> {}", from, new_state);
        transition
    }

    /// Register `listener`; no additional effect if the same `Arc` is
    /// already registered.
    pub fn register_state_listener(&self, listener: StateListener) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.listeners.iter().any(|l| same_listener(l, &listener)) {
            inner.listeners.push(listener);
        }
    }

    /// Unregister `listener`; a no-op when it was never registered.
    pub fn unregister_state_listener(&self, listener: &StateListener) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.retain(|l| !same_listener(l, listener));
    }

    /// Transition history, most-recent-last. `limit` returns the last N.
    pub fn get_state_history(&self, limit: Option<usize>) -> Vec<StateTransition> {
        let inner = self.inner.lock().unwrap();
        match limit {
            None => inner.history.clone(),
            Some(n) => {
                let start = inner.history.len().saturating_sub(n);
                inner.history[start..].to_vec()
            }
        }
    }

    /// Metadata merged across transitions, last write wins.
    pub fn get_state_metadata(&self) -> StateMetadata {
        self.inner.lock().unwrap().metadata.clone()
    }

    /// Administrative reset: force `Idle`, clear history, metadata and any
    /// deferred transitions. Listeners are **not** notified.
    pub fn reset_state(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.current = VoiceTypingState::Idle;
        inner.history.clear();
        inner.metadata.clear();
        inner.pending.clear();
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new(VoiceTypingState::Idle)
    }
}

impl std::fmt::Debug for StateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("StateManager")
            .field("current", &inner.current)
            .field("history_len", &inner.history.len())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
