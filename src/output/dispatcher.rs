//! Fan-out of recognized text to registered targets and listeners.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use super::{OutputActionTarget, OutputMetadata, OutputType};

/// Observer notified of every dispatched utterance, after the targets.
pub type TextListener = Arc<dyn Fn(&str, &OutputMetadata) + Send + Sync>;

fn same_listener(a: &TextListener, b: &TextListener) -> bool {
    // Compare data pointers; fat-pointer comparison would also compare
    // vtable addresses, which are not unique across codegen units.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

// ---------------------------------------------------------------------------
// OutputDispatcher
// ---------------------------------------------------------------------------

struct DispatcherInner {
    targets: Vec<Arc<dyn OutputActionTarget>>,
    listeners: Vec<TextListener>,
}

/// Delivers each utterance to every registered target.
///
/// Targets are isolated from each other: one failing (or panicking) target
/// never prevents delivery to the rest. Dispatch succeeds when at least one
/// target accepted the text.
pub struct OutputDispatcher {
    inner: Mutex<DispatcherInner>,
}

impl OutputDispatcher {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DispatcherInner {
                targets: Vec::new(),
                listeners: Vec::new(),
            }),
        }
    }

    /// Register a target. Unavailable targets are refused so dead
    /// destinations never dilute dispatch results.
    pub fn add_target(&self, target: Arc<dyn OutputActionTarget>) -> bool {
        if !target.is_available() {
            log::warn!(
                "output: refusing unavailable target {}",
                target.get_output_type()
            );
            return false;
        }
        log::debug!("output: registered target {}", target.get_output_type());
        self.inner.lock().unwrap().targets.push(target);
        true
    }

    /// Remove all targets of the given type. Returns `true` when at least
    /// one was removed.
    pub fn remove_target(&self, output_type: OutputType) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.targets.len();
        inner
            .targets
            .retain(|target| target.get_output_type() != output_type);
        inner.targets.len() < before
    }

    pub fn target_count(&self) -> usize {
        self.inner.lock().unwrap().targets.len()
    }

    pub fn add_text_listener(&self, listener: TextListener) {
        self.inner.lock().unwrap().listeners.push(listener);
    }

    pub fn remove_text_listener(&self, listener: &TextListener) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.listeners.len();
        inner.listeners.retain(|l| !same_listener(l, listener));
        inner.listeners.len() < before
    }

    /// Deliver `text` to every registered target and notify listeners.
    ///
    /// Empty (or whitespace-only) text is rejected. A missing timestamp is
    /// stamped with the current time before delivery, so all targets see
    /// the same metadata. Returns `true` when at least one target accepted
    /// the text.
    pub fn dispatch_text(&self, text: &str, metadata: Option<OutputMetadata>) -> bool {
        if text.trim().is_empty() {
            log::warn!("output: rejecting empty text");
            return false;
        }

        let mut metadata = metadata.unwrap_or_default();
        if metadata.timestamp.is_none() {
            metadata.timestamp = Some(SystemTime::now());
        }

        let (targets, listeners) = {
            let inner = self.inner.lock().unwrap();
            (inner.targets.clone(), inner.listeners.clone())
        };

        let mut successes = 0usize;
        for target in &targets {
            if !target.is_available() {
                log::warn!("output: target {} unavailable, skipping", target.get_output_type());
                continue;
            }
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                target.deliver_text(text, &metadata)
            }));
            match delivered {
                Ok(true) => successes += 1,
                Ok(false) => {
                    log::warn!("output: target {} refused delivery", target.get_output_type());
                }
                Err(_) => {
                    log::error!("output: target {} panicked", target.get_output_type());
                }
            }
        }

        for listener in &listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(text, &metadata))).is_err() {
                log::error!("output: text listener panicked");
            }
        }

        log::debug!(
            "output: dispatched {:?} to {}/{} targets",
            text,
            successes,
            targets.len()
        );
        successes > 0
    }

    /// Release every target and drop all registrations.
    pub fn cleanup(&self) {
        let mut inner = self.inner.lock().unwrap();
        for target in &inner.targets {
            target.cleanup();
        }
        inner.targets.clear();
        inner.listeners.clear();
    }
}

impl Default for OutputDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockOutputTarget;

    #[test]
    fn empty_text_is_rejected_before_any_delivery() {
        let dispatcher = OutputDispatcher::new();
        let target = Arc::new(MockOutputTarget::new(OutputType::Callback));
        assert!(dispatcher.add_target(Arc::clone(&target) as Arc<dyn OutputActionTarget>));

        assert!(!dispatcher.dispatch_text("", None));
        assert!(!dispatcher.dispatch_text("   ", None));
        assert_eq!(target.delivery_count(), 0);
    }

    #[test]
    fn fan_out_reaches_every_target() {
        let dispatcher = OutputDispatcher::new();
        let first = Arc::new(MockOutputTarget::new(OutputType::Keyboard));
        let second = Arc::new(MockOutputTarget::new(OutputType::Clipboard));
        dispatcher.add_target(Arc::clone(&first) as Arc<dyn OutputActionTarget>);
        dispatcher.add_target(Arc::clone(&second) as Arc<dyn OutputActionTarget>);

        assert!(dispatcher.dispatch_text("hello", None));
        assert_eq!(first.delivery_count(), 1);
        assert_eq!(second.delivery_count(), 1);
    }

    #[test]
    fn missing_timestamp_is_stamped_once_for_all_targets() {
        let dispatcher = OutputDispatcher::new();
        let first = Arc::new(MockOutputTarget::new(OutputType::Keyboard));
        let second = Arc::new(MockOutputTarget::new(OutputType::File));
        dispatcher.add_target(Arc::clone(&first) as Arc<dyn OutputActionTarget>);
        dispatcher.add_target(Arc::clone(&second) as Arc<dyn OutputActionTarget>);

        assert!(dispatcher.dispatch_text("hi", None));
        let stamp_a = first.deliveries()[0].1.timestamp;
        let stamp_b = second.deliveries()[0].1.timestamp;
        assert!(stamp_a.is_some());
        assert_eq!(stamp_a, stamp_b);
    }

    #[test]
    fn provided_timestamp_is_preserved() {
        let dispatcher = OutputDispatcher::new();
        let target = Arc::new(MockOutputTarget::new(OutputType::Callback));
        dispatcher.add_target(Arc::clone(&target) as Arc<dyn OutputActionTarget>);

        let stamp = SystemTime::UNIX_EPOCH;
        let metadata = OutputMetadata {
            timestamp: Some(stamp),
            ..Default::default()
        };
        assert!(dispatcher.dispatch_text("hi", Some(metadata)));
        assert_eq!(target.deliveries()[0].1.timestamp, Some(stamp));
    }

    #[test]
    fn one_failing_target_does_not_block_the_rest() {
        let dispatcher = OutputDispatcher::new();
        let failing = Arc::new(MockOutputTarget::new(OutputType::Keyboard));
        failing.fail_deliveries(true);
        let healthy = Arc::new(MockOutputTarget::new(OutputType::Clipboard));
        dispatcher.add_target(Arc::clone(&failing) as Arc<dyn OutputActionTarget>);
        dispatcher.add_target(Arc::clone(&healthy) as Arc<dyn OutputActionTarget>);

        assert!(dispatcher.dispatch_text("hello", None));
        assert_eq!(healthy.delivery_count(), 1);
    }

    #[test]
    fn all_targets_failing_means_dispatch_failed() {
        let dispatcher = OutputDispatcher::new();
        let target = Arc::new(MockOutputTarget::new(OutputType::Keyboard));
        target.fail_deliveries(true);
        dispatcher.add_target(Arc::clone(&target) as Arc<dyn OutputActionTarget>);

        assert!(!dispatcher.dispatch_text("hello", None));
    }

    #[test]
    fn no_targets_means_dispatch_failed() {
        let dispatcher = OutputDispatcher::new();
        assert!(!dispatcher.dispatch_text("hello", None));
    }

    #[test]
    fn unavailable_target_is_refused_at_registration() {
        let dispatcher = OutputDispatcher::new();
        let target = Arc::new(MockOutputTarget::new(OutputType::Keyboard));
        target.set_available(false);
        assert!(!dispatcher.add_target(target));
        assert_eq!(dispatcher.target_count(), 0);
    }

    #[test]
    fn target_going_unavailable_is_skipped_at_dispatch() {
        let dispatcher = OutputDispatcher::new();
        let target = Arc::new(MockOutputTarget::new(OutputType::Keyboard));
        dispatcher.add_target(Arc::clone(&target) as Arc<dyn OutputActionTarget>);
        target.set_available(false);

        assert!(!dispatcher.dispatch_text("hello", None));
        assert_eq!(target.delivery_count(), 0);
    }

    #[test]
    fn remove_target_by_type() {
        let dispatcher = OutputDispatcher::new();
        dispatcher.add_target(Arc::new(MockOutputTarget::new(OutputType::Keyboard)));
        dispatcher.add_target(Arc::new(MockOutputTarget::new(OutputType::Clipboard)));

        assert!(dispatcher.remove_target(OutputType::Keyboard));
        assert_eq!(dispatcher.target_count(), 1);
        assert!(!dispatcher.remove_target(OutputType::Keyboard));
    }

    #[test]
    fn listeners_observe_every_dispatch() {
        let dispatcher = OutputDispatcher::new();
        let target = Arc::new(MockOutputTarget::new(OutputType::Callback));
        dispatcher.add_target(target);

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: TextListener =
            Arc::new(move |text, _metadata| sink.lock().unwrap().push(text.to_string()));
        dispatcher.add_text_listener(Arc::clone(&listener));

        dispatcher.dispatch_text("one", None);
        dispatcher.dispatch_text("two", None);
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);

        assert!(dispatcher.remove_text_listener(&listener));
        dispatcher.dispatch_text("three", None);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn panicking_listener_does_not_poison_dispatch() {
        let dispatcher = OutputDispatcher::new();
        let target = Arc::new(MockOutputTarget::new(OutputType::Callback));
        dispatcher.add_target(Arc::clone(&target) as Arc<dyn OutputActionTarget>);

        dispatcher.add_text_listener(Arc::new(|_, _| panic!("listener bug")));
        assert!(dispatcher.dispatch_text("hello", None));
        assert_eq!(target.delivery_count(), 1);
        // A second dispatch still works.
        assert!(dispatcher.dispatch_text("again", None));
    }

    #[test]
    fn cleanup_drops_all_registrations() {
        let dispatcher = OutputDispatcher::new();
        dispatcher.add_target(Arc::new(MockOutputTarget::new(OutputType::Keyboard)));
        dispatcher.cleanup();
        assert_eq!(dispatcher.target_count(), 0);
        assert!(!dispatcher.dispatch_text("hello", None));
    }
}
