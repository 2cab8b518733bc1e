//! Background thread wrapping `rdev::listen`.

use std::sync::mpsc;

use rdev::{Event, EventType, Key};

use super::HotkeyEvent;

/// Listens for one key globally and queues its press/release edges.
///
/// `rdev::listen` blocks its thread forever and offers no shutdown, so the
/// thread is detached and simply dies with the process. Events for keys
/// other than the configured one are discarded at the source.
pub struct HotkeyListener {
    rx: mpsc::Receiver<HotkeyEvent>,
}

impl HotkeyListener {
    /// Spawn the listener thread. Returns `None` when the thread cannot
    /// be spawned; grab failures inside the thread are logged instead,
    /// since `rdev` only reports them asynchronously.
    pub fn start(key: Key) -> Option<Self> {
        let (tx, rx) = mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event: Event| {
                    let edge = match event.event_type {
                        EventType::KeyPress(k) if k == key => HotkeyEvent::Pressed,
                        EventType::KeyRelease(k) if k == key => HotkeyEvent::Released,
                        _ => return,
                    };
                    // The receiver dropping just means the app is exiting.
                    let _ = tx.send(edge);
                });
                if let Err(e) = result {
                    log::error!("hotkey: global listener failed: {e:?}");
                }
            });

        match spawned {
            Ok(_) => Some(Self { rx }),
            Err(e) => {
                log::error!("hotkey: failed to spawn listener thread: {e}");
                None
            }
        }
    }

    /// Drain one queued event without blocking.
    pub fn try_recv(&self) -> Option<HotkeyEvent> {
        self.rx.try_recv().ok()
    }
}
