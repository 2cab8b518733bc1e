//! Global hotkey handling via `rdev`.
//!
//! One configurable key toggles the session: press-and-release walks the
//! state machine forward (idle starts listening, listening finishes, an
//! error acknowledges back to idle).

pub mod listener;

pub use listener::HotkeyListener;

use rdev::Key;

/// Edge of the hotkey press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    Pressed,
    Released,
}

/// Parse a configured key name. Case-insensitive; returns `None` for
/// anything unrecognized so the caller can fall back to its default.
pub fn parse_key(name: &str) -> Option<Key> {
    let key = match name.to_ascii_uppercase().as_str() {
        "F1" => Key::F1,
        "F2" => Key::F2,
        "F3" => Key::F3,
        "F4" => Key::F4,
        "F5" => Key::F5,
        "F6" => Key::F6,
        "F7" => Key::F7,
        "F8" => Key::F8,
        "F9" => Key::F9,
        "F10" => Key::F10,
        "F11" => Key::F11,
        "F12" => Key::F12,
        "SPACE" => Key::Space,
        "TAB" => Key::Tab,
        "HOME" => Key::Home,
        "END" => Key::End,
        "INSERT" => Key::Insert,
        "PAUSE" => Key::Pause,
        "SCROLLLOCK" | "SCROLL_LOCK" => Key::ScrollLock,
        _ => return None,
    };
    Some(key)
}
