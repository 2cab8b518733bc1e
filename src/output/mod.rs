//! Recognized-text delivery.
//!
//! [`OutputDispatcher`] fans each utterance out to every registered
//! [`OutputActionTarget`]. Concrete targets cover keyboard injection,
//! the system clipboard, a transcript file and an in-process callback.

pub mod callback;
pub mod clipboard;
pub mod dispatcher;
pub mod file;
pub mod keyboard;

pub use callback::CallbackOutputTarget;
pub use clipboard::ClipboardOutputTarget;
pub use dispatcher::{OutputDispatcher, TextListener};
pub use file::FileOutputTarget;
pub use keyboard::KeyboardOutputTarget;

use std::time::SystemTime;

use crate::config::OutputConfig;

// ---------------------------------------------------------------------------
// OutputType
// ---------------------------------------------------------------------------

/// Kind of destination a target writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Keyboard,
    Clipboard,
    File,
    Callback,
}

impl OutputType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keyboard => "keyboard",
            Self::Clipboard => "clipboard",
            Self::File => "file",
            Self::Callback => "callback",
        }
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// OutputMetadata
// ---------------------------------------------------------------------------

/// Context attached to a delivered utterance.
///
/// The dispatcher stamps `timestamp` at dispatch time when the caller left
/// it unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputMetadata {
    pub confidence: Option<f32>,
    pub timestamp: Option<SystemTime>,
    /// Origin of the text, e.g. a recognition backend name.
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// OutputActionTarget
// ---------------------------------------------------------------------------

/// One destination for recognized text.
///
/// `deliver_text` reports failure with `false` rather than panicking; the
/// dispatcher isolates targets from each other.
pub trait OutputActionTarget: Send + Sync {
    fn initialize(&self, config: &OutputConfig) -> bool;

    fn deliver_text(&self, text: &str, metadata: &OutputMetadata) -> bool;

    fn is_available(&self) -> bool;

    fn get_output_type(&self) -> OutputType;

    /// Whether the target can render formatting hints (rich text). All
    /// current targets deliver plain text.
    fn supports_formatting(&self) -> bool;

    fn cleanup(&self);
}
