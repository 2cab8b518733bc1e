//! Clipboard target via `arboard`.
//!
//! `arboard::Clipboard` holds a connection to the display server, so a
//! fresh handle is opened per delivery rather than kept across the long
//! idle gaps between utterances.

use std::sync::atomic::{AtomicBool, Ordering};

use arboard::Clipboard;

use crate::config::OutputConfig;

use super::{OutputActionTarget, OutputMetadata, OutputType};

pub struct ClipboardOutputTarget {
    initialized: AtomicBool,
}

impl ClipboardOutputTarget {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
        }
    }
}

impl Default for ClipboardOutputTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputActionTarget for ClipboardOutputTarget {
    fn initialize(&self, _config: &OutputConfig) -> bool {
        match Clipboard::new() {
            Ok(_) => {
                self.initialized.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                log::error!("clipboard: unavailable: {e}");
                false
            }
        }
    }

    fn deliver_text(&self, text: &str, _metadata: &OutputMetadata) -> bool {
        match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => true,
            Err(e) => {
                log::error!("clipboard: failed to set text: {e}");
                false
            }
        }
    }

    fn is_available(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn get_output_type(&self) -> OutputType {
        OutputType::Clipboard
    }

    fn supports_formatting(&self) -> bool {
        false
    }

    fn cleanup(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }
}
