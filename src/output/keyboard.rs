//! Keyboard injection target via `enigo`.
//!
//! Types recognized text into whichever window currently has focus, which
//! is the whole point of the application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use enigo::{Enigo, Keyboard, Settings};

use crate::config::OutputConfig;

use super::{OutputActionTarget, OutputMetadata, OutputType};

pub struct KeyboardOutputTarget {
    enigo: Mutex<Option<Enigo>>,
    append_space: AtomicBool,
}

impl KeyboardOutputTarget {
    pub fn new() -> Self {
        Self {
            enigo: Mutex::new(None),
            append_space: AtomicBool::new(true),
        }
    }
}

impl Default for KeyboardOutputTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputActionTarget for KeyboardOutputTarget {
    fn initialize(&self, config: &OutputConfig) -> bool {
        self.append_space
            .store(config.append_space, Ordering::SeqCst);
        match Enigo::new(&Settings::default()) {
            Ok(enigo) => {
                *self.enigo.lock().unwrap() = Some(enigo);
                true
            }
            Err(e) => {
                log::error!("keyboard: failed to initialize injector: {e}");
                false
            }
        }
    }

    fn deliver_text(&self, text: &str, _metadata: &OutputMetadata) -> bool {
        let mut guard = self.enigo.lock().unwrap();
        let Some(enigo) = guard.as_mut() else {
            return false;
        };
        let payload = if self.append_space.load(Ordering::SeqCst) {
            format!("{text} ")
        } else {
            text.to_string()
        };
        match enigo.text(&payload) {
            Ok(()) => true,
            Err(e) => {
                log::error!("keyboard: injection failed: {e}");
                false
            }
        }
    }

    fn is_available(&self) -> bool {
        self.enigo.lock().unwrap().is_some()
    }

    fn get_output_type(&self) -> OutputType {
        OutputType::Keyboard
    }

    fn supports_formatting(&self) -> bool {
        false
    }

    fn cleanup(&self) {
        self.enigo.lock().unwrap().take();
    }
}
