//! In-process callback target, for embedding the pipeline in another
//! application instead of typing into the focused window.

use std::sync::Arc;

use crate::config::OutputConfig;

use super::{OutputActionTarget, OutputMetadata, OutputType};

type DeliveryFn = Arc<dyn Fn(&str, &OutputMetadata) + Send + Sync>;

pub struct CallbackOutputTarget {
    callback: DeliveryFn,
}

impl CallbackOutputTarget {
    pub fn new(callback: DeliveryFn) -> Self {
        Self { callback }
    }
}

impl OutputActionTarget for CallbackOutputTarget {
    fn initialize(&self, _config: &OutputConfig) -> bool {
        true
    }

    fn deliver_text(&self, text: &str, metadata: &OutputMetadata) -> bool {
        (self.callback)(text, metadata);
        true
    }

    fn is_available(&self) -> bool {
        true
    }

    fn get_output_type(&self) -> OutputType {
        OutputType::Callback
    }

    fn supports_formatting(&self) -> bool {
        false
    }

    fn cleanup(&self) {}
}
