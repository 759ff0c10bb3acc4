//! Composer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for a composer instance.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Longest message text, in UTF-16 code units.
    pub max_message_length: usize,

    /// Longest caption when attachments are present.
    pub caption_limit: usize,

    /// Minimum gap between keyup-driven selection syncs.
    pub keyup_debounce_ms: u64,

    /// Delay before refocusing the input after a pointer-down.
    pub focus_restore_delay_ms: u32,

    /// Delay of the second refocus attempt, after the first one ran.
    pub focus_retry_delay_ms: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_message_length: 4096,
            caption_limit: 1024,
            keyup_debounce_ms: 50,
            focus_restore_delay_ms: 0,
            focus_retry_delay_ms: 50,
        }
    }
}

impl ComposerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Length limit for a draft, depending on whether it is a caption.
    pub fn length_limit(&self, is_caption: bool) -> usize {
        if is_caption {
            self.caption_limit
        } else {
            self.max_message_length
        }
    }

    pub fn keyup_debounce(&self) -> Duration {
        Duration::from_millis(self.keyup_debounce_ms)
    }
}
