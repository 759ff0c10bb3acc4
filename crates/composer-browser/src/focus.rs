//! Deferred focus restoration.
//!
//! A mousedown on the rendered content moves focus to it before our handler
//! runs, so the textarea is refocused after the event settles. Some engines
//! drop the first refocus, hence the retry.

use composer_core::ComposerConfig;
use gloo_timers::callback::Timeout;

use crate::input::TextareaInput;

/// Focus `input` once after the event loop turns.
pub fn focus_soon(input: &TextareaInput, config: &ComposerConfig) {
    let input = input.clone();
    Timeout::new(config.focus_restore_delay_ms, move || input.focus()).forget();
}

/// Focus `input` after the event loop turns, then again after the retry delay.
pub fn focus_with_retry(input: &TextareaInput, config: &ComposerConfig) {
    let input = input.clone();
    let retry_delay = config.focus_retry_delay_ms;
    Timeout::new(config.focus_restore_delay_ms, move || {
        input.focus();
        Timeout::new(retry_delay, move || {
            if !composer_core::SelectionHost::is_focused(&input) {
                tracing::trace!(target: "composer::focus", "retrying focus");
                input.focus();
            }
        })
        .forget();
    })
    .forget();
}
