//! Formatter shortcuts from keyboard events.

use composer_core::{EditingHost, FormatOutcome, Modifiers, Result, TextFormatter};

pub fn modifiers(event: &web_sys::KeyboardEvent) -> Modifiers {
    Modifiers {
        ctrl: event.ctrl_key(),
        alt: event.alt_key(),
        shift: event.shift_key(),
        meta: event.meta_key(),
    }
}

/// Run the formatter shortcut for `event`, if it is one.
///
/// Handled events have their default action and propagation stopped so the
/// browser's own bold/italic bindings don't fire as well.
pub fn handle_formatter_keydown<H: EditingHost>(
    formatter: &mut TextFormatter<H>,
    event: &web_sys::KeyboardEvent,
) -> Result<Option<FormatOutcome>> {
    let outcome = formatter.handle_shortcut(&event.key(), modifiers(event))?;
    if outcome.is_some() {
        event.prevent_default();
        event.stop_propagation();
    }
    Ok(outcome)
}
