//! Logical selection kept in step with the native text input.

use std::time::Duration;

use web_time::Instant;

use crate::caret::caret_coordinates;
use crate::config::ComposerConfig;
use crate::error::Result;
use crate::platform::{LayoutHost, SelectionHost};
use crate::types::{CaretCoordinates, Selection};

/// Native events that may move the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    SelectionChange,
    Input,
    KeyUp,
    Focus,
}

/// Lets at most one call through per interval.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    interval: Duration,
    last: Option<Instant>,
}

impl DebounceGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a call at `now` may proceed. A passing call restarts the
    /// interval.
    pub fn try_pass(&mut self, now: Instant) -> bool {
        let open = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if open {
            self.last = Some(now);
        }
        open
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Tracks the `{start, end}` selection of the composer.
#[derive(Debug, Clone)]
pub struct SelectionController {
    selection: Selection,
    keyup_gate: DebounceGate,
}

impl SelectionController {
    pub fn new(config: &ComposerConfig) -> Self {
        Self {
            selection: Selection::default(),
            keyup_gate: DebounceGate::new(config.keyup_debounce()),
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Resync from the host after `event`. Returns whether the selection
    /// changed.
    pub fn handle<H: SelectionHost>(&mut self, host: &H, event: SelectionEvent) -> Result<bool> {
        self.handle_at(host, event, Instant::now())
    }

    pub fn handle_at<H: SelectionHost>(
        &mut self,
        host: &H,
        event: SelectionEvent,
        now: Instant,
    ) -> Result<bool> {
        // Selection changes elsewhere in the document are not ours.
        if !host.is_focused() {
            return Ok(false);
        }
        if event == SelectionEvent::KeyUp && !self.keyup_gate.try_pass(now) {
            tracing::trace!(target: "composer::selection", "keyup sync debounced");
            return Ok(false);
        }

        let selection = host.selection()?.clamp(host.text_len());
        if selection == self.selection {
            return Ok(false);
        }

        tracing::trace!(
            target: "composer::selection",
            ?event,
            start = selection.start,
            end = selection.end,
            "selection synced"
        );
        self.selection = selection;
        Ok(true)
    }

    /// Move the native selection and adopt it.
    pub fn set_selection<H: SelectionHost>(&mut self, host: &H, selection: Selection) -> Result<()> {
        let selection = selection.clamp(host.text_len());
        host.set_selection(selection)?;
        self.selection = selection;
        Ok(())
    }

    /// Pixel position of the caret at the selection start.
    pub fn caret_coordinates<L: LayoutHost>(&self, layout: &L) -> CaretCoordinates {
        caret_coordinates(layout, self.selection.caret())
    }

    /// Forget the selection, e.g. after the draft was cleared.
    pub fn reset(&mut self) {
        self.selection = Selection::default();
        self.keyup_gate.reset();
    }
}
