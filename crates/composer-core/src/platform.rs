//! Host capability traits.
//!
//! These traits are the seam between the composer logic and whatever owns the
//! real UI. The browser crate implements them over the DOM; tests implement
//! them over plain structs so every pass can run headless.

use smol_str::SmolStr;

use crate::entity::EntityType;
use crate::error::HostError;
use crate::types::{ContentOrigin, MarkupOffset, Rect, Selection};

/// Layout measurement over the rendered container.
///
/// Rectangles are in viewport coordinates; the caret resolver converts them
/// to container-relative positions.
pub trait LayoutHost {
    /// Bounding rect of the span whose `data-offset` is `offset`.
    fn offset_span_rect(&self, offset: MarkupOffset) -> Option<Rect>;

    /// Bounding rect of the span whose `data-virtual-offset` is `offset`.
    fn virtual_span_rect(&self, offset: MarkupOffset) -> Option<Rect>;

    /// Bounding rect of the rendering container itself.
    fn container_rect(&self) -> Option<Rect>;

    /// Container margin plus padding.
    fn content_origin(&self) -> ContentOrigin;
}

/// The native text input that owns the real selection.
pub trait SelectionHost {
    /// Current `selectionStart`/`selectionEnd`.
    fn selection(&self) -> Result<Selection, HostError>;

    fn set_selection(&self, selection: Selection) -> Result<(), HostError>;

    /// Whether the input is the active element.
    fn is_focused(&self) -> bool;

    /// Length of the input's value in UTF-16 code units.
    fn text_len(&self) -> usize;
}

/// Rich-text commands understood by an editing host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    Bold,
    Italic,
    Underline,
    RemoveFormat,
}

impl EditCommand {
    /// Command name as `document.execCommand` spells it.
    pub const fn as_str(self) -> &'static str {
        match self {
            EditCommand::Bold => "bold",
            EditCommand::Italic => "italic",
            EditCommand::Underline => "underline",
            EditCommand::RemoveFormat => "removeFormat",
        }
    }
}

/// Editing operations on a contenteditable region with a saved selection.
pub trait EditingHost {
    /// HTML of the saved selection. With `drop_custom_emoji`, custom emoji
    /// images are replaced by their alt text.
    fn selected_html(&self, drop_custom_emoji: bool) -> Option<String>;

    /// Upper-case tag names from the selection's common ancestor up to the
    /// editable root, innermost first.
    fn ancestor_tags(&self) -> Vec<SmolStr>;

    /// Replace the current selection with `html`.
    fn insert_html(&self, html: &str) -> Result<(), HostError>;

    fn exec_command(&self, command: EditCommand) -> Result<(), HostError>;

    /// Replace the element enclosing the selection with its text content.
    ///
    /// The element must have tag `tag` and, when given, a matching
    /// `data-entity-type`. Returns false when no such element encloses the
    /// selection.
    fn unwrap_selected_element(
        &self,
        tag: &str,
        entity_type: Option<EntityType>,
    ) -> Result<bool, HostError>;

    /// `href` of the link enclosing the selection, if any.
    fn selected_link_href(&self) -> Option<String>;

    /// Point the link enclosing the selection at `href`. Returns false when
    /// the selection is not inside a link.
    fn set_selected_link_href(&self, href: &str) -> Result<bool, HostError>;

    /// Re-apply the saved selection to the document.
    fn restore_selection(&self) -> Result<(), HostError>;

    /// Save the document's current selection as the working selection.
    fn capture_selection(&self) -> Result<(), HostError>;
}

impl<T: LayoutHost> LayoutHost for &T {
    fn offset_span_rect(&self, offset: MarkupOffset) -> Option<Rect> {
        (*self).offset_span_rect(offset)
    }

    fn virtual_span_rect(&self, offset: MarkupOffset) -> Option<Rect> {
        (*self).virtual_span_rect(offset)
    }

    fn container_rect(&self) -> Option<Rect> {
        (*self).container_rect()
    }

    fn content_origin(&self) -> ContentOrigin {
        (*self).content_origin()
    }
}

impl<T: SelectionHost> SelectionHost for &T {
    fn selection(&self) -> Result<Selection, HostError> {
        (*self).selection()
    }

    fn set_selection(&self, selection: Selection) -> Result<(), HostError> {
        (*self).set_selection(selection)
    }

    fn is_focused(&self) -> bool {
        (*self).is_focused()
    }

    fn text_len(&self) -> usize {
        (*self).text_len()
    }
}
