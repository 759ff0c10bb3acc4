//! Core composer types: selection, offsets in the two coordinate spaces, and
//! caret geometry.
//!
//! All offsets are UTF-16 code units, the unit native text inputs report in
//! `selectionStart`/`selectionEnd`.

use std::ops::Range;

/// Offset into the compiled plain text (markup stripped).
///
/// This is the space entity offsets live in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlainOffset(pub usize);

/// Offset into the markup-inclusive text the user is typing.
///
/// Rendered `data-offset` attributes and the native input selection are in
/// this space. Never compare it against a [`PlainOffset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkupOffset(pub usize);

impl PlainOffset {
    pub fn get(self) -> usize {
        self.0
    }

    /// The offset `units` UTF-16 code units further on.
    pub fn advance(self, units: usize) -> PlainOffset {
        PlainOffset(self.0 + units)
    }

    /// Units from `start` up to this offset, zero if `start` is past it.
    pub fn since(self, start: PlainOffset) -> usize {
        self.0.saturating_sub(start.0)
    }
}

impl MarkupOffset {
    pub fn get(self) -> usize {
        self.0
    }

    /// The offset one unit before this one, if any.
    pub fn prev(self) -> Option<MarkupOffset> {
        self.0.checked_sub(1).map(MarkupOffset)
    }
}

impl std::fmt::Display for MarkupOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open selection `[start, end)` over the markup-inclusive text.
///
/// Independent of any DOM range. `start <= end` always holds; constructors
/// reorder swapped bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Create a selection, ordering the bounds.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Create a collapsed selection (caret position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Check if the selection is collapsed (caret only).
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Check if an offset is within the selection (end is exclusive).
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Clamp both bounds to a text of `len` units.
    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.start.min(len), self.end.min(len))
    }

    /// Caret position of a collapsed selection as a markup offset.
    pub fn caret(&self) -> MarkupOffset {
        MarkupOffset(self.start)
    }
}

/// Pixel position of the caret relative to the rendering container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CaretCoordinates {
    pub left: f64,
    pub top: f64,
}

impl CaretCoordinates {
    pub fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite()
    }
}

/// Rectangle reported by a layout host, in viewport coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Margin plus padding of the rendering container, used as the caret origin
/// for empty lines and empty documents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContentOrigin {
    pub left: f64,
    pub top: f64,
}

/// Length of a string in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_orders_bounds() {
        let sel = Selection::new(10, 5);
        assert_eq!(sel.start, 5);
        assert_eq!(sel.end, 10);
        assert_eq!(sel.len(), 5);
        assert_eq!(sel.to_range(), 5..10);
    }

    #[test]
    fn test_selection_collapsed() {
        let sel = Selection::collapsed(7);
        assert!(sel.is_collapsed());
        assert!(sel.is_empty());
        assert_eq!(sel.caret(), MarkupOffset(7));
    }

    #[test]
    fn test_selection_contains() {
        let sel = Selection::new(5, 10);
        assert!(!sel.contains(4));
        assert!(sel.contains(5));
        assert!(sel.contains(9));
        assert!(!sel.contains(10)); // end is exclusive
    }

    #[test]
    fn test_selection_clamp() {
        assert_eq!(Selection::new(3, 40).clamp(12), Selection::new(3, 12));
        assert_eq!(Selection::new(30, 40).clamp(12), Selection::collapsed(12));
    }

    #[test]
    fn test_utf16_len() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("😀"), 2);
        assert_eq!(utf16_len("é😀"), 3);
    }

    #[test]
    fn test_markup_offset_prev() {
        assert_eq!(MarkupOffset(0).prev(), None);
        assert_eq!(MarkupOffset(4).prev(), Some(MarkupOffset(3)));
    }
}
