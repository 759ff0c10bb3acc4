//! Caret geometry and pointer mapping.
//!
//! Offsets to pixels go through an ordered list of resolver strategies over a
//! [`LayoutHost`]; the first that answers wins and the container origin is the
//! floor, so resolution never fails. Pixels to offsets work on the render
//! layout plus whatever the host reports for the hit-tested range.

use crate::platform::LayoutHost;
use crate::render::RenderedSpan;
use crate::types::{CaretCoordinates, MarkupOffset, Selection};

/// A single caret strategy.
type Resolver = fn(&dyn LayoutHost, MarkupOffset) -> Option<CaretCoordinates>;

/// Strategies in the order they are tried.
const RESOLVERS: [(&str, Resolver); 4] = [
    ("virtual_before", virtual_before),
    ("glyph_before", glyph_before),
    ("virtual_at", virtual_at),
    ("glyph_at", glyph_at),
];

/// Caret position for `position`, relative to the rendering container.
pub fn caret_coordinates<H: LayoutHost>(host: &H, position: MarkupOffset) -> CaretCoordinates {
    let host: &dyn LayoutHost = host;

    for (name, resolve) in RESOLVERS {
        if let Some(coords) = resolve(host, position).filter(CaretCoordinates::is_finite) {
            tracing::trace!(
                target: "composer::caret",
                position = position.0,
                strategy = name,
                left = coords.left,
                top = coords.top,
                "resolved caret"
            );
            return coords;
        }
    }

    tracing::trace!(
        target: "composer::caret",
        position = position.0,
        "no span for caret, using content origin"
    );
    origin_fallback(host)
}

/// Newline-start anchor at `pos - 1`: the caret sits at the start of the
/// line that follows that newline.
fn virtual_before(host: &dyn LayoutHost, position: MarkupOffset) -> Option<CaretCoordinates> {
    line_start(host, position.prev()?)
}

/// Glyph at `pos - 1`: the caret sits after it.
fn glyph_before(host: &dyn LayoutHost, position: MarkupOffset) -> Option<CaretCoordinates> {
    let span = host.offset_span_rect(position.prev()?)?;
    let container = host.container_rect()?;
    Some(CaretCoordinates::new(
        span.right - container.left,
        span.top - container.top,
    ))
}

fn virtual_at(host: &dyn LayoutHost, position: MarkupOffset) -> Option<CaretCoordinates> {
    line_start(host, position)
}

/// Glyph at `pos`: the caret sits before it.
fn glyph_at(host: &dyn LayoutHost, position: MarkupOffset) -> Option<CaretCoordinates> {
    let span = host.offset_span_rect(position)?;
    let container = host.container_rect()?;
    Some(CaretCoordinates::new(
        span.left - container.left,
        span.top - container.top,
    ))
}

fn line_start(host: &dyn LayoutHost, anchor: MarkupOffset) -> Option<CaretCoordinates> {
    let span = host.virtual_span_rect(anchor)?;
    let container = host.container_rect()?;
    let origin = host.content_origin();
    Some(CaretCoordinates::new(origin.left, span.top - container.top))
}

fn origin_fallback(host: &dyn LayoutHost) -> CaretCoordinates {
    let origin = host.content_origin();
    let coords = CaretCoordinates::new(origin.left, origin.top);
    if coords.is_finite() {
        coords
    } else {
        CaretCoordinates::default()
    }
}

/// Kind of DOM node a hit-tested range starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeAnchor {
    Text,
    Element,
    Other,
}

/// Start of a range returned by hit testing (`caretRangeFromPoint`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePosition {
    pub anchor: RangeAnchor,
    /// `data-offset` of the closest enclosing `span[data-offset]`.
    pub span_offset: Option<MarkupOffset>,
    /// Offset within the start node.
    pub node_offset: usize,
}

/// Markup offset of a hit-tested range.
///
/// Inside a text node the node offset is added to the span's offset; on an
/// element any non-zero child offset means "after this span". Anything else
/// maps to the document start.
pub fn offset_from_range_position(range: &RangePosition) -> MarkupOffset {
    match (range.anchor, range.span_offset) {
        (RangeAnchor::Text, Some(span)) => MarkupOffset(span.0 + range.node_offset),
        (RangeAnchor::Element, Some(span)) => {
            MarkupOffset(span.0 + usize::from(range.node_offset > 0))
        }
        _ => MarkupOffset(0),
    }
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// No element under the pointer.
    Nothing,
    /// The `editor-line` element itself, i.e. the empty area of line `line`.
    LineArea { line: usize },
    /// Something inside a line, if the enclosing line is known.
    Inside { line: Option<usize> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerDown {
    /// Click count (`UIEvent.detail`).
    pub detail: u32,
    pub target: PointerTarget,
}

/// Selection to apply for a pointer-down, or `None` to leave it unchanged.
///
/// `hit_test` is only consulted for a single click inside a line.
pub fn resolve_pointer_down(
    layout: &[Vec<RenderedSpan>],
    event: &PointerDown,
    hit_test: impl FnOnce() -> Option<RangePosition>,
) -> Option<Selection> {
    let line_index = match event.target {
        PointerTarget::Nothing => return Some(Selection::collapsed(0)),
        PointerTarget::LineArea { line } => Some(line),
        PointerTarget::Inside { line } => line,
    };

    if event.detail >= 2 {
        let line = layout.get(line_index?)?;
        return line_selection(line);
    }

    match event.target {
        PointerTarget::LineArea { line } => {
            Some(Selection::collapsed(empty_area_offset(layout, line).0))
        }
        _ => {
            let range = hit_test()?;
            Some(Selection::collapsed(offset_from_range_position(&range).0))
        }
    }
}

/// Range of the line's real spans, for double and triple click.
pub fn line_selection(line: &[RenderedSpan]) -> Option<Selection> {
    let mut spans = line.iter().filter(|span| !span.is_virtual());
    let first = spans.next()?;
    let last = spans.last().unwrap_or(first);
    Some(Selection::new(first.offset.0, last.end().0))
}

/// Caret offset for a click on the empty area of line `line`.
///
/// After the line's last character, or for an empty line after the last
/// character of the nearest preceding non-empty line, else the document start.
pub fn empty_area_offset(layout: &[Vec<RenderedSpan>], line: usize) -> MarkupOffset {
    fn last_real(spans: &[RenderedSpan]) -> Option<MarkupOffset> {
        spans
            .iter()
            .rev()
            .find(|span| !span.is_virtual())
            .map(RenderedSpan::end)
    }

    if let Some(end) = layout.get(line).and_then(|spans| last_real(spans)) {
        return end;
    }

    layout[..line.min(layout.len())]
        .iter()
        .rev()
        .find_map(|spans| last_real(spans))
        .unwrap_or_default()
}
