//! Pointer-down to caret offset.
//!
//! The rendered content is not editable; clicks on it are mapped back to an
//! offset in the textarea, which then gets focus.

use composer_core::{
    MarkupOffset, PointerDown, PointerTarget, RangeAnchor, RangePosition, RenderedSpan, Selection,
    resolve_pointer_down,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

const LINE_CLASS: &str = "editor-line";
const OFFSET_SPAN_SELECTOR: &str = "span[data-offset]";

// === caretRangeFromPoint binding ===
//
// Non-standard, so web-sys has no binding. Gecko lacks it entirely; check
// with `has_caret_range_from_point` before calling.

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = web_sys::Document, js_name = Document)]
    type CaretDocument;

    #[wasm_bindgen(method, js_name = caretRangeFromPoint)]
    fn caret_range_from_point(this: &CaretDocument, x: f64, y: f64) -> Option<web_sys::Range>;
}

fn has_caret_range_from_point(document: &web_sys::Document) -> bool {
    js_sys::Reflect::has(document, &JsValue::from_str("caretRangeFromPoint")).unwrap_or(false)
}

/// Hit-test the viewport point `(x, y)`.
pub fn range_position_at(x: f64, y: f64) -> Option<RangePosition> {
    let document = gloo_utils::document();
    if !has_caret_range_from_point(&document) {
        tracing::trace!(target: "composer::pointer", "caretRangeFromPoint unavailable");
        return None;
    }
    let range = document
        .unchecked_ref::<CaretDocument>()
        .caret_range_from_point(x, y)?;
    range_position(&range)
}

/// Describe the start of `range` for offset mapping.
pub fn range_position(range: &web_sys::Range) -> Option<RangePosition> {
    let container = range.start_container().ok()?;
    let node_offset = range.start_offset().ok()? as usize;

    let (anchor, element) = match container.node_type() {
        web_sys::Node::TEXT_NODE => (RangeAnchor::Text, container.parent_element()),
        web_sys::Node::ELEMENT_NODE => (RangeAnchor::Element, container.dyn_into().ok()),
        _ => (RangeAnchor::Other, None),
    };

    let span_offset = element
        .and_then(|element| element.closest(OFFSET_SPAN_SELECTOR).ok().flatten())
        .and_then(|span| span.get_attribute("data-offset"))
        .and_then(|offset| offset.parse().ok())
        .map(MarkupOffset);

    Some(RangePosition {
        anchor,
        span_offset,
        node_offset,
    })
}

/// Classify a mousedown inside `content`.
pub fn pointer_down(content: &web_sys::Element, event: &web_sys::MouseEvent) -> PointerDown {
    let detail = event.detail().max(0) as u32;
    let Some(target) = event
        .target()
        .and_then(|target| target.dyn_into::<web_sys::Element>().ok())
    else {
        return PointerDown {
            detail,
            target: PointerTarget::Nothing,
        };
    };

    let target = if target.class_list().contains(LINE_CLASS) {
        match line_index(content, &target) {
            Some(line) => PointerTarget::LineArea { line },
            None => PointerTarget::Inside { line: None },
        }
    } else {
        let line = target
            .closest(&format!(".{LINE_CLASS}"))
            .ok()
            .flatten()
            .and_then(|line| line_index(content, &line));
        PointerTarget::Inside { line }
    };

    PointerDown { detail, target }
}

/// Index of `line` among the line divs of `content`.
fn line_index(content: &web_sys::Element, line: &web_sys::Element) -> Option<usize> {
    let lines = content
        .query_selector_all(&format!(".{LINE_CLASS}"))
        .ok()?;
    let line: &web_sys::Node = line.as_ref();
    (0..lines.length())
        .find(|&index| lines.get(index).as_ref() == Some(line))
        .map(|index| index as usize)
}

/// Classify a mousedown on the rendered content and resolve the selection it
/// asks for.
pub fn selection_for_pointer_down(
    content: &web_sys::Element,
    layout: &[Vec<RenderedSpan>],
    event: &web_sys::MouseEvent,
) -> (PointerDown, Option<Selection>) {
    let down = pointer_down(content, event);
    let (x, y) = (f64::from(event.client_x()), f64::from(event.client_y()));
    let selection = resolve_pointer_down(layout, &down, || range_position_at(x, y));
    tracing::trace!(
        target: "composer::pointer",
        detail = down.detail,
        pointer_target = ?down.target,
        ?selection,
        "pointer down"
    );
    (down, selection)
}
