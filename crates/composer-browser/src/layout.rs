//! Layout measurement over the rendered composer content.

use composer_core::{ContentOrigin, LayoutHost, MarkupOffset, Rect};

/// [`LayoutHost`] backed by the DOM of the rendering container.
pub struct DomLayout {
    container: web_sys::HtmlElement,
}

impl DomLayout {
    pub fn new(container: web_sys::HtmlElement) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &web_sys::HtmlElement {
        &self.container
    }

    fn span_rect(&self, attribute: &str, offset: MarkupOffset) -> Option<Rect> {
        let selector = format!(r#"span[{attribute}="{offset}"]"#);
        let span = self.container.query_selector(&selector).ok().flatten()?;
        Some(to_rect(&span.get_bounding_client_rect()))
    }
}

impl LayoutHost for DomLayout {
    fn offset_span_rect(&self, offset: MarkupOffset) -> Option<Rect> {
        self.span_rect("data-offset", offset)
    }

    fn virtual_span_rect(&self, offset: MarkupOffset) -> Option<Rect> {
        self.span_rect("data-virtual-offset", offset)
    }

    fn container_rect(&self) -> Option<Rect> {
        Some(to_rect(&self.container.get_bounding_client_rect()))
    }

    fn content_origin(&self) -> ContentOrigin {
        let style = gloo_utils::window()
            .get_computed_style(&self.container)
            .ok()
            .flatten();
        let Some(style) = style else {
            tracing::warn!(target: "composer::layout", "no computed style for container");
            return ContentOrigin::default();
        };

        let px = |property: &str| {
            style
                .get_property_value(property)
                .ok()
                .and_then(|value| parse_px(&value))
                .unwrap_or(0.0)
        };

        ContentOrigin {
            left: px("margin-left") + px("padding-left"),
            top: px("margin-top") + px("padding-top"),
        }
    }
}

fn to_rect(rect: &web_sys::DomRect) -> Rect {
    Rect::new(rect.left(), rect.top(), rect.right(), rect.bottom())
}

/// Parse a computed CSS length such as `"12.5px"`.
pub fn parse_px(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse().ok()
}
