//! The hidden textarea that owns the real text and selection.

use composer_core::{HostError, Selection, SelectionHost, utf16_len};

/// [`SelectionHost`] over a `<textarea>`.
#[derive(Clone)]
pub struct TextareaInput {
    textarea: web_sys::HtmlTextAreaElement,
}

impl TextareaInput {
    pub fn new(textarea: web_sys::HtmlTextAreaElement) -> Self {
        Self { textarea }
    }

    pub fn element(&self) -> &web_sys::HtmlTextAreaElement {
        &self.textarea
    }

    pub fn value(&self) -> String {
        self.textarea.value()
    }

    pub fn set_value(&self, value: &str) {
        self.textarea.set_value(value);
    }

    pub fn focus(&self) {
        if let Err(e) = self.textarea.focus() {
            tracing::warn!(target: "composer::input", "focus failed: {:?}", e);
        }
    }
}

impl SelectionHost for TextareaInput {
    fn selection(&self) -> Result<Selection, HostError> {
        let start = self
            .textarea
            .selection_start()
            .map_err(|e| format!("selectionStart failed: {:?}", e))?
            .unwrap_or(0);
        let end = self
            .textarea
            .selection_end()
            .map_err(|e| format!("selectionEnd failed: {:?}", e))?
            .unwrap_or(start);
        Ok(Selection::new(start as usize, end as usize))
    }

    fn set_selection(&self, selection: Selection) -> Result<(), HostError> {
        self.textarea
            .set_selection_range(selection.start as u32, selection.end as u32)
            .map_err(|e| format!("setSelectionRange failed: {:?}", e).into())
    }

    fn is_focused(&self) -> bool {
        let textarea: &web_sys::Node = self.textarea.as_ref();
        gloo_utils::document()
            .active_element()
            .is_some_and(|active| active.is_same_node(Some(textarea)))
    }

    fn text_len(&self) -> usize {
        utf16_len(&self.textarea.value())
    }
}
