//! Event wiring between the textarea, the rendered content and the caret.
//!
//! The textarea owns the text and the native selection. The content element
//! shows the rendered markup and the caret element is positioned over it.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use composer_core::{
    Composer, ComposerConfig, FormattedText, MessageId, MessageSink, PointerTarget, Result,
    SelectionEvent, SendOutcome,
};
use gloo_events::EventListener;
use wasm_bindgen::JsCast;

use crate::focus::{focus_soon, focus_with_retry};
use crate::input::TextareaInput;
use crate::layout::DomLayout;
use crate::pointer::selection_for_pointer_down;

/// Placeholder keeping an empty content element one line tall.
const EMPTY_CONTENT: &str = "<span></span>";

struct ViewInner {
    composer: RefCell<Composer>,
    input: TextareaInput,
    content: web_sys::HtmlElement,
    caret: web_sys::HtmlElement,
}

impl ViewInner {
    fn sync(&self, event: SelectionEvent) {
        if self.update_selection(event) {
            self.repaint();
        }
    }

    /// Read the native selection; true when it moved.
    fn update_selection(&self, event: SelectionEvent) -> bool {
        let result = self
            .composer
            .borrow_mut()
            .handle_selection_event(&self.input, event);
        result.unwrap_or_else(|e| {
            tracing::warn!(target: "composer::view", ?event, "selection sync failed: {}", e);
            false
        })
    }

    fn on_input(&self) {
        self.composer.borrow_mut().set_text(self.input.value());
        self.update_selection(SelectionEvent::Input);
        self.repaint();
    }

    fn on_pointer_down(&self, event: &web_sys::MouseEvent) {
        let (down, selection) = {
            let composer = self.composer.borrow();
            selection_for_pointer_down(&self.content, &composer.rendered().layout, event)
        };

        let Some(selection) = selection else {
            return;
        };
        if let Err(e) = self
            .composer
            .borrow_mut()
            .set_selection(&self.input, selection)
        {
            tracing::warn!(target: "composer::view", "applying pointer selection failed: {}", e);
        }
        self.repaint();

        let composer = self.composer.borrow();
        if down.detail >= 2 || down.target == PointerTarget::Nothing {
            focus_soon(&self.input, composer.config());
        } else {
            focus_with_retry(&self.input, composer.config());
        }
    }

    fn repaint(&self) {
        let composer = self.composer.borrow();
        let html = composer.rendered().html.as_str();
        self.content
            .set_inner_html(if html.is_empty() { EMPTY_CONTENT } else { html });
        self.place_caret(&composer);
    }

    fn place_caret(&self, composer: &Composer) {
        let style = self.caret.style();
        let result = if composer.selection().is_collapsed() {
            let layout = DomLayout::new(self.content.clone());
            let coords = composer.caret_coordinates(&layout);
            style
                .set_property("left", &format!("{}px", coords.left))
                .and_then(|_| style.set_property("top", &format!("{}px", coords.top)))
                .and_then(|_| style.set_property("display", "block"))
        } else {
            style.set_property("display", "none")
        };
        if let Err(e) = result {
            tracing::warn!(target: "composer::view", "caret style update failed: {:?}", e);
        }
    }
}

/// A composer attached to its DOM elements.
///
/// Listeners are removed when the view is dropped.
pub struct ComposerView {
    inner: Rc<ViewInner>,
    _listeners: Vec<EventListener>,
}

impl ComposerView {
    pub fn attach(
        content: web_sys::HtmlElement,
        textarea: web_sys::HtmlTextAreaElement,
        caret: web_sys::HtmlElement,
        config: ComposerConfig,
    ) -> Self {
        let input = TextareaInput::new(textarea.clone());
        let mut composer = Composer::new(config);
        composer.set_text(input.value());

        let inner = Rc::new(ViewInner {
            composer: RefCell::new(composer),
            input,
            content: content.clone(),
            caret,
        });

        let listen = |target: &web_sys::EventTarget,
                      name: &'static str,
                      handle: fn(&ViewInner, &web_sys::Event)| {
            let inner = inner.clone();
            EventListener::new(target, name, move |event| handle(&inner, event))
        };

        let listeners = vec![
            listen(&gloo_utils::document(), "selectionchange", |inner, _| {
                inner.sync(SelectionEvent::SelectionChange)
            }),
            listen(&textarea, "input", |inner, _| inner.on_input()),
            listen(&textarea, "keyup", |inner, _| inner.sync(SelectionEvent::KeyUp)),
            listen(&textarea, "focus", |inner, _| inner.sync(SelectionEvent::Focus)),
            listen(&content, "mousedown", |inner, event| {
                if let Some(event) = event.dyn_ref::<web_sys::MouseEvent>() {
                    inner.on_pointer_down(event);
                }
            }),
        ];

        inner.repaint();
        tracing::debug!(target: "composer::view", "composer attached");

        Self {
            inner,
            _listeners: listeners,
        }
    }

    pub fn composer(&self) -> Ref<'_, Composer> {
        self.inner.composer.borrow()
    }

    pub fn input(&self) -> &TextareaInput {
        &self.inner.input
    }

    pub fn set_has_attachments(&self, has_attachments: bool) {
        self.inner
            .composer
            .borrow_mut()
            .set_has_attachments(has_attachments);
    }

    /// Load a sent message for editing.
    pub fn start_editing(&self, id: MessageId, message: &FormattedText) {
        let mut composer = self.inner.composer.borrow_mut();
        composer.start_editing(id, message);
        self.inner.input.set_value(composer.text());
        drop(composer);
        self.inner.repaint();
    }

    pub fn cancel_editing(&self) {
        self.inner.composer.borrow_mut().cancel_editing();
        self.reset_input();
    }

    /// Send the draft through `sink` and clear the textarea on success.
    pub fn send<S: MessageSink>(&self, sink: S) -> Result<SendOutcome> {
        let outcome = self.inner.composer.borrow_mut().send(sink)?;
        if outcome != SendOutcome::Empty {
            self.reset_input();
        }
        Ok(outcome)
    }

    fn reset_input(&self) {
        let text = self.inner.composer.borrow().text().to_string();
        self.inner.input.set_value(&text);
        self.inner.repaint();
    }
}
