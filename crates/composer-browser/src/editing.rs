//! Formatting commands over a contenteditable region.
//!
//! The formatter toolbar takes focus away from the editable element, so the
//! selection it acts on is a `Range` saved when the toolbar opened and put
//! back before commands run.

use std::cell::RefCell;

use composer_core::{EditCommand, EditingHost, EntityType, HostError, SmolStr};
use wasm_bindgen::JsCast;

const CUSTOM_EMOJI_SELECTOR: &str = "img[data-document-id]";

/// [`EditingHost`] over a contenteditable root element.
pub struct DomEditing {
    root: web_sys::HtmlElement,
    range: RefCell<Option<web_sys::Range>>,
}

impl DomEditing {
    pub fn new(root: web_sys::HtmlElement) -> Self {
        Self {
            root,
            range: RefCell::new(None),
        }
    }

    /// Use `range` as the working selection.
    pub fn with_range(root: web_sys::HtmlElement, range: web_sys::Range) -> Self {
        Self {
            root,
            range: RefCell::new(Some(range)),
        }
    }

    pub fn range(&self) -> Option<web_sys::Range> {
        self.range.borrow().clone()
    }

    /// Parent element of the saved range's common ancestor.
    fn selected_element(&self) -> Option<web_sys::Element> {
        let range = self.range()?;
        range.common_ancestor_container().ok()?.parent_element()
    }

    /// The link element enclosing the selection, inside the root.
    fn selected_link(&self) -> Option<web_sys::Element> {
        let link = self.selected_element()?.closest("a").ok().flatten()?;
        let root: &web_sys::Node = self.root.as_ref();
        let node: &web_sys::Node = link.as_ref();
        root.contains(Some(node)).then_some(link)
    }
}

fn html_document() -> Result<web_sys::HtmlDocument, HostError> {
    gloo_utils::document()
        .dyn_into::<web_sys::HtmlDocument>()
        .map_err(|_| "document is not an HtmlDocument".into())
}

fn dom_selection() -> Result<web_sys::Selection, HostError> {
    gloo_utils::window()
        .get_selection()
        .map_err(|e| format!("get_selection failed: {:?}", e))?
        .ok_or_else(|| "no selection object".into())
}

impl EditingHost for DomEditing {
    fn selected_html(&self, drop_custom_emoji: bool) -> Option<String> {
        let range = self.range()?;
        let fragment = range.clone_contents().ok()?;
        let holder = gloo_utils::document().create_element("div").ok()?;
        holder.append_child(&fragment).ok()?;

        if drop_custom_emoji {
            let emoji = holder.query_selector_all(CUSTOM_EMOJI_SELECTOR).ok()?;
            for index in 0..emoji.length() {
                let Some(element) = emoji
                    .get(index)
                    .and_then(|node| node.dyn_into::<web_sys::Element>().ok())
                else {
                    continue;
                };
                let alt = element.get_attribute("alt").unwrap_or_default();
                if let Err(e) = element.replace_with_with_str_1(&alt) {
                    tracing::warn!(target: "composer::editing", "replacing emoji failed: {:?}", e);
                }
            }
        }

        Some(holder.inner_html())
    }

    fn ancestor_tags(&self) -> Vec<SmolStr> {
        let mut tags = Vec::new();
        let mut current = self.selected_element();
        let root: &web_sys::Element = self.root.as_ref();
        while let Some(element) = current {
            if &element == root {
                break;
            }
            tags.push(SmolStr::new(element.tag_name()));
            current = element.parent_element();
        }
        tags
    }

    fn insert_html(&self, html: &str) -> Result<(), HostError> {
        html_document()?
            .exec_command_with_show_ui_and_value("insertHTML", false, html)
            .map_err(|e| format!("insertHTML failed: {:?}", e))?;
        Ok(())
    }

    fn exec_command(&self, command: EditCommand) -> Result<(), HostError> {
        html_document()?
            .exec_command(command.as_str())
            .map_err(|e| format!("{} failed: {:?}", command.as_str(), e))?;
        Ok(())
    }

    fn unwrap_selected_element(
        &self,
        tag: &str,
        entity_type: Option<EntityType>,
    ) -> Result<bool, HostError> {
        let Some(element) = self.selected_element() else {
            return Ok(false);
        };
        if element.tag_name() != tag {
            return Ok(false);
        }
        if let Some(entity_type) = entity_type {
            if element.get_attribute("data-entity-type").as_deref() != Some(entity_type.as_str()) {
                return Ok(false);
            }
        }
        let Some(text) = element.text_content().filter(|text| !text.is_empty()) else {
            return Ok(false);
        };

        element
            .replace_with_with_str_1(&text)
            .map_err(|e| format!("replaceWith failed: {:?}", e))?;
        Ok(true)
    }

    fn selected_link_href(&self) -> Option<String> {
        self.selected_link()?.get_attribute("href")
    }

    fn set_selected_link_href(&self, href: &str) -> Result<bool, HostError> {
        let Some(link) = self.selected_link() else {
            return Ok(false);
        };
        link.set_attribute("href", href)
            .map_err(|e| format!("set_attribute failed: {:?}", e))?;
        Ok(true)
    }

    fn restore_selection(&self) -> Result<(), HostError> {
        let Some(range) = self.range() else {
            return Ok(());
        };
        let selection = dom_selection()?;
        selection
            .remove_all_ranges()
            .map_err(|e| format!("remove_all_ranges failed: {:?}", e))?;
        selection
            .add_range(&range)
            .map_err(|e| format!("add_range failed: {:?}", e))?;
        Ok(())
    }

    fn capture_selection(&self) -> Result<(), HostError> {
        let selection = dom_selection()?;
        if selection.range_count() == 0 {
            return Ok(());
        }
        let range = selection
            .get_range_at(0)
            .map_err(|e| format!("get_range_at failed: {:?}", e))?;
        *self.range.borrow_mut() = Some(range);
        Ok(())
    }
}
