//! Selection-driven rich-text formatting.
//!
//! The formatter works on a contenteditable region through an [`EditingHost`].
//! It derives the active formats from the tags around the saved selection and
//! applies toggles either with native editing commands (bold, italic,
//! underline) or by wrapping the selected HTML in an entity element.

use smol_str::SmolStr;

use crate::entity::EntityType;
use crate::error::Result;
use crate::platform::{EditCommand, EditingHost};

/// A toggleable format in the formatter toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextFormat {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Monospace,
    Spoiler,
}

impl TextFormat {
    pub const ALL: [TextFormat; 6] = [
        TextFormat::Bold,
        TextFormat::Italic,
        TextFormat::Underline,
        TextFormat::Strikethrough,
        TextFormat::Monospace,
        TextFormat::Spoiler,
    ];

    /// Format implied by an upper-case element tag name.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "B" | "STRONG" => Some(TextFormat::Bold),
            "I" | "EM" => Some(TextFormat::Italic),
            "U" => Some(TextFormat::Underline),
            "DEL" => Some(TextFormat::Strikethrough),
            "CODE" => Some(TextFormat::Monospace),
            "SPAN" => Some(TextFormat::Spoiler),
            _ => None,
        }
    }

    /// Formats that exclude every other format while set.
    fn is_exclusive(self) -> bool {
        matches!(self, TextFormat::Monospace | TextFormat::Strikethrough)
    }
}

/// How a toolbar button should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Normal,
    Active,
    Disabled,
}

/// Formats applied around the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub monospace: bool,
    pub spoiler: bool,
}

impl FormatState {
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = Self::default();
        for format in tags
            .into_iter()
            .filter_map(|tag| TextFormat::from_tag(tag.as_ref()))
        {
            state.set(format, true);
        }
        state
    }

    pub fn get(&self, format: TextFormat) -> bool {
        match format {
            TextFormat::Bold => self.bold,
            TextFormat::Italic => self.italic,
            TextFormat::Underline => self.underline,
            TextFormat::Strikethrough => self.strikethrough,
            TextFormat::Monospace => self.monospace,
            TextFormat::Spoiler => self.spoiler,
        }
    }

    pub fn set(&mut self, format: TextFormat, value: bool) {
        let slot = match format {
            TextFormat::Bold => &mut self.bold,
            TextFormat::Italic => &mut self.italic,
            TextFormat::Underline => &mut self.underline,
            TextFormat::Strikethrough => &mut self.strikethrough,
            TextFormat::Monospace => &mut self.monospace,
            TextFormat::Spoiler => &mut self.spoiler,
        };
        *slot = value;
    }

    pub fn button_state(&self, format: TextFormat) -> ButtonState {
        if self.get(format) {
            return ButtonState::Active;
        }

        let blocked = if format.is_exclusive() {
            TextFormat::ALL
                .into_iter()
                .any(|other| other != format && self.get(other))
        } else {
            self.monospace || self.strikethrough
        };

        if blocked {
            ButtonState::Disabled
        } else {
            ButtonState::Normal
        }
    }
}

/// Modifier key state of a keydown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };
}

/// What a formatter shortcut triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatterAction {
    OpenLink,
    Toggle(TextFormat),
}

/// Map a keydown to a formatter action.
///
/// Shortcuts need Ctrl or Cmd and must not have Alt held.
pub fn shortcut(key: &str, modifiers: Modifiers) -> Option<FormatterAction> {
    if modifiers.alt || !(modifiers.ctrl || modifiers.meta) {
        return None;
    }

    let action = match key.to_ascii_lowercase().as_str() {
        "k" => FormatterAction::OpenLink,
        "b" => FormatterAction::Toggle(TextFormat::Bold),
        "u" => FormatterAction::Toggle(TextFormat::Underline),
        "i" => FormatterAction::Toggle(TextFormat::Italic),
        "m" => FormatterAction::Toggle(TextFormat::Monospace),
        "s" => FormatterAction::Toggle(TextFormat::Strikethrough),
        "p" => FormatterAction::Toggle(TextFormat::Spoiler),
        _ => return None,
    };
    Some(action)
}

/// Result of a formatter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatOutcome {
    /// Nothing was applied.
    Unchanged,
    /// The document changed and the formatter stays open.
    Updated,
    /// The document changed and the formatter should close.
    Close,
}

/// Add a scheme to a bare link target and normalize it.
///
/// Returns `None` for an empty or unparseable target.
pub fn normalize_link_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(url) = url::Url::parse(raw) {
        // `host:port` parses as an opaque URL with the host as scheme.
        let opaque = url.cannot_be_a_base() && !matches!(url.scheme(), "mailto" | "tel");
        if !opaque && url.scheme() != "javascript" {
            return Some(url.into());
        }
    }

    match url::Url::parse(&format!("https://{raw}")) {
        Ok(url) => Some(url.into()),
        Err(err) => {
            tracing::warn!(target: "composer::formatter", %err, raw, "rejected link url");
            None
        }
    }
}

/// Pending state of the link input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkControl {
    pub url: String,
    /// Whether the selection is already inside a link whose `href` gets
    /// replaced on confirm.
    pub editing: bool,
}

/// Toolbar logic for one saved selection.
pub struct TextFormatter<H: EditingHost> {
    host: H,
    state: FormatState,
    link: Option<LinkControl>,
}

impl<H: EditingHost> TextFormatter<H> {
    pub fn new(host: H) -> Self {
        let mut formatter = Self {
            host,
            state: FormatState::default(),
            link: None,
        };
        formatter.refresh();
        formatter
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn state(&self) -> FormatState {
        self.state
    }

    pub fn button_state(&self, format: TextFormat) -> ButtonState {
        self.state.button_state(format)
    }

    pub fn link_control(&self) -> Option<&LinkControl> {
        self.link.as_ref()
    }

    /// Recompute the format state from the selection's ancestors.
    pub fn refresh(&mut self) {
        let tags: Vec<SmolStr> = self.host.ancestor_tags();
        self.state = FormatState::from_tags(&tags);
        tracing::trace!(target: "composer::formatter", state = ?self.state, "format state refreshed");
    }

    pub fn apply(&mut self, action: FormatterAction) -> Result<FormatOutcome> {
        match action {
            FormatterAction::OpenLink => {
                self.open_link();
                Ok(FormatOutcome::Updated)
            }
            FormatterAction::Toggle(format) => self.toggle(format),
        }
    }

    /// Run the shortcut bound to `key`, if any. `None` means the key is not a
    /// formatter shortcut and should be left to the platform.
    pub fn handle_shortcut(
        &mut self,
        key: &str,
        modifiers: Modifiers,
    ) -> Result<Option<FormatOutcome>> {
        match shortcut(key, modifiers) {
            Some(action) => self.apply(action).map(Some),
            None => Ok(None),
        }
    }

    pub fn toggle(&mut self, format: TextFormat) -> Result<FormatOutcome> {
        match format {
            TextFormat::Bold => self.toggle_bold(),
            TextFormat::Italic => self.toggle_command(TextFormat::Italic, EditCommand::Italic),
            TextFormat::Underline => {
                self.toggle_command(TextFormat::Underline, EditCommand::Underline)
            }
            TextFormat::Strikethrough => {
                self.toggle_wrapper(TextFormat::Strikethrough, "DEL", None, false, "<del>", "</del>")
            }
            TextFormat::Monospace => self.toggle_wrapper(
                TextFormat::Monospace,
                "CODE",
                None,
                true,
                r#"<code class="text-entity-code" dir="auto">"#,
                "</code>",
            ),
            TextFormat::Spoiler => self.toggle_wrapper(
                TextFormat::Spoiler,
                "SPAN",
                Some(EntityType::Spoiler),
                false,
                r#"<span class="spoiler" data-entity-type="spoiler">"#,
                "</span>",
            ),
        }
    }

    fn toggle_bold(&mut self) -> Result<FormatOutcome> {
        // Re-running `bold` on bold text does not unbold it in every engine,
        // so unbolding clears all formatting and restores the rest.
        let command = if self.state.bold {
            EditCommand::RemoveFormat
        } else {
            EditCommand::Bold
        };
        self.host.exec_command(command)?;
        if self.state.bold {
            if self.state.italic {
                self.host.exec_command(EditCommand::Italic)?;
            }
            if self.state.underline {
                self.host.exec_command(EditCommand::Underline)?;
            }
        }
        self.host.capture_selection()?;
        self.state.bold = !self.state.bold;
        Ok(FormatOutcome::Updated)
    }

    fn toggle_command(&mut self, format: TextFormat, command: EditCommand) -> Result<FormatOutcome> {
        self.host.exec_command(command)?;
        self.host.capture_selection()?;
        self.state.set(format, !self.state.get(format));
        Ok(FormatOutcome::Updated)
    }

    fn toggle_wrapper(
        &mut self,
        format: TextFormat,
        tag: &str,
        entity_type: Option<EntityType>,
        drop_custom_emoji: bool,
        open: &str,
        close: &str,
    ) -> Result<FormatOutcome> {
        if self.state.get(format) {
            if !self.host.unwrap_selected_element(tag, entity_type)? {
                return Ok(FormatOutcome::Unchanged);
            }
            self.state.set(format, false);
            return Ok(FormatOutcome::Updated);
        }

        let Some(html) = self.host.selected_html(drop_custom_emoji) else {
            return Ok(FormatOutcome::Unchanged);
        };
        self.host.insert_html(&format!("{open}{html}{close}"))?;
        Ok(FormatOutcome::Close)
    }

    /// Show the link input, prefilled when the selection is already a link.
    pub fn open_link(&mut self) {
        let href = self.host.selected_link_href();
        self.link = Some(LinkControl {
            editing: href.is_some(),
            url: href.unwrap_or_default(),
        });
    }

    pub fn set_link_url(&mut self, url: impl Into<String>) {
        if let Some(link) = self.link.as_mut() {
            link.url = url.into();
        }
    }

    pub fn close_link(&mut self) {
        self.link = None;
    }

    /// Apply the link input to the selection.
    pub fn confirm_link(&mut self) -> Result<FormatOutcome> {
        let Some(link) = self.link.as_ref() else {
            return Ok(FormatOutcome::Unchanged);
        };
        let Some(href) = normalize_link_url(&link.url) else {
            return Ok(FormatOutcome::Unchanged);
        };

        if link.editing {
            if !self.host.set_selected_link_href(&href)? {
                return Ok(FormatOutcome::Unchanged);
            }
        } else {
            let Some(html) = self.host.selected_html(true) else {
                return Ok(FormatOutcome::Unchanged);
            };
            self.host.restore_selection()?;
            self.host.insert_html(&format!(
                r#"<a href="{}" class="text-entity-link" dir="auto">{}</a>"#,
                html_escape::encode_double_quoted_attribute(&href),
                html
            ))?;
        }

        self.link = None;
        Ok(FormatOutcome::Close)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::error::HostError;

    #[derive(Default)]
    struct FakeEditable {
        tags: Vec<SmolStr>,
        html: Option<String>,
        link_href: Option<String>,
        enclosing: Option<(&'static str, Option<EntityType>)>,
        calls: RefCell<Vec<String>>,
        dropped_emoji: Cell<bool>,
    }

    impl FakeEditable {
        fn with_tags(tags: &[&str]) -> Self {
            Self {
                tags: tags.iter().map(|t| SmolStr::new(t)).collect(),
                html: Some("hi".into()),
                ..Self::default()
            }
        }

        fn log(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl EditingHost for FakeEditable {
        fn selected_html(&self, drop_custom_emoji: bool) -> Option<String> {
            self.dropped_emoji.set(drop_custom_emoji);
            self.html.clone()
        }

        fn ancestor_tags(&self) -> Vec<SmolStr> {
            self.tags.clone()
        }

        fn insert_html(&self, html: &str) -> std::result::Result<(), HostError> {
            self.log(format!("insert {html}"));
            Ok(())
        }

        fn exec_command(&self, command: EditCommand) -> std::result::Result<(), HostError> {
            self.log(command.as_str());
            Ok(())
        }

        fn unwrap_selected_element(
            &self,
            tag: &str,
            entity_type: Option<EntityType>,
        ) -> std::result::Result<bool, HostError> {
            let matched = self.enclosing == Some((tag_static(tag), entity_type));
            if matched {
                self.log(format!("unwrap {tag}"));
            }
            Ok(matched)
        }

        fn selected_link_href(&self) -> Option<String> {
            self.link_href.clone()
        }

        fn set_selected_link_href(&self, href: &str) -> std::result::Result<bool, HostError> {
            self.log(format!("href {href}"));
            Ok(self.link_href.is_some())
        }

        fn restore_selection(&self) -> std::result::Result<(), HostError> {
            self.log("restore");
            Ok(())
        }

        fn capture_selection(&self) -> std::result::Result<(), HostError> {
            self.log("capture");
            Ok(())
        }
    }

    fn tag_static(tag: &str) -> &'static str {
        match tag {
            "DEL" => "DEL",
            "CODE" => "CODE",
            "SPAN" => "SPAN",
            _ => "",
        }
    }

    #[test]
    fn test_state_from_tags() {
        let state = FormatState::from_tags(["STRONG", "EM", "DIV", "U"]);
        assert!(state.bold && state.italic && state.underline);
        assert!(!state.monospace && !state.spoiler && !state.strikethrough);
    }

    #[test]
    fn test_button_states() {
        let state = FormatState {
            bold: true,
            ..FormatState::default()
        };
        assert_eq!(state.button_state(TextFormat::Bold), ButtonState::Active);
        assert_eq!(state.button_state(TextFormat::Italic), ButtonState::Normal);
        assert_eq!(
            state.button_state(TextFormat::Monospace),
            ButtonState::Disabled
        );
        assert_eq!(
            state.button_state(TextFormat::Strikethrough),
            ButtonState::Disabled
        );

        let state = FormatState {
            monospace: true,
            ..FormatState::default()
        };
        assert_eq!(state.button_state(TextFormat::Bold), ButtonState::Disabled);
        assert_eq!(state.button_state(TextFormat::Monospace), ButtonState::Active);
        assert_eq!(
            state.button_state(TextFormat::Strikethrough),
            ButtonState::Disabled
        );

        let empty = FormatState::default();
        assert!(
            TextFormat::ALL
                .into_iter()
                .all(|f| empty.button_state(f) == ButtonState::Normal)
        );
    }

    #[test]
    fn test_shortcuts() {
        assert_eq!(
            shortcut("b", Modifiers::CTRL),
            Some(FormatterAction::Toggle(TextFormat::Bold))
        );
        assert_eq!(shortcut("K", Modifiers::META), Some(FormatterAction::OpenLink));
        assert_eq!(shortcut("b", Modifiers::default()), None);
        let ctrl_alt = Modifiers {
            alt: true,
            ..Modifiers::CTRL
        };
        assert_eq!(shortcut("b", ctrl_alt), None);
        assert_eq!(shortcut("x", Modifiers::CTRL), None);
    }

    #[test]
    fn test_bold_on_leaves_other_formats() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&["I"]));
        let outcome = formatter.toggle(TextFormat::Bold).unwrap();
        assert_eq!(outcome, FormatOutcome::Updated);
        assert_eq!(formatter.host().calls(), vec!["bold", "capture"]);
        assert!(formatter.state().bold);
    }

    #[test]
    fn test_bold_off_restores_other_formats() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&["B", "I", "U"]));
        formatter.toggle(TextFormat::Bold).unwrap();
        assert_eq!(
            formatter.host().calls(),
            vec!["removeFormat", "italic", "underline", "capture"]
        );
        assert!(!formatter.state().bold);
        assert!(formatter.state().italic);
    }

    #[test]
    fn test_italic_flips_state() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&[]));
        formatter.toggle(TextFormat::Italic).unwrap();
        assert!(formatter.state().italic);
        formatter.toggle(TextFormat::Italic).unwrap();
        assert!(!formatter.state().italic);
        assert_eq!(
            formatter.host().calls(),
            vec!["italic", "capture", "italic", "capture"]
        );
    }

    #[test]
    fn test_wrap_monospace_drops_emoji() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&[]));
        let outcome = formatter.toggle(TextFormat::Monospace).unwrap();
        assert_eq!(outcome, FormatOutcome::Close);
        assert!(formatter.host().dropped_emoji.get());
        assert_eq!(
            formatter.host().calls(),
            vec![r#"insert <code class="text-entity-code" dir="auto">hi</code>"#]
        );
    }

    #[test]
    fn test_wrap_spoiler_and_strike() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&[]));
        formatter.toggle(TextFormat::Spoiler).unwrap();
        formatter.toggle(TextFormat::Strikethrough).unwrap();
        assert!(!formatter.host().dropped_emoji.get());
        assert_eq!(
            formatter.host().calls(),
            vec![
                r#"insert <span class="spoiler" data-entity-type="spoiler">hi</span>"#,
                "insert <del>hi</del>",
            ]
        );
    }

    #[test]
    fn test_unwrap_spoiler() {
        let mut host = FakeEditable::with_tags(&["SPAN"]);
        host.enclosing = Some(("SPAN", Some(EntityType::Spoiler)));
        let mut formatter = TextFormatter::new(host);
        assert!(formatter.state().spoiler);
        let outcome = formatter.toggle(TextFormat::Spoiler).unwrap();
        assert_eq!(outcome, FormatOutcome::Updated);
        assert!(!formatter.state().spoiler);
        assert_eq!(formatter.host().calls(), vec!["unwrap SPAN"]);
    }

    #[test]
    fn test_unwrap_without_matching_element() {
        // A mention span also reports SPAN but is not a spoiler.
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&["SPAN"]));
        let outcome = formatter.toggle(TextFormat::Spoiler).unwrap();
        assert_eq!(outcome, FormatOutcome::Unchanged);
        assert!(formatter.state().spoiler);
        assert!(formatter.host().calls().is_empty());
    }

    #[test]
    fn test_normalize_link_url() {
        assert_eq!(
            normalize_link_url("example.com/a b").as_deref(),
            Some("https://example.com/a%20b")
        );
        assert_eq!(
            normalize_link_url("http://x.org/").as_deref(),
            Some("http://x.org/")
        );
        assert_eq!(
            normalize_link_url("mailto:a@b.c").as_deref(),
            Some("mailto:a@b.c")
        );
        assert_eq!(
            normalize_link_url("localhost:3000").as_deref(),
            Some("https://localhost:3000/")
        );
        assert_eq!(normalize_link_url("   "), None);
    }

    #[test]
    fn test_insert_link() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&[]));
        formatter.open_link();
        assert_eq!(formatter.link_control(), Some(&LinkControl::default()));
        formatter.set_link_url("example.com");
        let outcome = formatter.confirm_link().unwrap();
        assert_eq!(outcome, FormatOutcome::Close);
        assert!(formatter.link_control().is_none());
        assert_eq!(
            formatter.host().calls(),
            vec![
                "restore",
                r#"insert <a href="https://example.com/" class="text-entity-link" dir="auto">hi</a>"#,
            ]
        );
    }

    #[test]
    fn test_edit_existing_link() {
        let mut host = FakeEditable::with_tags(&["A"]);
        host.link_href = Some("https://old.example/".into());
        let mut formatter = TextFormatter::new(host);
        formatter.handle_shortcut("k", Modifiers::CTRL).unwrap();
        let link = formatter.link_control().unwrap();
        assert!(link.editing);
        assert_eq!(link.url, "https://old.example/");

        formatter.set_link_url("new.example");
        assert_eq!(formatter.confirm_link().unwrap(), FormatOutcome::Close);
        assert_eq!(formatter.host().calls(), vec!["href https://new.example/"]);
    }

    #[test]
    fn test_confirm_without_control() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&[]));
        assert_eq!(formatter.confirm_link().unwrap(), FormatOutcome::Unchanged);
        assert!(formatter.host().calls().is_empty());
    }

    #[test]
    fn test_non_shortcut_key_passes_through() {
        let mut formatter = TextFormatter::new(FakeEditable::with_tags(&[]));
        assert_eq!(formatter.handle_shortcut("a", Modifiers::CTRL).unwrap(), None);
        assert_eq!(
            formatter.handle_shortcut("u", Modifiers::CTRL).unwrap(),
            Some(FormatOutcome::Updated)
        );
        assert!(formatter.state().underline);
    }
}
