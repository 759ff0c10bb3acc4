//! Render the AST as line-structured, offset-annotated HTML.
//!
//! Every source character, markup included, becomes one span carrying its
//! markup offset in `data-offset`. Offsets advance by the character's UTF-16
//! length so they agree with the native input's `selectionStart`. After a
//! newline the next line opens with a zero-width `newline-start` span whose
//! `data-virtual-offset` is the newline's offset, which gives empty lines a
//! caret anchor.
//!
//! The pass is a reducer: [`RenderState`] is threaded by value through
//! [`RenderState::visit`] and comes back updated for every node.

use std::fmt::Write as _;

use crate::ast::{AstNode, NodeKind};
use crate::entity::{BLOCK_FENCE, EntityType};
use crate::types::{MarkupOffset, Selection};

/// What a rendered span stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Char,
    Space,
    Newline,
    Symbol,
    /// Zero-width caret anchor at the start of a line that follows a newline.
    NewlineStart,
}

/// One span of a rendered line, as emitted into the HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedSpan {
    /// `data-offset`, or `data-virtual-offset` for [`SpanKind::NewlineStart`].
    pub offset: MarkupOffset,
    /// Width in UTF-16 code units; zero for virtual spans.
    pub len: usize,
    pub kind: SpanKind,
}

impl RenderedSpan {
    pub fn is_virtual(&self) -> bool {
        self.kind == SpanKind::NewlineStart
    }

    pub fn end(&self) -> MarkupOffset {
        MarkupOffset(self.offset.0 + self.len)
    }
}

/// Result of [`render_ast`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub html: String,
    /// Offset just past the last rendered character.
    pub max_offset: MarkupOffset,
    /// Spans of each `editor-line` div, in document order.
    pub layout: Vec<Vec<RenderedSpan>>,
}

/// Render `node` with `selection` highlighted.
pub fn render_ast(node: &AstNode, selection: Selection) -> RenderOutput {
    let state = RenderState::new(selection).visit(node);
    state.finish()
}

/// Traversal state of one render pass.
#[derive(Debug, Clone)]
pub struct RenderState {
    /// Completed HTML chunks: line divs and block tags between them.
    lines: Vec<String>,
    current_line: String,
    offset: usize,
    pending_newline_start: bool,
    selection: Selection,
    layout: Vec<Vec<RenderedSpan>>,
    current_spans: Vec<RenderedSpan>,
    /// Inline tags open on the current line: opening HTML and closing tag.
    open_tags: Vec<(String, &'static str)>,
}

impl RenderState {
    pub fn new(selection: Selection) -> Self {
        Self {
            lines: Vec::new(),
            current_line: String::new(),
            offset: 0,
            pending_newline_start: false,
            selection,
            layout: Vec::new(),
            current_spans: Vec::new(),
            open_tags: Vec::new(),
        }
    }

    pub fn offset(&self) -> MarkupOffset {
        MarkupOffset(self.offset)
    }

    /// Render one node and return the updated state.
    pub fn visit(mut self, node: &AstNode) -> Self {
        let kind = match node.kind {
            NodeKind::Root => {
                self = node.children.iter().fold(self, Self::visit);
                self.flush_line();
                return self;
            }
            NodeKind::Text => {
                self.push_source(node.source_str());
                return self;
            }
            NodeKind::Entity(kind) => kind,
        };

        match kind {
            EntityType::Pre => {
                let mut tag = String::from("<pre class=\"code-block\" data-entity-type=\"pre\"");
                if let Some(language) = node.language.as_deref() {
                    let _ = write!(tag, " data-language=\"{}\"", escape(language));
                }
                tag.push('>');
                self.render_block(node, kind, tag, "</pre>", |mut state| {
                    state.push_text(node.value_str());
                    state
                })
            }
            EntityType::Blockquote => {
                let tag =
                    "<blockquote class=\"text-entity-blockquote\" data-entity-type=\"blockquote\">"
                        .to_string();
                self.render_block(node, kind, tag, "</blockquote>", |state| {
                    node.children.iter().fold(state, Self::visit)
                })
            }
            EntityType::Code => {
                let symbol = kind.markup_symbol();
                self.push_symbols(symbol.open);
                self.open_tag(
                    "<code class=\"text-entity-code\" data-entity-type=\"code\">".to_string(),
                    "</code>",
                );
                self.push_text(node.value_str());
                self.close_tag();
                self.push_symbols(symbol.close);
                self
            }
            EntityType::Bold
            | EntityType::Italic
            | EntityType::Strike
            | EntityType::Underline
            | EntityType::Spoiler => {
                let symbol = kind.markup_symbol();
                let (open, close) = inline_tag(kind);
                self.push_symbols(symbol.open);
                self.open_tag(open, close);
                self = node.children.iter().fold(self, Self::visit);
                self.close_tag();
                self.push_symbols(symbol.close);
                self
            }
            EntityType::TextUrl => {
                let url = node.url.as_deref().unwrap_or_default();
                self.push_symbols(kind.markup_symbol().open);
                self.open_tag(
                    format!(
                        "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" data-entity-type=\"textUrl\">",
                        escape(url)
                    ),
                    "</a>",
                );
                self.push_text(node.value_str());
                self.close_tag();
                self.push_symbols(kind.markup_symbol().close);
                self.push_url_part(url);
                self
            }
            EntityType::Mention => {
                self.push_symbols(kind.markup_symbol().open);
                self.open_tag(
                    "<span class=\"mention\" data-entity-type=\"mention\">".to_string(),
                    "</span>",
                );
                self.push_text(node.value_str());
                self.close_tag();
                self
            }
            EntityType::CustomEmoji => {
                let label = node.value_str();
                let url = node.url.as_deref().unwrap_or_default();
                let document_id = node.document_id.as_deref().unwrap_or(url);
                self.push_symbols(kind.markup_symbol().open);
                self.push_text(label);
                self.push_symbols(kind.markup_symbol().close);
                self.push_url_part(url);
                let _ = write!(
                    self.current_line,
                    "<img class=\"emoji\" alt=\"{}\" data-document-id=\"{}\" data-entity-type=\"customEmoji\" />",
                    escape(label),
                    escape(document_id)
                );
                self
            }
        }
    }

    /// Fence, block tag, content, closing tag and closing fence.
    ///
    /// The fence opening is the raw source (```` ``` ````, an optional `q `
    /// or language, an optional newline) so offsets stay aligned.
    fn render_block(
        mut self,
        node: &AstNode,
        kind: EntityType,
        open_tag: String,
        close_tag: &str,
        content: impl FnOnce(Self) -> Self,
    ) -> Self {
        let opening = node
            .opening
            .as_deref()
            .unwrap_or(kind.markup_symbol().open);

        if self.has_content() {
            self.flush_line();
        }
        self.push_symbols(opening);
        if self.has_content() {
            self.flush_line();
        }
        self.lines.push(open_tag);

        self = content(self);

        if self.has_content() {
            self.flush_line();
        }
        self.lines.push(close_tag.to_string());
        self.push_symbols(BLOCK_FENCE);

        tracing::trace!(
            target: "composer::render",
            kind = %kind,
            end = self.offset,
            "rendered block"
        );
        self
    }

    fn finish(mut self) -> RenderOutput {
        self.flush_line();
        RenderOutput {
            html: self.lines.concat(),
            max_offset: MarkupOffset(self.offset),
            layout: self.layout,
        }
    }

    /// True when the current line holds more than a newline-start anchor.
    fn has_content(&self) -> bool {
        self.current_spans.iter().any(|span| !span.is_virtual())
    }

    /// Raw text source: an escape backslash renders as a markup symbol
    /// followed by the escaped character.
    fn push_source(&mut self, source: &str) {
        let mut chars = source.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    self.push_symbol('\\');
                    self.push_char(escaped);
                    continue;
                }
            }
            self.push_char(ch);
        }
    }

    fn push_text(&mut self, text: &str) {
        text.chars().for_each(|ch| self.push_char(ch));
    }

    fn push_char(&mut self, ch: char) {
        match ch {
            ' ' => self.push_span(SpanKind::Space, Some("space"), " ", 1),
            '\n' => self.push_newline(Some("newline")),
            _ => {
                let mut buf = [0u8; 4];
                let escaped = escape(ch.encode_utf8(&mut buf)).into_owned();
                self.push_span(SpanKind::Char, None, &escaped, ch.len_utf16());
            }
        }
    }

    fn push_symbols(&mut self, symbols: &str) {
        symbols.chars().for_each(|ch| self.push_symbol(ch));
    }

    fn push_symbol(&mut self, ch: char) {
        if ch == '\n' {
            self.push_newline(Some("markup-symbol newline"));
            return;
        }
        let mut buf = [0u8; 4];
        let escaped = escape(ch.encode_utf8(&mut buf)).into_owned();
        self.push_span(
            SpanKind::Symbol,
            Some("markup-symbol"),
            &escaped,
            ch.len_utf16(),
        );
    }

    /// `](url)` tail of a link or custom emoji.
    fn push_url_part(&mut self, url: &str) {
        self.push_symbols("(");
        self.push_symbols(url);
        self.push_symbols(")");
    }

    fn push_newline(&mut self, class: Option<&str>) {
        self.push_span(SpanKind::Newline, class, "", 1);
        self.pending_newline_start = true;
        self.flush_line();
    }

    fn push_span(&mut self, kind: SpanKind, class: Option<&str>, content: &str, len: usize) {
        let offset = self.offset;
        self.write_span(class, "data-offset", offset, content);
        self.current_spans.push(RenderedSpan {
            offset: MarkupOffset(offset),
            len,
            kind,
        });
        self.offset += len;
    }

    fn write_span(&mut self, class: Option<&str>, attr: &str, offset: usize, content: &str) {
        let selected = self.selection.contains(offset);
        // Writing into a String cannot fail.
        let _ = match (class, selected) {
            (Some(class), true) => write!(self.current_line, "<span class=\"{class} selected\""),
            (Some(class), false) => write!(self.current_line, "<span class=\"{class}\""),
            (None, true) => write!(self.current_line, "<span class=\"selected\""),
            (None, false) => write!(self.current_line, "<span"),
        };
        let _ = write!(self.current_line, " {attr}=\"{offset}\">{content}</span>");
    }

    fn open_tag(&mut self, open: String, close: &'static str) {
        self.current_line.push_str(&open);
        self.open_tags.push((open, close));
    }

    fn close_tag(&mut self) {
        if let Some((_, close)) = self.open_tags.pop() {
            self.current_line.push_str(close);
        }
    }

    /// Close the current line. Inline tags still open are closed here and
    /// reopened on the next line so every line div is well formed.
    fn flush_line(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }

        for (_, close) in self.open_tags.iter().rev() {
            self.current_line.push_str(close);
        }
        self.lines.push(format!(
            "<div class=\"editor-line\">{}</div>",
            std::mem::take(&mut self.current_line)
        ));
        self.layout.push(std::mem::take(&mut self.current_spans));

        if self.pending_newline_start {
            self.pending_newline_start = false;
            let virtual_offset = self.offset.saturating_sub(1);
            self.write_span(Some("newline-start"), "data-virtual-offset", virtual_offset, "");
            self.current_spans.push(RenderedSpan {
                offset: MarkupOffset(virtual_offset),
                len: 0,
                kind: SpanKind::NewlineStart,
            });
        }

        for (open, _) in &self.open_tags {
            self.current_line.push_str(open);
        }
    }
}

fn inline_tag(kind: EntityType) -> (String, &'static str) {
    match kind {
        EntityType::Spoiler => (
            "<span class=\"spoiler\" data-entity-type=\"spoiler\">".to_string(),
            "</span>",
        ),
        _ => {
            let tag = kind.html_tag().unwrap_or("span");
            let close = match tag {
                "strong" => "</strong>",
                "em" => "</em>",
                "del" => "</del>",
                "u" => "</u>",
                _ => "</span>",
            };
            (format!("<{tag} data-entity-type=\"{kind}\">"), close)
        }
    }
}

fn escape(s: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_quoted_attribute(s)
}
