//! Message entities: the positional formatting annotations of the wire format.
//!
//! A formatted message is plain text plus a list of entities, each covering
//! `[offset, offset + length)` in UTF-16 code units of that text.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::PlainOffset;

/// Entity kinds understood by the markup language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Bold,
    Italic,
    Strike,
    Underline,
    Code,
    Pre,
    Blockquote,
    Spoiler,
    TextUrl,
    CustomEmoji,
    Mention,
}

/// Opening and closing markup for an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupSymbol {
    pub open: &'static str,
    pub close: &'static str,
}

impl MarkupSymbol {
    const fn paired(symbol: &'static str) -> Self {
        Self {
            open: symbol,
            close: symbol,
        }
    }
}

/// Fence shared by pre and blockquote blocks.
pub const BLOCK_FENCE: &str = "```";

impl EntityType {
    /// Markup symbols for this entity.
    ///
    /// Link-like entities only list the label brackets; the `(url)` part is
    /// appended after `close` by whoever renders them. Mentions have no
    /// closing symbol.
    pub const fn markup_symbol(self) -> MarkupSymbol {
        match self {
            EntityType::Bold => MarkupSymbol::paired("**"),
            EntityType::Italic => MarkupSymbol::paired("*"),
            EntityType::Strike => MarkupSymbol::paired("~~"),
            EntityType::Underline => MarkupSymbol::paired("__"),
            EntityType::Code => MarkupSymbol::paired("`"),
            EntityType::Pre | EntityType::Blockquote => MarkupSymbol::paired(BLOCK_FENCE),
            EntityType::Spoiler => MarkupSymbol::paired("||"),
            EntityType::TextUrl => MarkupSymbol {
                open: "[",
                close: "]",
            },
            EntityType::CustomEmoji => MarkupSymbol {
                open: "![",
                close: "]",
            },
            EntityType::Mention => MarkupSymbol {
                open: "@",
                close: "",
            },
        }
    }

    /// HTML tag used when rendering this entity, if it has a dedicated one.
    pub const fn html_tag(self) -> Option<&'static str> {
        match self {
            EntityType::Bold => Some("strong"),
            EntityType::Italic => Some("em"),
            EntityType::Strike => Some("del"),
            EntityType::Underline => Some("u"),
            EntityType::Code => Some("code"),
            EntityType::Pre => Some("pre"),
            EntityType::Blockquote => Some("blockquote"),
            EntityType::Spoiler => Some("span"),
            EntityType::TextUrl | EntityType::CustomEmoji | EntityType::Mention => None,
        }
    }

    /// Value of the `data-entity-type` attribute.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityType::Bold => "bold",
            EntityType::Italic => "italic",
            EntityType::Strike => "strike",
            EntityType::Underline => "underline",
            EntityType::Code => "code",
            EntityType::Pre => "pre",
            EntityType::Blockquote => "blockquote",
            EntityType::Spoiler => "spoiler",
            EntityType::TextUrl => "textUrl",
            EntityType::CustomEmoji => "customEmoji",
            EntityType::Mention => "mention",
        }
    }

    /// Formatting pairs in the order the tokenizer tries them.
    ///
    /// `**` precedes `*` so a bold delimiter is never read as two italics.
    pub const FORMATTING_ORDER: [EntityType; 5] = [
        EntityType::Bold,
        EntityType::Italic,
        EntityType::Strike,
        EntityType::Underline,
        EntityType::Spoiler,
    ];
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positional formatting annotation over compiled plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub offset: usize,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<SmolStr>,
}

impl Entity {
    /// Entity without payload.
    pub fn new(kind: EntityType, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            url: None,
            document_id: None,
            language: None,
        }
    }

    /// Entity without payload covering `[start, end)`.
    pub fn spanning(kind: EntityType, start: PlainOffset, end: PlainOffset) -> Self {
        Self::new(kind, start.get(), end.since(start))
    }

    pub fn start(&self) -> PlainOffset {
        PlainOffset(self.offset)
    }

    pub fn end(&self) -> PlainOffset {
        PlainOffset(self.offset + self.length)
    }
}

/// Canonical `{ text, entities? }` wire shape of a formatted message.
///
/// `entities` is `None` rather than empty when there is no formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
}

impl FormattedText {
    /// Entities as a slice, empty when absent.
    pub fn entities(&self) -> &[Entity] {
        self.entities.as_deref().unwrap_or(&[])
    }
}
