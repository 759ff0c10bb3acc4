//! composer-core: Markup composer logic without browser dependencies.
//!
//! This crate provides:
//! - `tokenize` / `parse` - markup to tokens to AST, one scan per pass
//! - `parse_ast_as_formatted_text` - AST to `{ text, entities }`
//! - `formatted_text_to_markup` - the reverse, for editing sent messages
//! - `render_ast` - offset-annotated HTML plus a line layout
//! - Caret and pointer mapping over `LayoutHost`
//! - `SelectionController`, `TextFormatter` and `Composer`, generic over the
//!   host traits in [`platform`]

pub mod ast;
pub mod caret;
pub mod compile;
pub mod composer;
pub mod config;
pub mod controller;
pub mod entity;
pub mod error;
pub mod formatter;
pub mod markup;
pub mod platform;
pub mod render;
pub mod tokenizer;
pub mod types;

pub use ast::{AstNode, NodeKind, parse, parse_markup};
pub use caret::{
    PointerDown, PointerTarget, RangeAnchor, RangePosition, caret_coordinates,
    empty_area_offset, line_selection, offset_from_range_position, resolve_pointer_down,
};
pub use compile::parse_ast_as_formatted_text;
pub use composer::{Composer, MessageId, MessageSink, OutgoingMessage, SendOutcome};
pub use config::ComposerConfig;
pub use controller::{DebounceGate, SelectionController, SelectionEvent};
pub use entity::{BLOCK_FENCE, Entity, EntityType, FormattedText, MarkupSymbol};
pub use error::{ComposerError, HostError, Result};
pub use formatter::{
    ButtonState, FormatOutcome, FormatState, FormatterAction, LinkControl, Modifiers, TextFormat,
    TextFormatter, normalize_link_url, shortcut,
};
pub use markup::formatted_text_to_markup;
pub use platform::{EditCommand, EditingHost, LayoutHost, SelectionHost};
pub use render::{RenderOutput, RenderState, RenderedSpan, SpanKind, render_ast};
pub use smol_str::SmolStr;
pub use tokenizer::{Token, TokenKind, tokenize};
pub use types::{
    CaretCoordinates, ContentOrigin, MarkupOffset, PlainOffset, Rect, Selection, utf16_len,
};
