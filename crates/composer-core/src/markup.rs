//! Serialize formatted text back into markup.
//!
//! Used to load an existing message into the composer for editing. The output
//! compiles back to the same text and entities for well-nested input.

use crate::entity::{BLOCK_FENCE, Entity, EntityType, FormattedText};
use crate::tokenizer::is_language_byte;
use crate::types::{PlainOffset, utf16_len};

const ESCAPED_CHARS: &[char] = &['\\', '*', '_', '~', '`', '[', '|', '@', '!'];

/// Marker that follows the fence of a blockquote.
const QUOTE_OPENING: &str = "q ";

/// Render `formatted` as markup.
///
/// Adjacent closing symbols that share a character (an italic ending right
/// where a bold ends) re-tokenize by scan order and may not round-trip.
///
/// Entities nested inside a leaf entity (code, pre, link, emoji, mention) or
/// blocks nested inside a blockquote cannot be expressed and are dropped.
/// Entities that overlap without nesting are clipped to their parent. A leaf
/// whose content would close it early, or a pre whose language reads as a
/// quote marker, is dropped and its text written as escaped plain text.
pub fn formatted_text_to_markup(formatted: &FormattedText) -> String {
    let text = &formatted.text;
    let total = PlainOffset(utf16_len(text));

    let mut entities: Vec<&Entity> = formatted
        .entities()
        .iter()
        .filter(|entity| {
            if entity.length == 0 || entity.end() > total {
                tracing::warn!(
                    target: "composer::markup",
                    kind = %entity.kind,
                    offset = entity.offset,
                    length = entity.length,
                    "dropping out of range entity"
                );
                return false;
            }
            if let Some(reason) = unwritable(entity, &covered_text(text, entity)) {
                tracing::warn!(
                    target: "composer::markup",
                    kind = %entity.kind,
                    offset = entity.offset,
                    length = entity.length,
                    reason,
                    "dropping entity that markup cannot express"
                );
                return false;
            }
            true
        })
        .collect();
    entities.sort_by(|a, b| a.start().cmp(&b.start()).then(b.length.cmp(&a.length)));

    let mut out = String::with_capacity(text.len() + entities.len() * 4);
    let mut stack: Vec<(&Entity, PlainOffset)> = Vec::new();
    let mut next = 0;
    let mut pos = PlainOffset::default();

    for ch in text.chars() {
        close_until(&mut out, &mut stack, pos);

        while let Some(&entity) = entities.get(next).filter(|e| e.start() <= pos) {
            next += 1;
            if !can_open(entity.kind, &stack) {
                continue;
            }
            let parent_end = stack.last().map_or(total, |&(_, end)| end);
            let end = entity.end().min(parent_end);
            out.push_str(&opening(entity));
            stack.push((entity, end));
        }

        let in_leaf = stack.iter().any(|(entity, _)| is_leaf(entity.kind));
        let before_mention = ch == '@'
            && entities[next..]
                .iter()
                .any(|e| e.kind == EntityType::Mention && e.start() == pos.advance(1));
        if !in_leaf && !before_mention && ESCAPED_CHARS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);

        pos = pos.advance(ch.len_utf16());
    }

    close_until(&mut out, &mut stack, PlainOffset(usize::MAX));
    out
}

/// The part of `text` that `entity` covers.
fn covered_text(text: &str, entity: &Entity) -> String {
    let (start, end) = (entity.start(), entity.end());
    let mut pos = PlainOffset::default();
    text.chars()
        .filter(|ch| {
            let at = pos;
            pos = pos.advance(ch.len_utf16());
            at >= start && at < end
        })
        .collect()
}

/// Why a leaf entity over `content` would not tokenize back to itself.
fn unwritable(entity: &Entity, content: &str) -> Option<&'static str> {
    let target = match entity.kind {
        EntityType::TextUrl => entity.url.as_deref(),
        EntityType::CustomEmoji => entity.document_id.as_deref(),
        _ => None,
    }
    .unwrap_or_default();

    match entity.kind {
        EntityType::Code if content.contains(['`', '\n']) => {
            Some("code contains a backtick or newline")
        }
        EntityType::Pre if content.contains(BLOCK_FENCE) || content.ends_with('`') => {
            Some("pre contains a fence")
        }
        EntityType::Pre if entity.language.as_deref().is_some_and(is_quote_or_invalid) => {
            Some("pre language is not a plain identifier")
        }
        EntityType::TextUrl | EntityType::CustomEmoji
            if content.contains(']') || target.contains(')') || target.ends_with('\\') =>
        {
            Some("label or target contains a closing delimiter")
        }
        kind if is_leaf(kind) && content.ends_with('\\') => Some("content ends with a backslash"),
        _ => None,
    }
}

fn is_quote_or_invalid(language: &str) -> bool {
    language == "q" || !language.bytes().all(is_language_byte)
}

fn close_until(out: &mut String, stack: &mut Vec<(&Entity, PlainOffset)>, pos: PlainOffset) {
    while let Some(&(entity, end)) = stack.last() {
        if end > pos {
            break;
        }
        out.push_str(&closing(entity));
        stack.pop();
    }
}

fn is_leaf(kind: EntityType) -> bool {
    matches!(
        kind,
        EntityType::Code
            | EntityType::Pre
            | EntityType::TextUrl
            | EntityType::CustomEmoji
            | EntityType::Mention
    )
}

fn is_block(kind: EntityType) -> bool {
    matches!(kind, EntityType::Pre | EntityType::Blockquote)
}

fn can_open(kind: EntityType, stack: &[(&Entity, PlainOffset)]) -> bool {
    stack.iter().all(|(open, _)| {
        !is_leaf(open.kind) && !(is_block(kind) && open.kind == EntityType::Blockquote)
    })
}

fn opening(entity: &Entity) -> String {
    match entity.kind {
        EntityType::Pre => {
            let language = entity.language.as_deref().unwrap_or_default();
            format!("{BLOCK_FENCE}{language}\n")
        }
        EntityType::Blockquote => format!("{BLOCK_FENCE}{QUOTE_OPENING}"),
        // The `@` is part of the text already.
        EntityType::Mention => String::new(),
        kind => kind.markup_symbol().open.to_owned(),
    }
}

fn closing(entity: &Entity) -> String {
    match entity.kind {
        EntityType::TextUrl => format!("]({})", entity.url.as_deref().unwrap_or_default()),
        EntityType::CustomEmoji => {
            format!("]({})", entity.document_id.as_deref().unwrap_or_default())
        }
        kind => kind.markup_symbol().close.to_owned(),
    }
}
