//! Markup tokenizer.
//!
//! A single forward scan over the input. At every position the handlers are
//! tried in a fixed priority order (escape, block fence, inline code, link or
//! custom emoji, mention, formatting pair) and the first one that matches
//! wins. Anything that does not match accumulates as plain text, so
//! unterminated delimiters degrade to literal text instead of failing.
//!
//! Positions are byte indices. Every delimiter is ASCII, so every slice taken
//! here starts and ends on a char boundary.

use smol_str::SmolStr;

use crate::entity::{BLOCK_FENCE, EntityType};

/// Characters that end a plain text run when unescaped.
const SPECIAL_CHARS: &[u8] = b"\\*_~`[|@!";

/// Marker after the opening fence that turns a pre block into a blockquote.
const QUOTE_MARKER: u8 = b'q';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Entity(EntityType),
}

/// A token produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal content. For text this has escapes resolved; for code, pre,
    /// links, custom emoji and mentions it is the raw content.
    pub value: Option<String>,
    pub children: Option<Vec<Token>>,
    pub language: Option<SmolStr>,
    pub url: Option<SmolStr>,
    /// Source text of a text token, escape backslashes included.
    pub source: Option<String>,
    /// Raw opening fence of a block (```` ``` ````, optional `q `/language,
    /// optional newline).
    pub opening: Option<SmolStr>,
}

impl Token {
    fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            value: None,
            children: None,
            language: None,
            url: None,
            source: None,
            opening: None,
        }
    }

    /// Plain text token whose value equals its source.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            source: Some(value.clone()),
            value: Some(value),
            ..Self::new(TokenKind::Text)
        }
    }

    fn escaped(ch: char) -> Self {
        let mut source = String::with_capacity(1 + ch.len_utf8());
        source.push('\\');
        source.push(ch);
        Self {
            value: Some(ch.to_string()),
            source: Some(source),
            ..Self::new(TokenKind::Text)
        }
    }

    fn entity(kind: EntityType) -> Self {
        Self::new(TokenKind::Entity(kind))
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        match self.kind {
            TokenKind::Entity(kind) => Some(kind),
            TokenKind::Text => None,
        }
    }
}

/// Tokenize markup.
///
/// `is_nested` is set while tokenizing the content of a blockquote; it turns
/// off fence recognition so blocks never nest.
pub fn tokenize(input: &str, is_nested: bool) -> Vec<Token> {
    Scanner {
        input,
        bytes: input.as_bytes(),
        is_nested,
        pos: 0,
    }
    .run()
}

type Handler<'a> = fn(&Scanner<'a>) -> Option<(Token, usize)>;

struct Scanner<'a> {
    input: &'a str,
    bytes: &'a [u8],
    is_nested: bool,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn run(mut self) -> Vec<Token> {
        let handlers: [Handler<'a>; 5] = [
            Self::block,
            Self::inline_code,
            Self::link,
            Self::mention,
            Self::formatting,
        ];
        let mut tokens = Vec::new();

        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'\\' && self.pos + 1 < self.bytes.len() {
                // The escaped char may be multi-byte; take it whole.
                if let Some(ch) = self.input[self.pos + 1..].chars().next() {
                    tokens.push(Token::escaped(ch));
                    self.pos += 1 + ch.len_utf8();
                    continue;
                }
            }

            if let Some((token, next)) = handlers.iter().find_map(|handler| handler(&self)) {
                tracing::trace!(
                    target: "composer::tokenizer",
                    kind = ?token.kind,
                    start = self.pos,
                    end = next,
                    "matched token"
                );
                tokens.push(token);
                self.pos = next;
                continue;
            }

            let end = self.text_end();
            tokens.push(Token::text(&self.input[self.pos..end]));
            self.pos = end;
        }

        tokens
    }

    fn byte(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    fn starts_with(&self, symbol: &str, pos: usize) -> bool {
        self.bytes
            .get(pos..)
            .is_some_and(|rest| rest.starts_with(symbol.as_bytes()))
    }

    /// A position is escaped when preceded by an odd number of backslashes.
    fn is_escaped(&self, pos: usize) -> bool {
        let backslashes = self.bytes[..pos]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        backslashes % 2 == 1
    }

    /// Next unescaped occurrence of `symbol` at or after `from`.
    fn find_closing(&self, symbol: &str, from: usize) -> Option<usize> {
        (from..self.bytes.len()).find(|&pos| self.starts_with(symbol, pos) && !self.is_escaped(pos))
    }

    /// End of the plain text run starting at the current position.
    fn text_end(&self) -> usize {
        let mut end = self.pos + 1;
        while end < self.bytes.len() {
            if SPECIAL_CHARS.contains(&self.bytes[end]) && !self.is_escaped(end) {
                break;
            }
            end += 1;
        }
        end.min(self.bytes.len())
    }

    fn block(&self) -> Option<(Token, usize)> {
        let pos = self.pos;
        if self.is_nested || !self.starts_with(BLOCK_FENCE, pos) || self.is_escaped(pos) {
            return None;
        }

        let mut content_start = pos + BLOCK_FENCE.len();
        let mut is_quote = false;
        let mut language = None;

        if self.byte(content_start) == Some(QUOTE_MARKER)
            && matches!(self.byte(content_start + 1), Some(b' ' | b'\n'))
        {
            is_quote = true;
            // A space belongs to the marker; a newline is swallowed below.
            content_start += if self.byte(content_start + 1) == Some(b' ') {
                2
            } else {
                1
            };
        } else {
            let lang_len = self.bytes[content_start..]
                .iter()
                .take_while(|&&b| is_language_byte(b))
                .count();
            if lang_len > 0 && self.byte(content_start + lang_len) == Some(b'\n') {
                language = Some(SmolStr::new(
                    &self.input[content_start..content_start + lang_len],
                ));
                content_start += lang_len;
            }
        }

        if self.byte(content_start) == Some(b'\n') {
            content_start += 1;
        }

        let end = self.find_closing(BLOCK_FENCE, content_start)?;
        let content = &self.input[content_start..end];
        let opening = SmolStr::new(&self.input[pos..content_start]);

        let token = if is_quote {
            Token {
                children: Some(tokenize(content, true)),
                opening: Some(opening),
                ..Token::entity(EntityType::Blockquote)
            }
        } else {
            Token {
                value: Some(content.to_string()),
                language,
                opening: Some(opening),
                ..Token::entity(EntityType::Pre)
            }
        };

        Some((token, end + BLOCK_FENCE.len()))
    }

    fn inline_code(&self) -> Option<(Token, usize)> {
        let pos = self.pos;
        if self.byte(pos) != Some(b'`') || self.is_escaped(pos) {
            return None;
        }

        let end = self.find_closing("`", pos + 1)?;
        let content = &self.input[pos + 1..end];
        if content.is_empty() || content.contains('\n') {
            return None;
        }

        let token = Token {
            value: Some(content.to_string()),
            ..Token::entity(EntityType::Code)
        };
        Some((token, end + 1))
    }

    fn link(&self) -> Option<(Token, usize)> {
        let pos = self.pos;
        let is_emoji = self.byte(pos) == Some(b'!') && self.byte(pos + 1) == Some(b'[');
        if (!is_emoji && self.byte(pos) != Some(b'[')) || self.is_escaped(pos) {
            return None;
        }

        let label_start = if is_emoji { pos + 2 } else { pos + 1 };
        let label_end = self.find_closing("]", label_start)?;
        if self.byte(label_end + 1) != Some(b'(') {
            return None;
        }

        let url_start = label_end + 2;
        let url_end = self.find_closing(")", url_start)?;

        let kind = if is_emoji {
            EntityType::CustomEmoji
        } else {
            EntityType::TextUrl
        };
        let token = Token {
            value: Some(self.input[label_start..label_end].to_string()),
            url: Some(SmolStr::new(&self.input[url_start..url_end])),
            ..Token::entity(kind)
        };
        Some((token, url_end + 1))
    }

    fn mention(&self) -> Option<(Token, usize)> {
        let pos = self.pos;
        if self.byte(pos) != Some(b'@') || self.is_escaped(pos) {
            return None;
        }

        let handle_len = self.bytes[pos + 1..]
            .iter()
            .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'_')
            .count();
        if handle_len == 0 {
            return None;
        }

        let end = pos + 1 + handle_len;
        let token = Token {
            value: Some(self.input[pos + 1..end].to_string()),
            ..Token::entity(EntityType::Mention)
        };
        Some((token, end))
    }

    fn formatting(&self) -> Option<(Token, usize)> {
        let pos = self.pos;
        if self.is_escaped(pos) {
            return None;
        }

        EntityType::FORMATTING_ORDER.iter().find_map(|&kind| {
            let symbol = kind.markup_symbol().open;
            if !self.starts_with(symbol, pos) {
                return None;
            }
            let end = self.find_closing(symbol, pos + symbol.len())?;
            let inner = &self.input[pos + symbol.len()..end];
            let token = Token {
                children: Some(tokenize(inner, self.is_nested)),
                ..Token::entity(kind)
            };
            Some((token, end + symbol.len()))
        })
    }
}

pub(crate) fn is_language_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'#' | b'-' | b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn value(token: &Token) -> &str {
        token.value.as_deref().unwrap_or_default()
    }

    #[test]
    fn test_plain_text_single_token() {
        let tokens = tokenize("hello world", false);
        assert_eq!(tokens, vec![Token::text("hello world")]);
    }

    #[test]
    fn test_bold() {
        let tokens = tokenize("**bold**", false);
        assert_eq!(kinds(&tokens), vec![TokenKind::Entity(EntityType::Bold)]);
        let children = tokens[0].children.as_ref().unwrap();
        assert_eq!(children, &vec![Token::text("bold")]);
    }

    #[test]
    fn test_double_star_wins_over_italic() {
        let tokens = tokenize("**a**", false);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::Bold));
    }

    #[test]
    fn test_italic_strike_underline_spoiler() {
        for (input, kind) in [
            ("*a*", EntityType::Italic),
            ("~~a~~", EntityType::Strike),
            ("__a__", EntityType::Underline),
            ("||a||", EntityType::Spoiler),
        ] {
            let tokens = tokenize(input, false);
            assert_eq!(tokens.len(), 1, "{input}");
            assert_eq!(tokens[0].entity_type(), Some(kind), "{input}");
        }
    }

    #[test]
    fn test_unterminated_is_text() {
        let tokens = tokenize("**open", false);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Text));
        let joined: String = tokens.iter().map(value).collect();
        assert_eq!(joined, "**open");
    }

    #[test]
    fn test_empty_pair_is_formatting() {
        let tokens = tokenize("****", false);
        assert_eq!(kinds(&tokens), vec![TokenKind::Entity(EntityType::Bold)]);
        assert_eq!(tokens[0].children.as_ref().unwrap(), &Vec::<Token>::new());

        let tokens = tokenize("||||", false);
        assert_eq!(kinds(&tokens), vec![TokenKind::Entity(EntityType::Spoiler)]);
    }

    #[test]
    fn test_escape_consumes_next_char() {
        let tokens = tokenize(r"\*\*not bold\*\*", false);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Text));
        let joined: String = tokens.iter().map(value).collect();
        assert_eq!(joined, "**not bold**");
        let source: String = tokens
            .iter()
            .map(|t| t.source.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(source, r"\*\*not bold\*\*");
    }

    #[test]
    fn test_escape_multibyte() {
        let tokens = tokenize("\\é", false);
        assert_eq!(tokens.len(), 1);
        assert_eq!(value(&tokens[0]), "é");
    }

    #[test]
    fn test_trailing_backslash_is_text() {
        let tokens = tokenize("a\\", false);
        let joined: String = tokens.iter().map(value).collect();
        assert_eq!(joined, "a\\");
    }

    #[test]
    fn test_escaped_closing_symbol_is_skipped() {
        // The first closing `*` is escaped, so the pair closes on the second.
        let tokens = tokenize(r"*a\*b*", false);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::Italic));
    }

    #[test]
    fn test_inline_code() {
        let tokens = tokenize("run `cargo test` now", false);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Text,
                TokenKind::Entity(EntityType::Code),
                TokenKind::Text
            ]
        );
        assert_eq!(value(&tokens[1]), "cargo test");
    }

    #[test]
    fn test_inline_code_rejects_empty_and_newline() {
        assert!(
            tokenize("``", false)
                .iter()
                .all(|t| t.kind == TokenKind::Text)
        );
        assert!(
            tokenize("`a\nb`", false)
                .iter()
                .all(|t| t.kind != TokenKind::Entity(EntityType::Code))
        );
    }

    #[test]
    fn test_pre_block() {
        let tokens = tokenize("```\nfn main() {}\n```", false);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::Pre));
        assert_eq!(value(&tokens[0]), "fn main() {}\n");
        assert_eq!(tokens[0].opening.as_deref(), Some("```\n"));
        assert_eq!(tokens[0].language, None);
    }

    #[test]
    fn test_pre_block_language() {
        let tokens = tokenize("```rust\nlet x = 1;```", false);
        assert_eq!(tokens[0].language.as_deref(), Some("rust"));
        assert_eq!(value(&tokens[0]), "let x = 1;");
        assert_eq!(tokens[0].opening.as_deref(), Some("```rust\n"));
    }

    #[test]
    fn test_word_without_newline_is_not_language() {
        let tokens = tokenize("```abc```", false);
        assert_eq!(tokens[0].language, None);
        assert_eq!(value(&tokens[0]), "abc");
    }

    #[test]
    fn test_blockquote() {
        let tokens = tokenize("```q **quoted**```", false);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::Blockquote));
        assert_eq!(tokens[0].opening.as_deref(), Some("```q "));
        let children = tokens[0].children.as_ref().unwrap();
        assert_eq!(children[0].entity_type(), Some(EntityType::Bold));
    }

    #[test]
    fn test_blockquote_marker_with_newline() {
        let tokens = tokenize("```q\nquoted```", false);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::Blockquote));
        assert_eq!(tokens[0].opening.as_deref(), Some("```q\n"));
        assert_eq!(tokens[0].children.as_ref().unwrap(), &vec![Token::text("quoted")]);
    }

    #[test]
    fn test_nested_tokenize_never_yields_blocks() {
        let tokens = tokenize("```inner```", true);
        assert!(tokens.iter().all(|t| !matches!(
            t.entity_type(),
            Some(EntityType::Pre | EntityType::Blockquote)
        )));
    }

    #[test]
    fn test_fence_inside_quote_closes_the_quote() {
        // The quote closes on the first fence after its marker, so the inner
        // fence never becomes quote content.
        let tokens = tokenize("```q\n```nested```\n```", false);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Entity(EntityType::Blockquote),
                TokenKind::Text,
                TokenKind::Entity(EntityType::Pre),
            ]
        );
        assert_eq!(tokens[0].children.as_ref().unwrap(), &Vec::<Token>::new());
        assert_eq!(value(&tokens[1]), "nested");
        assert_eq!(value(&tokens[2]), "");
    }

    #[test]
    fn test_unterminated_fence_is_text() {
        let tokens = tokenize("```never closed", false);
        assert!(tokens.iter().all(|t| !matches!(
            t.entity_type(),
            Some(EntityType::Pre | EntityType::Blockquote)
        )));
    }

    #[test]
    fn test_text_url() {
        let tokens = tokenize("[site](https://example.com)", false);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::TextUrl));
        assert_eq!(value(&tokens[0]), "site");
        assert_eq!(tokens[0].url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_link_requires_paren_after_bracket() {
        let tokens = tokenize("[site] (x)", false);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Text));
    }

    #[test]
    fn test_custom_emoji() {
        let tokens = tokenize("![😀](doc123)", false);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::CustomEmoji));
        assert_eq!(value(&tokens[0]), "😀");
        assert_eq!(tokens[0].url.as_deref(), Some("doc123"));
    }

    #[test]
    fn test_mention() {
        let tokens = tokenize("Hello @alice!", false);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Text,
                TokenKind::Entity(EntityType::Mention),
                TokenKind::Text
            ]
        );
        assert_eq!(value(&tokens[1]), "alice");
        assert_eq!(value(&tokens[2]), "!");
    }

    #[test]
    fn test_bare_at_is_text() {
        let tokens = tokenize("a @ b", false);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Text));
    }

    #[test]
    fn test_scan_order_resolves_ambiguity() {
        // First `*` pairs with the first unescaped `*` after it.
        let tokens = tokenize("*italic**not-bold*", false);
        assert_eq!(tokens[0].entity_type(), Some(EntityType::Italic));
        assert_eq!(
            tokens[0].children.as_ref().unwrap(),
            &vec![Token::text("italic")]
        );
    }
}
