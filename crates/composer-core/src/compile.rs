//! Compile an AST into the `{ text, entities? }` wire shape.

use crate::ast::{AstNode, NodeKind};
use crate::entity::{Entity, EntityType, FormattedText};
use crate::error::{ComposerError, Result};
use crate::types::{PlainOffset, utf16_len};

/// Flatten `ast` into plain text plus positional entities.
///
/// Whitespace is trimmed at the edges of the document only; interior
/// whitespace is message content. Entities are sorted by offset, longer
/// first on ties, and an empty list is reported as `None`.
pub fn parse_ast_as_formatted_text(ast: &AstNode) -> Result<FormattedText> {
    let mut root = ast.clone();
    trim_leading(&mut root.children);
    trim_trailing(&mut root.children);

    let mut compiler = Compiler::default();
    compiler.visit(&root)?;

    let mut entities: Vec<Entity> = compiler.entities.into_iter().flatten().collect();
    // Stable sort: entities pushed in pre-order keep outer before inner on
    // full ties.
    entities.sort_by(|a, b| a.offset.cmp(&b.offset).then(b.length.cmp(&a.length)));

    tracing::trace!(
        target: "composer::compile",
        text_len = compiler.len.get(),
        entities = entities.len(),
        "compiled formatted text"
    );

    Ok(FormattedText {
        text: compiler.text,
        entities: (!entities.is_empty()).then_some(entities),
    })
}

fn is_container(kind: NodeKind) -> bool {
    match kind {
        NodeKind::Root => true,
        NodeKind::Text => false,
        NodeKind::Entity(kind) => matches!(
            kind,
            EntityType::Bold
                | EntityType::Italic
                | EntityType::Strike
                | EntityType::Underline
                | EntityType::Spoiler
                | EntityType::Blockquote
        ),
    }
}

/// Strip leading whitespace from the first text leaves, dropping leaves that
/// become empty. Returns true once a leaf with content has been reached.
fn trim_leading(nodes: &mut Vec<AstNode>) -> bool {
    let mut i = 0;
    while i < nodes.len() {
        let node = &mut nodes[i];
        if node.is_text() {
            let trimmed = node.value_str().trim_start().to_owned();
            if trimmed.is_empty() {
                nodes.remove(i);
                continue;
            }
            node.value = Some(trimmed);
            return true;
        }
        if !is_container(node.kind) || trim_leading(&mut node.children) {
            return true;
        }
        i += 1;
    }
    false
}

fn trim_trailing(nodes: &mut Vec<AstNode>) -> bool {
    let mut i = nodes.len();
    while i > 0 {
        i -= 1;
        let node = &mut nodes[i];
        if node.is_text() {
            let trimmed = node.value_str().trim_end().to_owned();
            if trimmed.is_empty() {
                nodes.remove(i);
                continue;
            }
            node.value = Some(trimmed);
            return true;
        }
        if !is_container(node.kind) || trim_trailing(&mut node.children) {
            return true;
        }
    }
    false
}

#[derive(Default)]
struct Compiler {
    text: String,
    /// End of `text`, in UTF-16 code units.
    len: PlainOffset,
    /// Slots reserved in pre-order, filled once a node's extent is known.
    entities: Vec<Option<Entity>>,
}

impl Compiler {
    fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        self.len = self.len.advance(utf16_len(s));
    }

    fn visit(&mut self, node: &AstNode) -> Result<()> {
        let kind = match node.kind {
            NodeKind::Root => {
                for child in &node.children {
                    self.visit(child)?;
                }
                return Ok(());
            }
            NodeKind::Text => {
                self.push_str(node.value_str());
                return Ok(());
            }
            NodeKind::Entity(kind) => kind,
        };

        if kind == EntityType::Mention {
            // The handle keeps its `@` in the text; the entity covers the
            // handle alone.
            self.push_str(EntityType::Mention.markup_symbol().open);
        }

        let slot = self.entities.len();
        self.entities.push(None);
        let start = self.len;

        if is_container(node.kind) {
            for child in &node.children {
                self.visit(child)?;
            }
        } else {
            self.push_str(node.value_str());
        }

        if self.len == start {
            return Ok(());
        }

        let mut entity = Entity::spanning(kind, start, self.len);
        match kind {
            EntityType::Pre => entity.language = node.language.clone(),
            EntityType::TextUrl => entity.url = node.url.clone(),
            EntityType::CustomEmoji => {
                let Some(document_id) = node.document_id.clone() else {
                    tracing::error!(
                        target: "composer::compile",
                        label = node.value_str(),
                        "custom emoji without document id"
                    );
                    return Err(ComposerError::MissingDocumentId {
                        label: node.value_str().to_owned(),
                    });
                };
                entity.document_id = Some(document_id);
            }
            _ => {}
        }
        self.entities[slot] = Some(entity);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_markup;
    use crate::tokenizer::{TokenKind, tokenize};

    fn compile(markup: &str) -> FormattedText {
        parse_ast_as_formatted_text(&parse_markup(markup)).unwrap()
    }

    fn assert_invariants(formatted: &FormattedText) {
        let len = utf16_len(&formatted.text);
        for pair in formatted.entities().windows(2) {
            assert!(pair[0].offset <= pair[1].offset);
            if pair[0].offset == pair[1].offset {
                assert!(pair[0].length >= pair[1].length);
            }
        }
        for entity in formatted.entities() {
            assert!(entity.length > 0);
            assert!(entity.offset + entity.length <= len);
        }
    }

    #[test]
    fn test_bold() {
        let formatted = compile("**bold**");
        assert_eq!(formatted.text, "bold");
        assert_eq!(
            formatted.entities(),
            &[Entity::new(EntityType::Bold, 0, 4)]
        );
    }

    #[test]
    fn test_plain_text_has_no_entities() {
        let formatted = compile("just words");
        assert_eq!(formatted.text, "just words");
        assert_eq!(formatted.entities, None);
    }

    #[test]
    fn test_escaped_markup() {
        let formatted = compile(r"\*\*not bold\*\*");
        assert_eq!(formatted.text, "**not bold**");
        assert_eq!(formatted.entities, None);
    }

    #[test]
    fn test_plain_output_has_no_markup() {
        let formatted = compile("**bold** and `code` with ~~strike~~");
        let reparsed = tokenize(&formatted.text, false);
        assert!(reparsed.iter().all(|t| t.kind == TokenKind::Text));
    }

    #[test]
    fn test_custom_emoji() {
        let formatted = compile("![😀](doc123)");
        assert_eq!(formatted.text, "😀");
        assert_eq!(
            formatted.entities(),
            &[Entity {
                document_id: Some("doc123".into()),
                ..Entity::new(EntityType::CustomEmoji, 0, 2)
            }]
        );
    }

    #[test]
    fn test_custom_emoji_without_document_id_fails() {
        let mut root = parse_markup("![😀](doc123)");
        root.children[0].document_id = None;
        let err = parse_ast_as_formatted_text(&root).unwrap_err();
        assert!(matches!(err, ComposerError::MissingDocumentId { .. }));
    }

    #[test]
    fn test_mention() {
        let formatted = compile("Hello @alice!");
        assert_eq!(formatted.text, "Hello @alice!");
        assert_eq!(
            formatted.entities(),
            &[Entity::new(EntityType::Mention, 7, 5)]
        );
    }

    #[test]
    fn test_mixed_formatting() {
        let formatted = compile("**bold *and italic* **");
        assert_eq!(formatted.text, "bold and italic");
        assert_eq!(
            formatted.entities(),
            &[
                Entity::new(EntityType::Bold, 0, 15),
                Entity::new(EntityType::Italic, 5, 10),
            ]
        );
        assert_invariants(&formatted);
    }

    #[test]
    fn test_mixed_formatting_scan_order() {
        // `**` closes on the first `**` of the trailing run, leaving a
        // literal `*` and an unterminated italic.
        let formatted = compile("**bold *and italic***");
        assert_eq!(formatted.text, "bold *and italic*");
        assert_eq!(
            formatted.entities(),
            &[Entity::new(EntityType::Bold, 0, 16)]
        );
    }

    #[test]
    fn test_same_extent_keeps_outer_first() {
        let formatted = compile("**__both__**");
        assert_eq!(
            formatted.entities(),
            &[
                Entity::new(EntityType::Bold, 0, 4),
                Entity::new(EntityType::Underline, 0, 4),
            ]
        );
    }

    #[test]
    fn test_edge_whitespace_trimmed() {
        let formatted = compile("  \n**hi** there  \n");
        assert_eq!(formatted.text, "hi there");
        assert_eq!(
            formatted.entities(),
            &[Entity::new(EntityType::Bold, 0, 2)]
        );
    }

    #[test]
    fn test_whitespace_only_container_at_end() {
        let formatted = compile("word **  **");
        assert_eq!(formatted.text, "word");
        assert_eq!(formatted.entities, None);
    }

    #[test]
    fn test_pre_language_and_link() {
        let formatted = compile("```rust\nlet x = 1;``` see [docs](https://docs.rs)");
        assert_eq!(formatted.text, "let x = 1; see docs");
        assert_eq!(
            formatted.entities(),
            &[
                Entity {
                    language: Some("rust".into()),
                    ..Entity::new(EntityType::Pre, 0, 10)
                },
                Entity {
                    url: Some("https://docs.rs".into()),
                    ..Entity::new(EntityType::TextUrl, 15, 4)
                },
            ]
        );
    }

    #[test]
    fn test_blockquote() {
        let formatted = compile("```q\nquote **me** ```");
        assert_eq!(formatted.text, "quote me");
        assert_eq!(
            formatted.entities(),
            &[
                Entity::new(EntityType::Blockquote, 0, 8),
                Entity::new(EntityType::Bold, 6, 2),
            ]
        );
    }

    #[test]
    fn test_utf16_offsets() {
        let formatted = compile("😀 **x**");
        assert_eq!(
            formatted.entities(),
            &[Entity::new(EntityType::Bold, 3, 1)]
        );
    }

    #[test]
    fn test_empty_pair_compiles_to_nothing() {
        let formatted = compile("****");
        assert_eq!(formatted.text, "");
        assert_eq!(formatted.entities, None);

        let formatted = compile("a ____ b");
        assert_eq!(formatted.text, "a  b");
        assert_eq!(formatted.entities, None);
    }

    #[test]
    fn test_fence_inside_quote_yields_no_block() {
        let formatted = compile("```q\n```nested```\n```");
        assert_eq!(formatted.text, "nested");
        assert_eq!(formatted.entities, None);
    }

    #[test]
    fn test_empty_code_not_an_entity() {
        let formatted = compile("a `` b");
        assert_eq!(formatted.text, "a `` b");
        assert_eq!(formatted.entities, None);
    }
}
