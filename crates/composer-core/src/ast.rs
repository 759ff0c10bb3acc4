//! AST built from the token stream.
//!
//! The tree is rebuilt on every pass and shared by the compiler and the
//! renderer. Adjacent text nodes are merged at every level so that escape
//! fragments and plain runs read as one leaf.

use smol_str::SmolStr;

use crate::entity::EntityType;
use crate::tokenizer::{Token, TokenKind, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Text,
    Entity(EntityType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: NodeKind,
    pub value: Option<String>,
    /// Raw source of a text node, escape backslashes included.
    pub source: Option<String>,
    pub children: Vec<AstNode>,
    pub language: Option<SmolStr>,
    pub url: Option<SmolStr>,
    pub document_id: Option<SmolStr>,
    pub user_id: Option<SmolStr>,
    /// Raw opening fence of a pre or blockquote node.
    pub opening: Option<SmolStr>,
}

impl AstNode {
    fn empty(kind: NodeKind) -> Self {
        Self {
            kind,
            value: None,
            source: None,
            children: Vec::new(),
            language: None,
            url: None,
            document_id: None,
            user_id: None,
            opening: None,
        }
    }

    pub fn root(children: Vec<AstNode>) -> Self {
        Self {
            children,
            ..Self::empty(NodeKind::Root)
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            source: Some(value.clone()),
            value: Some(value),
            ..Self::empty(NodeKind::Text)
        }
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        match self.kind {
            NodeKind::Entity(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Value as a string slice, empty when absent.
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }

    /// Raw source of a text node, falling back to its value.
    pub fn source_str(&self) -> &str {
        self.source
            .as_deref()
            .or(self.value.as_deref())
            .unwrap_or_default()
    }

    fn from_token(token: Token) -> Self {
        let kind = match token.kind {
            TokenKind::Text => NodeKind::Text,
            TokenKind::Entity(kind) => NodeKind::Entity(kind),
        };

        let mut node = Self {
            value: token.value,
            source: token.source,
            language: token.language,
            url: token.url,
            opening: token.opening,
            children: token
                .children
                .map(|children| children.into_iter().map(Self::from_token).collect())
                .unwrap_or_default(),
            ..Self::empty(kind)
        };

        match kind {
            // `![alt](id)` carries the document id in the url slot.
            NodeKind::Entity(EntityType::CustomEmoji) => node.document_id = node.url.clone(),
            NodeKind::Entity(EntityType::Mention) => {
                node.user_id = node.value.as_deref().map(SmolStr::new)
            }
            _ => {}
        }

        node
    }
}

/// Build the root node from a token stream.
pub fn parse(tokens: Vec<Token>) -> AstNode {
    let nodes = tokens.into_iter().map(AstNode::from_token).collect();
    AstNode::root(merge_text_nodes(nodes))
}

/// Tokenize and parse in one step.
pub fn parse_markup(text: &str) -> AstNode {
    parse(tokenize(text, false))
}

fn merge_text_nodes(nodes: Vec<AstNode>) -> Vec<AstNode> {
    let mut merged: Vec<AstNode> = Vec::with_capacity(nodes.len());

    for mut node in nodes {
        if node.is_text() {
            if let Some(last) = merged.last_mut().filter(|last| last.is_text()) {
                let value = node.value_str().to_owned();
                let source = node.source_str().to_owned();
                last.value.get_or_insert_with(String::new).push_str(&value);
                last.source.get_or_insert_with(String::new).push_str(&source);
                continue;
            }
        } else if !node.children.is_empty() {
            node.children = merge_text_nodes(std::mem::take(&mut node.children));
        }
        merged.push(node);
    }

    merged
}
