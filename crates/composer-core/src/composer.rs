//! Draft state and the send path.

use serde::{Deserialize, Serialize};

use crate::ast::parse_markup;
use crate::compile::parse_ast_as_formatted_text;
use crate::config::ComposerConfig;
use crate::controller::{SelectionController, SelectionEvent};
use crate::entity::{Entity, FormattedText};
use crate::error::{ComposerError, HostError, Result};
use crate::markup::formatted_text_to_markup;
use crate::platform::{LayoutHost, SelectionHost};
use crate::render::{RenderOutput, render_ast};
use crate::types::{CaretCoordinates, Selection, utf16_len};

/// Identifier of a message already sent, as assigned by the sink.
pub type MessageId = u64;

/// Compiled message handed to a [`MessageSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    /// Whether the text is a caption for attachments.
    #[serde(default)]
    pub is_caption: bool,
}

impl OutgoingMessage {
    pub fn formatted_text(&self) -> FormattedText {
        FormattedText {
            text: self.text.clone(),
            entities: self.entities.clone(),
        }
    }
}

/// Where compiled drafts go.
pub trait MessageSink {
    fn send(&mut self, message: OutgoingMessage) -> std::result::Result<(), HostError>;

    fn edit(&mut self, id: MessageId, message: OutgoingMessage) -> std::result::Result<(), HostError>;
}

impl<T: MessageSink> MessageSink for &mut T {
    fn send(&mut self, message: OutgoingMessage) -> std::result::Result<(), HostError> {
        (**self).send(message)
    }

    fn edit(&mut self, id: MessageId, message: OutgoingMessage) -> std::result::Result<(), HostError> {
        (**self).edit(id, message)
    }
}

/// What [`Composer::send`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The draft compiled to empty text and nothing was sent.
    Empty,
    Sent,
    Edited(MessageId),
}

/// A message draft with its selection and current rendering.
#[derive(Debug, Clone)]
pub struct Composer {
    config: ComposerConfig,
    text: String,
    controller: SelectionController,
    editing: Option<MessageId>,
    has_attachments: bool,
    rendered: RenderOutput,
}

impl Composer {
    pub fn new(config: ComposerConfig) -> Self {
        let controller = SelectionController::new(&config);
        let mut composer = Self {
            config,
            text: String::new(),
            controller,
            editing: None,
            has_attachments: false,
            rendered: RenderOutput::default(),
        };
        composer.render();
        composer
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Raw markup of the draft.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Selection {
        self.controller.selection()
    }

    pub fn rendered(&self) -> &RenderOutput {
        &self.rendered
    }

    pub fn editing(&self) -> Option<MessageId> {
        self.editing
    }

    pub fn set_has_attachments(&mut self, has_attachments: bool) {
        self.has_attachments = has_attachments;
    }

    /// Replace the draft text, e.g. after native input.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.render();
    }

    /// Resync the selection after a native event. Returns whether the
    /// rendering changed.
    pub fn handle_selection_event<H: SelectionHost>(
        &mut self,
        host: &H,
        event: SelectionEvent,
    ) -> Result<bool> {
        let changed = self.controller.handle(host, event)?;
        if changed {
            self.render();
        }
        Ok(changed)
    }

    pub fn set_selection<H: SelectionHost>(&mut self, host: &H, selection: Selection) -> Result<()> {
        self.controller.set_selection(host, selection)?;
        self.render();
        Ok(())
    }

    pub fn caret_coordinates<L: LayoutHost>(&self, layout: &L) -> CaretCoordinates {
        self.controller.caret_coordinates(layout)
    }

    /// Load a sent message into the draft for editing.
    pub fn start_editing(&mut self, id: MessageId, message: &FormattedText) {
        tracing::debug!(target: "composer::draft", id, "editing message");
        self.editing = Some(id);
        self.text = formatted_text_to_markup(message);
        self.controller.reset();
        self.render();
    }

    /// Leave edit mode and drop the draft.
    pub fn cancel_editing(&mut self) {
        if self.editing.take().is_some() {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.controller.reset();
        self.render();
    }

    /// Compile the draft to its wire shape.
    pub fn compile(&self) -> Result<FormattedText> {
        parse_ast_as_formatted_text(&parse_markup(&self.text))
    }

    /// Check compiled text against the message or caption limit.
    pub fn validate_length(&self, formatted: &FormattedText) -> Result<()> {
        let limit = self.config.length_limit(self.has_attachments);
        let len = utf16_len(&formatted.text);
        if len > limit {
            tracing::debug!(target: "composer::draft", len, limit, "draft over length limit");
            return Err(ComposerError::MessageTooLong {
                extra: len - limit,
                limit,
            });
        }
        Ok(())
    }

    /// Compile and hand the draft to `sink`, then clear it.
    ///
    /// The draft is kept when compiling, validation or the sink fails.
    pub fn send<S: MessageSink>(&mut self, mut sink: S) -> Result<SendOutcome> {
        let formatted = self.compile()?;
        if formatted.text.is_empty() {
            return Ok(SendOutcome::Empty);
        }
        self.validate_length(&formatted)?;

        let message = OutgoingMessage {
            text: formatted.text,
            entities: formatted.entities,
            is_caption: self.has_attachments,
        };
        let outcome = match self.editing {
            Some(id) => {
                sink.edit(id, message)?;
                SendOutcome::Edited(id)
            }
            None => {
                sink.send(message)?;
                SendOutcome::Sent
            }
        };

        tracing::debug!(target: "composer::draft", ?outcome, "draft sent");
        self.editing = None;
        self.clear();
        Ok(outcome)
    }

    fn render(&mut self) {
        let selection = self.controller.selection().clamp(utf16_len(&self.text));
        self.rendered = render_ast(&parse_markup(&self.text), selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::types::MarkupOffset;

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<OutgoingMessage>,
        edited: Vec<(MessageId, OutgoingMessage)>,
        fail: bool,
    }

    impl MessageSink for RecordingSink {
        fn send(&mut self, message: OutgoingMessage) -> std::result::Result<(), HostError> {
            if self.fail {
                return Err("offline".into());
            }
            self.sent.push(message);
            Ok(())
        }

        fn edit(
            &mut self,
            id: MessageId,
            message: OutgoingMessage,
        ) -> std::result::Result<(), HostError> {
            self.edited.push((id, message));
            Ok(())
        }
    }

    #[test]
    fn test_set_text_renders() {
        let mut composer = Composer::new(ComposerConfig::default());
        composer.set_text("**hi**");
        assert_eq!(composer.rendered().max_offset, MarkupOffset(6));
        assert!(composer.rendered().html.contains("<strong"));
    }

    #[test]
    fn test_send_clears_draft() {
        let mut composer = Composer::new(ComposerConfig::default());
        let mut sink = RecordingSink::default();
        composer.set_text("hello **world**");

        let outcome = composer.send(&mut sink).unwrap();
        assert_eq!(outcome, SendOutcome::Sent);
        assert_eq!(composer.text(), "");
        assert_eq!(sink.sent.len(), 1);
        assert_eq!(sink.sent[0].text, "hello world");
        assert_eq!(
            sink.sent[0].entities,
            Some(vec![Entity::new(EntityType::Bold, 6, 5)])
        );
        assert!(!sink.sent[0].is_caption);
    }

    #[test]
    fn test_empty_draft_not_sent() {
        let mut composer = Composer::new(ComposerConfig::default());
        let mut sink = RecordingSink::default();
        composer.set_text("   \n ");
        assert_eq!(composer.send(&mut sink).unwrap(), SendOutcome::Empty);
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_too_long_keeps_draft() {
        let config = ComposerConfig {
            max_message_length: 5,
            ..ComposerConfig::default()
        };
        let mut composer = Composer::new(config);
        let mut sink = RecordingSink::default();
        composer.set_text("**abcdefg**");

        let err = composer.send(&mut sink).unwrap_err();
        assert!(matches!(
            err,
            ComposerError::MessageTooLong { extra: 2, limit: 5 }
        ));
        assert_eq!(composer.text(), "**abcdefg**");
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_caption_limit_with_attachments() {
        let config = ComposerConfig {
            caption_limit: 3,
            ..ComposerConfig::default()
        };
        let mut composer = Composer::new(config);
        composer.set_has_attachments(true);
        composer.set_text("abcd");
        let formatted = composer.compile().unwrap();
        assert!(composer.validate_length(&formatted).is_err());

        composer.set_has_attachments(false);
        assert!(composer.validate_length(&formatted).is_ok());
    }

    #[test]
    fn test_sink_failure_keeps_draft() {
        let mut composer = Composer::new(ComposerConfig::default());
        let mut sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        composer.set_text("hi");
        let err = composer.send(&mut sink).unwrap_err();
        assert!(matches!(err, ComposerError::Host(_)));
        assert_eq!(composer.text(), "hi");
    }

    #[test]
    fn test_edit_round_trip() {
        let mut composer = Composer::new(ComposerConfig::default());
        let mut sink = RecordingSink::default();
        let original = FormattedText {
            text: "see docs".into(),
            entities: Some(vec![Entity::new(EntityType::Italic, 4, 4)]),
        };

        composer.start_editing(7, &original);
        assert_eq!(composer.text(), "see *docs*");
        assert_eq!(composer.editing(), Some(7));

        composer.set_text("see **docs**");
        assert_eq!(composer.send(&mut sink).unwrap(), SendOutcome::Edited(7));
        assert_eq!(composer.editing(), None);
        assert_eq!(sink.edited[0].0, 7);
        assert_eq!(
            sink.edited[0].1.formatted_text().entities(),
            &[Entity::new(EntityType::Bold, 4, 4)]
        );
    }

    #[test]
    fn test_cancel_editing_clears() {
        let mut composer = Composer::new(ComposerConfig::default());
        composer.start_editing(1, &FormattedText {
            text: "x".into(),
            entities: None,
        });
        composer.cancel_editing();
        assert_eq!(composer.text(), "");
        assert_eq!(composer.editing(), None);
    }

    #[test]
    fn test_outgoing_json_shape() {
        let message = OutgoingMessage {
            text: "hi".into(),
            entities: None,
            is_caption: false,
        };
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"text":"hi","isCaption":false}"#);
    }
}
