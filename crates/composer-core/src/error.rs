//! Error types for the composer core.
//!
//! Malformed user markup is never an error: unterminated delimiters fall back
//! to literal text. Only contract violations (bad upstream data, broken hosts,
//! invalid configuration) end up here.

use miette::Diagnostic;

/// Main error type for composer operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ComposerError {
    /// A custom emoji node reached the compiler without a document id.
    #[error("custom emoji `{label}` has no document id")]
    #[diagnostic(
        code(composer::missing_document_id),
        help("custom emoji markup must be written as `![alt](documentId)`")
    )]
    MissingDocumentId { label: String },

    /// Draft text exceeds the configured limit.
    #[error("message is {extra} characters over the limit of {limit}")]
    #[diagnostic(code(composer::message_too_long))]
    MessageTooLong { extra: usize, limit: usize },

    /// The selection or editing host failed.
    #[error(transparent)]
    #[diagnostic(code(composer::host))]
    Host(#[from] HostError),

    /// Configuration could not be parsed.
    #[error("invalid composer config: {0}")]
    #[diagnostic(code(composer::config))]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ComposerError>;

/// Error reported by a host implementation (DOM, native UI, test double).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError(pub String);

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HostError {}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        HostError(s.to_string())
    }
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        HostError(s)
    }
}
