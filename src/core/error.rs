//! Synthesis error taxonomy.
//!
//! Every failure is raised synchronously to the caller and names the
//! construct path (or logical ID) it concerns. Synthesis is all-or-nothing:
//! no partial template is ever returned alongside an error.

use thiserror::Error;

/// Errors raised while building, resolving, synthesizing or asserting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    #[error("there is already a construct with id '{id}' under '{parent}'")]
    DuplicatePath { parent: String, id: String },

    #[error("invalid construct id '{id}': {reason}")]
    InvalidConstructId { id: String, reason: String },

    #[error("{path}: unrecognized option '{option}'")]
    UnrecognizedOption { path: String, option: String },

    #[error("{path}: missing required property '{property}'")]
    MissingRequiredProperty { path: String, property: String },

    #[error("{path}: invalid properties: {message}")]
    InvalidProps { path: String, message: String },

    #[error("cyclic reference while resolving token {token}{}", hint_suffix(.hint))]
    CyclicReference { token: usize, hint: Option<String> },

    #[error("'{referrer}' references '{target}', which is not in the template")]
    DanglingReference { referrer: String, target: String },

    #[error("logical id '{logical_id}' is produced by both '{first}' and '{second}'")]
    LogicalIdCollision {
        logical_id: String,
        first: String,
        second: String,
    },

    #[error("{0}")]
    AssertionMismatch(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("serialize error: {0}")]
    Serialize(String),
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref().map(|h| format!(" ({h})")).unwrap_or_default()
}

impl SynthError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProps {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
