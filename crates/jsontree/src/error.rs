//! Error types for the value model and the text parser.

use thiserror::Error;

use crate::value::JsonKind;

pub type Result<T, E = JsonError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JsonError {
    /// Structurally invalid JSON text.
    #[error("malformed JSON at offset {offset}: {message} (near `{excerpt}`)")]
    MalformedInput {
        offset: usize,
        message: String,
        excerpt: String,
    },
    /// Input ran out while more tokens were expected.
    #[error("unexpected end of input at offset {offset}, expected {expected}")]
    UnexpectedEnd { offset: usize, expected: String },
    /// An operation was invoked on the wrong variant.
    #[error("`{operation}` is not supported on a JSON {found}")]
    TypeMismatch {
        operation: &'static str,
        found: JsonKind,
    },
    #[error("index {index} is out of bounds for an array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    /// A host value could not be turned into a tree.
    #[error("cannot convert host value: {0}")]
    HostValue(String),
}

impl JsonError {
    pub(crate) fn mismatch(operation: &'static str, found: JsonKind) -> Self {
        JsonError::TypeMismatch { operation, found }
    }

    /// Character offset for parser errors.
    pub fn offset(&self) -> Option<usize> {
        match self {
            JsonError::MalformedInput { offset, .. } | JsonError::UnexpectedEnd { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for JsonError {
    fn from(err: serde_json::Error) -> Self {
        JsonError::HostValue(err.to_string())
    }
}
