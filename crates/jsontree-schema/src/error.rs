use jsontree::{JsonError, PointerError};
use thiserror::Error;

/// Error type returned by injected document fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while loading, expanding or compiling a schema. Validation
/// itself never fails; violations are data.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot resolve `{reference}`: {reason}")]
    Resolution { reference: String, reason: String },
    #[error("fetching `{uri}` failed: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: BoxError,
    },
    #[error("invalid URI `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("unresolvable fragment: {0}")]
    Pointer(#[from] PointerError),
    #[error("invalid `{keyword}`: {reason}")]
    InvalidKeyword { keyword: String, reason: String },
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    Json(#[from] JsonError),
}

impl SchemaError {
    pub(crate) fn keyword(keyword: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidKeyword {
            keyword: keyword.to_string(),
            reason: reason.into(),
        }
    }
}
