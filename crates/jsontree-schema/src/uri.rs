//! Reference URI handling.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::SchemaError;

/// An absolute reference split into the document it names and the JSON
/// Pointer fragment inside it. `document` is `None` for a same-document
/// reference made without any base URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RefUri {
    pub document: Option<Url>,
    /// Percent-decoded fragment, without the `#`.
    pub fragment: String,
}

impl RefUri {
    /// Memo key: equal for references naming the same target.
    pub fn key(&self) -> String {
        match &self.document {
            Some(document) => format!("{document}#{}", self.fragment),
            None => format!("#{}", self.fragment),
        }
    }
}

/// Resolves `reference` against `base` (RFC 3986).
pub(crate) fn make_absolute(base: Option<&Url>, reference: &str) -> Result<RefUri, SchemaError> {
    let joined = match base {
        Some(base) => base.join(reference),
        None => {
            if let Some(fragment) = reference.strip_prefix('#') {
                return Ok(RefUri {
                    document: None,
                    fragment: decode(fragment),
                });
            }
            if reference.is_empty() {
                return Ok(RefUri {
                    document: None,
                    fragment: String::new(),
                });
            }
            Url::parse(reference)
        }
    };
    match joined {
        Ok(url) => Ok(split(url)),
        Err(url::ParseError::RelativeUrlWithoutBase) => Err(SchemaError::Resolution {
            reference: reference.to_string(),
            reason: "relative reference without a base URI".to_string(),
        }),
        Err(err) => Err(SchemaError::InvalidUri {
            uri: reference.to_string(),
            reason: err.to_string(),
        }),
    }
}

/// The base URI in effect below a schema carrying `"id": id`. An `id` that
/// cannot be made absolute leaves the base unchanged.
pub(crate) fn scope(base: Option<&Url>, id: &str) -> Option<Url> {
    let scoped = match base {
        Some(base) => base.join(id),
        None => Url::parse(id),
    };
    match scoped {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::debug!(id, error = %err, "ignoring unresolvable schema id");
            base.cloned()
        }
    }
}

/// `url` with its fragment removed.
pub(crate) fn document_of(url: &Url) -> Url {
    let mut document = url.clone();
    document.set_fragment(None);
    document
}

pub(crate) fn parse(uri: &str) -> Result<Url, SchemaError> {
    Url::parse(uri).map_err(|err| SchemaError::InvalidUri {
        uri: uri.to_string(),
        reason: err.to_string(),
    })
}

fn split(mut url: Url) -> RefUri {
    let fragment = url.fragment().map(decode).unwrap_or_default();
    url.set_fragment(None);
    RefUri {
        document: Some(url),
        fragment,
    }
}

fn decode(fragment: &str) -> String {
    percent_decode_str(fragment).decode_utf8_lossy().into_owned()
}
