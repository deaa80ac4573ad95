//! JSON Pointer (RFC 6901) over [`Json`] trees.

use thiserror::Error;

use crate::value::{Json, JsonKind};

/// Why a pointer could not be followed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("`{pointer}`: no value at `{segment}`")]
    NotFound { pointer: String, segment: String },
    #[error("`{pointer}`: `{segment}` is not an array index")]
    InvalidIndex { pointer: String, segment: String },
    #[error("`{pointer}`: cannot step into a {found} with `{segment}`")]
    NotAContainer {
        pointer: String,
        segment: String,
        found: JsonKind,
    },
}

/// Unescapes a JSON Pointer path component.
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a JSON Pointer path component.
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

/// Splits a pointer into unescaped components. `""` is the root.
///
/// # Example
///
/// ```
/// use jsontree::pointer::parse_json_pointer;
///
/// assert_eq!(parse_json_pointer(""), Vec::<String>::new());
/// assert_eq!(parse_json_pointer("/a~1b/0"), vec!["a/b", "0"]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Vec<String> {
    match pointer.strip_prefix('/') {
        None if pointer.is_empty() => Vec::new(),
        Some(rest) => rest.split('/').map(unescape_component).collect(),
        // A missing leading slash is tolerated.
        None => pointer.split('/').map(unescape_component).collect(),
    }
}

/// Joins path components into a pointer, escaping each one. The root path
/// formats as `""`.
///
/// # Example
///
/// ```
/// use jsontree::pointer::format_json_pointer;
///
/// assert_eq!(format_json_pointer(&[]), "");
/// assert_eq!(format_json_pointer(&["a/b".to_string(), "~".to_string()]), "/a~1b/~0");
/// ```
pub fn format_json_pointer(path: &[String]) -> String {
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component));
    }
    out
}

/// Non-negative decimal integer without leading zeros.
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

/// Moves one component down from `current`. `pointer` is only used for
/// error context.
pub fn step(current: &Json, segment: &str, pointer: &str) -> Result<Json, PointerError> {
    let not_found = || PointerError::NotFound {
        pointer: pointer.to_string(),
        segment: segment.to_string(),
    };
    match current.kind() {
        JsonKind::Object => current.get(segment).ok().flatten().ok_or_else(not_found),
        JsonKind::Array => {
            if !is_valid_index(segment) {
                return Err(PointerError::InvalidIndex {
                    pointer: pointer.to_string(),
                    segment: segment.to_string(),
                });
            }
            let index: usize = segment.parse().map_err(|_| not_found())?;
            current.at(index).map_err(|_| not_found())
        }
        found => Err(PointerError::NotAContainer {
            pointer: pointer.to_string(),
            segment: segment.to_string(),
            found,
        }),
    }
}

/// Follows `path` from `root`.
pub fn find(root: &Json, path: &[String]) -> Result<Json, PointerError> {
    let pointer = format_json_pointer(path);
    let mut current = root.clone();
    for segment in path {
        current = step(&current, segment, &pointer)?;
    }
    Ok(current)
}

/// Follows a pointer string from `root`.
///
/// # Example
///
/// ```
/// use jsontree::pointer::{find_by_pointer, PointerError};
/// use jsontree::Json;
///
/// let doc = Json::parse(r#"{"a": [10, {"b~": true}]}"#).unwrap();
/// let found = find_by_pointer(&doc, "/a/1/b~0").unwrap();
/// assert!(found.as_bool().unwrap());
/// assert!(matches!(
///     find_by_pointer(&doc, "/a/01"),
///     Err(PointerError::InvalidIndex { .. })
/// ));
/// ```
pub fn find_by_pointer(root: &Json, pointer: &str) -> Result<Json, PointerError> {
    let mut current = root.clone();
    for segment in parse_json_pointer(pointer) {
        current = step(&current, &segment, pointer)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn components_round_trip_through_escaping() {
        assert_eq!(escape_component("a/b~c"), "a~1b~0c");
        assert_eq!(unescape_component("a~1b~0c"), "a/b~c");
        // `~01` is `~1`, not `/`.
        assert_eq!(unescape_component("~01"), "~1");
    }

    #[test]
    fn parse_and_format() {
        assert!(parse_json_pointer("").is_empty());
        assert_eq!(parse_json_pointer("/"), vec![""]);
        assert_eq!(parse_json_pointer("/a~1b/0"), vec!["a/b", "0"]);
        assert_eq!(parse_json_pointer("a/b"), vec!["a", "b"]);
        assert_eq!(
            format_json_pointer(&["a/b".to_string(), "0".to_string()]),
            "/a~1b/0"
        );
    }

    #[test]
    fn index_validation() {
        assert!(is_valid_index("0"));
        assert!(is_valid_index("10"));
        assert!(!is_valid_index("01"));
        assert!(!is_valid_index("-1"));
        assert!(!is_valid_index(""));
        assert!(!is_valid_index("-"));
    }

    #[test]
    fn finds_nested_values() {
        let doc = Json::from(json!({"a": {"b": [10, {"c~d": true}]}, "": 5}));
        assert_eq!(find_by_pointer(&doc, "/a/b/0").unwrap(), Json::from(10));
        assert!(find_by_pointer(&doc, "/a/b/1/c~0d").unwrap().as_bool().unwrap());
        assert_eq!(find_by_pointer(&doc, "/").unwrap(), Json::from(5));
        assert!(Json::ptr_eq(&find_by_pointer(&doc, "").unwrap(), &doc));
        assert_eq!(
            find(&doc, &["a".into(), "b".into(), "0".into()]).unwrap(),
            Json::from(10)
        );
    }

    #[test]
    fn reports_the_failing_segment() {
        let doc = Json::from(json!({"a": [1], "s": "x"}));
        assert_eq!(
            find_by_pointer(&doc, "/a/3").unwrap_err(),
            PointerError::NotFound {
                pointer: "/a/3".into(),
                segment: "3".into()
            }
        );
        assert!(matches!(
            find_by_pointer(&doc, "/a/x"),
            Err(PointerError::InvalidIndex { .. })
        ));
        assert!(matches!(
            find_by_pointer(&doc, "/s/0"),
            Err(PointerError::NotAContainer {
                found: JsonKind::String,
                ..
            })
        ));
        assert_eq!(doc.pointer("/missing").unwrap(), None);
    }
}
