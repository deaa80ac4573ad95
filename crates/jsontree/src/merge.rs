//! Structural merge of objects and arrays (`Json::with`).
//!
//! Rules are looked up by merge path: `""` for the receiver itself,
//! `"/key"` for the property `key` merged one level down, and so on.
//! Elements of an array merged by `compare_by` are merged with the rule of
//! the array's own path.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{JsonError, Result};
use crate::value::{Json, JsonKind};

/// What to do at one merge path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRule {
    /// Merge into existing containers of the same kind instead of
    /// replacing them.
    pub merge: bool,
    /// Insert deep copies of incoming values.
    pub dup: bool,
    /// Arrays: insert incoming elements in order, skipping equal ones.
    pub sort: bool,
    /// Arrays: compare object elements by this property.
    pub compare_by: Option<String>,
}

/// Merge rules keyed by merge path.
///
/// # Example
///
/// ```
/// use jsontree::{Json, WithOptions};
///
/// let doc = Json::parse(r#"{"a": {"x": 1}, "list": [1, 3]}"#).unwrap();
/// let patch = Json::parse(r#"{"a": {"y": 2}, "list": [2, 3]}"#).unwrap();
/// doc.with(&patch, &WithOptions::new().merge("").merge("/list").sort("/list")).unwrap();
/// assert_eq!(doc.to_string(), r#"{"a":{"x":1,"y":2},"list":[1,2,3]}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithOptions {
    rules: HashMap<String, MergeRule>,
}

impl WithOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole rule at `path`.
    pub fn rule(mut self, path: impl Into<String>, rule: MergeRule) -> Self {
        self.rules.insert(path.into(), rule);
        self
    }

    /// Merge containers found at `path` into existing ones.
    pub fn merge(mut self, path: &str) -> Self {
        self.entry(path).merge = true;
        self
    }

    /// Copy incoming values at `path` instead of sharing their nodes.
    pub fn dup(mut self, path: &str) -> Self {
        self.entry(path).dup = true;
        self
    }

    /// Keep the array at `path` ordered by [`compare`], dropping incoming
    /// elements equal to one already present.
    pub fn sort(mut self, path: &str) -> Self {
        self.entry(path).sort = true;
        self
    }

    /// Match object elements of the array at `path` by their `key` property.
    pub fn compare_by(mut self, path: &str, key: impl Into<String>) -> Self {
        self.entry(path).compare_by = Some(key.into());
        self
    }

    fn entry(&mut self, path: &str) -> &mut MergeRule {
        self.rules.entry(path.to_string()).or_default()
    }

    /// The rule at `path`, or the default (overwrite, append) rule.
    pub fn rule_for(&self, path: &str) -> MergeRule {
        self.rules.get(path).cloned().unwrap_or_default()
    }

    /// Reads options written as JSON values. A string (`"merge"`, `"dup"`
    /// or `"sort"`) switches that flag on for the receiver. An object
    /// `{"for": paths, "merge": bool, "dup": bool, "sort": bool,
    /// "compareBy": key}` sets the full rule for each listed path; `for`
    /// defaults to `""` and may be a single string.
    pub fn from_json(options: &[Json]) -> Result<Self> {
        let mut out = WithOptions::new();
        for option in options {
            match option.kind() {
                JsonKind::String => {
                    let flag = option.as_str()?;
                    let rule = out.entry("");
                    match flag.as_str() {
                        "merge" => rule.merge = true,
                        "dup" => rule.dup = true,
                        "sort" => rule.sort = true,
                        other => {
                            return Err(JsonError::HostValue(format!(
                                "unknown merge option `{other}`"
                            )))
                        }
                    }
                }
                JsonKind::Object => {
                    let paths = match option.get("for")? {
                        None => vec![String::new()],
                        Some(one) if one.is_string() => vec![one.as_str()?],
                        Some(many) => many
                            .elements()?
                            .iter()
                            .map(Json::as_str)
                            .collect::<Result<Vec<_>>>()?,
                    };
                    let compare_by = match option.get("compareBy")? {
                        Some(key) if !key.is_null() => Some(key.as_str()?),
                        _ => None,
                    };
                    let rule = MergeRule {
                        merge: option.is("merge", true),
                        dup: option.is("dup", true),
                        sort: option.is("sort", true),
                        compare_by,
                    };
                    for path in paths {
                        out.rules.insert(path, rule.clone());
                    }
                }
                found => return Err(JsonError::mismatch("with options", found)),
            }
        }
        Ok(out)
    }
}

impl Json {
    /// Merges `other` into this object or array. With no rules, object
    /// properties are overwritten shallowly and array elements appended.
    pub fn with(&self, other: &Json, options: &WithOptions) -> Result<&Json> {
        merge_at(self, other, options, "")?;
        Ok(self)
    }
}

fn merge_at(local: &Json, other: &Json, options: &WithOptions, path: &str) -> Result<()> {
    match (local.kind(), other.kind()) {
        (JsonKind::Object, JsonKind::Object) => merge_objects(local, other, options, path),
        (JsonKind::Array, JsonKind::Array) => merge_arrays(local, other, options, path),
        (JsonKind::Object | JsonKind::Array, found) => Err(JsonError::mismatch("with", found)),
        (found, _) => Err(JsonError::mismatch("with", found)),
    }
}

fn same_container(a: &Json, b: &Json) -> bool {
    let kind = a.kind();
    kind == b.kind() && matches!(kind, JsonKind::Object | JsonKind::Array)
}

fn merge_objects(local: &Json, other: &Json, options: &WithOptions, path: &str) -> Result<()> {
    let rule = options.rule_for(path);
    for (key, incoming) in other.entries()? {
        if rule.merge {
            if let Some(existing) = local.get(&key)? {
                if same_container(&existing, &incoming) {
                    merge_at(&existing, &incoming, options, &format!("{path}/{key}"))?;
                    continue;
                }
            }
        }
        let value = if rule.dup { incoming.dup() } else { incoming };
        local.set(key, value)?;
    }
    Ok(())
}

fn merge_arrays(local: &Json, other: &Json, options: &WithOptions, path: &str) -> Result<()> {
    let rule = options.rule_for(path);
    let key = rule.compare_by.as_deref();
    for incoming in other.elements()? {
        let incoming = if rule.dup { incoming.dup() } else { incoming };
        if rule.sort {
            let existing = local.elements()?;
            let mut insert_at = existing.len();
            let mut matched = None;
            for (at, item) in existing.iter().enumerate() {
                match compare_by(item, &incoming, key) {
                    Ordering::Less => continue,
                    Ordering::Equal => matched = Some(item.clone()),
                    Ordering::Greater => insert_at = at,
                }
                break;
            }
            match matched {
                Some(item) if rule.merge && same_container(&item, &incoming) => {
                    merge_at(&item, &incoming, options, path)?;
                }
                Some(_) => {}
                None => {
                    local.insert_at(insert_at, incoming)?;
                }
            }
        } else if let Some(key) = key {
            let found = local
                .elements()?
                .into_iter()
                .position(|item| keyed_match(&item, &incoming, key));
            match found {
                Some(at) => {
                    let item = local.at(at)?;
                    if rule.merge && same_container(&item, &incoming) {
                        merge_at(&item, &incoming, options, path)?;
                    } else {
                        local.set_at(at, incoming)?;
                    }
                }
                None => {
                    local.add(incoming)?;
                }
            }
        } else {
            local.add(incoming)?;
        }
    }
    Ok(())
}

fn keyed_match(a: &Json, b: &Json, key: &str) -> bool {
    match (a.get(key), b.get(key)) {
        (Ok(Some(x)), Ok(Some(y))) => x == y,
        _ => false,
    }
}

fn compare_by(a: &Json, b: &Json, key: Option<&str>) -> Ordering {
    let pick = |value: &Json| match key {
        Some(key) => value.get(key).ok().flatten().unwrap_or_else(|| value.clone()),
        None => value.clone(),
    };
    compare(&pick(a), &pick(b))
}

fn rank(kind: JsonKind) -> u8 {
    match kind {
        JsonKind::Null => 0,
        JsonKind::Boolean => 1,
        JsonKind::Number => 2,
        JsonKind::String => 3,
        JsonKind::Array => 4,
        JsonKind::Object => 5,
    }
}

/// Orders values by kind (null, boolean, number, string, array, object),
/// then by content. Arrays compare element-wise, objects by their text.
pub fn compare(a: &Json, b: &Json) -> Ordering {
    let (ka, kb) = (a.kind(), b.kind());
    if ka != kb {
        return rank(ka).cmp(&rank(kb));
    }
    match ka {
        JsonKind::Null => Ordering::Equal,
        JsonKind::Boolean => a.as_bool().ok().cmp(&b.as_bool().ok()),
        JsonKind::Number => match (a.as_number(), b.as_number()) {
            (Ok(x), Ok(y)) => x.compare(&y),
            _ => Ordering::Equal,
        },
        JsonKind::String => a.as_str().ok().cmp(&b.as_str().ok()),
        JsonKind::Array => {
            let (xs, ys) = (
                a.elements().unwrap_or_default(),
                b.elements().unwrap_or_default(),
            );
            for (x, y) in xs.iter().zip(&ys) {
                match compare(x, y) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            xs.len().cmp(&ys.len())
        }
        JsonKind::Object => {
            if a == b {
                Ordering::Equal
            } else {
                a.to_string().cmp(&b.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Json {
        Json::from(value)
    }

    #[test]
    fn default_is_shallow_overwrite() {
        let a = doc(json!({"a": {"b": 1}, "k": 0}));
        a.with(&doc(json!({"a": {"c": 2}})), &WithOptions::new()).unwrap();
        assert_eq!(a.to_string(), r#"{"a":{"c":2},"k":0}"#);
    }

    #[test]
    fn merge_descends_into_matching_objects() {
        let a = doc(json!({"a": {"b": 1}}));
        a.with(&doc(json!({"a": {"c": 2}})), &WithOptions::new().merge(""))
            .unwrap();
        assert_eq!(a.to_string(), r#"{"a":{"b":1,"c":2}}"#);
    }

    #[test]
    fn rules_apply_per_path() {
        let a = doc(json!({"a": {"x": {"p": 1}}}));
        let b = doc(json!({"a": {"x": {"q": 2}}}));
        // merge only at the root: `/a` gets a shallow overwrite of `x`
        a.with(&b, &WithOptions::new().merge("")).unwrap();
        assert_eq!(a.to_string(), r#"{"a":{"x":{"q":2}}}"#);

        let a = doc(json!({"a": {"x": {"p": 1}}}));
        a.with(&b, &WithOptions::new().merge("").merge("/a")).unwrap();
        assert_eq!(a.to_string(), r#"{"a":{"x":{"p":1,"q":2}}}"#);
    }

    #[test]
    fn dup_copies_incoming_values() {
        let shared = doc(json!({"v": 1}));
        let other = Json::object();
        other.set("s", &shared).unwrap();

        let plain = Json::object();
        plain.with(&other, &WithOptions::new()).unwrap();
        assert!(Json::ptr_eq(&plain.get("s").unwrap().unwrap(), &shared));

        let copied = Json::object();
        copied.with(&other, &WithOptions::new().dup("")).unwrap();
        let s = copied.get("s").unwrap().unwrap();
        assert_eq!(s, shared);
        assert!(!Json::ptr_eq(&s, &shared));
    }

    #[test]
    fn arrays_append_by_default() {
        let a = doc(json!([1, 2]));
        a.with(&doc(json!([2, 3])), &WithOptions::new()).unwrap();
        assert_eq!(a.to_string(), "[1,2,2,3]");
    }

    #[test]
    fn sorted_merge_skips_equal_elements() {
        let a = doc(json!([1, 3, 5]));
        a.with(&doc(json!([0, 3, 4, 9])), &WithOptions::new().sort(""))
            .unwrap();
        assert_eq!(a.to_string(), "[0,1,3,4,5,9]");
    }

    #[test]
    fn sorted_merge_by_key() {
        let a = doc(json!([{"id": 1, "v": "a"}, {"id": 3, "v": "c"}]));
        let b = doc(json!([{"id": 2, "v": "b"}, {"id": 3, "w": true}]));
        let options = WithOptions::new().sort("").compare_by("", "id").merge("");
        a.with(&b, &options).unwrap();
        assert_eq!(
            a.to_string(),
            r#"[{"id":1,"v":"a"},{"id":2,"v":"b"},{"id":3,"v":"c","w":true}]"#
        );
    }

    #[test]
    fn compare_by_replaces_or_merges_matches() {
        let base = json!([{"id": "x", "n": 1}, {"id": "y", "n": 2}]);
        let incoming = doc(json!([{"id": "y", "m": 3}, {"id": "z"}]));

        let a = doc(base.clone());
        a.with(&incoming, &WithOptions::new().compare_by("", "id"))
            .unwrap();
        assert_eq!(
            a.to_string(),
            r#"[{"id":"x","n":1},{"id":"y","m":3},{"id":"z"}]"#
        );

        let a = doc(base);
        a.with(&incoming, &WithOptions::new().compare_by("", "id").merge(""))
            .unwrap();
        assert_eq!(
            a.to_string(),
            r#"[{"id":"x","n":1},{"id":"y","n":2,"m":3},{"id":"z"}]"#
        );
    }

    #[test]
    fn options_from_json() {
        let options = WithOptions::from_json(&[
            Json::from("merge"),
            doc(json!({"for": ["/a", "/b"], "sort": true, "compareBy": "id"})),
            doc(json!({"for": "/c", "dup": true})),
        ])
        .unwrap();
        assert!(options.rule_for("").merge);
        assert_eq!(
            options.rule_for("/b"),
            MergeRule {
                sort: true,
                compare_by: Some("id".into()),
                ..MergeRule::default()
            }
        );
        assert!(options.rule_for("/c").dup);
        assert_eq!(options.rule_for("/missing"), MergeRule::default());
        assert!(WithOptions::from_json(&[Json::from("bogus")]).is_err());
        assert!(WithOptions::from_json(&[Json::from(1)]).is_err());
    }

    #[test]
    fn mismatched_kinds_fail() {
        let a = Json::object();
        assert!(matches!(
            a.with(&Json::array(), &WithOptions::new()),
            Err(JsonError::TypeMismatch {
                operation: "with",
                found: JsonKind::Array
            })
        ));
        assert!(Json::from(1).with(&Json::object(), &WithOptions::new()).is_err());
    }

    #[test]
    fn nested_kind_change_overwrites() {
        let a = doc(json!({"a": {"b": 1}}));
        a.with(&doc(json!({"a": [1]})), &WithOptions::new().merge(""))
            .unwrap();
        assert_eq!(a.to_string(), r#"{"a":[1]}"#);
    }

    #[test]
    fn ordering_of_mixed_values() {
        let values = ["null", "false", "true", "-1", "2.5", "\"a\"", "[1]", "{}"];
        for pair in values.windows(2) {
            let a = Json::parse(pair[0]).unwrap();
            let b = Json::parse(pair[1]).unwrap();
            assert_eq!(compare(&a, &b), Ordering::Less, "{} < {}", pair[0], pair[1]);
        }
        assert_eq!(
            compare(&Json::from(1), &Json::from(1.0)),
            Ordering::Equal
        );
    }
}
