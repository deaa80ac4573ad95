//! `$ref` expansion.
//!
//! Expansion rewrites a schema tree in place so that every `{"$ref": ...}`
//! object is replaced by the node it points at. References to the same
//! absolute URI share one node, so recursive schemas become cyclic graphs
//! rather than infinite trees.

use std::collections::HashMap;

use jsontree::{pointer, Json, JsonKind};
use url::Url;

use crate::error::{BoxError, SchemaError};
use crate::uri;

/// Supplies documents named by references outside the current one.
pub trait Fetch: Send + Sync {
    fn fetch(&self, uri: &Url) -> Result<Json, BoxError>;
}

impl<F> Fetch for F
where
    F: Fn(&Url) -> Result<Json, BoxError> + Send + Sync,
{
    fn fetch(&self, uri: &Url) -> Result<Json, BoxError> {
        self(uri)
    }
}

pub(crate) struct Expander<'f> {
    fetcher: Option<&'f dyn Fetch>,
    /// Reference key to target node.
    resolved: HashMap<String, Json>,
    /// Node identity to its replacement (itself for plain containers). The
    /// key node is kept alive alongside so its identity is not reused.
    expanded: HashMap<usize, (Json, Json)>,
    /// Fetched documents by document URI.
    documents: HashMap<String, Json>,
}

impl<'f> Expander<'f> {
    pub fn new(fetcher: Option<&'f dyn Fetch>) -> Self {
        Self {
            fetcher,
            resolved: HashMap::new(),
            expanded: HashMap::new(),
            documents: HashMap::new(),
        }
    }

    /// Registers an already loaded document so references to its URI do
    /// not fetch it again.
    pub fn seed_document(&mut self, uri: &Url, document: &Json) {
        self.documents
            .insert(uri::document_of(uri).to_string(), document.clone());
    }

    /// Expands `node`, part of the document `top`, and returns what should
    /// stand in its place.
    pub fn expand(&mut self, node: &Json, top: &Json, base: Option<&Url>) -> Result<Json, SchemaError> {
        let id = node.node_id();
        if let Some((_, replacement)) = self.expanded.get(&id) {
            return Ok(replacement.clone());
        }
        match node.kind() {
            JsonKind::Object => {
                let scoped = match node.get("id")? {
                    Some(scope_id) if scope_id.is_string() => {
                        let scoped = uri::scope(base, &scope_id.as_str()?);
                        tracing::trace!(base = ?scoped.as_ref().map(Url::as_str), "schema id rescopes");
                        scoped
                    }
                    _ => base.cloned(),
                };
                if let Some(reference) = alias_of(node)? {
                    let target = self.resolve(&reference, top, scoped.as_ref())?;
                    self.expanded.insert(id, (node.clone(), target.clone()));
                    return Ok(target);
                }
                self.expanded.insert(id, (node.clone(), node.clone()));
                for (key, child) in node.entries()? {
                    let replacement = self.expand(&child, top, scoped.as_ref())?;
                    if !Json::ptr_eq(&replacement, &child) {
                        node.set(key, replacement)?;
                    }
                }
                Ok(node.clone())
            }
            JsonKind::Array => {
                self.expanded.insert(id, (node.clone(), node.clone()));
                for (index, child) in node.elements()?.iter().enumerate() {
                    let replacement = self.expand(child, top, base)?;
                    if !Json::ptr_eq(&replacement, child) {
                        node.set_at(index, replacement)?;
                    }
                }
                Ok(node.clone())
            }
            _ => Ok(node.clone()),
        }
    }

    /// Resolves `reference` to the node standing in for it. A target that
    /// is itself a `$ref` object is followed first, so every key along an
    /// alias chain maps to the final schema node.
    fn resolve(&mut self, reference: &str, top: &Json, base: Option<&Url>) -> Result<Json, SchemaError> {
        let mut target_uri = uri::make_absolute(base, reference)?;
        let mut top = top.clone();
        let mut base = base.cloned();
        let mut aliases: Vec<String> = Vec::new();
        loop {
            let key = target_uri.key();
            if let Some(hit) = self.resolved.get(&key).cloned() {
                tracing::trace!(reference = %key, "reusing resolved reference");
                for alias in aliases {
                    self.resolved.insert(alias, hit.clone());
                }
                return Ok(hit);
            }
            if aliases.contains(&key) {
                return Err(SchemaError::Resolution {
                    reference: reference.to_string(),
                    reason: format!("reference cycle through {key} never reaches a schema"),
                });
            }

            let current = base.as_ref().map(uri::document_of);
            let (document, document_base) = match &target_uri.document {
                Some(document) if Some(document) != current.as_ref() => {
                    (self.document(document)?, Some(document.clone()))
                }
                _ => (top.clone(), base.clone()),
            };
            let target = pointer::find_by_pointer(&document, &target_uri.fragment)?;

            if let Some(next) = alias_of(&target)? {
                let scoped = match target.get("id")? {
                    Some(scope_id) if scope_id.is_string() => {
                        uri::scope(document_base.as_ref(), &scope_id.as_str()?)
                    }
                    _ => document_base,
                };
                target_uri = uri::make_absolute(scoped.as_ref(), &next)?;
                aliases.push(key);
                top = document;
                base = scoped;
                continue;
            }

            // Registered before expanding so references back to it terminate.
            aliases.push(key);
            for alias in &aliases {
                self.resolved.insert(alias.clone(), target.clone());
            }
            let target = self.expand(&target, &document, document_base.as_ref())?;
            for alias in aliases {
                self.resolved.insert(alias, target.clone());
            }
            return Ok(target);
        }
    }

    /// Every fetched document, expanded.
    pub fn documents(&self) -> impl Iterator<Item = &Json> {
        self.documents.values()
    }

    fn document(&mut self, uri: &Url) -> Result<Json, SchemaError> {
        let key = uri.to_string();
        if let Some(document) = self.documents.get(&key) {
            return Ok(document.clone());
        }
        let fetcher = self.fetcher.ok_or_else(|| SchemaError::Fetch {
            uri: key.clone(),
            source: "no document fetcher configured".into(),
        })?;
        tracing::debug!(uri = %key, "fetching referenced schema document");
        let fetched = fetcher
            .fetch(uri)
            .map_err(|source| SchemaError::Fetch {
                uri: key.clone(),
                source,
            })?
            .dup();
        self.documents.insert(key.clone(), fetched.clone());
        let expanded = self.expand(&fetched, &fetched, Some(uri))?;
        self.documents.insert(key, expanded.clone());
        Ok(expanded)
    }
}

/// The reference held by a `{"$ref": "..."}` object, if `node` is one.
fn alias_of(node: &Json) -> Result<Option<String>, SchemaError> {
    if !node.is_object() {
        return Ok(None);
    }
    match node.get("$ref")?.filter(Json::is_string) {
        Some(reference) => Ok(Some(reference.as_str()?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn expand(schema: &Json) -> Result<Json, SchemaError> {
        Expander::new(None).expand(schema, schema, None)
    }

    #[test]
    fn local_reference_becomes_the_target_node() {
        let schema = Json::from(json!({
            "definitions": {"foo": {"type": "integer"}},
            "properties": {"a": {"$ref": "#/definitions/foo"}, "b": {"$ref": "#/definitions/foo"}}
        }));
        let root = expand(&schema).unwrap();
        let foo = root.pointer("/definitions/foo").unwrap().unwrap();
        let a = root.pointer("/properties/a").unwrap().unwrap();
        let b = root.pointer("/properties/b").unwrap().unwrap();
        assert!(Json::ptr_eq(&a, &foo));
        assert!(Json::ptr_eq(&b, &foo));
    }

    #[test]
    fn recursive_reference_becomes_a_cycle() {
        let schema = Json::from(json!({
            "type": "object",
            "properties": {"next": {"$ref": "#"}}
        }));
        let root = expand(&schema).unwrap();
        let next = root.pointer("/properties/next").unwrap().unwrap();
        assert!(Json::ptr_eq(&next, &root));
        root.get("properties").unwrap().unwrap().clear().unwrap();
    }

    #[test]
    fn root_reference_into_definitions() {
        let schema = Json::from(json!({
            "$ref": "#/definitions/node",
            "definitions": {
                "node": {"properties": {"child": {"$ref": "#/definitions/node"}}}
            }
        }));
        let root = expand(&schema).unwrap();
        let child = root.pointer("/properties/child").unwrap().unwrap();
        assert!(Json::ptr_eq(&child, &root));
        root.clear().unwrap();
    }

    #[test]
    fn reference_chains_are_followed() {
        let schema = Json::from(json!({
            "definitions": {"a": {"$ref": "#/definitions/b"}, "b": {"minimum": 1}},
            "items": {"$ref": "#/definitions/a"}
        }));
        let root = expand(&schema).unwrap();
        let items = root.get("items").unwrap().unwrap();
        assert_eq!(items, Json::from(json!({"minimum": 1})));
    }

    #[test]
    fn alias_to_a_recursive_definition_leaves_no_reference_behind() {
        let schema = Json::from(json!({
            "properties": {"root": {"$ref": "#/definitions/node"}},
            "definitions": {
                "node": {"$ref": "#/definitions/tree"},
                "tree": {
                    "type": "object",
                    "properties": {"child": {"$ref": "#/definitions/node"}}
                }
            }
        }));
        let root = expand(&schema).unwrap();
        let tree = root.pointer("/definitions/tree").unwrap().unwrap();
        let node = root.pointer("/definitions/node").unwrap().unwrap();
        let child = tree.pointer("/properties/child").unwrap().unwrap();
        let entry = root.pointer("/properties/root").unwrap().unwrap();
        assert!(Json::ptr_eq(&node, &tree));
        assert!(Json::ptr_eq(&child, &tree));
        assert!(Json::ptr_eq(&entry, &tree));
        assert!(!child.has("$ref"));
        tree.clear().unwrap();
    }

    #[test]
    fn alias_cycle_without_a_schema_is_an_error() {
        let schema = Json::from(json!({
            "definitions": {"a": {"$ref": "#/definitions/b"}, "b": {"$ref": "#/definitions/a"}},
            "items": {"$ref": "#/definitions/a"}
        }));
        assert!(matches!(expand(&schema), Err(SchemaError::Resolution { .. })));
        assert!(matches!(
            expand(&Json::from(json!({"$ref": "#"}))),
            Err(SchemaError::Resolution { .. })
        ));
    }

    #[test]
    fn missing_pointer_target_is_an_error() {
        let schema = Json::from(json!({"items": {"$ref": "#/definitions/none"}}));
        assert!(matches!(expand(&schema), Err(SchemaError::Pointer(_))));
    }

    #[test]
    fn external_documents_are_fetched_once() {
        let fetches = AtomicUsize::new(0);
        let fetcher = |uri: &Url| -> Result<Json, BoxError> {
            fetches.fetch_add(1, Ordering::SeqCst);
            assert_eq!(uri.as_str(), "http://example.com/types.json");
            Ok(Json::from(json!({"int": {"type": "integer"}, "str": {"type": "string"}})))
        };
        let schema = Json::from(json!({
            "properties": {
                "a": {"$ref": "types.json#/int"},
                "b": {"$ref": "types.json#/str"},
                "c": {"$ref": "http://example.com/types.json#/int"}
            }
        }));
        let base = Url::parse("http://example.com/root.json").unwrap();
        let root = Expander::new(Some(&fetcher))
            .expand(&schema, &schema, Some(&base))
            .unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        let a = root.pointer("/properties/a").unwrap().unwrap();
        let c = root.pointer("/properties/c").unwrap().unwrap();
        assert!(Json::ptr_eq(&a, &c));
        assert_eq!(
            root.pointer("/properties/b/type").unwrap().unwrap().as_str().unwrap(),
            "string"
        );
    }

    #[test]
    fn fetch_failures_propagate() {
        let fetcher = |_: &Url| -> Result<Json, BoxError> { Err("offline".into()) };
        let schema = Json::from(json!({"$ref": "http://example.com/x.json"}));
        let err = Expander::new(Some(&fetcher))
            .expand(&schema, &schema, None)
            .unwrap_err();
        assert!(matches!(err, SchemaError::Fetch { ref uri, .. } if uri == "http://example.com/x.json"));
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn external_reference_without_fetcher_fails() {
        let schema = Json::from(json!({"$ref": "http://example.com/x.json"}));
        assert!(matches!(expand(&schema), Err(SchemaError::Fetch { .. })));
    }

    #[test]
    fn id_changes_the_base_of_nested_references() {
        let fetched = std::sync::Mutex::new(Vec::new());
        let fetcher = |uri: &Url| -> Result<Json, BoxError> {
            fetched.lock().unwrap().push(uri.to_string());
            Ok(Json::from(json!({"type": "boolean"})))
        };
        let schema = Json::from(json!({
            "id": "http://example.com/root.json",
            "properties": {
                "nested": {
                    "id": "sub/",
                    "properties": {"flag": {"$ref": "flag.json"}}
                }
            }
        }));
        let root = Expander::new(Some(&fetcher))
            .expand(&schema, &schema, None)
            .unwrap();
        assert_eq!(
            *fetched.lock().unwrap(),
            vec!["http://example.com/sub/flag.json".to_string()]
        );
        let flag = root
            .pointer("/properties/nested/properties/flag")
            .unwrap()
            .unwrap();
        assert!(flag.is("type", "boolean"));
    }
}
