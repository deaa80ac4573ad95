use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use jsontree::Json;
use url::Url;

use crate::compiler::{self, Program};
use crate::error::SchemaError;
use crate::interpreter::{self, ValidationResult};
use crate::resolver::{Expander, Fetch};
use crate::uri;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Bound on the rendered documents and sub-schemas quoted in violation
    /// messages.
    pub max_chars: usize,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self { max_chars: 50 }
    }
}

/// Configures how a schema document is expanded and compiled.
#[derive(Clone, Default)]
pub struct SchemaBuilder {
    base_uri: Option<Url>,
    fetcher: Option<Arc<dyn Fetch>>,
    options: SchemaOptions,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// URI of the schema document itself; relative references and ids are
    /// resolved against it.
    pub fn base_uri(mut self, uri: Url) -> Self {
        self.base_uri = Some(uri);
        self
    }

    /// Source of documents named by references outside the schema. Without
    /// one, any such reference fails to build.
    pub fn fetcher(mut self, fetcher: impl Fetch + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn max_chars(mut self, max_chars: usize) -> Self {
        self.options.max_chars = max_chars;
        self
    }

    /// Expands and compiles a copy of `schema`; the argument is not touched.
    pub fn build(&self, schema: &Json) -> Result<Schema, SchemaError> {
        let copy = schema.dup();
        let mut expander = Expander::new(self.fetcher.as_deref());
        if let Some(base) = &self.base_uri {
            expander.seed_document(base, &copy);
        }
        let expanded = expander.expand(&copy, &copy, self.base_uri.as_ref());
        // The copy and every fetched document may hold cycles the root
        // never reaches.
        let mut documents = vec![copy];
        documents.extend(expander.documents().cloned());
        let root = match expanded {
            Ok(root) => root,
            Err(err) => {
                release(&documents);
                return Err(err);
            }
        };
        documents.push(root.clone());
        let program = match compiler::compile(&root, self.options.max_chars) {
            Ok(program) => program,
            Err(err) => {
                release(&documents);
                return Err(err);
            }
        };
        tracing::debug!(
            base_uri = self.base_uri.as_ref().map(Url::as_str),
            documents = documents.len() - 1,
            "built schema"
        );
        Ok(Schema {
            root,
            documents,
            program,
            options: self.options.clone(),
        })
    }

    /// Fetches the schema document at `uri` with the configured fetcher and
    /// builds it with `uri` as its base.
    pub fn load(mut self, uri: &Url) -> Result<Schema, SchemaError> {
        let fetcher = self.fetcher.clone().ok_or_else(|| SchemaError::Fetch {
            uri: uri.to_string(),
            source: "no document fetcher configured".into(),
        })?;
        let document = uri::document_of(uri);
        let root = fetcher
            .fetch(&document)
            .map_err(|source| SchemaError::Fetch {
                uri: document.to_string(),
                source,
            })?;
        self.base_uri = Some(document);
        self.build(&root)
    }
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("base_uri", &self.base_uri)
            .field("fetcher", &self.fetcher.as_ref().map(|_| ".."))
            .field("options", &self.options)
            .finish()
    }
}

/// A compiled schema. Validation takes `&self` and may run from several
/// threads at once.
///
/// The expanded schema tree can contain reference cycles. Dropping the
/// `Schema` empties every container of that tree and of every document it
/// fetched to break them, including any handle previously obtained from
/// [`Schema::to_json`].
pub struct Schema {
    root: Json,
    /// Everything to release on drop, `root` included.
    documents: Vec<Json>,
    program: Program,
    options: SchemaOptions,
}

impl Schema {
    pub fn new(schema: &Json) -> Result<Schema, SchemaError> {
        SchemaBuilder::new().build(schema)
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Loads the schema document at `uri` through `fetcher`.
    pub fn from_uri(uri: &str, fetcher: impl Fetch + 'static) -> Result<Schema, SchemaError> {
        let uri = uri::parse(uri)?;
        SchemaBuilder::new().fetcher(fetcher).load(&uri)
    }

    pub fn validate(&self, document: &Json) -> ValidationResult {
        interpreter::validate(&self.program, document, self.options.max_chars)
    }

    /// The schema with every `$ref` replaced by its target.
    pub fn to_json(&self) -> Json {
        self.root.clone()
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("root", &self.root)
            .field("options", &self.options)
            .finish()
    }
}

impl Drop for Schema {
    fn drop(&mut self) {
        release(&self.documents);
    }
}

/// Empties every container reachable from `roots`.
fn release(roots: &[Json]) {
    let mut seen = HashSet::new();
    let mut stack = roots.to_vec();
    let mut containers = Vec::new();
    while let Some(node) = stack.pop() {
        if node.is_primitive() || !seen.insert(node.node_id()) {
            continue;
        }
        if let Ok(elements) = node.elements() {
            stack.extend(elements);
        } else if let Ok(entries) = node.entries() {
            stack.extend(entries.into_iter().map(|(_, value)| value));
        }
        containers.push(node);
    }
    for node in &containers {
        let _ = node.clear();
    }
}
