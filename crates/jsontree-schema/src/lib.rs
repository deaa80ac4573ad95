//! JSON Schema validation over [`jsontree`] documents.
//!
//! Building a [`Schema`] copies the schema document, replaces every `$ref`
//! by the node it names (fetching other documents through a [`Fetch`]
//! implementation when needed) and compiles the result. Validation then
//! reports violations as data and never fails.
//!
//! Supported keywords: `type`, `enum`, `allOf`, `anyOf`, `oneOf`, `not`,
//! `required`, `properties`, `patternProperties`, `additionalProperties`,
//! `minProperties`, `maxProperties`, `items`, `additionalItems`,
//! `uniqueItems`, `minItems`, `maxItems`, `minimum`, `maximum`,
//! `exclusiveMinimum`, `exclusiveMaximum`, `multipleOf`, `minLength`,
//! `maxLength`, `pattern` and `dependencies`, plus `id` and `$ref`.
//!
//! # Example
//!
//! ```
//! use jsontree::Json;
//! use jsontree_schema::Schema;
//!
//! let schema = Schema::new(&Json::parse(r#"{
//!     "type": "object",
//!     "required": ["x"],
//!     "properties": {"x": {"type": "number"}}
//! }"#).unwrap()).unwrap();
//!
//! assert!(schema.validate(&Json::parse(r#"{"x": 1}"#).unwrap()).ok);
//!
//! let result = schema.validate(&Json::parse(r#"{"x": "s"}"#).unwrap());
//! assert!(!result.ok);
//! assert_eq!(result.errors[0].path, "/x");
//! ```

mod compiler;
pub mod error;
mod interpreter;
pub mod resolver;
pub mod schema;
mod uri;

pub use error::{BoxError, SchemaError};
pub use interpreter::{ValidationResult, Violation};
pub use resolver::Fetch;
pub use schema::{Schema, SchemaBuilder, SchemaOptions};
