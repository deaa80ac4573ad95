//! Mutable JSON document trees.
//!
//! A [`Json`] handle points at a node of a tree whose containers know their
//! children and whose children know (weakly) their containers. Trees come
//! from the [`parser`], from host values through a [`Factory`], or from the
//! constructors on [`Json`]; they print back through the [`printer`].
//!
//! # Example
//!
//! ```
//! use jsontree::{Json, WithOptions};
//!
//! let doc = Json::parse(r#"{"a": 1, "b": [1, 2, 3]} // trailing comment"#).unwrap();
//! assert_eq!(doc.get("b").unwrap().unwrap().at(1).unwrap().as_integer().unwrap(), 2);
//!
//! let patch = Json::parse(r#"{"c": {"d": true}}"#).unwrap();
//! doc.with(&patch, &WithOptions::new()).unwrap();
//! assert_eq!(doc.to_string(), r#"{"a":1,"b":[1,2,3],"c":{"d":true}}"#);
//! assert!(doc.pointer("/c/d").unwrap().unwrap().as_bool().unwrap());
//! ```

pub mod error;
pub mod factory;
pub mod merge;
pub mod number;
pub mod parser;
pub mod pointer;
pub mod printer;
pub mod value;

pub use error::{JsonError, Result};
pub use factory::{DefaultFactory, Factory, FactoryGuard};
pub use merge::{MergeRule, WithOptions};
pub use number::{Decimal, Number};
pub use parser::{parse, CharCursor, Parser, StrCursor};
pub use pointer::PointerError;
pub use printer::PrintOptions;
pub use value::{Json, JsonKind};
