//! Schema compilation.
//!
//! A reference-expanded schema tree is lowered into a flat [`Program`]: an
//! arena of [`Instruction`]s addressed by [`InstrId`]. Sub-schemas compile
//! once per node identity, so a schema graph with cycles compiles to a
//! program whose instructions refer back to each other by id.

use std::collections::HashMap;

use jsontree::{Json, JsonKind, Number};
use regex::Regex;

use crate::error::SchemaError;

pub(crate) type InstrId = usize;

#[derive(Debug)]
pub(crate) enum Instruction {
    Any,
    /// All steps apply; violations accumulate.
    Sequence(Vec<InstrId>),
    Type {
        allowed: Vec<String>,
        rendered: String,
    },
    Enum {
        options: Vec<Json>,
        rendered: String,
    },
    AnyOf {
        alternates: Vec<InstrId>,
        rendered: String,
    },
    OneOf {
        alternates: Vec<InstrId>,
        rendered: String,
    },
    Not {
        inner: InstrId,
        rendered: String,
    },
    Required(String),
    Object(ObjectCheck),
    Array(ArrayCheck),
    Number(NumberCheck),
    Str(StringCheck),
    SchemaDependency {
        property: String,
        schema: InstrId,
    },
    PropertyDependency {
        property: String,
        required: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Additional {
    Any,
    Forbidden,
    Schema(InstrId),
}

#[derive(Debug)]
pub(crate) struct ObjectCheck {
    pub properties: Vec<(String, InstrId)>,
    /// Unanchored: a key matches when the pattern is found anywhere in it.
    pub patterns: Vec<(Regex, InstrId)>,
    pub additional: Additional,
    pub min: usize,
    pub max: Option<usize>,
}

#[derive(Debug)]
pub(crate) enum Items {
    Any,
    Single(InstrId),
    Tuple(Vec<InstrId>),
}

#[derive(Debug)]
pub(crate) struct ArrayCheck {
    pub items: Items,
    /// Only consulted past the end of a tuple `items`.
    pub additional: Additional,
    pub unique: bool,
    pub min: usize,
    pub max: Option<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct NumberCheck {
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<Number>,
}

#[derive(Debug)]
pub(crate) struct StringCheck {
    pub min: usize,
    pub max: Option<usize>,
    /// Anchored regex plus the pattern text as written in the schema.
    pub pattern: Option<(Regex, String)>,
}

#[derive(Debug)]
pub(crate) struct Program {
    ops: Vec<Instruction>,
    root: InstrId,
}

impl Program {
    pub fn root(&self) -> InstrId {
        self.root
    }

    pub fn get(&self, id: InstrId) -> &Instruction {
        &self.ops[id]
    }
}

/// Compiles `schema` into a program. `max_chars` bounds the schema excerpts
/// embedded in violation messages.
pub(crate) fn compile(schema: &Json, max_chars: usize) -> Result<Program, SchemaError> {
    let mut compiler = Compiler {
        ops: Vec::new(),
        memo: HashMap::new(),
        max_chars,
    };
    let root = compiler.compile(schema)?;
    tracing::debug!(instructions = compiler.ops.len(), "compiled schema");
    Ok(Program {
        ops: compiler.ops,
        root,
    })
}

struct Compiler {
    ops: Vec<Instruction>,
    memo: HashMap<usize, InstrId>,
    max_chars: usize,
}

impl Compiler {
    fn push(&mut self, instruction: Instruction) -> InstrId {
        self.ops.push(instruction);
        self.ops.len() - 1
    }

    fn compile(&mut self, schema: &Json) -> Result<InstrId, SchemaError> {
        if let Some(&id) = self.memo.get(&schema.node_id()) {
            tracing::trace!(instruction = id, "reusing compiled sub-schema");
            return Ok(id);
        }
        if !schema.is_object() {
            // Only objects carry keywords; anything else accepts everything.
            let id = self.push(Instruction::Any);
            self.memo.insert(schema.node_id(), id);
            return Ok(id);
        }

        // Reserved before descending so cycles land on this slot.
        let id = self.push(Instruction::Sequence(Vec::new()));
        self.memo.insert(schema.node_id(), id);

        let mut steps = Vec::new();
        if let Some(step) = self.type_check(schema)? {
            steps.push(step);
        }
        if let Some(options) = schema.get("enum")? {
            let rendered = options.to_string_bounded(self.max_chars);
            let options = list(&options, "enum")?.iter().map(Json::dup).collect();
            steps.push(self.push(Instruction::Enum { options, rendered }));
        }
        if let Some(all) = schema.get("allOf")? {
            for sub in list(&all, "allOf")? {
                steps.push(self.compile(&sub)?);
            }
        }
        if let Some(any) = schema.get("anyOf")? {
            let alternates = self.compile_all(&any, "anyOf")?;
            let rendered = any.to_string_bounded(self.max_chars);
            steps.push(self.push(Instruction::AnyOf { alternates, rendered }));
        }
        if let Some(one) = schema.get("oneOf")? {
            let alternates = self.compile_all(&one, "oneOf")?;
            let rendered = one.to_string_bounded(self.max_chars);
            steps.push(self.push(Instruction::OneOf { alternates, rendered }));
        }
        if let Some(not) = schema.get("not")? {
            let inner = self.compile(&not)?;
            let rendered = not.to_string_bounded(self.max_chars);
            steps.push(self.push(Instruction::Not { inner, rendered }));
        }
        if let Some(required) = schema.get("required")? {
            match required.kind() {
                JsonKind::Array => {
                    for name in list(&required, "required")? {
                        let name = string(&name, "required")?;
                        steps.push(self.push(Instruction::Required(name)));
                    }
                }
                // draft-03 style `"required": true` on a property schema.
                JsonKind::Boolean => {}
                found => {
                    return Err(SchemaError::keyword(
                        "required",
                        format!("expected an array of names, found {found}"),
                    ))
                }
            }
        }
        if let Some(check) = self.object_check(schema)? {
            steps.push(self.push(Instruction::Object(check)));
        }
        if let Some(check) = self.array_check(schema)? {
            steps.push(self.push(Instruction::Array(check)));
        }
        if let Some(check) = number_check(schema)? {
            steps.push(self.push(Instruction::Number(check)));
        }
        if let Some(check) = string_check(schema)? {
            steps.push(self.push(Instruction::Str(check)));
        }
        if let Some(dependencies) = schema.get("dependencies")? {
            if !dependencies.is_object() {
                return Err(SchemaError::keyword("dependencies", "expected an object"));
            }
            for (property, dependency) in dependencies.entries()? {
                let step = match dependency.kind() {
                    JsonKind::Object => {
                        let schema = self.compile(&dependency)?;
                        Instruction::SchemaDependency { property, schema }
                    }
                    JsonKind::Array => {
                        let required = list(&dependency, "dependencies")?
                            .iter()
                            .map(|name| string(name, "dependencies"))
                            .collect::<Result<Vec<_>, _>>()?;
                        Instruction::PropertyDependency { property, required }
                    }
                    JsonKind::String => Instruction::PropertyDependency {
                        property,
                        required: vec![dependency.as_str()?],
                    },
                    found => {
                        return Err(SchemaError::keyword(
                            "dependencies",
                            format!("`{property}` maps to a {found}"),
                        ))
                    }
                };
                steps.push(self.push(step));
            }
        }

        self.ops[id] = if steps.is_empty() {
            Instruction::Any
        } else {
            Instruction::Sequence(steps)
        };
        Ok(id)
    }

    fn compile_all(&mut self, schemas: &Json, keyword: &str) -> Result<Vec<InstrId>, SchemaError> {
        list(schemas, keyword)?
            .iter()
            .map(|sub| self.compile(sub))
            .collect()
    }

    fn type_check(&mut self, schema: &Json) -> Result<Option<InstrId>, SchemaError> {
        let Some(types) = schema.get("type")? else {
            return Ok(None);
        };
        let (allowed, rendered) = match types.kind() {
            JsonKind::String => {
                let name = types.as_str()?;
                let rendered = Json::array_from([name.as_str()]).to_string();
                (vec![name], rendered)
            }
            JsonKind::Array => {
                let names = list(&types, "type")?
                    .iter()
                    .map(|name| string(name, "type"))
                    .collect::<Result<Vec<_>, _>>()?;
                (names, types.to_string())
            }
            found => {
                return Err(SchemaError::keyword(
                    "type",
                    format!("expected a name or an array of names, found {found}"),
                ))
            }
        };
        if allowed.iter().any(|name| name == "any") {
            return Ok(None);
        }
        Ok(Some(self.push(Instruction::Type { allowed, rendered })))
    }

    fn object_check(&mut self, schema: &Json) -> Result<Option<ObjectCheck>, SchemaError> {
        let mut check = ObjectCheck {
            properties: Vec::new(),
            patterns: Vec::new(),
            additional: Additional::Any,
            min: 0,
            max: None,
        };
        if let Some(properties) = schema.get("properties")? {
            for (name, sub) in map(&properties, "properties")? {
                let id = self.compile(&sub)?;
                check.properties.push((name, id));
            }
        }
        if let Some(patterns) = schema.get("patternProperties")? {
            for (pattern, sub) in map(&patterns, "patternProperties")? {
                let regex = Regex::new(&pattern).map_err(|source| SchemaError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                let id = self.compile(&sub)?;
                check.patterns.push((regex, id));
            }
        }
        if let Some(additional) = schema.get("additionalProperties")? {
            check.additional = self.additional(&additional, "additionalProperties")?;
        }
        check.min = size(schema, "minProperties")?.unwrap_or(0);
        check.max = size(schema, "maxProperties")?;

        let active = !check.properties.is_empty()
            || !check.patterns.is_empty()
            || check.additional != Additional::Any
            || check.min > 0
            || check.max.is_some();
        Ok(active.then_some(check))
    }

    fn array_check(&mut self, schema: &Json) -> Result<Option<ArrayCheck>, SchemaError> {
        let mut check = ArrayCheck {
            items: Items::Any,
            additional: Additional::Any,
            unique: false,
            min: 0,
            max: None,
        };
        if let Some(items) = schema.get("items")? {
            check.items = match items.kind() {
                JsonKind::Object => Items::Single(self.compile(&items)?),
                JsonKind::Array => Items::Tuple(self.compile_all(&items, "items")?),
                found => {
                    return Err(SchemaError::keyword(
                        "items",
                        format!("expected a schema or an array of schemas, found {found}"),
                    ))
                }
            };
        }
        if let Some(additional) = schema.get("additionalItems")? {
            check.additional = self.additional(&additional, "additionalItems")?;
        }
        if let Some(unique) = schema.get("uniqueItems")? {
            check.unique = boolean(&unique, "uniqueItems")?;
        }
        check.min = size(schema, "minItems")?.unwrap_or(0);
        check.max = size(schema, "maxItems")?;

        let active = !matches!(check.items, Items::Any)
            || check.unique
            || check.min > 0
            || check.max.is_some();
        Ok(active.then_some(check))
    }

    fn additional(&mut self, value: &Json, keyword: &str) -> Result<Additional, SchemaError> {
        match value.kind() {
            JsonKind::Object => Ok(Additional::Schema(self.compile(value)?)),
            JsonKind::Boolean if value.as_bool()? => Ok(Additional::Any),
            JsonKind::Boolean => Ok(Additional::Forbidden),
            found => Err(SchemaError::keyword(
                keyword,
                format!("expected a schema or a boolean, found {found}"),
            )),
        }
    }
}

fn number_check(schema: &Json) -> Result<Option<NumberCheck>, SchemaError> {
    let check = NumberCheck {
        minimum: number(schema, "minimum")?,
        maximum: number(schema, "maximum")?,
        exclusive_minimum: flag(schema, "exclusiveMinimum")?,
        exclusive_maximum: flag(schema, "exclusiveMaximum")?,
        multiple_of: number(schema, "multipleOf")?,
    };
    if let Some(divisor) = &check.multiple_of {
        if divisor.as_f64() <= 0.0 {
            return Err(SchemaError::keyword("multipleOf", "must be greater than zero"));
        }
    }
    let active =
        check.minimum.is_some() || check.maximum.is_some() || check.multiple_of.is_some();
    Ok(active.then_some(check))
}

fn string_check(schema: &Json) -> Result<Option<StringCheck>, SchemaError> {
    let mut check = StringCheck {
        min: size(schema, "minLength")?.unwrap_or(0),
        max: size(schema, "maxLength")?,
        pattern: None,
    };
    if let Some(pattern) = schema.get("pattern")? {
        let pattern = string(&pattern, "pattern")?;
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            SchemaError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        check.pattern = Some((regex, pattern));
    }
    let active = check.min > 0 || check.max.is_some() || check.pattern.is_some();
    Ok(active.then_some(check))
}

// ── Keyword value readers ─────────────────────────────────────────────

fn list(value: &Json, keyword: &str) -> Result<Vec<Json>, SchemaError> {
    if !value.is_array() {
        return Err(SchemaError::keyword(
            keyword,
            format!("expected an array, found {}", value.kind()),
        ));
    }
    Ok(value.elements()?)
}

fn map(value: &Json, keyword: &str) -> Result<Vec<(String, Json)>, SchemaError> {
    if !value.is_object() {
        return Err(SchemaError::keyword(
            keyword,
            format!("expected an object, found {}", value.kind()),
        ));
    }
    Ok(value.entries()?)
}

fn string(value: &Json, keyword: &str) -> Result<String, SchemaError> {
    if !value.is_string() {
        return Err(SchemaError::keyword(
            keyword,
            format!("expected a string, found {}", value.kind()),
        ));
    }
    Ok(value.as_str()?)
}

fn boolean(value: &Json, keyword: &str) -> Result<bool, SchemaError> {
    if !value.is_bool() {
        return Err(SchemaError::keyword(
            keyword,
            format!("expected a boolean, found {}", value.kind()),
        ));
    }
    Ok(value.as_bool()?)
}

fn flag(schema: &Json, keyword: &str) -> Result<bool, SchemaError> {
    match schema.get(keyword)? {
        Some(value) => boolean(&value, keyword),
        None => Ok(false),
    }
}

fn number(schema: &Json, keyword: &str) -> Result<Option<Number>, SchemaError> {
    match schema.get(keyword)? {
        Some(value) if value.is_number() => Ok(Some(value.as_number()?)),
        Some(value) => Err(SchemaError::keyword(
            keyword,
            format!("expected a number, found {}", value.kind()),
        )),
        None => Ok(None),
    }
}

/// A non-negative integral count (`minLength`, `maxItems`, ...).
fn size(schema: &Json, keyword: &str) -> Result<Option<usize>, SchemaError> {
    let Some(value) = number(schema, keyword)? else {
        return Ok(None);
    };
    if !value.is_integral() || value.as_f64() < 0.0 {
        return Err(SchemaError::keyword(
            keyword,
            format!("expected a non-negative integer, found {value}"),
        ));
    }
    Ok(Some(usize::try_from(value.as_i64()).unwrap_or(usize::MAX)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn program(schema: serde_json::Value) -> Program {
        compile(&Json::from(schema), 50).unwrap()
    }

    fn error(schema: serde_json::Value) -> SchemaError {
        compile(&Json::from(schema), 50).unwrap_err()
    }

    #[test]
    fn empty_schema_accepts_everything() {
        let p = program(json!({}));
        assert!(matches!(p.get(p.root()), Instruction::Any));
        let p = program(json!({"type": "any", "description": "whatever"}));
        assert!(matches!(p.get(p.root()), Instruction::Any));
    }

    #[test]
    fn keywords_become_sequence_steps() {
        let p = program(json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {"a": {"type": "string"}}
        }));
        let Instruction::Sequence(steps) = p.get(p.root()) else {
            panic!("expected a sequence");
        };
        assert_eq!(steps.len(), 4);
        assert!(matches!(p.get(steps[0]), Instruction::Type { allowed, .. } if allowed == &["object"]));
        assert!(matches!(p.get(steps[1]), Instruction::Required(name) if name == "a"));
        assert!(matches!(p.get(steps[2]), Instruction::Required(name) if name == "b"));
        assert!(matches!(p.get(steps[3]), Instruction::Object(check) if check.properties.len() == 1));
    }

    #[test]
    fn shared_subschemas_compile_once() {
        let schema = Json::from(json!({"properties": {}}));
        let shared = Json::from(json!({"type": "integer"}));
        let properties = schema.get("properties").unwrap().unwrap();
        properties.set("a", &shared).unwrap();
        properties.set("b", &shared).unwrap();
        let p = compile(&schema, 50).unwrap();
        let Instruction::Sequence(steps) = p.get(p.root()) else {
            panic!("expected a sequence");
        };
        let Instruction::Object(check) = p.get(steps[0]) else {
            panic!("expected an object check");
        };
        assert_eq!(check.properties[0].1, check.properties[1].1);
    }

    #[test]
    fn cyclic_schema_compiles() {
        let schema = Json::from(json!({"type": "object", "properties": {}}));
        schema
            .get("properties")
            .unwrap()
            .unwrap()
            .set("self", &schema)
            .unwrap();
        let p = compile(&schema, 50).unwrap();
        let Instruction::Sequence(steps) = p.get(p.root()) else {
            panic!("expected a sequence");
        };
        let Instruction::Object(check) = p.get(steps[1]) else {
            panic!("expected an object check");
        };
        assert_eq!(check.properties[0].1, p.root());
        schema.clear().unwrap();
    }

    #[test]
    fn pattern_is_anchored() {
        let p = program(json!({"pattern": "a+"}));
        let Instruction::Sequence(steps) = p.get(p.root()) else {
            panic!("expected a sequence");
        };
        let Instruction::Str(check) = p.get(steps[0]) else {
            panic!("expected a string check");
        };
        let (regex, text) = check.pattern.as_ref().unwrap();
        assert_eq!(text, "a+");
        assert!(regex.is_match("aaa"));
        assert!(!regex.is_match("baaa"));
    }

    #[test]
    fn boolean_required_is_ignored() {
        let p = program(json!({"required": true}));
        assert!(matches!(p.get(p.root()), Instruction::Any));
    }

    #[test]
    fn malformed_keywords_are_rejected() {
        assert!(matches!(
            error(json!({"type": 3})),
            SchemaError::InvalidKeyword { ref keyword, .. } if keyword == "type"
        ));
        assert!(matches!(
            error(json!({"minLength": -1})),
            SchemaError::InvalidKeyword { ref keyword, .. } if keyword == "minLength"
        ));
        assert!(matches!(
            error(json!({"maxItems": 1.5})),
            SchemaError::InvalidKeyword { ref keyword, .. } if keyword == "maxItems"
        ));
        assert!(matches!(
            error(json!({"exclusiveMinimum": 1, "minimum": 0})),
            SchemaError::InvalidKeyword { ref keyword, .. } if keyword == "exclusiveMinimum"
        ));
        assert!(matches!(
            error(json!({"multipleOf": 0})),
            SchemaError::InvalidKeyword { ref keyword, .. } if keyword == "multipleOf"
        ));
        assert!(matches!(
            error(json!({"anyOf": {}})),
            SchemaError::InvalidKeyword { ref keyword, .. } if keyword == "anyOf"
        ));
        assert!(matches!(
            error(json!({"required": "a"})),
            SchemaError::InvalidKeyword { ref keyword, .. } if keyword == "required"
        ));
    }

    #[test]
    fn bad_regex_is_reported() {
        assert!(matches!(
            error(json!({"pattern": "("})),
            SchemaError::InvalidPattern { ref pattern, .. } if pattern == "("
        ));
        assert!(matches!(
            error(json!({"patternProperties": {"[": {}}})),
            SchemaError::InvalidPattern { ref pattern, .. } if pattern == "["
        ));
    }

    #[test]
    fn array_check_only_when_constrained() {
        let p = program(json!({"additionalItems": false}));
        assert!(matches!(p.get(p.root()), Instruction::Any));
        let p = program(json!({"items": [{}, {}], "additionalItems": false}));
        let Instruction::Sequence(steps) = p.get(p.root()) else {
            panic!("expected a sequence");
        };
        let Instruction::Array(check) = p.get(steps[0]) else {
            panic!("expected an array check");
        };
        assert!(matches!(&check.items, Items::Tuple(ids) if ids.len() == 2));
        assert_eq!(check.additional, Additional::Forbidden);
    }
}
