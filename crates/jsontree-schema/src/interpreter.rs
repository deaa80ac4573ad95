//! Runs a compiled [`Program`] against a document.
//!
//! Validation never fails: every violation found is collected as a
//! [`Violation`] carrying the JSON Pointer of the offending sub-document.

use std::collections::HashSet;
use std::fmt;

use jsontree::pointer::escape_component;
use jsontree::{Json, JsonKind, Number};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::compiler::{
    Additional, ArrayCheck, InstrId, Instruction, Items, NumberCheck, ObjectCheck, Program,
    StringCheck,
};

/// One failed constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// JSON Pointer of the offending sub-document (`""` for the root).
    pub path: String,
    pub message: String,
    /// Per-alternate results of a failed `oneOf`, in schema order. Empty
    /// for every other keyword.
    pub causes: Vec<Vec<Violation>>,
}

impl Violation {
    fn new(path: &str, message: String) -> Self {
        Self {
            path: path.to_string(),
            message,
            causes: Vec::new(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.path, self.message)
    }
}

/// Outcome of [`Schema::validate`](crate::Schema::validate).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<Violation>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<Violation>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    /// Rendered messages, one per top-level violation.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// `{"ok":true}` or `{"ok":false,"errors":[...]}`. A violation with
    /// causes is followed by an array holding one array per alternate.
    pub fn to_json(&self) -> Json {
        if self.ok {
            return Json::object_from([("ok", Json::boolean(true))]);
        }
        Json::object_from([
            ("ok", Json::boolean(false)),
            ("errors", violations_to_json(&self.errors)),
        ])
    }
}

fn violations_to_json(violations: &[Violation]) -> Json {
    let mut out = Vec::with_capacity(violations.len());
    for violation in violations {
        out.push(Json::string(violation.to_string()));
        if !violation.causes.is_empty() {
            out.push(Json::array_from(
                violation.causes.iter().map(|cause| violations_to_json(cause)),
            ));
        }
    }
    Json::array_from(out)
}

pub(crate) fn validate(program: &Program, document: &Json, max_chars: usize) -> ValidationResult {
    let mut run = Run {
        program,
        max_chars,
        active: HashSet::new(),
    };
    let mut errors = Vec::new();
    run.apply(program.root(), document, "", &mut errors);
    ValidationResult::from_errors(errors)
}

struct Run<'p> {
    program: &'p Program,
    max_chars: usize,
    /// `(instruction, document node)` pairs being evaluated; re-entering
    /// one means a schema cycle met a document cycle.
    active: HashSet<(InstrId, usize)>,
}

impl Run<'_> {
    fn render(&self, value: &Json) -> String {
        value.to_string_bounded(self.max_chars)
    }

    fn check(&mut self, id: InstrId, doc: &Json, path: &str) -> Vec<Violation> {
        let mut errors = Vec::new();
        self.apply(id, doc, path, &mut errors);
        errors
    }

    fn passes(&mut self, id: InstrId, doc: &Json, path: &str) -> bool {
        self.check(id, doc, path).is_empty()
    }

    fn apply(&mut self, id: InstrId, doc: &Json, path: &str, errors: &mut Vec<Violation>) {
        let program = self.program;
        match program.get(id) {
            Instruction::Any => {}
            Instruction::Sequence(steps) => {
                let key = (id, doc.node_id());
                if !self.active.insert(key) {
                    return;
                }
                for &step in steps {
                    self.apply(step, doc, path, errors);
                }
                self.active.remove(&key);
            }
            Instruction::Type { allowed, rendered } => {
                if !type_matches(allowed, doc) {
                    errors.push(Violation::new(
                        path,
                        format!(
                            "Type mismatch for {}, allowed types: {rendered}",
                            self.render(doc)
                        ),
                    ));
                }
            }
            Instruction::Enum { options, rendered } => {
                if !options.iter().any(|option| option == doc) {
                    errors.push(Violation::new(
                        path,
                        format!(
                            "Element {} doesn't match any of enumerated possibilities {rendered}",
                            self.render(doc)
                        ),
                    ));
                }
            }
            Instruction::AnyOf {
                alternates,
                rendered,
            } => {
                if !alternates.iter().any(|&alt| self.passes(alt, doc, path)) {
                    errors.push(Violation::new(
                        path,
                        format!(
                            "Element {} must conform to at least one of available sub-schemas {rendered}",
                            self.render(doc)
                        ),
                    ));
                }
            }
            Instruction::OneOf {
                alternates,
                rendered,
            } => {
                let mut matches = 0;
                let mut causes = Vec::new();
                for &alt in alternates {
                    let result = self.check(alt, doc, path);
                    if result.is_empty() {
                        matches += 1;
                    } else {
                        causes.push(result);
                    }
                }
                if matches != 1 {
                    let mut violation = Violation::new(
                        path,
                        format!(
                            "Element {} must conform to exactly one of available sub-schemas, but not more {rendered}",
                            self.render(doc)
                        ),
                    );
                    violation.causes = causes;
                    errors.push(violation);
                }
            }
            Instruction::Not { inner, rendered } => {
                if self.passes(*inner, doc, path) {
                    errors.push(Violation::new(
                        path,
                        format!(
                            "Element {} must NOT conform to the schema {rendered}",
                            self.render(doc)
                        ),
                    ));
                }
            }
            Instruction::Required(name) => {
                if doc.is_object() && !doc.has(name) {
                    errors.push(Violation::new(
                        path,
                        format!(
                            "Required property {name} missing from object {}",
                            self.render(doc)
                        ),
                    ));
                }
            }
            Instruction::Object(check) => self.object(check, doc, path, errors),
            Instruction::Array(check) => self.array(check, doc, path, errors),
            Instruction::Number(check) => number(check, doc, path, errors),
            Instruction::Str(check) => self.string(check, doc, path, errors),
            Instruction::SchemaDependency { property, schema } => {
                if doc.is_object() && doc.has(property) {
                    self.apply(*schema, doc, path, errors);
                }
            }
            Instruction::PropertyDependency { property, required } => {
                if doc.is_object() && doc.has(property) {
                    for name in required {
                        if !doc.has(name) {
                            errors.push(Violation::new(
                                path,
                                format!(
                                    "Conditionally required property {name} missing from object {}",
                                    self.render(doc)
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }

    fn object(&mut self, check: &ObjectCheck, doc: &Json, path: &str, errors: &mut Vec<Violation>) {
        let Ok(entries) = doc.entries() else {
            return;
        };
        let mut covered = HashSet::new();
        for (name, schema) in &check.properties {
            if let Some((_, value)) = entries.iter().find(|(key, _)| key == name) {
                covered.insert(name.as_str());
                self.apply(*schema, value, &child_path(path, name), errors);
            }
        }
        for (pattern, schema) in &check.patterns {
            for (key, value) in &entries {
                if pattern.is_match(key) {
                    covered.insert(key.as_str());
                    self.apply(*schema, value, &child_path(path, key), errors);
                }
            }
        }
        if check.additional != Additional::Any {
            for (key, value) in &entries {
                if covered.contains(key.as_str()) {
                    continue;
                }
                match check.additional {
                    Additional::Schema(schema) => {
                        self.apply(schema, value, &child_path(path, key), errors)
                    }
                    _ => errors.push(Violation::new(
                        path,
                        format!(
                            "Extra property '{key}', schema doesn't allow any properties not explicitly defined: {}",
                            self.render(doc)
                        ),
                    )),
                }
            }
        }
        if entries.len() < check.min {
            errors.push(Violation::new(
                path,
                format!(
                    "Object {} has fewer than the permitted {} number of properties.",
                    self.render(doc),
                    check.min
                ),
            ));
        }
        if let Some(max) = check.max {
            if entries.len() > max {
                errors.push(Violation::new(
                    path,
                    format!(
                        "Object {} has more than the permitted {max} number of properties.",
                        self.render(doc)
                    ),
                ));
            }
        }
    }

    fn array(&mut self, check: &ArrayCheck, doc: &Json, path: &str, errors: &mut Vec<Violation>) {
        let Ok(elements) = doc.elements() else {
            return;
        };
        for (index, element) in elements.iter().enumerate() {
            let schema = match &check.items {
                Items::Any => break,
                Items::Single(schema) => Additional::Schema(*schema),
                Items::Tuple(schemas) => match schemas.get(index) {
                    Some(schema) => Additional::Schema(*schema),
                    None => check.additional,
                },
            };
            let element_path = child_path(path, &index.to_string());
            let before = errors.len();
            match schema {
                Additional::Any => {}
                Additional::Schema(schema) => self.apply(schema, element, &element_path, errors),
                Additional::Forbidden => errors.push(Violation::new(
                    &element_path,
                    format!(
                        "Additional items are not permitted: {} in {}",
                        self.render(element),
                        self.render(doc)
                    ),
                )),
            }
            if errors.len() > before {
                break;
            }
        }
        if check.unique {
            for (index, element) in elements.iter().enumerate() {
                if elements[..index].iter().any(|earlier| earlier == element) {
                    errors.push(Violation::new(
                        &child_path(path, &index.to_string()),
                        format!("Element {} is duplicate in array.", self.render(element)),
                    ));
                    break;
                }
            }
        }
        let len = elements.len();
        if len < check.min || check.max.is_some_and(|max| len > max) {
            let max = check
                .max
                .map_or_else(|| "inf".to_string(), |max| max.to_string());
            errors.push(Violation::new(
                path,
                format!(
                    "Array {} has number of elements outside of the permitted range [{},{max}].",
                    self.render(doc),
                    check.min
                ),
            ));
        }
    }

    fn string(&self, check: &StringCheck, doc: &Json, path: &str, errors: &mut Vec<Violation>) {
        if !doc.is_string() {
            return;
        }
        let Ok(text) = doc.as_str() else {
            return;
        };
        let len = text.chars().count();
        if len < check.min || check.max.is_some_and(|max| len > max) {
            let max = check
                .max
                .map_or_else(|| "inf".to_string(), |max| max.to_string());
            errors.push(Violation::new(
                path,
                format!(
                    "String {} has length outside of the permitted range [{},{max}].",
                    self.render(doc),
                    check.min
                ),
            ));
        }
        if let Some((regex, pattern)) = &check.pattern {
            if !regex.is_match(&text) {
                errors.push(Violation::new(
                    path,
                    format!("String {} does not match regex {pattern}", self.render(doc)),
                ));
            }
        }
    }
}

fn type_matches(allowed: &[String], doc: &Json) -> bool {
    let kind = doc.kind();
    allowed.iter().any(|name| match name.as_str() {
        "integer" => kind == JsonKind::Number && doc.as_number().is_ok_and(|n| n.is_integral()),
        other => other == kind.as_str(),
    })
}

fn number(check: &NumberCheck, doc: &Json, path: &str, errors: &mut Vec<Violation>) {
    let Ok(value) = doc.as_number() else {
        return;
    };
    if let Some(minimum) = &check.minimum {
        let order = value.compare(minimum);
        if order.is_lt() || (check.exclusive_minimum && order.is_eq()) {
            errors.push(Violation::new(
                path,
                format!("Number {value} is below allowed minimum {minimum}"),
            ));
        }
    }
    if let Some(maximum) = &check.maximum {
        let order = value.compare(maximum);
        if order.is_gt() || (check.exclusive_maximum && order.is_eq()) {
            errors.push(Violation::new(
                path,
                format!("Number {value} is above allowed maximum {maximum}"),
            ));
        }
    }
    if let Some(divisor) = &check.multiple_of {
        if !is_multiple(&value, divisor) {
            errors.push(Violation::new(
                path,
                format!("Number {value} is not a multiple of {divisor}"),
            ));
        }
    }
}

fn is_multiple(value: &Number, divisor: &Number) -> bool {
    if let (Some(value), Some(divisor)) = (value.as_bigint(), divisor.as_bigint()) {
        if divisor.is_zero() {
            return false;
        }
        return (value % divisor) == BigInt::zero();
    }
    let quotient = value.as_f64() / divisor.as_f64();
    quotient.is_finite() && quotient.fract() == 0.0
}

fn child_path(path: &str, segment: &str) -> String {
    format!("{path}/{}", escape_component(segment))
}
