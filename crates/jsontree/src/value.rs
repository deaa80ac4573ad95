//! The JSON value tree.
//!
//! A [`Json`] is a shared handle to a node. Cloning the handle never copies
//! the node (use [`Json::dup`] for that) and `==` compares structure, not
//! identity (use [`Json::ptr_eq`] for that).
//!
//! Containers own their children. Every child keeps weak back-references
//! to the containers that hold it, which is what [`Json::up`] answers. A node
//! may sit in several containers at once; after reference expansion a
//! container can even reach itself. Back-references never keep a node
//! alive.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use indexmap::IndexMap;
use num_bigint::BigInt;
use serde::Serialize;

use crate::error::{JsonError, Result};
use crate::factory;
use crate::number::{Decimal, Number};
use crate::printer::{self, PrintOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Data {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Json>),
    Object(IndexMap<String, Json>),
}

impl Data {
    fn kind(&self) -> JsonKind {
        match self {
            Data::Null => JsonKind::Null,
            Data::Bool(_) => JsonKind::Boolean,
            Data::Number(_) => JsonKind::Number,
            Data::String(_) => JsonKind::String,
            Data::Array(_) => JsonKind::Array,
            Data::Object(_) => JsonKind::Object,
        }
    }
}

struct Node {
    data: RwLock<Data>,
    enclosing: Mutex<Vec<Weak<Node>>>,
}

impl Node {
    fn read(&self) -> RwLockReadGuard<'_, Data> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Data> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn enclosing(&self) -> MutexGuard<'_, Vec<Weak<Node>>> {
        self.enclosing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a node of a JSON document tree.
#[derive(Clone)]
pub struct Json(Arc<Node>);

impl Json {
    pub(crate) fn from_data(data: Data) -> Json {
        Json(Arc::new(Node {
            data: RwLock::new(data),
            enclosing: Mutex::new(Vec::new()),
        }))
    }

    /// Parses JSON text with the active factory.
    pub fn parse(text: &str) -> Result<Json> {
        crate::parser::parse(text)
    }

    // ── Construction through the active factory ───────────────────────────

    /// `null`, built by the active [`Factory`](crate::Factory).
    pub fn nil() -> Json {
        factory::current().nil()
    }

    pub fn boolean(value: bool) -> Json {
        factory::current().boolean(value)
    }

    pub fn string(value: impl Into<String>) -> Json {
        factory::current().string(value.into())
    }

    /// A number node; integers keep their exact value.
    ///
    /// # Example
    ///
    /// ```
    /// use jsontree::Json;
    ///
    /// assert_eq!(Json::number(7).to_string(), "7");
    /// assert_eq!(Json::number(7.0).to_string(), "7.0");
    /// assert_eq!(Json::number(7), Json::number(7.0));
    /// ```
    pub fn number(value: impl Into<Number>) -> Json {
        factory::current().number(value.into())
    }

    /// An empty object.
    pub fn object() -> Json {
        factory::current().object()
    }

    /// An empty array.
    pub fn array() -> Json {
        factory::current().array()
    }

    /// Converts any host value the active factory understands.
    pub fn make(value: impl Into<Json>) -> Json {
        value.into()
    }

    /// Builds a tree from any serializable host value.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Json> {
        let host = serde_json::to_value(value)?;
        Ok(factory::current().make(&host))
    }

    /// Object from `(key, value)` pairs, in order.
    pub fn object_from<K, V, I>(entries: I) -> Json
    where
        K: Into<String>,
        V: Into<Json>,
        I: IntoIterator<Item = (K, V)>,
    {
        let object = Json::object();
        for (key, value) in entries {
            object.insert_child(key.into(), value.into());
        }
        object
    }

    /// Array from `items`, in order.
    ///
    /// # Example
    ///
    /// ```
    /// use jsontree::Json;
    ///
    /// let list = Json::array_from([Json::from(1), Json::from("two"), Json::nil()]);
    /// assert_eq!(list.to_string(), r#"[1,"two",null]"#);
    /// ```
    pub fn array_from<V, I>(items: I) -> Json
    where
        V: Into<Json>,
        I: IntoIterator<Item = V>,
    {
        let array = Json::array();
        for item in items {
            array.push_child(item.into());
        }
        array
    }

    // ── Identity and enclosure ────────────────────────────────────────────

    /// Address of the node, stable while any handle to it is alive.
    pub fn node_id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// True when both handles point at the same node. `==` compares
    /// structure instead.
    pub fn ptr_eq(a: &Json, b: &Json) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// The first live container holding this node.
    pub fn up(&self) -> Option<Json> {
        self.0.enclosing().iter().find_map(|w| w.upgrade().map(Json))
    }

    /// Every live container holding this node.
    pub fn enclosing(&self) -> Vec<Json> {
        self.0
            .enclosing()
            .iter()
            .filter_map(|w| w.upgrade().map(Json))
            .collect()
    }

    fn attach(&self, parent: &Json) {
        let mut enclosing = self.0.enclosing();
        enclosing.retain(|w| w.strong_count() > 0);
        enclosing.push(Arc::downgrade(&parent.0));
    }

    fn detach(&self, parent: &Json) {
        let target = Arc::as_ptr(&parent.0);
        let mut enclosing = self.0.enclosing();
        if let Some(at) = enclosing.iter().position(|w| Weak::as_ptr(w) == target) {
            enclosing.remove(at);
        }
    }

    // ── Variant inspection ────────────────────────────────────────────────

    pub fn kind(&self) -> JsonKind {
        self.0.read().kind()
    }

    pub fn is_null(&self) -> bool {
        self.kind() == JsonKind::Null
    }

    pub fn is_bool(&self) -> bool {
        self.kind() == JsonKind::Boolean
    }

    pub fn is_number(&self) -> bool {
        self.kind() == JsonKind::Number
    }

    pub fn is_string(&self) -> bool {
        self.kind() == JsonKind::String
    }

    pub fn is_array(&self) -> bool {
        self.kind() == JsonKind::Array
    }

    pub fn is_object(&self) -> bool {
        self.kind() == JsonKind::Object
    }

    /// Booleans, numbers and strings.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.kind(),
            JsonKind::Boolean | JsonKind::Number | JsonKind::String
        )
    }

    pub(crate) fn snapshot(&self) -> Data {
        self.0.read().clone()
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    /// Element `index` of an array.
    pub fn at(&self, index: usize) -> Result<Json> {
        match &*self.0.read() {
            Data::Array(items) => items.get(index).cloned().ok_or(JsonError::IndexOutOfBounds {
                index,
                len: items.len(),
            }),
            other => Err(JsonError::mismatch("at", other.kind())),
        }
    }

    /// Property `key` of an object; `None` when the key is absent, which is
    /// distinct from a present `null`.
    pub fn get(&self, key: &str) -> Result<Option<Json>> {
        match &*self.0.read() {
            Data::Object(map) => Ok(map.get(key).cloned()),
            other => Err(JsonError::mismatch("get", other.kind())),
        }
    }

    /// Property `key`, or `default` when absent. The object is not modified.
    pub fn get_or(&self, key: &str, default: impl Into<Json>) -> Result<Json> {
        Ok(self.get(key)?.unwrap_or_else(|| default.into()))
    }

    /// Whether this is an object with property `key`.
    pub fn has(&self, key: &str) -> bool {
        matches!(&*self.0.read(), Data::Object(map) if map.contains_key(key))
    }

    /// Whether property `key` exists and structurally equals `value`.
    pub fn is(&self, key: &str, value: impl Into<Json>) -> bool {
        match self.get(key) {
            Ok(Some(found)) => found == value.into(),
            _ => false,
        }
    }

    /// Whether element `index` exists and structurally equals `value`.
    pub fn is_at(&self, index: usize, value: impl Into<Json>) -> bool {
        match self.at(index) {
            Ok(found) => found == value.into(),
            Err(_) => false,
        }
    }

    /// Looks up a JSON Pointer (`/a/0/b`) below this node.
    pub fn pointer(&self, pointer: &str) -> Result<Option<Json>, crate::pointer::PointerError> {
        match crate::pointer::find_by_pointer(self, pointer) {
            Ok(found) => Ok(Some(found)),
            Err(crate::pointer::PointerError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Number of elements or properties.
    pub fn len(&self) -> Result<usize> {
        match &*self.0.read() {
            Data::Array(items) => Ok(items.len()),
            Data::Object(map) => Ok(map.len()),
            other => Err(JsonError::mismatch("len", other.kind())),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Property names of an object, in insertion order.
    pub fn keys(&self) -> Result<Vec<String>> {
        match &*self.0.read() {
            Data::Object(map) => Ok(map.keys().cloned().collect()),
            other => Err(JsonError::mismatch("keys", other.kind())),
        }
    }

    /// Snapshot of `(key, child)` pairs in insertion order.
    pub fn entries(&self) -> Result<Vec<(String, Json)>> {
        match &*self.0.read() {
            Data::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            other => Err(JsonError::mismatch("entries", other.kind())),
        }
    }

    /// Snapshot of the child handles of an array.
    pub fn elements(&self) -> Result<Vec<Json>> {
        match &*self.0.read() {
            Data::Array(items) => Ok(items.clone()),
            other => Err(JsonError::mismatch("elements", other.kind())),
        }
    }

    /// The children of an object keyed by name. The handles are shared with
    /// the tree; the map is not.
    pub fn as_json_map(&self) -> Result<IndexMap<String, Json>> {
        match &*self.0.read() {
            Data::Object(map) => Ok(map.clone()),
            other => Err(JsonError::mismatch("as_json_map", other.kind())),
        }
    }

    pub fn as_json_list(&self) -> Result<Vec<Json>> {
        self.elements()
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    pub(crate) fn insert_child(&self, key: String, value: Json) -> Option<Json> {
        let previous = match &mut *self.0.write() {
            Data::Object(map) => map.insert(key, value.clone()),
            _ => return None,
        };
        value.attach(self);
        if let Some(old) = &previous {
            old.detach(self);
        }
        previous
    }

    pub(crate) fn push_child(&self, value: Json) {
        if let Data::Array(items) = &mut *self.0.write() {
            items.push(value.clone());
        } else {
            return;
        }
        value.attach(self);
    }

    /// Sets property `key`, replacing and detaching any previous child.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Json>) -> Result<&Json> {
        let kind = self.kind();
        if kind != JsonKind::Object {
            return Err(JsonError::mismatch("set", kind));
        }
        self.insert_child(key.into(), value.into());
        Ok(self)
    }

    /// Replaces element `index` of an array.
    pub fn set_at(&self, index: usize, value: impl Into<Json>) -> Result<&Json> {
        let value = value.into();
        let previous = match &mut *self.0.write() {
            Data::Array(items) => {
                let len = items.len();
                let slot = items
                    .get_mut(index)
                    .ok_or(JsonError::IndexOutOfBounds { index, len })?;
                std::mem::replace(slot, value.clone())
            }
            other => return Err(JsonError::mismatch("set_at", other.kind())),
        };
        value.attach(self);
        previous.detach(self);
        Ok(self)
    }

    /// Appends to an array.
    pub fn add(&self, value: impl Into<Json>) -> Result<&Json> {
        let kind = self.kind();
        if kind != JsonKind::Array {
            return Err(JsonError::mismatch("add", kind));
        }
        self.push_child(value.into());
        Ok(self)
    }

    /// Inserts into an array before `index`; `index == len` appends.
    pub fn insert_at(&self, index: usize, value: impl Into<Json>) -> Result<&Json> {
        let value = value.into();
        match &mut *self.0.write() {
            Data::Array(items) => {
                if index > items.len() {
                    return Err(JsonError::IndexOutOfBounds {
                        index,
                        len: items.len(),
                    });
                }
                items.insert(index, value.clone());
            }
            other => return Err(JsonError::mismatch("insert_at", other.kind())),
        }
        value.attach(self);
        Ok(self)
    }

    /// Removes property `key` and returns it, detached from this object.
    pub fn remove(&self, key: &str) -> Result<Option<Json>> {
        let removed = match &mut *self.0.write() {
            Data::Object(map) => map.shift_remove(key),
            other => return Err(JsonError::mismatch("remove", other.kind())),
        };
        if let Some(child) = &removed {
            child.detach(self);
        }
        Ok(removed)
    }

    /// Removes element `index` and returns it, detached from this array.
    pub fn remove_at(&self, index: usize) -> Result<Json> {
        let removed = match &mut *self.0.write() {
            Data::Array(items) => {
                if index >= items.len() {
                    return Err(JsonError::IndexOutOfBounds {
                        index,
                        len: items.len(),
                    });
                }
                items.remove(index)
            }
            other => return Err(JsonError::mismatch("remove_at", other.kind())),
        };
        removed.detach(self);
        Ok(removed)
    }

    /// Like [`Json::remove`] but returns the receiver.
    pub fn delete(&self, key: &str) -> Result<&Json> {
        self.remove(key)?;
        Ok(self)
    }

    /// Like [`Json::remove_at`] but returns the receiver.
    pub fn delete_at(&self, index: usize) -> Result<&Json> {
        self.remove_at(index)?;
        Ok(self)
    }

    /// Removes the first element structurally equal to `value`.
    pub fn remove_value(&self, value: &Json) -> Result<&Json> {
        let items = match &*self.0.read() {
            Data::Array(items) => items.clone(),
            other => return Err(JsonError::mismatch("remove_value", other.kind())),
        };
        let Some(at) = items.iter().position(|item| item == value) else {
            return Ok(self);
        };
        let removed = match &mut *self.0.write() {
            Data::Array(current) if current.get(at).is_some_and(|c| Json::ptr_eq(c, &items[at])) => {
                Some(current.remove(at))
            }
            _ => None,
        };
        if let Some(child) = removed {
            child.detach(self);
        }
        Ok(self)
    }

    /// Drops every child of an array or object.
    pub fn clear(&self) -> Result<&Json> {
        let children: Vec<Json> = match &mut *self.0.write() {
            Data::Array(items) => std::mem::take(items),
            Data::Object(map) => std::mem::take(map).into_values().collect(),
            other => return Err(JsonError::mismatch("clear", other.kind())),
        };
        for child in &children {
            child.detach(self);
        }
        Ok(self)
    }

    // ── Copy ──────────────────────────────────────────────────────────────

    /// Deep copy. Every node of the copy is new, leaves included, and is
    /// enclosed only by its new container. A container that reaches itself
    /// yields a copy that reaches itself.
    pub fn dup(&self) -> Json {
        self.dup_into(&mut HashMap::new())
    }

    fn dup_into(&self, in_progress: &mut HashMap<usize, Json>) -> Json {
        let id = self.node_id();
        if let Some(copy) = in_progress.get(&id) {
            return copy.clone();
        }
        match self.snapshot() {
            Data::Array(items) => {
                let copy = Json::from_data(Data::Array(Vec::with_capacity(items.len())));
                in_progress.insert(id, copy.clone());
                for item in &items {
                    copy.push_child(item.dup_into(in_progress));
                }
                in_progress.remove(&id);
                copy
            }
            Data::Object(map) => {
                let copy = Json::from_data(Data::Object(IndexMap::with_capacity(map.len())));
                in_progress.insert(id, copy.clone());
                for (key, value) in &map {
                    copy.insert_child(key.clone(), value.dup_into(in_progress));
                }
                in_progress.remove(&id);
                copy
            }
            leaf => Json::from_data(leaf),
        }
    }

    // ── Typed accessors ───────────────────────────────────────────────────

    /// The value of a boolean node.
    ///
    /// # Example
    ///
    /// ```
    /// use jsontree::{Json, JsonError};
    ///
    /// assert!(Json::boolean(true).as_bool().unwrap());
    /// assert!(matches!(Json::from(1).as_bool(), Err(JsonError::TypeMismatch { .. })));
    /// ```
    pub fn as_bool(&self) -> Result<bool> {
        match &*self.0.read() {
            Data::Bool(value) => Ok(*value),
            other => Err(JsonError::mismatch("as_bool", other.kind())),
        }
    }

    /// A copy of the text of a string node.
    pub fn as_str(&self) -> Result<String> {
        match &*self.0.read() {
            Data::String(value) => Ok(value.clone()),
            other => Err(JsonError::mismatch("as_str", other.kind())),
        }
    }

    /// First character of a string.
    pub fn as_char(&self) -> Result<char> {
        match &*self.0.read() {
            Data::String(value) => value
                .chars()
                .next()
                .ok_or(JsonError::IndexOutOfBounds { index: 0, len: 0 }),
            other => Err(JsonError::mismatch("as_char", other.kind())),
        }
    }

    pub fn as_number(&self) -> Result<Number> {
        match &*self.0.read() {
            Data::Number(value) => Ok(value.clone()),
            other => Err(JsonError::mismatch("as_number", other.kind())),
        }
    }

    fn with_number<T>(&self, operation: &'static str, f: impl FnOnce(&Number) -> T) -> Result<T> {
        match &*self.0.read() {
            Data::Number(value) => Ok(f(value)),
            other => Err(JsonError::mismatch(operation, other.kind())),
        }
    }

    /// Narrowed as described in [`number`](crate::number#narrowing).
    pub fn as_integer(&self) -> Result<i32> {
        self.with_number("as_integer", Number::as_i32)
    }

    pub fn as_long(&self) -> Result<i64> {
        self.with_number("as_long", Number::as_i64)
    }

    pub fn as_short(&self) -> Result<i16> {
        self.with_number("as_short", Number::as_i16)
    }

    pub fn as_byte(&self) -> Result<i8> {
        self.with_number("as_byte", Number::as_i8)
    }

    pub fn as_double(&self) -> Result<f64> {
        self.with_number("as_double", Number::as_f64)
    }

    pub fn as_float(&self) -> Result<f32> {
        self.with_number("as_float", Number::as_f32)
    }

    // ── Host projection ───────────────────────────────────────────────────

    /// Deep copy into plain `serde_json` values. Integers beyond `u64` and
    /// long decimals are projected through `f64`. A container reached again
    /// while it is being projected becomes `null`.
    pub fn value(&self) -> serde_json::Value {
        self.project(&mut HashSet::new())
    }

    /// [`value`](Json::value) of an object.
    pub fn as_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match self.value() {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(JsonError::mismatch("as_map", self.kind())),
        }
    }

    pub fn as_list(&self) -> Result<Vec<serde_json::Value>> {
        match self.value() {
            serde_json::Value::Array(items) => Ok(items),
            _ => Err(JsonError::mismatch("as_list", self.kind())),
        }
    }

    fn project(&self, active: &mut HashSet<usize>) -> serde_json::Value {
        use serde_json::Value;
        match self.snapshot() {
            Data::Null => Value::Null,
            Data::Bool(value) => Value::Bool(value),
            Data::Number(number) => number_to_host(&number),
            Data::String(value) => Value::String(value),
            Data::Array(items) => {
                if !active.insert(self.node_id()) {
                    return Value::Null;
                }
                let out = items.iter().map(|item| item.project(active)).collect();
                active.remove(&self.node_id());
                Value::Array(out)
            }
            Data::Object(map) => {
                if !active.insert(self.node_id()) {
                    return Value::Null;
                }
                let out = map
                    .iter()
                    .map(|(key, value)| (key.clone(), value.project(active)))
                    .collect();
                active.remove(&self.node_id());
                Value::Object(out)
            }
        }
    }

    // ── Text ──────────────────────────────────────────────────────────────

    /// JSON text of at most roughly `max_chars` characters; children that
    /// do not fit are replaced by `...`.
    pub fn to_string_bounded(&self, max_chars: usize) -> String {
        printer::print(
            self,
            &PrintOptions {
                max_chars: Some(max_chars),
                ..PrintOptions::default()
            },
        )
    }

    /// JSONP wrapping: `callback(<json>);`, or plain text for an empty name.
    pub fn pad(&self, callback: &str) -> String {
        if callback.is_empty() {
            self.to_string()
        } else {
            format!("{callback}({self});")
        }
    }
}

fn number_to_host(number: &Number) -> serde_json::Value {
    use serde_json::Value;
    match number {
        Number::Int(value) => Value::from(*value),
        Number::Long(value) => Value::from(*value),
        Number::BigInt(value) => match u64::try_from(value) {
            Ok(unsigned) => Value::from(unsigned),
            Err(_) => float_to_host(number.as_f64()),
        },
        Number::Double(value) => float_to_host(*value),
        Number::Decimal(decimal) => float_to_host(decimal.as_f64()),
    }
}

fn float_to_host(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl PartialEq for Json {
    /// Structural equality. Two cyclic structures are equal when they unfold
    /// to the same infinite tree.
    fn eq(&self, other: &Json) -> bool {
        self.equal_in(other, &mut HashSet::new())
    }
}

impl Json {
    /// A pair already under comparison is assumed equal; any real
    /// difference still shows up on another branch.
    fn equal_in(&self, other: &Json, assumed: &mut HashSet<(usize, usize)>) -> bool {
        if Json::ptr_eq(self, other) {
            return true;
        }
        let pairs: Vec<(Json, Json)> = {
            let a = self.0.read();
            let b = other.0.read();
            match (&*a, &*b) {
                (Data::Null, Data::Null) => return true,
                (Data::Bool(x), Data::Bool(y)) => return x == y,
                (Data::Number(x), Data::Number(y)) => return x == y,
                (Data::String(x), Data::String(y)) => return x == y,
                (Data::Array(x), Data::Array(y)) => {
                    if x.len() != y.len() {
                        return false;
                    }
                    x.iter().cloned().zip(y.iter().cloned()).collect()
                }
                (Data::Object(x), Data::Object(y)) => {
                    if x.len() != y.len() {
                        return false;
                    }
                    let mut pairs = Vec::with_capacity(x.len());
                    for (key, value) in x {
                        match y.get(key) {
                            Some(other_value) => pairs.push((value.clone(), other_value.clone())),
                            None => return false,
                        }
                    }
                    pairs
                }
                _ => return false,
            }
        };
        if !assumed.insert((self.node_id(), other.node_id())) {
            return true;
        }
        pairs.iter().all(|(a, b)| a.equal_in(b, assumed))
    }
}

impl fmt::Display for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&printer::print(self, &PrintOptions::default()))
    }
}

impl fmt::Debug for Json {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Json({})", self.to_string_bounded(200))
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<&Json> for Json {
    fn from(value: &Json) -> Self {
        value.clone()
    }
}

impl From<bool> for Json {
    fn from(value: bool) -> Self {
        Json::boolean(value)
    }
}

impl From<&str> for Json {
    fn from(value: &str) -> Self {
        Json::string(value)
    }
}

impl From<String> for Json {
    fn from(value: String) -> Self {
        Json::string(value)
    }
}

impl From<&String> for Json {
    fn from(value: &String) -> Self {
        Json::string(value.as_str())
    }
}

impl From<Number> for Json {
    fn from(value: Number) -> Self {
        Json::number(value)
    }
}

macro_rules! json_from_number {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Json {
            fn from(value: $ty) -> Self {
                Json::number(Number::from(value))
            }
        })*
    };
}

json_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, BigInt, Decimal);

impl<T: Into<Json>> From<Vec<T>> for Json {
    fn from(items: Vec<T>) -> Self {
        Json::array_from(items)
    }
}

impl<T: Into<Json>> From<Option<T>> for Json {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Json::nil(),
        }
    }
}

impl From<serde_json::Value> for Json {
    fn from(value: serde_json::Value) -> Self {
        factory::current().make(&value)
    }
}

impl From<&serde_json::Value> for Json {
    fn from(value: &serde_json::Value) -> Self {
        factory::current().make(value)
    }
}
