//! Bound model values.
//!
//! Binders produce a [`Model`]: a dynamically shaped value graph that the
//! validation visitor walks under the guidance of metadata. Scalars,
//! collections and keyed collections are plain values; composite objects live
//! behind a shared [`ObjectRef`] so that graphs can alias and even cycle. An
//! object's [`ModelIdentity`] is the identity of its allocation, which is what
//! the cycle guard and the validation-state dictionary key on.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// Model Type
// ═══════════════════════════════════════════════════════════════════════════════

/// Name of a declared model type (e.g. `"int"`, `"string"`, `"Order"`).
///
/// Two types are the same type iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelType(Arc<str>);

impl ModelType {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Object References
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of a shared object within the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelIdentity(usize);

/// A shared, mutable composite object with named members.
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<BTreeMap<String, Model>>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an object from `(member, value)` pairs.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Model)>,
        K: Into<String>,
    {
        let map = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self(Arc::new(RwLock::new(map)))
    }

    /// Read a member. Missing members read as `None`.
    pub fn get(&self, member: &str) -> Option<Model> {
        self.0.read().get(member).cloned()
    }

    pub fn set(&self, member: impl Into<String>, value: Model) {
        self.0.write().insert(member.into(), value);
    }

    pub fn contains(&self, member: &str) -> bool {
        self.0.read().contains_key(member)
    }

    pub fn member_names(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    pub fn identity(&self) -> ModelIdentity {
        ModelIdentity(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// Members are not printed: the graph may be cyclic.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("identity", &format_args!("{:#x}", self.identity().0))
            .field("members", &self.member_names())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Model
// ═══════════════════════════════════════════════════════════════════════════════

/// A bound value.
#[derive(Debug, Clone, Default)]
pub enum Model {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Ordered collection.
    List(Vec<Model>),
    /// Keyed collection.
    Dictionary(BTreeMap<String, Model>),
    /// Composite object with named members.
    Object(ObjectRef),
}

impl Model {
    pub fn is_null(&self) -> bool {
        matches!(self, Model::Null)
    }

    /// Object identity, for objects only.
    pub fn identity(&self) -> Option<ModelIdentity> {
        match self {
            Model::Object(obj) => Some(obj.identity()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Model::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Model::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Model::Integer(i) => Some(*i as f64),
            Model::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Model::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Model]> {
        match self {
            Model::List(items) => Some(items),
            _ => None,
        }
    }

    /// Number of items for collections.
    pub fn item_count(&self) -> Option<usize> {
        match self {
            Model::List(items) => Some(items.len()),
            Model::Dictionary(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Scalar rendered as text, as it would appear in a message.
    pub fn display_value(&self) -> Option<String> {
        match self {
            Model::Bool(b) => Some(b.to_string()),
            Model::Integer(i) => Some(i.to_string()),
            Model::Float(f) => Some(f.to_string()),
            Model::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Convert into JSON. Objects seen earlier on the current path render as
    /// `null`, so cyclic graphs terminate.
    pub fn to_json(&self) -> Value {
        let mut path = HashSet::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut HashSet<ModelIdentity>) -> Value {
        match self {
            Model::Null => Value::Null,
            Model::Bool(b) => Value::Bool(*b),
            Model::Integer(i) => Value::from(*i),
            Model::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Model::Text(s) => Value::String(s.clone()),
            Model::List(items) => {
                Value::Array(items.iter().map(|m| m.to_json_inner(path)).collect())
            }
            Model::Dictionary(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_inner(path)))
                    .collect(),
            ),
            Model::Object(obj) => {
                let id = obj.identity();
                if !path.insert(id) {
                    return Value::Null;
                }
                let members = obj.0.read().clone();
                let value = Value::Object(
                    members
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_json_inner(path)))
                        .collect(),
                );
                path.remove(&id);
                value
            }
        }
    }
}

// Objects compare by identity, everything else structurally.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Model::Null, Model::Null) => true,
            (Model::Bool(a), Model::Bool(b)) => a == b,
            (Model::Integer(a), Model::Integer(b)) => a == b,
            (Model::Float(a), Model::Float(b)) => a == b,
            (Model::Text(a), Model::Text(b)) => a == b,
            (Model::List(a), Model::List(b)) => a == b,
            (Model::Dictionary(a), Model::Dictionary(b)) => a == b,
            (Model::Object(a), Model::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Model {
    fn from(v: bool) -> Self {
        Model::Bool(v)
    }
}

impl From<i64> for Model {
    fn from(v: i64) -> Self {
        Model::Integer(v)
    }
}

impl From<f64> for Model {
    fn from(v: f64) -> Self {
        Model::Float(v)
    }
}

impl From<&str> for Model {
    fn from(v: &str) -> Self {
        Model::Text(v.to_string())
    }
}

impl From<String> for Model {
    fn from(v: String) -> Self {
        Model::Text(v)
    }
}

impl From<Vec<Model>> for Model {
    fn from(v: Vec<Model>) -> Self {
        Model::List(v)
    }
}

impl From<ObjectRef> for Model {
    fn from(v: ObjectRef) -> Self {
        Model::Object(v)
    }
}

impl<T: Into<Model>> From<Option<T>> for Model {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Model::Null)
    }
}

/// JSON objects become [`Model::Object`]s (fresh identities).
impl From<Value> for Model {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Model::Null,
            Value::Bool(b) => Model::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Model::Integer(i),
                None => Model::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Model::Text(s),
            Value::Array(items) => Model::List(items.into_iter().map(Model::from).collect()),
            Value::Object(map) => Model::Object(ObjectRef::from_fields(
                map.into_iter().map(|(k, v)| (k, Model::from(v))),
            )),
        }
    }
}
