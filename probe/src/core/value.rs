//! Runtime model of values returned by the fact graph engine.
//!
//! The engine hands back values whose shape is not known statically. A value
//! may be a primitive, a wrapper around another value, an arbitrary object that
//! can reference itself, or an opaque handle whose structure cannot be read.
//! Objects and lists are reference-counted with interior mutability so that
//! self-referential graphs can be built; identity is the allocation address.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Metadata key naming the engine-side type of an object.
pub const TYPE_KEY: &str = "$type";
/// Metadata key carrying an object's custom textual conversion.
pub const DISPLAY_KEY: &str = "$display";

/// Marker substituted for a reference back into an object that is still open.
pub const CIRCULAR_MARKER: &str = "[Circular]";

/// A value returned by an engine read or write.
#[derive(Clone, Debug)]
pub enum FactValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Rc<FactList>),
    Object(Rc<FactObject>),
    Opaque(Rc<OpaqueHandle>),
}

impl FactValue {
    pub fn string(value: impl Into<String>) -> Self {
        FactValue::String(value.into())
    }

    pub fn object(object: FactObject) -> Self {
        FactValue::Object(Rc::new(object))
    }

    pub fn list(items: Vec<FactValue>) -> Self {
        FactValue::List(Rc::new(FactList::new(items)))
    }

    pub fn opaque(type_name: impl Into<String>) -> Self {
        FactValue::Opaque(Rc::new(OpaqueHandle {
            type_name: type_name.into(),
        }))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FactValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FactValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<FactObject>> {
        match self {
            FactValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Read a named field when this value is an object.
    pub fn field(&self, name: &str) -> Option<FactValue> {
        self.as_object().and_then(|object| object.field(name))
    }

    /// Shallow textual conversion, the equivalent of asking the value to print
    /// itself without looking inside nested structure.
    pub fn to_text(&self) -> String {
        match self {
            FactValue::Null => "null".to_string(),
            FactValue::Bool(value) => value.to_string(),
            FactValue::Number(value) => value.to_string(),
            FactValue::String(value) => value.clone(),
            FactValue::List(list) => format!("[list of {}]", list.len()),
            FactValue::Object(object) => object.to_text(),
            FactValue::Opaque(handle) => handle.to_text(),
        }
    }

    /// Convert a JSON document into a value.
    ///
    /// Object keys [`TYPE_KEY`] and [`DISPLAY_KEY`] become metadata rather than
    /// fields. JSON cannot express cycles, so the result is always a tree.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FactValue::Null,
            Value::Bool(value) => FactValue::Bool(*value),
            Value::Number(value) => FactValue::Number(value.clone()),
            Value::String(value) => FactValue::String(value.clone()),
            Value::Array(items) => FactValue::list(items.iter().map(FactValue::from_json).collect()),
            Value::Object(map) => {
                let mut object = FactObject::new();
                for (key, value) in map {
                    match (key.as_str(), value) {
                        (TYPE_KEY, Value::String(name)) => object = object.with_type(name.clone()),
                        (DISPLAY_KEY, Value::String(text)) => {
                            object = object.with_display(text.clone());
                        }
                        _ => object.insert(key.clone(), FactValue::from_json(value)),
                    }
                }
                FactValue::object(object)
            }
        }
    }

    fn identity(&self) -> Option<usize> {
        match self {
            FactValue::List(list) => Some(Rc::as_ptr(list) as usize),
            FactValue::Object(object) => Some(Rc::as_ptr(object) as usize),
            _ => None,
        }
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Bool(value)
    }
}

impl From<i32> for FactValue {
    fn from(value: i32) -> Self {
        FactValue::Number(value.into())
    }
}

impl From<i64> for FactValue {
    fn from(value: i64) -> Self {
        FactValue::Number(value.into())
    }
}

impl From<f64> for FactValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(FactValue::Null, FactValue::Number)
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        FactValue::String(value.to_string())
    }
}

impl From<String> for FactValue {
    fn from(value: String) -> Self {
        FactValue::String(value)
    }
}

/// Structured value with ordered, named fields.
#[derive(Debug, Default)]
pub struct FactObject {
    type_name: Option<String>,
    display: Option<String>,
    fields: RefCell<Vec<(String, FactValue)>>,
}

impl FactObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine-side type name, used by the default identity rendering.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Custom textual conversion for this object.
    pub fn with_display(mut self, text: impl Into<String>) -> Self {
        self.display = Some(text.into());
        self
    }

    pub fn with_field(self, name: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field. Takes `&self` so cycles can be closed after
    /// the object is shared.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<FactValue>) {
        let name = name.into();
        let value = value.into();
        let mut fields = self.fields.borrow_mut();
        match fields.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => fields.push((name, value)),
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.borrow().iter().any(|(key, _)| key == name)
    }

    pub fn field(&self, name: &str) -> Option<FactValue> {
        self.fields
            .borrow()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    /// Snapshot of the fields in insertion order.
    pub fn try_fields(&self) -> Result<Vec<(String, FactValue)>, ShapeError> {
        self.fields
            .try_borrow()
            .map(|fields| fields.clone())
            .map_err(|_| ShapeError::Busy)
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Custom text when present, otherwise the default identity rendering:
    /// `[object Object]` for untyped objects, `Type@address` for typed ones.
    pub fn to_text(&self) -> String {
        if let Some(text) = &self.display {
            return text.clone();
        }
        match &self.type_name {
            Some(name) => format!("{name}@{:x}", self as *const Self as usize),
            None => "[object Object]".to_string(),
        }
    }
}

impl From<FactObject> for FactValue {
    fn from(object: FactObject) -> Self {
        FactValue::object(object)
    }
}

/// Ordered sequence of values.
#[derive(Debug, Default)]
pub struct FactList {
    items: RefCell<Vec<FactValue>>,
}

impl FactList {
    pub fn new(items: Vec<FactValue>) -> Self {
        Self {
            items: RefCell::new(items),
        }
    }

    pub fn push(&self, value: impl Into<FactValue>) {
        self.items.borrow_mut().push(value.into());
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn try_items(&self) -> Result<Vec<FactValue>, ShapeError> {
        self.items
            .try_borrow()
            .map(|items| items.clone())
            .map_err(|_| ShapeError::Busy)
    }
}

/// Handle to an engine object whose structure cannot be inspected.
#[derive(Debug)]
pub struct OpaqueHandle {
    type_name: String,
}

impl OpaqueHandle {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn to_text(&self) -> String {
        format!("{}@{:x}", self.type_name, self as *const Self as usize)
    }
}

/// Reasons a structural walk over a value can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("value nests deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },
    #[error("value refers back to itself")]
    Cycle,
    #[error("opaque {type_name} value has no readable structure")]
    Opaque { type_name: String },
    #[error("value is being modified and cannot be read")]
    Busy,
}

/// What to do when a walk reaches an object that is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Substitute [`CIRCULAR_MARKER`] and keep going.
    Mark,
    /// Abort the walk with [`ShapeError::Cycle`].
    Fail,
}

/// Depth-first conversion of a value into JSON.
///
/// Identities of the objects currently being walked are tracked in a set; a
/// reference back into one of them is handled according to `policy`. Shared
/// but acyclic references are copied in full.
pub fn to_json(value: &FactValue, policy: CyclePolicy, max_depth: usize) -> Result<Value, ShapeError> {
    let mut open = HashSet::new();
    to_json_inner(value, policy, max_depth, 0, &mut open)
}

fn to_json_inner(
    value: &FactValue,
    policy: CyclePolicy,
    max_depth: usize,
    depth: usize,
    open: &mut HashSet<usize>,
) -> Result<Value, ShapeError> {
    match value {
        FactValue::Null => return Ok(Value::Null),
        FactValue::Bool(value) => return Ok(Value::Bool(*value)),
        FactValue::Number(value) => return Ok(Value::Number(value.clone())),
        FactValue::String(value) => return Ok(Value::String(value.clone())),
        FactValue::Opaque(handle) => {
            return Err(ShapeError::Opaque {
                type_name: handle.type_name.clone(),
            });
        }
        FactValue::List(_) | FactValue::Object(_) => {}
    }

    let Some(identity) = value.identity() else {
        return Ok(Value::Null);
    };
    if open.contains(&identity) {
        return match policy {
            CyclePolicy::Mark => Ok(Value::String(CIRCULAR_MARKER.to_string())),
            CyclePolicy::Fail => Err(ShapeError::Cycle),
        };
    }
    if depth >= max_depth {
        return Err(ShapeError::TooDeep { max_depth });
    }

    open.insert(identity);
    let result = match value {
        FactValue::List(list) => list
            .try_items()?
            .iter()
            .map(|item| to_json_inner(item, policy, max_depth, depth + 1, open))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        FactValue::Object(object) => {
            let mut map = Map::new();
            for (key, field) in object.try_fields()? {
                let converted = to_json_inner(&field, policy, max_depth, depth + 1, open)?;
                map.insert(key, converted);
            }
            Ok(Value::Object(map))
        }
        _ => Ok(Value::Null),
    };
    open.remove(&identity);
    result
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_moves_metadata_out_of_fields() {
        let value = FactValue::from_json(&json!({
            "$type": "BooleanWrapper",
            "item": true
        }));
        let object = value.as_object().expect("object");
        assert_eq!(object.type_name(), Some("BooleanWrapper"));
        assert!(!object.has_field(TYPE_KEY));
        assert_eq!(value.field("item").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn untyped_object_prints_generic_marker() {
        assert_eq!(FactObject::new().to_text(), "[object Object]");
    }

    #[test]
    fn typed_object_prints_address_marker() {
        let text = FactObject::new().with_type("gov.Fact").to_text();
        assert!(text.starts_with("gov.Fact@"));
    }

    #[test]
    fn insert_replaces_existing_field() {
        let object = FactObject::new().with_field("a", 1);
        object.insert("a", 2);
        let fields = object.try_fields().expect("fields");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].1.to_text(), "2");
    }

    #[test]
    fn to_json_marks_cycle_under_mark_policy() {
        let node = Rc::new(FactObject::new().with_field("name", "root"));
        node.insert("me", FactValue::Object(node.clone()));

        let json = to_json(&FactValue::Object(node), CyclePolicy::Mark, 16).expect("json");
        assert_eq!(json, json!({ "name": "root", "me": "[Circular]" }));
    }

    #[test]
    fn to_json_fails_cycle_under_fail_policy() {
        let list = Rc::new(FactList::default());
        list.push(FactValue::List(list.clone()));

        let err = to_json(&FactValue::List(list), CyclePolicy::Fail, 16).expect_err("cycle");
        assert_eq!(err, ShapeError::Cycle);
    }

    #[test]
    fn to_json_copies_shared_acyclic_reference_twice() {
        let shared = FactValue::object(FactObject::new().with_field("n", 1));
        let parent = FactObject::new()
            .with_field("left", shared.clone())
            .with_field("right", shared);

        let json = to_json(&parent.into(), CyclePolicy::Fail, 16).expect("json");
        assert_eq!(json, json!({ "left": { "n": 1 }, "right": { "n": 1 } }));
    }

    #[test]
    fn to_json_enforces_depth_bound() {
        let inner = FactObject::new().with_field("x", 1);
        let outer = FactObject::new().with_field("inner", inner);

        let err = to_json(&outer.into(), CyclePolicy::Mark, 1).expect_err("too deep");
        assert_eq!(err, ShapeError::TooDeep { max_depth: 1 });
    }

    #[test]
    fn to_json_rejects_opaque_values() {
        let object = FactObject::new().with_field("handle", FactValue::opaque("Graph"));
        let err = to_json(&object.into(), CyclePolicy::Mark, 16).expect_err("opaque");
        assert!(matches!(err, ShapeError::Opaque { .. }));
    }
}
