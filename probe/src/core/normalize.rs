//! Turn arbitrary engine values into display text.
//!
//! Values are classified in a fixed priority order and each class is handled
//! by a function that always produces text:
//!
//! 1. null renders as `null`;
//! 2. primitives render directly;
//! 3. wrappers exposing `item` (then `value`) are unwrapped and classified again;
//! 4. objects with a custom textual conversion use it verbatim;
//! 5. anything else is serialized structurally, with `[Circular]` at cycles;
//! 6. failing that, own fields are listed as `name: text` lines;
//! 7. failing that, a fixed fallback message is returned.

use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, warn};

use crate::core::messages::Locale;
use crate::core::value::{CyclePolicy, FactObject, FactValue, ShapeError, to_json};

/// Accessors that mark a single-field wrapper, in priority order.
pub const WRAPPER_FIELDS: [&str; 2] = ["item", "value"];

/// Default nesting limit for structural serialization.
pub const DEFAULT_MAX_DEPTH: usize = 64;
/// Default indent width for structural serialization.
pub const DEFAULT_INDENT: usize = 2;

/// Classification of a value for rendering purposes.
enum Shape {
    Null,
    Primitive(String),
    Wrapper(Rc<FactObject>, FactValue),
    Structured,
}

fn classify(value: &FactValue) -> Shape {
    match value {
        FactValue::Null => Shape::Null,
        FactValue::Bool(_) | FactValue::Number(_) | FactValue::String(_) => {
            Shape::Primitive(value.to_text())
        }
        FactValue::Object(object) => WRAPPER_FIELDS
            .iter()
            .find_map(|name| object.field(name))
            .map_or(Shape::Structured, |inner| {
                Shape::Wrapper(object.clone(), inner)
            }),
        FactValue::List(_) | FactValue::Opaque(_) => Shape::Structured,
    }
}

/// Renders engine values; never fails.
#[derive(Debug, Clone)]
pub struct Normalizer {
    locale: Locale,
    max_depth: usize,
    indent: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            indent: DEFAULT_INDENT,
        }
    }
}

impl Normalizer {
    pub fn new(locale: Locale, max_depth: usize, indent: usize) -> Self {
        Self {
            locale,
            max_depth,
            indent,
        }
    }

    pub fn normalize(&self, value: &FactValue) -> String {
        let mut current = value.clone();
        let mut unwrapped = HashSet::new();

        loop {
            match classify(&current) {
                Shape::Null => return "null".to_string(),
                Shape::Primitive(text) => return text,
                Shape::Wrapper(object, inner) => {
                    if !unwrapped.insert(Rc::as_ptr(&object) as usize) {
                        debug!("wrapper chain loops back on itself, rendering as structure");
                        break;
                    }
                    current = inner;
                }
                Shape::Structured => break,
            }
        }

        self.render_structured(&current)
    }

    fn render_structured(&self, value: &FactValue) -> String {
        if let Some(text) = custom_text(value) {
            return text;
        }

        match self.serialize(value) {
            Ok(text) if !is_trivial(&text) => return text,
            Ok(_) => debug!("structural serialization is empty"),
            Err(err) => warn!(error = %err, "structural serialization failed"),
        }

        match field_lines(value) {
            Ok(Some(text)) => return text,
            Ok(None) => debug!("value exposes no fields"),
            Err(err) => warn!(error = %err, "field inspection failed"),
        }

        self.locale.unrenderable().to_string()
    }

    /// Indented JSON rendering with `[Circular]` at reference cycles.
    pub fn serialize(&self, value: &FactValue) -> Result<String, ShapeError> {
        let json = to_json(value, CyclePolicy::Mark, self.max_depth)?;
        Ok(self.pretty(&json))
    }

    /// Pretty-print a JSON document with the configured indent.
    pub fn pretty(&self, json: &Value) -> String {
        let indent = " ".repeat(self.indent);
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
        if json.serialize(&mut serializer).is_err() {
            return json.to_string();
        }
        String::from_utf8(buf).unwrap_or_else(|_| json.to_string())
    }
}

/// Normalize with default settings.
pub fn normalize(value: &FactValue) -> String {
    Normalizer::default().normalize(value)
}

/// An object's own text when it is not a default identity rendering.
fn custom_text(value: &FactValue) -> Option<String> {
    let FactValue::Object(object) = value else {
        return None;
    };
    let text = object.display()?;
    if text.starts_with("[object") || text.contains('@') {
        return None;
    }
    Some(text.to_string())
}

fn is_trivial(serialized: &str) -> bool {
    serialized.is_empty() || serialized == "{}" || serialized == "[]"
}

/// `name: text` per own field, or `None` when there are no fields.
fn field_lines(value: &FactValue) -> Result<Option<String>, ShapeError> {
    let entries: Vec<(String, FactValue)> = match value {
        FactValue::Object(object) => object.try_fields()?,
        FactValue::List(list) => list
            .try_items()?
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => Vec::new(),
    };
    if entries.is_empty() {
        return Ok(None);
    }
    let lines: Vec<String> = entries
        .iter()
        .map(|(name, field)| format!("{name}: {}", field.to_text()))
        .collect();
    Ok(Some(lines.join("\n")))
}
