//! Contract with the fact graph engine.
//!
//! The engine is a black box: it turns a serialized dictionary into a graph and
//! answers reads and writes against it. Nothing here depends on how it does so.

use crate::core::messages::Locale;
use crate::core::normalize::Normalizer;
use crate::core::value::FactValue;

/// Builds graphs from serialized fact dictionaries.
pub trait FactEngine {
    type Dictionary;
    type Graph: FactGraph;

    /// Parse a dictionary; fails when the source is not a valid dictionary.
    fn import_dictionary(&self, source: &str) -> Result<Self::Dictionary, EngineFault>;

    /// Build a fresh graph with no facts written.
    fn build_graph(&self, dictionary: Self::Dictionary) -> Self::Graph;
}

/// A built fact graph.
pub trait FactGraph {
    /// Every path the dictionary defines, in engine order. Collection members
    /// appear with a `*` segment.
    fn list_paths(&self) -> Result<Vec<String>, EngineFault>;

    fn get(&self, path: &str) -> Result<FactValue, EngineFault>;

    /// Write a raw value. `None` means the engine returned no outcome object.
    fn set(&mut self, path: &str, raw_value: &str) -> Result<Option<FactValue>, EngineFault>;

    /// Full graph dump.
    fn serialize(&self) -> Result<String, EngineFault>;
}

/// A failed engine call, as thrown by the engine.
#[derive(Debug, Clone)]
pub enum EngineFault {
    /// A plain message.
    Message(String),
    /// A structured error value.
    Structured(FactValue),
    /// Failure with nothing attached.
    Unknown,
}

impl EngineFault {
    pub fn message(text: impl Into<String>) -> Self {
        EngineFault::Message(text.into())
    }

    /// Best available text for this failure: its message, then a `message`
    /// field, then its rendered form, then a generic sentence.
    pub fn describe(&self, locale: Locale, normalizer: &Normalizer) -> String {
        match self {
            EngineFault::Unknown => locale.unknown_error().to_string(),
            EngineFault::Message(text) if !text.trim().is_empty() => text.clone(),
            EngineFault::Message(_) => locale.undetailed_error().to_string(),
            EngineFault::Structured(value) => describe_value(value, locale, normalizer),
        }
    }
}

fn describe_value(value: &FactValue, locale: Locale, normalizer: &Normalizer) -> String {
    if value.is_null() {
        return locale.unknown_error().to_string();
    }
    if let Some(text) = value.as_str() {
        return text.to_string();
    }
    if let Some(text) = value
        .field("message")
        .and_then(|message| message.as_str().map(str::to_string))
        .filter(|text| !text.trim().is_empty())
    {
        return text;
    }
    let rendered = normalizer.normalize(value);
    if rendered == locale.unrenderable() {
        return locale.undetailed_error().to_string();
    }
    rendered
}
