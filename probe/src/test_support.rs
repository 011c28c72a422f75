//! Test-only engine double.
//!
//! A [`ScriptedEngine`] treats a dictionary as one fact path per line. Reads,
//! read failures and write outcomes are scripted up front; writes are
//! remembered so later reads see them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::core::value::FactValue;
use crate::engine::{EngineFault, FactEngine, FactGraph};

/// Canned behaviour for graphs built by a [`ScriptedEngine`].
#[derive(Debug, Clone, Default)]
pub struct GraphScript {
    values: Vec<(String, FactValue)>,
    get_faults: Vec<(String, EngineFault)>,
    set_results: VecDeque<Result<Option<FactValue>, EngineFault>>,
    serialized: Option<String>,
    serialize_fault: Option<EngineFault>,
}

impl GraphScript {
    pub fn with_value(mut self, path: &str, value: FactValue) -> Self {
        self.values.push((path.to_string(), value));
        self
    }

    pub fn with_get_fault(mut self, path: &str, fault: EngineFault) -> Self {
        self.get_faults.push((path.to_string(), fault));
        self
    }

    /// Queue the result of the next unscripted write. Writes past the queue
    /// report `{valid: true, limitViolations: []}`.
    pub fn with_set_result(mut self, result: Result<Option<FactValue>, EngineFault>) -> Self {
        self.set_results.push_back(result);
        self
    }

    pub fn with_serialized(mut self, text: &str) -> Self {
        self.serialized = Some(text.to_string());
        self
    }

    pub fn with_serialize_fault(mut self, fault: EngineFault) -> Self {
        self.serialize_fault = Some(fault);
        self
    }
}

#[derive(Debug, Default)]
pub struct ScriptedEngine {
    script: GraphScript,
    calls: Rc<RefCell<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new(script: GraphScript) -> Self {
        Self {
            script,
            calls: Rc::default(),
        }
    }

    /// `get`/`set` calls made on any graph this engine built, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl FactEngine for ScriptedEngine {
    type Dictionary = Vec<String>;
    type Graph = ScriptedGraph;

    fn import_dictionary(&self, source: &str) -> Result<Vec<String>, EngineFault> {
        let mut paths = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !line.starts_with('/') {
                return Err(EngineFault::message(format!(
                    "line {}: expected a fact path, found '{line}'",
                    index + 1
                )));
            }
            paths.push(line.to_string());
        }
        Ok(paths)
    }

    fn build_graph(&self, dictionary: Vec<String>) -> ScriptedGraph {
        ScriptedGraph {
            paths: dictionary,
            script: self.script.clone(),
            writes: Vec::new(),
            calls: self.calls.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ScriptedGraph {
    paths: Vec<String>,
    script: GraphScript,
    writes: Vec<(String, String)>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl FactGraph for ScriptedGraph {
    fn list_paths(&self) -> Result<Vec<String>, EngineFault> {
        Ok(self.paths.clone())
    }

    fn get(&self, path: &str) -> Result<FactValue, EngineFault> {
        self.calls.borrow_mut().push(format!("get {path}"));
        if let Some((_, fault)) = self.script.get_faults.iter().find(|(p, _)| p == path) {
            return Err(fault.clone());
        }
        if let Some((_, value)) = self.writes.iter().rev().find(|(p, _)| p == path) {
            return Ok(FactValue::string(value.clone()));
        }
        if let Some((_, value)) = self.script.values.iter().find(|(p, _)| p == path) {
            return Ok(value.clone());
        }
        Err(EngineFault::message(format!("path not found: {path}")))
    }

    fn set(&mut self, path: &str, raw_value: &str) -> Result<Option<FactValue>, EngineFault> {
        self.calls.borrow_mut().push(format!("set {path}={raw_value}"));
        let result = self.script.set_results.pop_front().unwrap_or_else(|| {
            Ok(Some(FactValue::from_json(&serde_json::json!({
                "valid": true,
                "limitViolations": []
            }))))
        });
        if result.is_ok() {
            self.writes.push((path.to_string(), raw_value.to_string()));
        }
        result
    }

    fn serialize(&self) -> Result<String, EngineFault> {
        if let Some(fault) = &self.script.serialize_fault {
            return Err(fault.clone());
        }
        if let Some(text) = &self.script.serialized {
            return Ok(text.clone());
        }
        let mut map = Map::new();
        for (path, value) in &self.writes {
            map.insert(path.clone(), Value::String(value.clone()));
        }
        Ok(Value::Object(map).to_string())
    }
}
