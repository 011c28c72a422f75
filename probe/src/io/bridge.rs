//! Fact graph engine reached through a child process.
//!
//! Every call spawns the configured command once, writes one JSON request to
//! its stdin and reads one JSON reply from its stdout:
//!
//! ```text
//! -> {"op":"get","dictionary":"<xml>","state":<token>,"path":"/age"}
//! <- {"ok":<value>,"state":<token>}   or   {"error":<value>}
//! ```
//!
//! The bridge keeps nothing between calls. The `state` token returned by a
//! write is sent back on every later call so the bridge can rebuild the graph.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::core::value::FactValue;
use crate::engine::{EngineFault, FactEngine, FactGraph};
use crate::io::config::EngineConfig;
use crate::io::process::{CommandOutput, run_command_with_timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeOp {
    Import,
    Paths,
    Get,
    Set,
    Serialize,
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    op: BridgeOp,
    dictionary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
}

/// Successful bridge reply.
#[derive(Debug)]
struct BridgeReply {
    ok: Value,
    state: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    config: Arc<EngineConfig>,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// A dictionary the bridge accepted.
#[derive(Debug, Clone)]
pub struct BridgeDictionary {
    source: Arc<str>,
}

#[derive(Debug)]
pub struct ProcessGraph {
    config: Arc<EngineConfig>,
    dictionary: Arc<str>,
    state: Option<Value>,
}

impl FactEngine for ProcessEngine {
    type Dictionary = BridgeDictionary;
    type Graph = ProcessGraph;

    fn import_dictionary(&self, source: &str) -> Result<BridgeDictionary, EngineFault> {
        call_bridge(
            &self.config,
            &BridgeRequest {
                op: BridgeOp::Import,
                dictionary: source,
                state: None,
                path: None,
                value: None,
            },
        )?;
        Ok(BridgeDictionary {
            source: Arc::from(source),
        })
    }

    fn build_graph(&self, dictionary: BridgeDictionary) -> ProcessGraph {
        ProcessGraph {
            config: self.config.clone(),
            dictionary: dictionary.source,
            state: None,
        }
    }
}

impl ProcessGraph {
    fn call(
        &self,
        op: BridgeOp,
        path: Option<&str>,
        value: Option<&str>,
    ) -> Result<BridgeReply, EngineFault> {
        call_bridge(
            &self.config,
            &BridgeRequest {
                op,
                dictionary: &self.dictionary,
                state: self.state.as_ref(),
                path,
                value,
            },
        )
    }
}

impl FactGraph for ProcessGraph {
    fn list_paths(&self) -> Result<Vec<String>, EngineFault> {
        let reply = self.call(BridgeOp::Paths, None, None)?;
        let Value::Array(items) = reply.ok else {
            return Err(EngineFault::message(
                "engine bridge returned a non-array path list",
            ));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::String(path) => Ok(path),
                other => Err(EngineFault::message(format!(
                    "engine bridge returned a non-string path: {other}"
                ))),
            })
            .collect()
    }

    fn get(&self, path: &str) -> Result<FactValue, EngineFault> {
        let reply = self.call(BridgeOp::Get, Some(path), None)?;
        Ok(FactValue::from_json(&reply.ok))
    }

    fn set(&mut self, path: &str, raw_value: &str) -> Result<Option<FactValue>, EngineFault> {
        let reply = self.call(BridgeOp::Set, Some(path), Some(raw_value))?;
        if let Some(state) = reply.state {
            self.state = Some(state);
        }
        match reply.ok {
            Value::Null => Ok(None),
            outcome => Ok(Some(FactValue::from_json(&outcome))),
        }
    }

    fn serialize(&self) -> Result<String, EngineFault> {
        let reply = self.call(BridgeOp::Serialize, None, None)?;
        match reply.ok {
            Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }
}

#[instrument(skip_all, fields(op = ?request.op))]
fn call_bridge(
    config: &EngineConfig,
    request: &BridgeRequest<'_>,
) -> Result<BridgeReply, EngineFault> {
    let Some((program, args)) = config.command.split_first() else {
        return Err(EngineFault::message("engine.command is empty"));
    };
    let input = serde_json::to_vec(request)
        .map_err(|err| EngineFault::message(format!("encode bridge request: {err}")))?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    let output = run_command_with_timeout(
        cmd,
        Some(&input),
        Duration::from_secs(config.timeout_secs),
        config.output_limit_bytes,
    )
    .map_err(|err| EngineFault::message(format!("engine bridge failed: {err:#}")))?;

    read_reply(&output, config.timeout_secs)
}

fn read_reply(output: &CommandOutput, timeout_secs: u64) -> Result<BridgeReply, EngineFault> {
    if output.timed_out {
        return Err(EngineFault::message(format!(
            "engine bridge timed out after {timeout_secs}s"
        )));
    }

    let parsed = serde_json::from_slice::<Value>(&output.stdout);
    // An error reply wins over the exit status; bridges may exit non-zero with it.
    if let Ok(Value::Object(mut reply)) = parsed {
        if let Some(error) = reply.remove("error") {
            debug!("bridge reported an error");
            return Err(fault_from_json(error));
        }
        if output.status.success() {
            return Ok(success_reply(reply));
        }
    }

    if !output.status.success() {
        let stderr = output.stderr_text();
        warn!(exit_code = ?output.status.code(), "engine bridge exited unsuccessfully");
        return Err(EngineFault::message(if stderr.is_empty() {
            format!("engine bridge exited with {}", output.status)
        } else {
            stderr
        }));
    }

    if output.stdout_truncated > 0 {
        return Err(EngineFault::message(format!(
            "engine bridge reply exceeded {} bytes",
            output.stdout.len()
        )));
    }
    Err(EngineFault::message(
        "engine bridge returned unreadable output",
    ))
}

fn success_reply(mut reply: Map<String, Value>) -> BridgeReply {
    BridgeReply {
        ok: reply.remove("ok").unwrap_or(Value::Null),
        state: reply.remove("state"),
    }
}

fn fault_from_json(error: Value) -> EngineFault {
    match error {
        Value::Null => EngineFault::Unknown,
        Value::String(text) => EngineFault::Message(text),
        other => EngineFault::Structured(FactValue::from_json(&other)),
    }
}
