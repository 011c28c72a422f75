//! The one loaded fact graph and the entry points the presentation layer calls.
//!
//! A [`Session`] owns the engine and at most one graph. Loading a dictionary
//! replaces the graph wholesale; a failed load keeps the previous one. Every
//! call runs to completion before the next, so no locking happens here.
//!
//! Two API layers are offered:
//!
//! - typed operations ([`Session::get`], [`Session::set`], ...) returning
//!   `Result<_, AdapterError>`;
//! - presentation entry points (`on_*`) that never fail and return a [`Reply`]
//!   whose notice text has been sanitized for display.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::core::messages::{Action, Locale};
use crate::core::normalize::Normalizer;
use crate::core::outcome::{OutcomeInterpreter, Verdict};
use crate::core::path::{paths_under, validate_path};
use crate::core::sanitize::sanitize_message;
use crate::engine::{EngineFault, FactEngine, FactGraph};
use crate::error::{AdapterError, ErrorKind};
use crate::io::config::ProbeConfig;

/// Result of a successful dictionary load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Incremented on every successful load.
    pub generation: u64,
    pub paths: Vec<String>,
}

/// Concrete paths defined under a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionListing {
    pub base: String,
    pub paths: Vec<String>,
}

impl CollectionListing {
    pub fn render(&self, locale: Locale) -> String {
        if self.paths.is_empty() {
            return locale.collection_not_found().to_string();
        }
        let mut lines = vec![locale.collection_header(&self.base)];
        lines.extend(self.paths.iter().map(|path| format!("• {path}")));
        lines.push(String::new());
        lines.push(locale.collection_hint());
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Validation,
    Engine,
    Violation,
    /// A write succeeded but reported rule violations.
    Advisory,
}

impl From<ErrorKind> for NoticeKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => NoticeKind::Validation,
            ErrorKind::Engine => NoticeKind::Engine,
            ErrorKind::Violation => NoticeKind::Violation,
        }
    }
}

/// Message for the error area. `text` is always sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: &str) -> Self {
        Self {
            kind,
            text: sanitize_message(text),
        }
    }
}

/// What the presentation layer shows after an entry point returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// Text for the result area.
    pub output: Option<String>,
    /// Message for the error area; `None` clears it.
    pub notice: Option<Notice>,
    /// A write reached the engine, whatever happened afterwards.
    pub wrote: bool,
}

impl Reply {
    pub fn output(text: String) -> Self {
        Self {
            output: Some(text),
            ..Self::default()
        }
    }

    pub fn notice(notice: Notice) -> Self {
        Self {
            notice: Some(notice),
            ..Self::default()
        }
    }
}

pub struct Session<E: FactEngine> {
    engine: E,
    graph: Option<E::Graph>,
    generation: u64,
    locale: Locale,
    normalizer: Normalizer,
    interpreter: OutcomeInterpreter,
}

impl<E: FactEngine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self::from_config(engine, &ProbeConfig::default())
    }

    pub fn from_config(engine: E, config: &ProbeConfig) -> Self {
        let normalizer = Normalizer::new(
            config.locale,
            config.render.max_depth,
            config.render.indent,
        );
        let interpreter =
            OutcomeInterpreter::new(config.locale, normalizer.clone(), config.render.max_depth);
        Self {
            engine,
            graph: None,
            generation: 0,
            locale: config.locale,
            normalizer,
            interpreter,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn is_loaded(&self) -> bool {
        self.graph.is_some()
    }

    /// Number of successful loads so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Parse `source`, build a graph from it, and replace the current graph.
    #[instrument(skip_all, fields(source_bytes = source.len()))]
    pub fn load_dictionary(&mut self, source: &str) -> Result<LoadSummary, AdapterError> {
        let dictionary =
            self.engine
                .import_dictionary(source)
                .map_err(|fault| AdapterError::Dictionary {
                    detail: self.describe(&fault),
                })?;
        let graph = self.engine.build_graph(dictionary);
        let paths = graph.list_paths().map_err(|fault| self.engine_error(&fault))?;

        self.graph = Some(graph);
        self.generation += 1;
        info!(
            generation = self.generation,
            paths = paths.len(),
            "fact graph replaced"
        );
        Ok(LoadSummary {
            generation: self.generation,
            paths,
        })
    }

    pub fn paths(&self) -> Result<Vec<String>, AdapterError> {
        let graph = self.graph(Action::ListPaths)?;
        graph.list_paths().map_err(|fault| self.engine_error(&fault))
    }

    /// Read one fact and render it as text.
    #[instrument(skip(self))]
    pub fn get(&self, path: &str) -> Result<String, AdapterError> {
        let graph = self.graph(Action::Query)?;
        validate_path(path)?;
        let value = graph.get(path).map_err(|fault| self.engine_error(&fault))?;
        Ok(self.normalizer.normalize(&value))
    }

    /// Write one fact. A write the engine marks invalid is returned as
    /// [`AdapterError::Violation`]; a valid write may still carry an advisory
    /// message in its verdict.
    #[instrument(skip(self, raw_value))]
    pub fn set(&mut self, path: &str, raw_value: &str) -> Result<Verdict, AdapterError> {
        let graph = self
            .graph
            .as_mut()
            .ok_or(AdapterError::NoGraph {
                action: Action::Save,
            })?;
        validate_path(path)?;
        let result = graph.set(path, raw_value);
        let outcome = result.map_err(|fault| self.engine_error(&fault))?;

        let verdict = self.interpreter.interpret(outcome.as_ref());
        debug!(valid = verdict.valid, validity = ?verdict.validity, "write interpreted");
        if verdict.is_blocking() {
            return Err(AdapterError::Violation {
                message: verdict
                    .message
                    .unwrap_or_else(|| self.locale.no_detailed_violation().to_string()),
                violations: verdict.violations,
            });
        }
        Ok(verdict)
    }

    /// Concrete paths defined under the collection `base`.
    pub fn collection(&self, base: &str) -> Result<CollectionListing, AdapterError> {
        let graph = self.graph(Action::CollectionQuery)?;
        let base = base.trim();
        if base.is_empty() {
            return Err(AdapterError::EmptyCollectionPath);
        }
        let paths = graph.list_paths().map_err(|fault| self.engine_error(&fault))?;
        let matching = paths_under(&paths, base)
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(CollectionListing {
            base: base.to_string(),
            paths: matching,
        })
    }

    /// Full graph dump, pretty-printed when the engine emits JSON.
    pub fn dump(&self) -> Result<String, AdapterError> {
        let graph = self.graph(Action::Dump)?;
        let raw = graph.serialize().map_err(|fault| self.engine_error(&fault))?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(json) => Ok(self.normalizer.pretty(&json)),
            Err(_) => Ok(raw),
        }
    }

    pub fn on_dictionary_loaded(&mut self, source: &str) -> Reply {
        match self.load_dictionary(source) {
            Ok(_) => self.reply_with_dump(None),
            Err(err) => self.reply_error(&err),
        }
    }

    pub fn on_get_requested(&self, path: &str) -> Reply {
        match self.get(path) {
            Ok(text) => Reply::output(text),
            Err(err) => self.reply_error(&err),
        }
    }

    pub fn on_set_requested(&mut self, path: &str, raw_value: &str) -> Reply {
        let notice = match self.set(path, raw_value) {
            Ok(verdict) => verdict
                .message
                .as_deref()
                .map(|text| Notice::new(NoticeKind::Advisory, text)),
            Err(err @ AdapterError::Violation { .. }) => Some(self.to_notice(&err)),
            Err(err) => return self.reply_error(&err),
        };
        Reply {
            wrote: true,
            ..self.reply_with_dump(notice)
        }
    }

    pub fn on_collection_query_requested(&self, base: &str) -> Reply {
        match self.collection(base) {
            Ok(listing) => Reply::output(listing.render(self.locale)),
            Err(err) => self.reply_error(&err),
        }
    }

    pub fn to_notice(&self, err: &AdapterError) -> Notice {
        Notice::new(err.kind().into(), &err.localized(self.locale))
    }

    fn reply_error(&self, err: &AdapterError) -> Reply {
        debug!(error = %err, "entry point failed");
        Reply::notice(self.to_notice(err))
    }

    /// Dump the graph under `notice`. A failed dump is reported after any
    /// earlier notice; a violation keeps its kind.
    fn reply_with_dump(&self, notice: Option<Notice>) -> Reply {
        match self.dump() {
            Ok(text) => Reply {
                output: Some(text),
                notice,
                ..Reply::default()
            },
            Err(err) => {
                let failure = self.to_notice(&err);
                let notice = match notice {
                    None => failure,
                    Some(first) => {
                        let kind = match first.kind {
                            NoticeKind::Violation => NoticeKind::Violation,
                            _ => failure.kind,
                        };
                        Notice::new(kind, &format!("{}\n{}", first.text, failure.text))
                    }
                };
                Reply::notice(notice)
            }
        }
    }

    fn graph(&self, action: Action) -> Result<&E::Graph, AdapterError> {
        self.graph.as_ref().ok_or(AdapterError::NoGraph { action })
    }

    fn describe(&self, fault: &EngineFault) -> String {
        fault.describe(self.locale, &self.normalizer)
    }

    fn engine_error(&self, fault: &EngineFault) -> AdapterError {
        AdapterError::Engine {
            detail: self.describe(fault),
        }
    }
}
