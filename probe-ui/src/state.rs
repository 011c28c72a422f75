//! Shared application state for the UI server.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::StatusCode;
use probe::io::bridge::ProcessEngine;
use probe::session::{Reply, Session};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

pub type ProbeSession = Session<ProcessEngine>;

/// Events broadcast to SSE clients when the graph changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A dictionary load replaced the whole graph.
    GraphReplaced { generation: u64 },
    /// A write reached the engine.
    FactSet { path: String },
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The one session. Engine calls block, so it is only touched from
    /// blocking tasks.
    session: Arc<Mutex<ProbeSession>>,
    /// Broadcast sender for graph change events.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
    /// Dictionary file loaded at start and watched for changes.
    pub dictionary_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(session: ProbeSession, dictionary_path: Option<PathBuf>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            session: Arc::new(Mutex::new(session)),
            event_tx: Arc::new(event_tx),
            dictionary_path,
        }
    }

    /// Run `f` against the session on the blocking pool.
    pub async fn with_session<T, F>(&self, f: F) -> Result<T, StatusCode>
    where
        T: Send + 'static,
        F: FnOnce(&mut ProbeSession) -> T + Send + 'static,
    {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await
        .map_err(|err| {
            error!(error = %err, "session task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
    }

    /// Replace the graph from dictionary text and announce it on success.
    pub async fn load_dictionary(&self, source: String) -> Result<Reply, StatusCode> {
        let (reply, generation) = self
            .with_session(move |session| {
                let before = session.generation();
                let reply = session.on_dictionary_loaded(&source);
                let after = session.generation();
                (reply, (after != before).then_some(after))
            })
            .await?;
        match generation {
            Some(generation) => {
                info!(generation, "dictionary loaded");
                let _ = self.event_tx.send(ChangeEvent::GraphReplaced { generation });
            }
            None => warn!(
                notice = ?reply.notice.as_ref().map(|n| n.text.as_str()),
                "dictionary rejected"
            ),
        }
        Ok(reply)
    }
}
