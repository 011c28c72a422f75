//! Server-Sent Events stream and dictionary file watcher.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::state::{AppState, ChangeEvent};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct SsePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl From<&ChangeEvent> for SsePayload {
    fn from(event: &ChangeEvent) -> Self {
        match event {
            ChangeEvent::GraphReplaced { generation } => SsePayload {
                event_type: "graph_replaced",
                generation: Some(*generation),
                path: None,
            },
            ChangeEvent::FactSet { path } => SsePayload {
                event_type: "fact_set",
                generation: None,
                path: Some(path.clone()),
            },
        }
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(change_event) => {
                    let payload = SsePayload::from(&change_event);
                    if let Ok(json) = serde_json::to_string(&payload) {
                        yield Ok(Event::default().event("change").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Reload the dictionary whenever its file changes. No-op without a path.
pub fn start_dictionary_watcher(state: AppState) {
    let Some(path) = state.dictionary_path.clone() else {
        return;
    };
    tokio::spawn(async move {
        if let Err(e) = run_dictionary_watcher(state, path).await {
            warn!(error = %e, "dictionary watcher failed");
        }
    });
}

async fn run_dictionary_watcher(state: AppState, path: PathBuf) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_millis(250)),
    )?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "watching dictionary");

    // Editors often write a file in several steps; settle before reloading.
    let mut pending: Vec<NotifyEvent> = Vec::new();
    let mut flush_tick = tokio::time::interval(Duration::from_millis(250));
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                pending.push(event);
            }
            _ = flush_tick.tick() => {
                if pending.is_empty() {
                    continue;
                }
                let touched = dictionary_touched(&path, &pending);
                pending.clear();
                if touched {
                    reload(&state, &path).await;
                }
            }
        }
    }
}

async fn reload(state: &AppState, path: &Path) {
    debug!(path = %path.display(), "dictionary changed, reloading");
    match tokio::fs::read_to_string(path).await {
        Ok(source) => {
            if let Err(status) = state.load_dictionary(source).await {
                warn!(%status, "dictionary reload failed");
            }
        }
        Err(e) => warn!(error = %e, path = %path.display(), "read dictionary"),
    }
}

/// Whether any create/modify event in the batch names `dictionary`.
fn dictionary_touched(dictionary: &Path, events: &[NotifyEvent]) -> bool {
    events.iter().any(|event| {
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event.paths.iter().any(|path| path == dictionary)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, path: &str) -> NotifyEvent {
        NotifyEvent {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    fn modify(path: &str) -> NotifyEvent {
        event(
            EventKind::Modify(notify::event::ModifyKind::Any),
            path,
        )
    }

    #[test]
    fn modify_of_dictionary_triggers_reload() {
        let dictionary = Path::new("/work/facts.xml");
        assert!(dictionary_touched(
            dictionary,
            &[modify("/work/other.xml"), modify("/work/facts.xml")]
        ));
    }

    #[test]
    fn unrelated_or_removal_events_are_ignored() {
        let dictionary = Path::new("/work/facts.xml");
        assert!(!dictionary_touched(dictionary, &[modify("/work/other.xml")]));
        assert!(!dictionary_touched(
            dictionary,
            &[event(
                EventKind::Remove(notify::event::RemoveKind::File),
                "/work/facts.xml"
            )]
        ));
    }

    #[test]
    fn payloads_name_the_change() {
        let replaced = serde_json::to_value(SsePayload::from(&ChangeEvent::GraphReplaced {
            generation: 3,
        }))
        .expect("json");
        assert_eq!(
            replaced,
            serde_json::json!({ "type": "graph_replaced", "generation": 3 })
        );

        let set = serde_json::to_value(SsePayload::from(&ChangeEvent::FactSet {
            path: "/age".to_string(),
        }))
        .expect("json");
        assert_eq!(set, serde_json::json!({ "type": "fact_set", "path": "/age" }));
    }
}
