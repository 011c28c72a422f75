//! HTTP route handlers for the probe API.
//!
//! Every handler answers with the session [`Reply`] as JSON. The status code
//! follows the notice kind so clients can branch without parsing text.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use probe::session::{NoticeKind, Reply};
use serde::Deserialize;

use crate::sse;
use crate::state::{AppState, ChangeEvent};

type ApiResult = Result<(StatusCode, Json<Reply>), StatusCode>;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/paths", get(list_paths))
        .route("/fact", axum::routing::post(set_fact))
        .route("/fact/{*path}", get(get_fact))
        .route("/collection", get(collection))
        .route("/graph", get(graph))
        .route("/dictionary", axum::routing::post(load_dictionary))
        .route("/events", get(sse::events_handler))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/paths - every path the dictionary defines, one per line.
async fn list_paths(State(state): State<AppState>) -> ApiResult {
    let reply = state
        .with_session(|session| match session.paths() {
            Ok(paths) => Reply::output(paths.join("\n")),
            Err(err) => Reply::notice(session.to_notice(&err)),
        })
        .await?;
    Ok(respond(reply))
}

/// GET /api/fact/{*path} - read one fact. `#` must be sent as `%23`.
async fn get_fact(State(state): State<AppState>, Path(path): Path<String>) -> ApiResult {
    let path = fact_path(&path);
    let reply = state
        .with_session(move |session| session.on_get_requested(&path))
        .await?;
    Ok(respond(reply))
}

#[derive(Debug, Deserialize)]
pub struct SetFactRequest {
    pub path: String,
    pub value: String,
}

/// POST /api/fact - write one fact; the reply carries the updated graph.
async fn set_fact(State(state): State<AppState>, Json(request): Json<SetFactRequest>) -> ApiResult {
    let path = request.path.clone();
    let reply = state
        .with_session(move |session| session.on_set_requested(&request.path, &request.value))
        .await?;
    if reply.wrote {
        let _ = state.event_tx.send(ChangeEvent::FactSet { path });
    }
    Ok(respond(reply))
}

#[derive(Debug, Default, Deserialize)]
pub struct CollectionParams {
    #[serde(default)]
    pub base: String,
}

/// GET /api/collection?base=/formW2s - concrete paths under a collection.
async fn collection(
    State(state): State<AppState>,
    Query(params): Query<CollectionParams>,
) -> ApiResult {
    let reply = state
        .with_session(move |session| session.on_collection_query_requested(&params.base))
        .await?;
    Ok(respond(reply))
}

/// GET /api/graph - the whole graph.
async fn graph(State(state): State<AppState>) -> ApiResult {
    let reply = state
        .with_session(|session| match session.dump() {
            Ok(text) => Reply::output(text),
            Err(err) => Reply::notice(session.to_notice(&err)),
        })
        .await?;
    Ok(respond(reply))
}

/// POST /api/dictionary - body is the dictionary text; replaces the graph.
async fn load_dictionary(State(state): State<AppState>, body: String) -> ApiResult {
    let reply = state.load_dictionary(body).await?;
    Ok(respond(reply))
}

/// Captured wildcard segments arrive without the leading slash.
fn fact_path(captured: &str) -> String {
    if captured.starts_with('/') {
        captured.to_string()
    } else {
        format!("/{captured}")
    }
}

fn status_for(reply: &Reply) -> StatusCode {
    match reply.notice.as_ref().map(|notice| notice.kind) {
        None | Some(NoticeKind::Advisory) => StatusCode::OK,
        Some(NoticeKind::Validation) => StatusCode::BAD_REQUEST,
        Some(NoticeKind::Engine) => StatusCode::BAD_GATEWAY,
        Some(NoticeKind::Violation) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn respond(reply: Reply) -> (StatusCode, Json<Reply>) {
    (status_for(&reply), Json(reply))
}
