//! JSON handlers for the session and catalog API.

use super::AppState;
use crate::catalog::{CatalogError, CatalogKind};
use crate::sessions::SessionError;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

// ── Error mapping ───────────────────────────────────────────────

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

/// Map a store error onto an HTTP status with a JSON `{"error": ...}` body.
pub(super) fn session_error_response(error: &SessionError) -> Response {
    let status = match error {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SessionError::Storage(_) | SessionError::Encoding(_) => {
            tracing::error!("session request failed: {error}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error.to_string())
}

fn catalog_error_response(error: &CatalogError) -> Response {
    let status = match error {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Invalid { .. } => StatusCode::BAD_REQUEST,
    };
    error_response(status, error.to_string())
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, Response> {
    serde_json::from_str(body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}")))
}

// ── Request bodies and queries ──────────────────────────────────

#[derive(Deserialize)]
pub struct SessionListQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    #[serde(default)]
    pub scenario_id: String,
    #[serde(default)]
    pub avatar_id: String,
    #[serde(default)]
    pub observer_id: String,
}

#[derive(Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
pub struct CatalogQuery {
    pub query: Option<String>,
}

// ── Handlers ────────────────────────────────────────────────────

/// GET /health: liveness check
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.console.store().len(),
    }))
}

/// GET /api/status: console overview
pub async fn handle_api_status(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.console.store();
    let counts: serde_json::Map<String, serde_json::Value> = store
        .counts_by_status()
        .into_iter()
        .map(|(status, count)| (status.to_string(), count.into()))
        .collect();
    let notifier = state.console.notifier();
    let queue = state.console.queue();

    Json(serde_json::json!({
        "application": state.config.application_name,
        "storage": {
            "backend": state.config.storage.backend,
            "location": store.storage_location(),
        },
        "transition_policy": store.policy().as_str(),
        "engine": {
            "notifier": notifier.name(),
            "destination": notifier.destination(),
        },
        "queue": {
            "pending": queue.pending(),
            "completed": queue.completed(),
        },
        "sessions": counts,
    }))
}

/// GET /api/config: effective configuration as TOML
pub async fn handle_api_config_get(State(state): State<AppState>) -> impl IntoResponse {
    match toml::to_string_pretty(state.config.as_ref()) {
        Ok(content) => Json(serde_json::json!({
            "format": "toml",
            "content": content,
        }))
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serialize config: {e}"),
        ),
    }
}

/// GET /api/sessions?limit=n: most recent sessions first
pub async fn handle_sessions_list(
    State(state): State<AppState>,
    Query(params): Query<SessionListQuery>,
) -> impl IntoResponse {
    let sessions = match params.limit {
        Some(limit) => state.console.recent_sessions(Some(limit)),
        None => state.console.sessions(),
    };

    Json(serde_json::json!({
        "total": state.console.store().len(),
        "sessions": sessions,
    }))
}

/// POST /api/sessions: create a session and start it in the background
pub async fn handle_session_create(State(state): State<AppState>, body: String) -> Response {
    let request: CreateSessionBody = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state
        .console
        .start_session(&request.scenario_id, &request.avatar_id, &request.observer_id)
        .await
    {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// GET /api/sessions/{id}: session joined with its records
pub async fn handle_session_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.console.session_details(&id) {
        Ok(details) => Json(details).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// POST /api/sessions/{id}/status: change status and notify the engine
pub async fn handle_session_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Response {
    let request: StatusBody = match parse_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.console.change_status(&id, &request.status).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// DELETE /api/sessions/{id}
pub async fn handle_session_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.console.delete_session(&id) {
        Ok(_) => Json(serde_json::json!({"status": "ok"})).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// GET /api/sessions/{id}/payload: integration payload as sent to the engine
pub async fn handle_session_payload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.console.integration_payload(&id) {
        Ok(payload) => Json(payload).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// GET /api/{scenarios,avatars,observers}?query=: catalog search
pub async fn handle_catalog_search(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    Query(params): Query<CatalogQuery>,
) -> impl IntoResponse {
    let records = state
        .console
        .catalog()
        .search_json(kind, params.query.as_deref().unwrap_or(""));
    Json(serde_json::json!({"records": records}))
}

/// GET /api/{scenarios,avatars,observers}/{id}
pub async fn handle_catalog_get(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    Path(id): Path<String>,
) -> Response {
    match state.console.catalog().get_json(kind, &id) {
        Some(record) => Json(record).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("{} not found: {id}", kind.record_label()),
        ),
    }
}

/// POST /api/{scenarios,avatars,observers}: create a record under a new id
pub async fn handle_catalog_create(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    body: String,
) -> Response {
    match state.console.catalog().create_json(kind, &body) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => catalog_error_response(&e),
    }
}

/// PUT /api/{scenarios,avatars,observers}/{id}: replace a record
pub async fn handle_catalog_update(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    Path(id): Path<String>,
    body: String,
) -> Response {
    match state.console.catalog().update_json(kind, &id, &body) {
        Ok(record) => Json(record).into_response(),
        Err(e) => catalog_error_response(&e),
    }
}

/// DELETE /api/{scenarios,avatars,observers}/{id}
pub async fn handle_catalog_delete(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    Path(id): Path<String>,
) -> Response {
    match state.console.catalog().delete(kind, &id) {
        Ok(()) => Json(serde_json::json!({"status": "ok"})).into_response(),
        Err(e) => catalog_error_response(&e),
    }
}
