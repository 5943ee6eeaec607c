//! In-memory stand-in for the PostgREST `todos` collection.
//!
//! Serves the subset the client speaks: `select`/`order` on reads, `id=eq.<id>`
//! filters, `Prefer: return=representation` on writes, and the `apikey` plus
//! bearer-token pair on every request. `MockState::fail_with` makes every
//! request answer with a fixed status, for exercising client rollback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// Access key accepted by `app()`.
pub const DEFAULT_API_KEY: &str = "mock-anon-key";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

/// Shared server state. Cloning shares the same rows and failure switch.
#[derive(Clone)]
pub struct MockState {
    api_key: Arc<str>,
    rows: Arc<RwLock<Vec<Todo>>>,
    failing: Arc<AtomicU16>,
}

impl MockState {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: Arc::from(api_key),
            rows: Arc::default(),
            failing: Arc::default(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Answer every following request with `status` until `recover`.
    pub fn fail_with(&self, status: u16) {
        self.failing.store(status, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(0, Ordering::SeqCst);
    }

    /// Current rows in insertion order.
    pub async fn todos(&self) -> Vec<Todo> {
        self.rows.read().await.clone()
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY)
    }
}

pub fn app() -> Router {
    app_with(MockState::default())
}

pub fn app_with(state: MockState) -> Router {
    Router::new()
        .route(
            "/rest/v1/todos",
            get(list_todos)
                .post(create_todo)
                .patch(update_todos)
                .delete(delete_todos),
        )
        .layer(middleware::from_fn_with_state(state.clone(), gate))
        .with_state(state)
}

pub async fn run_with(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

/// Failure injection first, then the key check.
async fn gate(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let failing = state.failing.load(Ordering::SeqCst);
    if failing != 0 {
        let status = StatusCode::from_u16(failing).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        debug!(%status, uri = %request.uri(), "gate: injected failure");
        return (status, "injected failure").into_response();
    }

    let headers = request.headers();
    let key_ok = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(state.api_key());
    let bearer = format!("Bearer {}", state.api_key());
    let bearer_ok = headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(bearer.as_str());
    if !key_ok || !bearer_ok {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    next.run(request).await
}

fn wants_representation(headers: &HeaderMap) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"))
}

/// `id=eq.<uuid>` filter. `Err` for a malformed filter.
fn id_filter(params: &HashMap<String, String>) -> Result<Option<Uuid>, StatusCode> {
    match params.get("id") {
        None => Ok(None),
        Some(raw) => raw
            .strip_prefix("eq.")
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(Some)
            .ok_or(StatusCode::BAD_REQUEST),
    }
}

async fn list_todos(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Todo>>, StatusCode> {
    let id = id_filter(&params)?;
    let mut todos: Vec<Todo> = state
        .rows
        .read()
        .await
        .iter()
        .filter(|t| id.is_none_or(|id| t.id == id))
        .cloned()
        .collect();
    match params.get("order").map(String::as_str) {
        None => {}
        Some("created_at.asc") => todos.sort_by_key(|t| t.created_at),
        Some("created_at.desc") => todos.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        Some(_) => return Err(StatusCode::BAD_REQUEST),
    }
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<CreateTodo>,
) -> Response {
    let todo = Todo {
        id: Uuid::new_v4(),
        text: input.text,
        completed: input.completed,
        created_at: input.created_at.unwrap_or_else(Utc::now),
    };
    debug!(id = %todo.id, "create_todo: inserted");
    state.rows.write().await.push(todo.clone());
    if wants_representation(&headers) {
        (StatusCode::CREATED, Json(vec![todo])).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn update_todos(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(input): Json<UpdateTodo>,
) -> Result<Response, StatusCode> {
    let id = id_filter(&params)?.ok_or(StatusCode::BAD_REQUEST)?;
    let mut rows = state.rows.write().await;
    let updated: Vec<Todo> = rows
        .iter_mut()
        .filter(|t| t.id == id)
        .map(|todo| {
            if let Some(text) = &input.text {
                todo.text = text.clone();
            }
            if let Some(completed) = input.completed {
                todo.completed = completed;
            }
            todo.clone()
        })
        .collect();
    if wants_representation(&headers) {
        Ok(Json(updated).into_response())
    } else {
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

async fn delete_todos(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<StatusCode, StatusCode> {
    let id = id_filter(&params)?.ok_or(StatusCode::BAD_REQUEST)?;
    state.rows.write().await.retain(|t| t.id != id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_serializes_to_json() {
        let todo = Todo {
            id: Uuid::nil(),
            text: "Test".to_string(),
            completed: false,
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["text"], "Test");
        assert_eq!(json["completed"], false);
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn create_todo_defaults_optional_fields() {
        let input: CreateTodo = serde_json::from_str(r#"{"text":"No extras"}"#).unwrap();
        assert_eq!(input.text, "No extras");
        assert!(!input.completed);
        assert!(input.created_at.is_none());
    }

    #[test]
    fn create_todo_rejects_missing_text() {
        let result: Result<CreateTodo, _> = serde_json::from_str(r#"{"completed":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn id_filter_requires_eq_prefix() {
        let mut params = HashMap::new();
        assert_eq!(id_filter(&params), Ok(None));

        params.insert("id".to_string(), format!("eq.{}", Uuid::nil()));
        assert_eq!(id_filter(&params), Ok(Some(Uuid::nil())));

        params.insert("id".to_string(), Uuid::nil().to_string());
        assert_eq!(id_filter(&params), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn failure_switch_toggles() {
        let state = MockState::default();
        state.fail_with(503);
        assert_eq!(state.failing.load(Ordering::SeqCst), 503);
        state.recover();
        assert_eq!(state.failing.load(Ordering::SeqCst), 0);
    }
}
