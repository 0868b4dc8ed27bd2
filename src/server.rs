//! HTTP surface: todo CRUD and the summary endpoints.

use crate::storage::{StorageError, TodoFilter, TodoStore};
use crate::summary::{Delivery, SummaryError, SummaryRequest, SummaryResult, SummaryService};
use crate::todo::{parse_date, NewTodo, Todo, TodoPatch, ValidationError};
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TodoStore>,
    pub summaries: Arc<SummaryService>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoFields {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    due_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl SummaryParams {
    fn into_request(self) -> Result<SummaryRequest, ValidationError> {
        let bound = |raw: Option<String>| {
            raw.filter(|r| !r.trim().is_empty())
                .map(|r| parse_date(&r))
                .transpose()
        };
        Ok(SummaryRequest {
            start_date: bound(self.start_date)?,
            end_date: bound(self.end_date)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct TodoListBody {
    success: bool,
    todos: Vec<Todo>,
}

#[derive(Debug, Serialize)]
struct TodoBody {
    success: bool,
    todo: Todo,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    success: bool,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Handler failures, rendered as `{success: false, error, details?}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("todo not found")]
    NotFound,
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        source: StorageError,
    },
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

impl ApiError {
    fn store(context: &'static str) -> impl FnOnce(StorageError) -> ApiError {
        move |source| ApiError::Store { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                "Invalid request".to_string(),
                Some(err.to_string()),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Todo not found".to_string(), None),
            ApiError::Store { context, source } => {
                tracing::error!(error = %source, "{context}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    context.to_string(),
                    Some(source.to_string()),
                )
            }
            ApiError::Summary(err) => {
                tracing::error!(error = %err, "error generating summary");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate summary".to_string(),
                    Some(err.to_string()),
                )
            }
        };
        let body = ErrorBody {
            success: false,
            error,
            details,
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route(
            "/api/todos/summarize",
            get(summarize_and_deliver_query).post(summarize_and_deliver_body),
        )
        .route(
            "/api/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/api/summary", get(summary_only))
        .with_state(state)
}

pub async fn run_server(state: AppState, listen: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .context("bind server listener failed")?;
    tracing::info!(%listen, "todo-digest listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated with error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status":"ok"}))
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<TodoListBody>, ApiError> {
    let todos = state
        .store
        .find(&TodoFilter::default())
        .map_err(ApiError::store("Failed to fetch todos"))?;
    Ok(Json(TodoListBody {
        success: true,
        todos,
    }))
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TodoBody>, ApiError> {
    let todo = state
        .store
        .get(&id)
        .map_err(ApiError::store("Failed to fetch todo"))?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(TodoBody {
        success: true,
        todo,
        message: None,
    }))
}

async fn create_todo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TodoBody>, ApiError> {
    let fields: TodoFields = parse_body(&body)?;
    let new = NewTodo::parse(
        fields.title.as_deref().unwrap_or_default(),
        fields.description.as_deref(),
        fields.status.as_deref(),
        fields.priority.as_deref(),
        fields.due_date.as_deref(),
    )?;
    let todo = state
        .store
        .create(new)
        .map_err(ApiError::store("Failed to create todo"))?;
    tracing::info!(id = %todo.id, "todo created");
    Ok(Json(TodoBody {
        success: true,
        todo,
        message: None,
    }))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TodoBody>, ApiError> {
    // Unknown ids are 404 even when the body is invalid.
    if state
        .store
        .get(&id)
        .map_err(ApiError::store("Failed to update todo"))?
        .is_none()
    {
        return Err(ApiError::NotFound);
    }

    let fields: TodoFields = parse_body(&body)?;
    let patch = TodoPatch::parse(
        fields.title.as_deref(),
        fields.description.as_deref(),
        fields.status.as_deref(),
        fields.priority.as_deref(),
        fields.due_date.as_deref(),
    )?;
    let todo = state
        .store
        .update(&id, patch)
        .map_err(ApiError::store("Failed to update todo"))?
        .ok_or(ApiError::NotFound)?;
    tracing::info!(id = %todo.id, "todo updated");
    Ok(Json(TodoBody {
        success: true,
        todo,
        message: Some("Todo updated successfully"),
    }))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let removed = state
        .store
        .delete(&id)
        .map_err(ApiError::store("Failed to delete todo"))?;
    if !removed {
        return Err(ApiError::NotFound);
    }
    tracing::info!(%id, "todo deleted");
    Ok(Json(MessageBody {
        success: true,
        message: "Todo deleted successfully",
    }))
}

async fn summary_only(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResult>, ApiError> {
    run_summary(&state, params, Delivery::None).await
}

async fn summarize_and_deliver_query(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResult>, ApiError> {
    run_summary(&state, params, Delivery::Slack).await
}

/// An empty body means no bounds.
async fn summarize_and_deliver_body(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SummaryResult>, ApiError> {
    let params: SummaryParams = parse_body(&body)?;
    run_summary(&state, params, Delivery::Slack).await
}

/// Decode a JSON request body regardless of its content type. A blank body
/// decodes to the default value.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ValidationError::InvalidBody(e.to_string()))
}

async fn run_summary(
    state: &AppState,
    params: SummaryParams,
    delivery: Delivery,
) -> Result<Json<SummaryResult>, ApiError> {
    let request = params.into_request()?;
    let result = state
        .summaries
        .summarize(request, delivery)
        .await
        .map_err(ApiError::Summary)?;
    Ok(Json(result))
}
