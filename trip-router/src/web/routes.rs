//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{error, warn};

use crate::graph::GraphSummary;
use crate::routing::SearchError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plan", post(plan))
        .route("/graph/summary", get(graph_summary))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Counts of vertices, edges, stops and trips in the live graph.
async fn graph_summary(State(state): State<AppState>) -> Result<Json<GraphSummary>, AppError> {
    let router = state.router.clone();
    let summary = tokio::task::spawn_blocking(move || router.summary())
        .await
        .map_err(|e| AppError::Internal {
            message: format!("summary task failed: {e}"),
        })?;
    Ok(Json(summary))
}

/// Plan a trip between two labelled vertices.
///
/// The search is CPU-bound and holds the graph's read lock, so it runs on
/// the blocking pool.
async fn plan(
    State(state): State<AppState>,
    req: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = req.map_err(|e| AppError::BadRequest {
        message: e.body_text(),
    })?;

    let router = state.router.clone();
    let response = tokio::task::spawn_blocking(move || {
        let from = router.resolve(&req.from).ok_or_else(|| AppError::NotFound {
            message: format!("Unknown place: {}", req.from),
        })?;
        let to = router.resolve(&req.to).ok_or_else(|| AppError::NotFound {
            message: format!("Unknown place: {}", req.to),
        })?;
        let request = req.into_request(from, to, router.config());
        let plan = router.plan(request)?;
        Ok::<_, AppError>(PlanResponse::from_plan(&plan, router.time_zone()))
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("search task failed: {e}"),
    })??;

    Ok(Json(response).into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Internal { message: String },
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidRequest(_) | SearchError::MissingTarget => AppError::BadRequest {
                message: e.to_string(),
            },
            SearchError::UnknownVertex(_) => AppError::NotFound {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
