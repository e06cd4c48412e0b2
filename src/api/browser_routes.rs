//! Browser API Routes
//!
//! Routes:
//! - GET    /api/health                     - Liveness and translator status
//! - GET    /api/catalog                    - Datasets, plot types, example lines
//! - POST   /api/sessions                   - Create a session, optionally from a layout query
//! - GET    /api/sessions/:id               - Live panels and layout config
//! - DELETE /api/sessions/:id               - Tear a session down
//! - POST   /api/sessions/:id/panels        - Add a batch of spec lines
//! - PUT    /api/sessions/:id/panels/:key   - Replace one panel in place
//! - POST   /api/sessions/:id/delete        - Delete panels by key or click counts
//! - GET    /api/sessions/:id/layout        - Download the layout file
//! - GET    /api/sessions/:id/share         - Shareable URL for the layout

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use panel_dsl::{decode_query, share_url, LayoutSeparator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::BrowserConfig;
use crate::error::SessionError;
use crate::registry::Catalog;
use crate::session::store::{get_session, insert_session, remove_session};
use crate::session::{
    BatchOutcome, BatchPipeline, PanelSession, Patch, SessionHandle, SessionSnapshot, SessionStore,
};

pub const LAYOUT_FILENAME: &str = "wmb_layout.txt";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// `?`-joined layout, as found in a shared URL
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub fallback: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session: SessionSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BatchOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct AddPanelsRequest {
    /// One spec line per line of text
    pub text: String,
    #[serde(default)]
    pub fallback: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReplacePanelRequest {
    pub text: String,
    #[serde(default)]
    pub fallback: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeletePanelsRequest {
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    /// Per-position delete click counts; non-zero means delete
    #[serde(default)]
    pub clicks: Option<Vec<u32>>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub translator: bool,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct BrowserState {
    pub sessions: SessionStore,
    pub pipeline: Arc<BatchPipeline>,
    pub config: Arc<BrowserConfig>,
}

impl BrowserState {
    fn fallback(&self, requested: Option<bool>) -> bool {
        requested.unwrap_or(self.config.fallback_default)
    }

    async fn session(&self, id: Uuid) -> Result<SessionHandle, ApiError> {
        get_session(&self.sessions, id)
            .await
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("session {} not found", id)))
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_browser_router(state: BrowserState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/catalog", get(catalog))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(show_session).delete(delete_session))
        .route("/api/sessions/:id/panels", post(add_panels))
        .route("/api/sessions/:id/panels/:key", put(replace_panel))
        .route("/api/sessions/:id/delete", post(delete_panels))
        .route("/api/sessions/:id/layout", get(download_layout))
        .route("/api/sessions/:id/share", get(share_layout))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health
async fn health(State(state): State<BrowserState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.read().await.len(),
        translator: state.pipeline.has_translator(),
    })
}

/// GET /api/catalog
async fn catalog(State(state): State<BrowserState>) -> Json<Catalog> {
    Json(state.pipeline.registry().catalog())
}

/// POST /api/sessions - an empty body creates an empty session
async fn create_session(
    State(state): State<BrowserState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionCreatedResponse>), ApiError> {
    let req = parse_create_request(&body)?;
    let mut session = PanelSession::new(state.config.max_panels);

    let outcome = match req.layout.as_deref() {
        Some(layout) => {
            let lines = decode_query(layout);
            tracing::info!("Importing {} layout line(s) into {}", lines.len(), session.id);
            Some(
                state
                    .pipeline
                    .add_batch(&mut session, &lines, state.fallback(req.fallback))
                    .await,
            )
        }
        None => None,
    };

    let snapshot = session.snapshot();
    insert_session(&state.sessions, session).await;
    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session: snapshot,
            outcome,
        }),
    ))
}

fn parse_create_request(body: &[u8]) -> Result<CreateSessionRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateSessionRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Rejected session request body: {}", e);
        api_error(StatusCode::BAD_REQUEST, format!("Invalid session request: {}", e))
    })
}

/// GET /api/sessions/:id
async fn show_session(
    State(state): State<BrowserState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = state.session(id).await?;
    let session = handle.lock().await;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/sessions/:id
async fn delete_session(
    State(state): State<BrowserState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if remove_session(&state.sessions, id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            format!("session {} not found", id),
        ))
    }
}

/// POST /api/sessions/:id/panels
async fn add_panels(
    State(state): State<BrowserState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddPanelsRequest>,
) -> Result<Json<BatchOutcome>, ApiError> {
    let handle = state.session(id).await?;
    let lines: Vec<&str> = req.text.lines().collect();
    let mut session = handle.lock().await;
    let outcome = state
        .pipeline
        .add_batch(&mut session, &lines, state.fallback(req.fallback))
        .await;
    Ok(Json(outcome))
}

/// PUT /api/sessions/:id/panels/:key
async fn replace_panel(
    State(state): State<BrowserState>,
    Path((id, key)): Path<(Uuid, String)>,
    Json(req): Json<ReplacePanelRequest>,
) -> Result<Json<Patch>, ApiError> {
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    let fallback = state.fallback(req.fallback);
    match state
        .pipeline
        .replace(&mut session, &key, &req.text, fallback)
        .await
    {
        Ok(patch) => Ok(Json(patch)),
        Err(e @ SessionError::UnknownPanel(_)) => {
            Err(api_error(StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(e) => Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())),
    }
}

/// POST /api/sessions/:id/delete
async fn delete_panels(
    State(state): State<BrowserState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeletePanelsRequest>,
) -> Result<Json<Patch>, ApiError> {
    let handle = state.session(id).await?;
    let mut session = handle.lock().await;
    let patch = match (req.keys, req.clicks) {
        (Some(keys), None) => session.delete(&keys),
        (None, Some(clicks)) => session.delete_clicked(&clicks),
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "exactly one of 'keys' or 'clicks' is required",
            ))
        }
    };
    Ok(Json(patch))
}

/// GET /api/sessions/:id/layout - newline-joined layout file
async fn download_layout(
    State(state): State<BrowserState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let handle = state.session(id).await?;
    let text = handle.lock().await.layout().encode(LayoutSeparator::Newline);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", LAYOUT_FILENAME),
            ),
        ],
        text,
    )
        .into_response())
}

/// GET /api/sessions/:id/share
async fn share_layout(
    State(state): State<BrowserState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareResponse>, ApiError> {
    let handle = state.session(id).await?;
    let session = handle.lock().await;
    Ok(Json(ShareResponse {
        url: share_url(&state.config.public_base_url, session.layout()),
    }))
}
