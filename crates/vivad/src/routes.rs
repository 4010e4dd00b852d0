//! API routes for vivad
//!
//! Each endpoint keeps its own error body shape: `start` and `upload` answer
//! with `{"message": ...}`, `answer` with `{"error": ...}`.

use crate::server::AppState;
use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use viva_common::{
    AnswerRequest, ErrorBody, HealthResponse, MessageError, StartRequest, StartResponse,
    UploadResponse, VivaError, SESSION_HEADER, UPLOAD_FIELD, VERSION,
};

type AppStateArc = Arc<AppState>;
type MessageRejection = (StatusCode, Json<MessageError>);
type ErrorRejection = (StatusCode, Json<ErrorBody>);

/// HTTP status for a core error.
pub fn status_for(err: &VivaError) -> StatusCode {
    match err {
        VivaError::CredentialsExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
        VivaError::Upstream(_) => StatusCode::BAD_GATEWAY,
        VivaError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VivaError::NoActiveSession | VivaError::SessionCompleted => StatusCode::CONFLICT,
        VivaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        VivaError::EmptyCredentialPool => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_error(status: StatusCode, message: impl Into<String>) -> MessageRejection {
    (
        status,
        Json(MessageError {
            message: message.into(),
        }),
    )
}

fn error_body(status: StatusCode, error: impl Into<String>) -> ErrorRejection {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
}

fn header_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Use the caller's session id, or mint one for a fresh session.
fn session_id_or_new(headers: &HeaderMap) -> String {
    header_session_id(headers).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn with_session_header(session_id: &str, body: impl IntoResponse) -> Response {
    ([(SESSION_HEADER, session_id.to_string())], body).into_response()
}

// ============================================================================
// Exam Routes
// ============================================================================

pub fn exam_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/start/", post(start_exam))
        .route("/api/answer/", post(submit_answer))
        .route("/api/upload/", post(upload_document))
}

async fn start_exam(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Response, MessageRejection> {
    let Json(req) = payload.map_err(|e| {
        message_error(StatusCode::BAD_REQUEST, format!("Error: {}", e.body_text()))
    })?;

    let session_id = session_id_or_new(&headers);
    let question = state
        .examiner
        .start(&session_id, req.topic.as_deref())
        .await
        .map_err(|e| {
            error!("Start failed for session {}: {}", session_id, e);
            message_error(status_for(&e), format!("Error: {}", e))
        })?;

    Ok(with_session_header(
        &session_id,
        Json(StartResponse {
            message: question,
            session_id: session_id.clone(),
        }),
    ))
}

async fn submit_answer(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Response, ErrorRejection> {
    let Json(req) = payload.map_err(|e| error_body(StatusCode::BAD_REQUEST, e.body_text()))?;

    let session_id = header_session_id(&headers).ok_or_else(|| {
        let err = VivaError::InvalidRequest(format!("missing {} header", SESSION_HEADER));
        error_body(status_for(&err), err.to_string())
    })?;

    let response = state
        .examiner
        .answer(&session_id, &req.question, &req.answer)
        .await
        .map_err(|e| {
            warn!("Answer rejected for session {}: {}", session_id, e);
            error_body(status_for(&e), e.to_string())
        })?;

    Ok(with_session_header(&session_id, Json(response)))
}

async fn upload_document(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, MessageRejection> {
    let no_file = || message_error(StatusCode::BAD_REQUEST, "No file found");

    let mut multipart = multipart.map_err(|_| no_file())?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        message_error(
            StatusCode::BAD_REQUEST,
            format!("Error reading PDF: {}", e.body_text()),
        )
    })? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await.map_err(|e| {
                message_error(
                    StatusCode::BAD_REQUEST,
                    format!("Error reading PDF: {}", e.body_text()),
                )
            })?;
            upload = Some(bytes);
            break;
        }
    }
    let bytes = upload.ok_or_else(no_file)?;
    info!("Received upload ({} bytes)", bytes.len());

    let extractor = state.extractor.clone();
    let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|e| {
            error!("Extraction task failed: {}", e);
            message_error(StatusCode::INTERNAL_SERVER_ERROR, "Error reading PDF: extraction aborted")
        })?
        .map_err(|e| message_error(status_for(&e), format!("Error reading PDF: {}", e)))?;

    let session_id = session_id_or_new(&headers);
    let question = state
        .examiner
        .start_document(&session_id, &text)
        .await
        .map_err(|e| {
            error!("Document question failed for session {}: {}", session_id, e);
            message_error(status_for(&e), format!("Error: {}", e))
        })?;

    Ok(with_session_header(
        &session_id,
        Json(UploadResponse {
            message: question,
            status: "success".to_string(),
            session_id: session_id.clone(),
        }),
    ))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/api/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        credentials: state.examiner.client().pool().len(),
        active_sessions: state.examiner.store().len().await,
    })
}
