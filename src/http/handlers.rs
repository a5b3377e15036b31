use super::state::AppState;
use crate::session::{SessionStats, TranscriptEntry};
use crate::turn::TurnState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartCallRequest {
    /// Optional call ID (if not provided, generate UUID)
    pub call_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub call_id: String,
    pub state: TurnState,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ShutdownCallResponse {
    pub call_id: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub call_id: String,
    pub entries: Vec<TranscriptEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(call_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Call {} not found", call_id),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /calls/start
/// Create a call session; recognition starts with the first audio frame
pub async fn start_call(
    State(state): State<AppState>,
    body: Option<Json<StartCallRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let call_id = req
        .call_id
        .unwrap_or_else(|| format!("call-{}", uuid::Uuid::new_v4()));

    info!("Starting call: {}", call_id);

    if let Some(stale) = state.evict_if_stopped(&call_id).await {
        let stats = stale.stats().await;
        info!(
            "Replacing ended call {} ({})",
            call_id,
            stats.end_reason.unwrap_or_default()
        );
    }

    if state.sessions.read().await.contains_key(&call_id) {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Call {} is already active", call_id),
            }),
        )
            .into_response();
    }

    let session = match state.factory.create(call_id.clone()).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to create call session: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create call session: {}", e),
                }),
            )
                .into_response();
        }
    };

    let session_state = session.state();

    {
        let mut sessions = state.sessions.write().await;
        if sessions.contains_key(&call_id) {
            // Lost a race with a concurrent start for the same ID
            drop(sessions);
            session.shutdown().await;
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Call {} is already active", call_id),
                }),
            )
                .into_response();
        }
        sessions.insert(call_id.clone(), session);
    }

    (
        StatusCode::OK,
        Json(StartCallResponse {
            call_id: call_id.clone(),
            state: session_state,
            message: format!("Call {} ready for audio", call_id),
        }),
    )
        .into_response()
}

/// POST /calls/:call_id/audio
/// Push one frame of raw PCM
pub async fn push_audio(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    match state.session(&call_id).await {
        Some(session) => {
            session.push_audio_frame(&body).await;
            StatusCode::ACCEPTED.into_response()
        }
        None => not_found(&call_id),
    }
}

/// POST /calls/:call_id/shutdown
/// Tear the call down and return its final stats
pub async fn shutdown_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    info!("Shutting down call: {}", call_id);

    let session = state.sessions.write().await.remove(&call_id);

    match session {
        Some(session) => {
            let stats = session.shutdown().await;
            (
                StatusCode::OK,
                Json(ShutdownCallResponse {
                    call_id,
                    message: "Call shut down".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => not_found(&call_id),
    }
}

/// GET /calls/:call_id/status
pub async fn get_call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    match state.session(&call_id).await {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => not_found(&call_id),
    }
}

/// GET /calls/:call_id/transcript
pub async fn get_call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    match state.session(&call_id).await {
        Some(session) => {
            let entries = session.transcript().await;
            (StatusCode::OK, Json(TranscriptResponse { call_id, entries })).into_response()
        }
        None => not_found(&call_id),
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": "loqa-voice-agent",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
