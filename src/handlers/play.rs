use axum::{
    Json,
    body::Bytes,
    extract::{Request, State},
    http::header,
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::metrics::{PLAYBACK_FAILURES, PLAYBACK_LATENCY, PLAYBACK_SUCCESS, REQUEST_TOTAL};
use crate::models::{PlayRequest, PlayResponse};
use crate::state::AppState;

// Read the body, trusting a declared Content-Length to reject early
async fn read_body(request: Request, max_body: usize) -> Result<Bytes, AppError> {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(len) if len > max_body as u64 => return Err(AppError::PayloadTooLarge),
        Some(0) => return Err(AppError::EmptyBody),
        _ => {}
    }

    let body = axum::body::to_bytes(request.into_body(), max_body)
        .await
        .map_err(|_| AppError::PayloadTooLarge)?;

    if body.is_empty() {
        return Err(AppError::EmptyBody);
    }
    Ok(body)
}

// POST /play
pub async fn play_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<PlayResponse>, AppError> {
    REQUEST_TOTAL.inc();

    let body = read_body(request, state.max_body).await?;
    let payload: PlayRequest = serde_json::from_slice(&body).map_err(|_| AppError::InvalidJson)?;
    let name = payload.audio.unwrap_or_default();

    let path = state.validator.validate(&name)?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(AppError::NotFound(name));
    }

    // one announcement at a time; a second request is turned away, not queued
    let guard = Arc::clone(&state.playback)
        .try_lock_owned()
        .map_err(|_| AppError::PlayerBusy)?;

    // playback runs on its own task so a client hanging up doesn't cut it short
    let player = state.player.clone();
    let start_time = Instant::now();
    let handle = tokio::spawn(async move {
        let _guard = guard;
        player.play(&path).await
    });

    let result = handle
        .await
        .map_err(|e| AppError::Internal(format!("playback task failed: {}", e)))?;
    PLAYBACK_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            PLAYBACK_SUCCESS.inc();
            tracing::info!("Played announcement: {}", name);
            Ok(Json(PlayResponse::playing(&name)))
        }
        Err(e) => {
            PLAYBACK_FAILURES.inc();
            Err(AppError::Playback(e))
        }
    }
}
