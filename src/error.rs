use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::player::PlaybackError;
use crate::rate_limit::Rejection;
use crate::validation::ValidationError;

// Every way a request can fail, each with one status code
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IP blocked due to rate limiting")]
    Blocked,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Invalid or missing API token")]
    Unauthorized,
    #[error("Endpoint not found")]
    EndpointNotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Request too large")]
    PayloadTooLarge,
    #[error("Empty request")]
    EmptyBody,
    #[error("Invalid JSON data")]
    InvalidJson,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Audio file not found: {0}")]
    NotFound(String),
    #[error("Playback already in progress")]
    PlayerBusy,
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Blocked | AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::EndpointNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::EmptyBody | AppError::InvalidJson | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PlayerBusy => StatusCode::CONFLICT,
            AppError::Playback(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Blocked => AppError::Blocked,
            Rejection::Exceeded => AppError::RateLimited,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            AppError::Playback(e) => {
                tracing::error!("Error playing audio: {}", e);
                self.to_string()
            }
            _ => self.to_string(),
        };

        (self.status(), Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::Blocked.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(AppError::InvalidJson.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(ValidationError::InvalidName).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("a.mp3".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(PlaybackError::Timeout).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_messages_pass_through() {
        let err = AppError::from(ValidationError::NotAllowed("x.mp3".into()));
        assert_eq!(err.to_string(), "Audio file not allowed: x.mp3");
    }

    #[test]
    fn rejections_map_to_distinct_messages() {
        assert_eq!(AppError::from(Rejection::Blocked).to_string(), "IP blocked due to rate limiting");
        assert_eq!(AppError::from(Rejection::Exceeded).to_string(), "Rate limit exceeded");
    }

    #[tokio::test]
    async fn internal_detail_is_not_sent_to_client() {
        let response = AppError::Internal("disk on fire at /var/x".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
    }
}
