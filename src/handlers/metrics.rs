use axum::response::IntoResponse;
use crate::error::AppError;
use crate::metrics;

pub async fn metrics_handler() -> Result<impl IntoResponse, AppError> {
    metrics::render().map_err(AppError::Internal)
}
