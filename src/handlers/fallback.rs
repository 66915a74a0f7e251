use crate::error::AppError;

// any path other than the known routes
pub async fn not_found() -> AppError {
    AppError::EndpointNotFound
}

// known path, wrong verb
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
