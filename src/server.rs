use axum::{
    Router,
    http::{HeaderValue, header},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admission_gate, method_not_allowed, metrics_handler, not_found, play_handler,
};
use crate::state::AppState;

// Build the router: /play behind the admission gate, CORS origin on everything
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new().route("/play", post(play_handler).fallback(method_not_allowed));

    if state.metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), admission_gate))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
