//! API route definitions

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Uri},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{error::ServerError, handlers, state::AppState, ServerConfig};

async fn handle_404(uri: Uri) -> impl IntoResponse {
    ServerError::NotFound(uri.path().to_string())
}

async fn handle_405() -> impl IntoResponse {
    ServerError::MethodNotAllowed
}

fn cors_layer() -> CorsLayer {
    // CORS_ORIGIN pins a single origin; unset or "*" allows any
    match std::env::var("CORS_ORIGIN") {
        Ok(origin) if !origin.is_empty() && origin != "*" => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new().allow_origin(value).allow_methods(Any).allow_headers(Any),
            Err(_) => {
                tracing::warn!(origin = %origin, "Invalid CORS_ORIGIN, allowing any origin");
                CorsLayer::permissive()
            }
        },
        _ => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    }
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health_check))
        .route("/model/info", get(handlers::model_info))
        .route("/model/reload", post(handlers::reload_model))
        .route("/metrics", get(handlers::metrics))
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}
