//! HTTP front end for the receipt parser.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, http::Method, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, ServerConfig};
pub use state::AppState;

/// Build the application router with CORS, tracing and the upload size limit applied.
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    routes::router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
