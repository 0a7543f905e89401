//! Route configuration and setup

use crate::constants::BODY_LIMIT_OVERHEAD;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use pdfgate_core::Config;
use pdfgate_infra::{request_id_middleware, security_headers_middleware};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router with all endpoints and middleware.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let sync_body_limit = config
        .limits
        .sync_max_html_bytes
        .saturating_add(BODY_LIMIT_OVERHEAD);
    let async_body_limit = config
        .limits
        .max_file_size
        .saturating_add(BODY_LIMIT_OVERHEAD);

    Router::new()
        .route("/", get(handlers::root::service_info))
        .route("/health", get(handlers::health::health_check))
        .route(
            "/generate-pdf",
            post(handlers::convert::generate_pdf).layer(DefaultBodyLimit::max(sync_body_limit)),
        )
        .route(
            "/generate-pdf-async",
            post(handlers::convert::generate_pdf_async)
                .layer(DefaultBodyLimit::max(async_body_limit)),
        )
        .route("/job-status/{job_id}", get(handlers::jobs::job_status))
        .route("/job-result/{job_id}", get(handlers::jobs::job_result))
        .route("/job/{job_id}", delete(handlers::jobs::delete_job))
        .layer(setup_cors(config))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    if config.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any)
}
