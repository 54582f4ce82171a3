//! Router setup with all routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use campus_core::config::ServerConfig;
use campus_core::error::CampusError;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let port = state.config.server.port;
    let rate_limit_per_sec = state.config.server.rate_limit_per_sec;
    let body_limit_bytes = state.config.server.body_limit_bytes;

    // The page is served same-origin; allow local development origins only.
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", port),
        format!("http://localhost:{}", port),
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    let limiter = RateLimiter::new(rate_limit_per_sec);

    let page_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/static/js/script.js", get(handlers::script));

    let json_routes = Router::new()
        .route("/ask", post(handlers::ask))
        .route("/reset", post(handlers::reset))
        .route("/history", get(handlers::history))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(axum::Extension(limiter));

    page_routes
        .merge(json_routes)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the configured address and serve until the process exits.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), CampusError> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CampusError::Api(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(address = %addr, "Campus Guide listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| CampusError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
