use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::set_expose_error_details;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, security_headers_middleware, trace_id,
};
use crate::routes::{guest_import, health, households};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);
    set_expose_error_details(config.server.expose_error_details);

    if config.security.admin_api_key.is_none() {
        tracing::warn!(
            "security.admin_api_key is not set; admin import routes are open to anyone"
        );
    }

    let state = AppState {
        pool,
        config: config.clone(),
    };

    let cors = build_cors(&config.security.cors_origins);

    // Admin routes (X-API-Key checked against security.admin_api_key)
    let admin_routes = Router::new()
        .merge(guest_import::router())
        .merge(households::admin_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .merge(households::public_router())
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/api/health/ready", get(health::ready))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(admin_routes)
        .merge(public_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn_with_state(
            config.security.hsts_enabled,
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise the configured list.
fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<_> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}
