//! BigDummy Analytics API Library
//!
//! Router, configuration and handlers for the query gateway. The binary in
//! `main.rs` only wires these to a listener.

pub mod auth;
pub mod config;
pub mod error;
pub mod health;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router over the given state.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .route("/ready", get(health::readiness_check))
        .route("/auth/google", get(auth::begin_auth))
        .route("/oauth2callback", get(auth::oauth_callback))
        .route("/api/schema", get(routes::get_schema))
        .route("/api/estimate", post(routes::estimate_query))
        .route("/api/query", post(routes::execute_query))
        .route("/api/nlp-to-sql", post(routes::nlp_to_sql))
        .route("/api/validate", post(routes::validate_query));

    #[cfg(feature = "metrics")]
    let router = router
        .route("/metrics", get(metrics::metrics_handler))
        .layer(axum::middleware::from_fn(metrics::track_metrics));

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
