//! Health Check Module
//!
//! Provides Kubernetes-compatible health endpoints:
//! - `/health` - Basic health check (returns "ok")
//! - `/ready` - Readiness probe (checks the OAuth client secrets parse)
//! - `/live` - Liveness probe (always returns healthy if the process is running)
//!
//! Readiness never calls BigQuery: the service holds no credentials of its
//! own, so warehouse reachability can only be observed per request.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use bigdummy_gcp_client::ClientSecrets;
use serde::Serialize;

use crate::AppState;

/// Health check response with detailed status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secrets: Option<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translator: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status enumeration
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Basic health check - always returns "ok" if the server is running
pub async fn health_check() -> &'static str {
    "ok"
}

/// Liveness probe - indicates if the application is running
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: HealthStatus::Healthy,
            client_secrets: None,
            translator: None,
            message: Some("Service is alive".to_string()),
        }),
    )
}

/// Readiness probe - indicates if the application is ready to serve traffic
///
/// A missing client secrets file only disables the consent flow, so it
/// reports degraded. A file that is present but does not parse is a broken
/// deployment and reports unhealthy.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let path = &state.config.client_secrets_file;
    let secrets_health = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => match ClientSecrets::from_file(path).await {
            Ok(_) => ComponentHealth {
                status: HealthStatus::Healthy,
                message: None,
            },
            Err(e) => ComponentHealth {
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            },
        },
        Ok(_) => ComponentHealth {
            status: HealthStatus::Degraded,
            message: Some("client secrets path is not a file".to_string()),
        },
        Err(e) => ComponentHealth {
            status: HealthStatus::Degraded,
            message: Some(format!("client secrets unavailable: {}", e)),
        },
    };

    let overall_status = secrets_health.status;
    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Queries still work with caller tokens
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let message = match overall_status {
        HealthStatus::Healthy => "Service is ready",
        HealthStatus::Degraded => "Service is ready, OAuth consent unavailable",
        HealthStatus::Unhealthy => "Service is not ready, client secrets are invalid",
    };

    let response = HealthResponse {
        status: overall_status,
        client_secrets: Some(secrets_health),
        translator: Some(state.translator.name()),
        message: Some(message.to_string()),
    };

    tracing::debug!(status = ?overall_status, "Readiness check completed");

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let result = health_check().await;
        assert_eq!(result, "ok");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(HealthStatus::Degraded).unwrap(),
            serde_json::json!("degraded")
        );
    }
}
