//! Mapping of domain errors onto HTTP responses.
//!
//! Bodies are always `{"error": "<message>"}`. The error category travels in
//! the `X-Error-Kind` header so clients can branch without parsing messages.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bigdummy_analytics_core::{AnalyticsError, ErrorKind};
use serde::Serialize;

/// Response header carrying the [`ErrorKind`] of a failed request.
pub const ERROR_KIND_HEADER: &str = "x-error-kind";

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error wrapper.
#[derive(Debug)]
pub struct ApiError(pub AnalyticsError);

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::MissingAuthorization => StatusCode::UNAUTHORIZED,
        ErrorKind::AuthExchange => StatusCode::BAD_REQUEST,
        ErrorKind::QueryEngine => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        let message = self.0.to_string();

        if status.is_server_error() {
            tracing::error!(kind = %kind, error = %message, "Request failed");
        } else {
            tracing::warn!(kind = %kind, error = %message, "Request rejected");
        }

        (
            status,
            [(ERROR_KIND_HEADER, HeaderValue::from_static(kind.as_str()))],
            Json(ErrorResponse { error: message }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AnalyticsError::Configuration("x".into()), 500),
            (AnalyticsError::MissingAuthorization("x".into()), 401),
            (AnalyticsError::AuthExchange("x".into()), 400),
            (AnalyticsError::QueryEngine("x".into()), 500),
            (AnalyticsError::Validation("x".into()), 400),
        ];
        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status().as_u16(), expected);
        }
    }

    #[tokio::test]
    async fn test_body_and_header() {
        let response =
            ApiError(AnalyticsError::Validation("No query provided".into())).into_response();
        assert_eq!(
            response.headers().get("x-error-kind").unwrap(),
            "validation"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"error":"No query provided"}"#);
    }
}
