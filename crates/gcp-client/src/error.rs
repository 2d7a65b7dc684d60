//! Error types for the Google Cloud adapters.

use bigdummy_analytics_core::AnalyticsError;

/// Errors that can occur when talking to Google APIs.
#[derive(Debug, thiserror::Error)]
pub enum GcpError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success answer from a Google API. Displays the API's own message.
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
        /// Machine-readable reason (e.g. `invalidQuery`, `accessDenied`)
        reason: Option<String>,
    },

    /// Identity provider rejected the code exchange
    #[error("{0}")]
    OAuth(String),

    /// Client secrets file missing or unreadable
    #[error("{0}")]
    Secrets(String),

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GcpError {
    /// HTTP status reported by the API, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GcpError::Api { status, .. } => Some(*status),
            GcpError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for Google API operations.
pub type Result<T> = std::result::Result<T, GcpError>;

impl From<GcpError> for AnalyticsError {
    fn from(err: GcpError) -> Self {
        match err {
            GcpError::Secrets(msg) => AnalyticsError::Configuration(msg),
            GcpError::Config(msg) => AnalyticsError::Configuration(msg),
            GcpError::OAuth(msg) => AnalyticsError::AuthExchange(msg),
            other => AnalyticsError::QueryEngine(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdummy_analytics_core::ErrorKind;

    #[test]
    fn test_api_error_displays_message() {
        let err = GcpError::Api {
            status: 400,
            message: "Syntax error: Unexpected end of script at [1:7]".to_string(),
            reason: Some("invalidQuery".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Syntax error: Unexpected end of script at [1:7]"
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_conversion_to_analytics_error() {
        let api = GcpError::Api {
            status: 403,
            message: "Access Denied".to_string(),
            reason: Some("accessDenied".to_string()),
        };
        let converted: AnalyticsError = api.into();
        assert_eq!(converted.kind(), ErrorKind::QueryEngine);
        assert_eq!(converted.to_string(), "Access Denied");

        let secrets: AnalyticsError = GcpError::Secrets("missing".to_string()).into();
        assert_eq!(secrets.kind(), ErrorKind::Configuration);

        let oauth: AnalyticsError = GcpError::OAuth("(invalid_grant) Bad Request".into()).into();
        assert_eq!(oauth.kind(), ErrorKind::AuthExchange);
        assert_eq!(oauth.to_string(), "(invalid_grant) Bad Request");

        let invalid: AnalyticsError = GcpError::InvalidResponse("no body".to_string()).into();
        assert_eq!(invalid.kind(), ErrorKind::QueryEngine);
    }
}
