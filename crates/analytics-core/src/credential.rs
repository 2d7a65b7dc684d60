//! Per-request credential reconstruction from the inbound `Authorization` header.

use crate::{AnalyticsError, Result};
use std::fmt;

/// Read-only warehouse access scope requested from the identity provider.
pub const BIGQUERY_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.readonly";

/// Default token endpoint of the identity provider.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Process-level OAuth client settings used to build credentials.
///
/// `Debug` masks the client secret.
#[derive(Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub scopes: Vec<String>,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            scopes: vec![BIGQUERY_READONLY_SCOPE.to_string()],
        }
    }
}

impl fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("token_uri", &self.token_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Short-lived credential built from a caller-supplied bearer token.
///
/// The token is trusted as-is; the warehouse is the only party that
/// validates it.
#[derive(Clone)]
pub struct Credential {
    token: String,
    pub scopes: Vec<String>,
    pub token_uri: String,
    pub client_id: String,
    client_secret: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, settings: &OAuthSettings) -> Self {
        Self {
            token: token.into(),
            scopes: settings.scopes.clone(),
            token_uri: settings.token_uri.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        }
    }

    pub fn bearer_token(&self) -> &str {
        &self.token
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Value for an outbound `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"***REDACTED***")
            .field("scopes", &self.scopes)
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .finish()
    }
}

fn redact(secret: &str) -> Option<&'static str> {
    if secret.is_empty() {
        None
    } else {
        Some("***REDACTED***")
    }
}

/// Build a credential from a raw `Authorization` header value.
///
/// The header must look like `"<scheme> <token>"`. Only the second token is
/// used; the scheme is not checked.
pub fn build_credential(auth_header: Option<&str>, settings: &OAuthSettings) -> Result<Credential> {
    let header = auth_header.ok_or_else(|| {
        AnalyticsError::MissingAuthorization("No authorization header".to_string())
    })?;

    let token = header.split_whitespace().nth(1).ok_or_else(|| {
        AnalyticsError::MissingAuthorization(
            "Malformed authorization header, expected '<scheme> <token>'".to_string(),
        )
    })?;

    Ok(Credential::new(token, settings))
}
