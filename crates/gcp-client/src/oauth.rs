//! Google OAuth 2.0 authorization-code flow for installed/web clients.
//!
//! The flow is stateless across requests: each call loads the client
//! secrets, and the `state` parameter is generated but not stored.

use crate::error::{GcpError, Result};
use bigdummy_analytics_core::credential::{BIGQUERY_READONLY_SCOPE, DEFAULT_TOKEN_URI};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Google's authorization endpoint, used when the secrets file omits `auth_uri`.
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

const STATE_LEN: usize = 30;

/// OAuth client registration, as downloaded from the Google Cloud console.
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***REDACTED***")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Deserialize)]
struct SecretsFile {
    web: Option<ClientSecrets>,
    installed: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse the console JSON format (`{"web": {...}}` or `{"installed": {...}}`).
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(raw)
            .map_err(|e| GcpError::Secrets(format!("Invalid client secrets file: {}", e)))?;
        file.web.or(file.installed).ok_or_else(|| {
            GcpError::Secrets(
                "Invalid client secrets file: expected a \"web\" or \"installed\" section"
                    .to_string(),
            )
        })
    }

    /// Load and parse a client secrets file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            GcpError::Secrets(format!(
                "Unable to read client secrets file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }
}

/// Where to send the user, and the `state` that was embedded in the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Tokens issued for an authorization code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"***REDACTED***")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Authorization-code flow bound to one client registration and redirect URI.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    http: reqwest::Client,
    secrets: ClientSecrets,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl OAuthFlow {
    pub fn new(
        http: reqwest::Client,
        secrets: ClientSecrets,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            http,
            secrets,
            redirect_uri: redirect_uri.into(),
            scopes: vec![BIGQUERY_READONLY_SCOPE.to_string()],
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Build the consent URL with a fresh random `state`.
    pub fn authorization_url(&self) -> Result<AuthorizationRequest> {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();

        let mut url = url::Url::parse(&self.secrets.auth_uri)
            .map_err(|e| GcpError::Secrets(format!("Invalid auth_uri in client secrets: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.secrets.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true");

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    /// Extract the code from the provider's redirect and exchange it.
    pub async fn exchange_callback(&self, callback_url: &str) -> Result<TokenPair> {
        let url = url::Url::parse(callback_url)
            .map_err(|e| GcpError::OAuth(format!("Invalid callback URL: {}", e)))?;
        self.exchange_query(url.query().unwrap_or_default()).await
    }

    /// Exchange the code carried by the provider's redirect query string
    /// (`code=...&state=...` or `error=...`).
    pub async fn exchange_query(&self, query: &str) -> Result<TokenPair> {
        let mut code = None;
        let mut error = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(GcpError::OAuth(format!("Authorization failed: {}", error)));
        }
        match code {
            Some(code) if !code.is_empty() => self.exchange_code(&code).await,
            _ => Err(GcpError::OAuth(
                "Missing code parameter in callback".to_string(),
            )),
        }
    }

    /// POST the authorization code to the token endpoint.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&self.secrets.token_uri)
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let parsed: Option<TokenErrorBody> = serde_json::from_slice(&body).ok();
            let message = match parsed {
                Some(TokenErrorBody {
                    error: Some(error),
                    error_description: Some(description),
                }) => format!("({}) {}", error, description),
                Some(TokenErrorBody {
                    error: Some(error),
                    ..
                }) => error,
                _ => format!("Token endpoint returned {}", status),
            };
            tracing::warn!(status = %status.as_u16(), error = %message, "Token exchange failed");
            return Err(GcpError::OAuth(message));
        }

        let tokens: TokenPair = serde_json::from_slice(&body)
            .map_err(|e| GcpError::OAuth(format!("Invalid token response: {}", e)))?;
        tracing::info!(
            refresh_token = tokens.refresh_token.is_some(),
            "Authorization code exchanged"
        );
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB_SECRETS: &str = r#"{
        "web": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "demo",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost:5000/oauth2callback"]
        }
    }"#;

    fn flow() -> OAuthFlow {
        OAuthFlow::new(
            reqwest::Client::new(),
            ClientSecrets::from_json(WEB_SECRETS).unwrap(),
            "http://localhost:5000/oauth2callback",
        )
    }

    #[test]
    fn test_parse_web_and_installed() {
        let web = ClientSecrets::from_json(WEB_SECRETS).unwrap();
        assert_eq!(web.client_id, "123.apps.googleusercontent.com");

        let installed = ClientSecrets::from_json(
            r#"{"installed": {"client_id": "abc", "client_secret": "def"}}"#,
        )
        .unwrap();
        assert_eq!(installed.auth_uri, DEFAULT_AUTH_URI);
        assert_eq!(installed.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_parse_rejects_unknown_layout() {
        let err = ClientSecrets::from_json(r#"{"service_account": {}}"#).unwrap_err();
        assert!(matches!(err, GcpError::Secrets(_)));
        assert!(ClientSecrets::from_json("not json").is_err());
    }

    #[test]
    fn test_secrets_debug_redacts() {
        let secrets = ClientSecrets::from_json(WEB_SECRETS).unwrap();
        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("shh"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_authorization_url() {
        let request = flow().authorization_url().unwrap();
        let url = url::Url::parse(&request.url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(request
            .url
            .starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "123.apps.googleusercontent.com");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:5000/oauth2callback"
        );
        assert_eq!(params["scope"], BIGQUERY_READONLY_SCOPE);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["include_granted_scopes"], "true");
        assert_eq!(params["state"], request.state);
        assert_eq!(request.state.len(), STATE_LEN);
    }

    #[test]
    fn test_state_is_random() {
        let flow = flow();
        let a = flow.authorization_url().unwrap();
        let b = flow.authorization_url().unwrap();
        assert_ne!(a.state, b.state);
    }

    #[tokio::test]
    async fn test_callback_with_provider_error() {
        let err = flow()
            .exchange_callback("http://localhost:5000/oauth2callback?error=access_denied&state=x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Authorization failed: access_denied");
    }

    #[tokio::test]
    async fn test_query_with_provider_error() {
        let err = flow()
            .exchange_query("error=access_denied&state=x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Authorization failed: access_denied");
    }

    #[tokio::test]
    async fn test_query_without_code() {
        let err = flow().exchange_query("state=x").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing code parameter in callback");

        let err = flow().exchange_query("").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing code parameter in callback");
    }

    #[tokio::test]
    async fn test_callback_without_code() {
        let err = flow()
            .exchange_callback("http://localhost:5000/oauth2callback?state=x")
            .await
            .unwrap_err();
        assert!(matches!(err, GcpError::OAuth(_)));
    }

    #[tokio::test]
    async fn test_from_file_missing() {
        let err = ClientSecrets::from_file("/nonexistent/client_secrets.json")
            .await
            .unwrap_err();
        assert!(matches!(err, GcpError::Secrets(_)));
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secrets.json");
        std::fs::write(&path, WEB_SECRETS).unwrap();

        let secrets = ClientSecrets::from_file(&path).await.unwrap();
        assert_eq!(secrets.client_secret, "shh");
    }

    #[test]
    fn test_token_pair_debug_redacts() {
        let tokens = TokenPair {
            access_token: "ya29.secret".to_string(),
            refresh_token: Some("1//refresh".to_string()),
        };
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("ya29"));
        assert!(!debug.contains("1//refresh"));
    }
}
