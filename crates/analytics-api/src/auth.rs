//! OAuth consent and callback endpoints.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{RawQuery, State},
    Json,
};
use bigdummy_analytics_core::AnalyticsError;
use bigdummy_gcp_client::{ClientSecrets, OAuthFlow};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub refresh_token: Option<String>,
}

async fn load_flow(state: &AppState) -> Result<OAuthFlow, AnalyticsError> {
    let secrets = ClientSecrets::from_file(&state.config.client_secrets_file).await?;
    Ok(OAuthFlow::new(
        state.http.clone(),
        secrets,
        state.config.redirect_uri.clone(),
    ))
}

/// GET /auth/google
pub async fn begin_auth(State(state): State<AppState>) -> Result<Json<AuthUrlResponse>, ApiError> {
    let flow = load_flow(&state).await?;
    let request = flow.authorization_url().map_err(AnalyticsError::from)?;

    tracing::info!("Issued authorization URL");
    Ok(Json(AuthUrlResponse {
        auth_url: request.url,
    }))
}

/// GET /oauth2callback
///
/// `code`, `state` and `error` are read from the inbound query string as-is,
/// independent of any query the configured redirect URI carries.
pub async fn oauth_callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<TokenResponse>, ApiError> {
    let flow = load_flow(&state).await?;
    let tokens = flow
        .exchange_query(query.as_deref().unwrap_or_default())
        .await
        .map_err(AnalyticsError::from)?;

    Ok(Json(TokenResponse {
        token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}
