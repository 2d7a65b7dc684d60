//! Warehouse and translation endpoints.

use crate::error::ApiError;
use crate::AppState;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use bigdummy_analytics_core::validation::{lint, require_query};
use bigdummy_analytics_core::{
    build_credential, AnalyticsError, CostEstimate, Credential, RowMapping, SchemaReport,
    TranslationResult,
};
use serde::{Deserialize, Serialize};

/// Body accepted by every endpoint that takes query text.
#[derive(Debug, Default, Deserialize)]
pub struct QueryBody {
    #[serde(default)]
    pub query: Option<String>,
}

impl QueryBody {
    /// Lenient parse: a missing, empty or malformed body yields no query.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct LintResponse {
    pub warnings: Vec<String>,
}

fn credential(state: &AppState, headers: &HeaderMap) -> Result<Credential, AnalyticsError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    build_credential(header, &state.config.oauth)
}

#[cfg(feature = "metrics")]
fn record<T>(operation: &str, result: &Result<T, AnalyticsError>) {
    let status = if result.is_ok() { "success" } else { "error" };
    crate::metrics::record_warehouse_operation(operation, status);
}

#[cfg(not(feature = "metrics"))]
fn record<T>(_operation: &str, _result: &Result<T, AnalyticsError>) {}

/// GET /api/schema
pub async fn get_schema(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SchemaReport>, ApiError> {
    let credential = credential(&state, &headers)?;
    let result = state.warehouse.get_schema(&credential).await;
    record("schema", &result);
    Ok(Json(result?))
}

/// POST /api/estimate
pub async fn estimate_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CostEstimate>, ApiError> {
    let credential = credential(&state, &headers)?;
    let body = QueryBody::parse(&body);
    let sql = require_query(body.query.as_deref())?;

    let result = state.warehouse.estimate(&credential, sql).await;
    record("estimate", &result);
    Ok(Json(result?))
}

/// POST /api/query
pub async fn execute_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<RowMapping>>, ApiError> {
    let credential = credential(&state, &headers)?;
    let body = QueryBody::parse(&body);
    let sql = require_query(body.query.as_deref())?;

    let result = state.warehouse.execute(&credential, sql).await;
    record("query", &result);
    Ok(Json(result?))
}

/// POST /api/nlp-to-sql
pub async fn nlp_to_sql(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TranslationResult>, ApiError> {
    let body = QueryBody::parse(&body);
    let text = require_query(body.query.as_deref())?;

    let result = state.translator.translate(text).await;
    record("translate", &result);
    let translation = result?;

    tracing::info!(
        translator = state.translator.name(),
        is_mock = translation.is_mock,
        "Translated question"
    );
    Ok(Json(translation))
}

/// POST /api/validate
pub async fn validate_query(body: Bytes) -> Result<Json<LintResponse>, ApiError> {
    let body = QueryBody::parse(&body);
    let sql = require_query(body.query.as_deref())?;
    Ok(Json(LintResponse {
        warnings: lint(sql),
    }))
}
