//! Input validation for the query gateway
//!
//! Provides:
//! - Required-field checks for request bodies
//! - Identifier checks for the configured project and dataset, which are
//!   interpolated into generated SQL
//! - Advisory lint for submitted SQL (never blocks submission)

use crate::masking::PII_FIELDS;
use crate::translate::NO_QUERY_PROVIDED;
use crate::{AnalyticsError, Result};

/// Maximum length for a project id
pub const MAX_PROJECT_ID_LEN: usize = 128;

/// Maximum length for a dataset id
pub const MAX_DATASET_ID_LEN: usize = 1024;

/// Require a non-empty `query` field.
pub fn require_query(query: Option<&str>) -> Result<&str> {
    match query {
        Some(q) if !q.is_empty() => Ok(q),
        _ => Err(AnalyticsError::Validation(NO_QUERY_PROVIDED.to_string())),
    }
}

/// Validate a project id
///
/// Requirements:
/// - Not empty
/// - <= 128 characters
/// - Lowercase letters, digits, hyphen, plus `.` and `:` for domain-scoped projects
pub fn validate_project_id(project_id: &str) -> Result<()> {
    if project_id.is_empty() {
        return Err(AnalyticsError::Configuration(
            "Project id cannot be empty".to_string(),
        ));
    }

    if project_id.len() > MAX_PROJECT_ID_LEN {
        return Err(AnalyticsError::Configuration(format!(
            "Project id too long: {} > {} characters",
            project_id.len(),
            MAX_PROJECT_ID_LEN
        )));
    }

    if !project_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | ':'))
    {
        return Err(AnalyticsError::Configuration(
            "Project id contains invalid characters (allowed: a-z, 0-9, -, ., :)".to_string(),
        ));
    }

    Ok(())
}

/// Validate a dataset id
///
/// Requirements:
/// - Not empty
/// - <= 1024 characters
/// - ASCII letters, digits, underscore only
pub fn validate_dataset_id(dataset_id: &str) -> Result<()> {
    if dataset_id.is_empty() {
        return Err(AnalyticsError::Configuration(
            "Dataset id cannot be empty".to_string(),
        ));
    }

    if dataset_id.len() > MAX_DATASET_ID_LEN {
        return Err(AnalyticsError::Configuration(format!(
            "Dataset id too long: {} > {} characters",
            dataset_id.len(),
            MAX_DATASET_ID_LEN
        )));
    }

    if !dataset_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AnalyticsError::Configuration(
            "Dataset id contains invalid characters (allowed: A-Z, a-z, 0-9, _)".to_string(),
        ));
    }

    Ok(())
}

/// Advisory warnings for a GA4 query.
///
/// Flags `event_params` access without `UNNEST` and any PII column referenced
/// by name. Warnings are informational; the query is still submitted as-is.
pub fn lint(sql: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    let identifiers: Vec<String> = sql
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect();

    let has = |name: &str| identifiers.iter().any(|token| token == name);

    if has("event_params") && !has("unnest") {
        warnings.push("Missing UNNEST for event_params access".to_string());
    }

    for column in PII_FIELDS {
        if has(column) {
            warnings.push(format!("Query contains PII column: {}", column));
        }
    }

    warnings
}
