//! Wire types for the BigQuery REST API v2.
//!
//! Only the fields this crate reads or sends are modeled. BigQuery encodes
//! 64-bit integers as JSON strings, so counters arrive as `String` and are
//! parsed by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies a table inside a project and dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

/// One entry of a `tables.list` page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListEntry {
    pub table_reference: TableReference,
    #[serde(rename = "type")]
    pub table_type: Option<String>,
}

/// A page of `tables.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableList {
    #[serde(default)]
    pub tables: Vec<TableListEntry>,
    pub next_page_token: Option<String>,
}

/// Column definition as reported by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<TableFieldSchema>,
}

impl TableFieldSchema {
    pub fn is_repeated(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("REPEATED"))
    }

    pub fn is_record(&self) -> bool {
        matches!(
            self.field_type.to_ascii_uppercase().as_str(),
            "RECORD" | "STRUCT"
        )
    }
}

/// Ordered column list of a table or result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

/// Table metadata returned by `tables.get`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub table_reference: TableReference,
    #[serde(default)]
    pub schema: Option<TableSchema>,
}

/// Body of `jobs.query`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub dry_run: bool,
    pub use_query_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    pub timeout_ms: u64,
    pub format_options: DataFormatOptions,
}

impl QueryRequest {
    /// Standard SQL request that runs the query.
    pub fn standard(query: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            query: query.into(),
            use_legacy_sql: false,
            dry_run: false,
            use_query_cache: true,
            location: None,
            max_results: None,
            timeout_ms,
            format_options: DataFormatOptions::default(),
        }
    }

    /// Standard SQL request that only plans the query.
    pub fn dry_run(query: impl Into<String>) -> Self {
        Self {
            dry_run: true,
            use_query_cache: false,
            ..Self::standard(query, 0)
        }
    }
}

/// Output encoding options. Timestamps are requested as integer microseconds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFormatOptions {
    pub use_int64_timestamp: bool,
}

impl Default for DataFormatOptions {
    fn default() -> Self {
        Self {
            use_int64_timestamp: true,
        }
    }
}

/// Identifies a query job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Raw result row in `{"f": [{"v": ...}]}` form.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

/// Raw result cell.
#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

/// Answer to `jobs.query` and `jobs.getQueryResults`. Both share this shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub job_complete: bool,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub page_token: Option<String>,
    pub total_rows: Option<String>,
    pub total_bytes_processed: Option<String>,
    #[serde(default)]
    pub cache_hit: bool,
}

impl QueryResponse {
    /// Parsed `totalBytesProcessed`, zero when absent.
    pub fn bytes_processed(&self) -> crate::Result<u64> {
        match self.total_bytes_processed.as_deref() {
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| {
                crate::GcpError::InvalidResponse(format!(
                    "totalBytesProcessed is not an integer: {}",
                    raw
                ))
            }),
        }
    }
}

/// Google API error envelope: `{"error": {"code", "message", "status", "errors"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorItem {
    pub reason: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_wire_format() {
        let body = serde_json::to_value(QueryRequest::dry_run("SELECT 1")).unwrap();
        assert_eq!(body["query"], "SELECT 1");
        assert_eq!(body["useLegacySql"], false);
        assert_eq!(body["dryRun"], true);
        assert_eq!(body["useQueryCache"], false);
        assert_eq!(body["formatOptions"]["useInt64Timestamp"], true);
        assert!(body.get("location").is_none());
    }

    #[test]
    fn test_query_response_parses_rows() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "kind": "bigquery#queryResponse",
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "jobComplete": true,
            "schema": {"fields": [{"name": "n", "type": "INTEGER", "mode": "NULLABLE"}]},
            "rows": [{"f": [{"v": "42"}]}],
            "totalRows": "1",
            "totalBytesProcessed": "1024"
        }))
        .unwrap();

        assert!(resp.job_complete);
        assert_eq!(resp.rows.len(), 1);
        assert_eq!(resp.rows[0].f[0].v, json!("42"));
        assert_eq!(resp.bytes_processed().unwrap(), 1024);
        assert_eq!(resp.job_reference.unwrap().job_id, "job_1");
    }

    #[test]
    fn test_bytes_processed_defaults_and_rejects_garbage() {
        let empty = QueryResponse::default();
        assert_eq!(empty.bytes_processed().unwrap(), 0);

        let bad = QueryResponse {
            total_bytes_processed: Some("lots".to_string()),
            ..Default::default()
        };
        assert!(bad.bytes_processed().is_err());
    }

    #[test]
    fn test_field_schema_flags() {
        let field: TableFieldSchema = serde_json::from_value(json!({
            "name": "items",
            "type": "RECORD",
            "mode": "REPEATED",
            "fields": [{"name": "item_id", "type": "STRING"}]
        }))
        .unwrap();
        assert!(field.is_record());
        assert!(field.is_repeated());
        assert_eq!(field.fields.len(), 1);
        assert!(!field.fields[0].is_repeated());
    }

    #[test]
    fn test_error_envelope() {
        let body: ApiErrorBody = serde_json::from_value(json!({
            "error": {
                "code": 404,
                "message": "Not found: Dataset p:analytics_1",
                "errors": [{"message": "Not found", "domain": "global", "reason": "notFound"}],
                "status": "NOT_FOUND"
            }
        }))
        .unwrap();
        assert_eq!(body.error.code, 404);
        assert_eq!(body.error.errors[0].reason.as_deref(), Some("notFound"));
    }
}
