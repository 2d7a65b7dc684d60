//! BigDummy Analytics Core
//!
//! Core types and request-scoped logic for the BigDummy query gateway:
//! credential reconstruction, PII masking, the dry-run cost model, the
//! natural-language translator seam, and query-text validation.
//!
//! Nothing in this crate performs I/O. The HTTP adapters live in
//! `bigdummy-gcp-client` and the server in `bigdummy-analytics-api`.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub mod cost;
pub mod credential;
pub mod masking;
pub mod translate;
pub mod validation;

pub use cost::{CostEstimate, CostModel};
pub use credential::{build_credential, Credential, OAuthSettings};
pub use masking::{mask_row, mask_rows, RowMapping, MASK_TOKEN, PII_FIELDS};
pub use translate::{MockTranslator, TranslationResult, Translator};

/// A single column in a table definition.
///
/// `fields` is only populated for `RECORD`/`STRUCT` columns and `mode` only
/// when the column is `REPEATED`, so scalar columns serialize as `{name, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ColumnSchema>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            mode: None,
            fields: Vec::new(),
        }
    }

    /// Returns true if the column holds nested fields.
    pub fn is_nested(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Columns of one table, in table-definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<ColumnSchema>,
}

/// Table name to column list, in the order the listing call returned tables.
///
/// Serializes as a JSON object keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    tables: Vec<TableColumns>,
}

impl SchemaReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: impl Into<String>, columns: Vec<ColumnSchema>) {
        self.tables.push(TableColumns {
            table: table.into(),
            columns,
        });
    }

    pub fn tables(&self) -> &[TableColumns] {
        &self.tables
    }

    pub fn get(&self, table: &str) -> Option<&[ColumnSchema]> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.columns.as_slice())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Serialize for SchemaReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.table, &table.columns)?;
        }
        map.end()
    }
}

/// Machine-readable error category, exposed alongside the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    MissingAuthorization,
    AuthExchange,
    QueryEngine,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::MissingAuthorization => "missing_authorization",
            ErrorKind::AuthExchange => "auth_exchange",
            ErrorKind::QueryEngine => "query_engine",
            ErrorKind::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while serving a gateway request.
///
/// `Display` is the bare underlying message; callers that need the category
/// use [`AnalyticsError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Missing or unreadable secrets/configuration
    #[error("{0}")]
    Configuration(String),

    /// Absent or malformed `Authorization` header
    #[error("{0}")]
    MissingAuthorization(String),

    /// Identity provider rejected the authorization code exchange
    #[error("{0}")]
    AuthExchange(String),

    /// Any failure reported by the warehouse or its transport
    #[error("{0}")]
    QueryEngine(String),

    /// Missing required request field
    #[error("{0}")]
    Validation(String),
}

impl AnalyticsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyticsError::Configuration(_) => ErrorKind::Configuration,
            AnalyticsError::MissingAuthorization(_) => ErrorKind::MissingAuthorization,
            AnalyticsError::AuthExchange(_) => ErrorKind::AuthExchange,
            AnalyticsError::QueryEngine(_) => ErrorKind::QueryEngine,
            AnalyticsError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Returns true if the failure was caused by the caller's request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalyticsError::MissingAuthorization(_)
                | AnalyticsError::AuthExchange(_)
                | AnalyticsError::Validation(_)
        )
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
