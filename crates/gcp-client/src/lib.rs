//! BigDummy Google Cloud adapters
//!
//! Thin HTTP clients for the services the query gateway brokers:
//!
//! - **BigQuery REST v2**: table listing, dry runs, query execution with
//!   result paging ([`BigQueryClient`], [`Warehouse`])
//! - **Google OAuth 2.0**: authorization URL construction and code exchange
//!   ([`OAuthFlow`])
//! - **Gemini**: a model-backed [`Translator`](bigdummy_analytics_core::Translator)
//!   ([`ModelBackedTranslator`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bigdummy_analytics_core::{build_credential, CostModel, OAuthSettings};
//! use bigdummy_gcp_client::{BigQueryClient, ClientConfig, Warehouse};
//!
//! let client = BigQueryClient::new(ClientConfig::builder("https://bigquery.googleapis.com").build()?)?;
//! let warehouse = Warehouse::new(client, "my-project", "analytics_123456", CostModel::default());
//!
//! let cred = build_credential(Some("Bearer ya29..."), &OAuthSettings::default())?;
//! let estimate = warehouse.estimate(&cred, "SELECT 1").await?;
//! println!("{} bytes, ${:.4}", estimate.bytes_processed, estimate.estimated_cost);
//! ```
//!
//! # Retries
//!
//! None. Every call is attempted exactly once and failures surface
//! immediately to the caller.

pub mod bigquery;
pub mod config;
pub mod error;
pub mod gemini;
pub mod oauth;
pub mod rows;
pub mod types;
pub mod warehouse;

pub use bigquery::{BigQueryClient, QueryOutcome};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{GcpError, Result};
pub use gemini::{GeminiConfig, ModelBackedTranslator};
pub use oauth::{AuthorizationRequest, ClientSecrets, OAuthFlow, TokenPair};
pub use warehouse::Warehouse;
