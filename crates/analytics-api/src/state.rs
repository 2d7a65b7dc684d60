//! Shared, read-only application state.

use crate::config::AppConfig;
use bigdummy_analytics_core::{AnalyticsError, MockTranslator, Result, Translator};
use bigdummy_gcp_client::{BigQueryClient, ClientConfig, ModelBackedTranslator, Warehouse};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub warehouse: Warehouse,
    pub translator: Arc<dyn Translator>,
    /// Pooled client for OAuth and model calls.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut client_config = ClientConfig::builder(config.bigquery_url.clone());
        if let Some(timeout) = config.bigquery_timeout {
            client_config = client_config.timeout(timeout);
        }
        if let Some(ref location) = config.bigquery_location {
            client_config = client_config.location(location.clone());
        }
        let client = BigQueryClient::new(client_config.build()?)?;

        let warehouse = Warehouse::new(
            client,
            config.project_id.clone(),
            config.dataset_id.clone(),
            config.cost_model,
        )
        .with_cancel_on_disconnect(config.cancel_on_disconnect);

        let http = reqwest::Client::builder()
            .user_agent(concat!("bigdummy-analytics-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyticsError::Configuration(format!("HTTP client: {}", e)))?;

        let translator: Arc<dyn Translator> = match config.gemini.clone() {
            Some(gemini) => Arc::new(ModelBackedTranslator::new(
                http.clone(),
                gemini,
                config.project_id.clone(),
                config.dataset_id.clone(),
            )?),
            None => Arc::new(MockTranslator::new(
                config.project_id.clone(),
                config.dataset_id.clone(),
            )),
        };

        tracing::info!(
            project = %config.project_id,
            dataset = %config.dataset_id,
            translator = translator.name(),
            cancel_on_disconnect = config.cancel_on_disconnect,
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            warehouse,
            translator,
            http,
        })
    }
}
