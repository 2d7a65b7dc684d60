//! Process configuration, read once at startup.
//!
//! ## Environment
//!
//! - `BIGQUERY_PROJECT_ID`: project holding the GA4 export (default: `your-project-id`)
//! - `GA4_DATASET_ID`: GA4 export dataset (default: `analytics_XXXXXX`)
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`: OAuth client attached to credentials
//! - `GOOGLE_CLIENT_SECRETS_FILE`: client secrets JSON for the consent flow (default: `client_secrets.json`)
//! - `OAUTH_REDIRECT_URI`: callback registered with Google (default: `http://localhost:5000/oauth2callback`)
//! - `GOOGLE_TOKEN_URI`: token endpoint recorded on credentials
//! - `BIGQUERY_API_URL`: BigQuery REST root (default: `https://bigquery.googleapis.com`)
//! - `BIGQUERY_TIMEOUT_SECS`: whole-request timeout for BigQuery calls (default: none)
//! - `BIGQUERY_LOCATION`: job location (default: inferred by BigQuery)
//! - `BIGDUMMY_COST_PER_TIB`: price per TiB scanned for estimates (default: 5.0)
//! - `BIGDUMMY_CANCEL_ON_DISCONNECT`: cancel running jobs when the caller goes away (default: false)
//! - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_API_URL`: enable the model-backed translator
//! - `PORT`: listen port (default: 5000)

use bigdummy_analytics_core::cost::DEFAULT_COST_PER_TIB;
use bigdummy_analytics_core::credential::DEFAULT_TOKEN_URI;
use bigdummy_analytics_core::validation::{validate_dataset_id, validate_project_id};
use bigdummy_analytics_core::{AnalyticsError, CostModel, OAuthSettings, Result};
use bigdummy_gcp_client::config::DEFAULT_BIGQUERY_URL;
use bigdummy_gcp_client::gemini::{DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL};
use bigdummy_gcp_client::GeminiConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PROJECT_ID: &str = "your-project-id";
pub const DEFAULT_DATASET_ID: &str = "analytics_XXXXXX";
pub const DEFAULT_CLIENT_SECRETS_FILE: &str = "client_secrets.json";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5000/oauth2callback";
pub const DEFAULT_PORT: u16 = 5000;

/// Immutable settings shared by every request.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub oauth: OAuthSettings,
    pub client_secrets_file: PathBuf,
    pub redirect_uri: String,
    pub bigquery_url: String,
    pub bigquery_timeout: Option<Duration>,
    pub bigquery_location: Option<String>,
    pub cost_model: CostModel,
    pub cancel_on_disconnect: bool,
    /// Set when `GEMINI_API_KEY` is present.
    pub gemini: Option<GeminiConfig>,
    pub port: u16,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let project_id =
            var("BIGQUERY_PROJECT_ID").unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());
        let dataset_id = var("GA4_DATASET_ID").unwrap_or_else(|| DEFAULT_DATASET_ID.to_string());
        validate_project_id(&project_id)?;
        validate_dataset_id(&dataset_id)?;

        let oauth = OAuthSettings {
            client_id: var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            client_secret: var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            token_uri: var("GOOGLE_TOKEN_URI").unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            ..Default::default()
        };

        let cost_per_tib = parse(&var, "BIGDUMMY_COST_PER_TIB")?.unwrap_or(DEFAULT_COST_PER_TIB);
        let timeout_secs: Option<u64> = parse(&var, "BIGQUERY_TIMEOUT_SECS")?;

        let cancel_on_disconnect = match var("BIGDUMMY_CANCEL_ON_DISCONNECT") {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                AnalyticsError::Configuration(format!(
                    "BIGDUMMY_CANCEL_ON_DISCONNECT must be true or false (got '{}')",
                    raw
                ))
            })?,
        };

        let gemini = var("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: var("GEMINI_API_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string()),
        });

        Ok(Self {
            project_id,
            dataset_id,
            oauth,
            client_secrets_file: var("GOOGLE_CLIENT_SECRETS_FILE")
                .unwrap_or_else(|| DEFAULT_CLIENT_SECRETS_FILE.to_string())
                .into(),
            redirect_uri: var("OAUTH_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            bigquery_url: var("BIGQUERY_API_URL")
                .unwrap_or_else(|| DEFAULT_BIGQUERY_URL.to_string()),
            bigquery_timeout: timeout_secs.map(Duration::from_secs),
            bigquery_location: var("BIGQUERY_LOCATION"),
            cost_model: CostModel::new(cost_per_tib)?,
            cancel_on_disconnect,
            gemini,
            port: parse(&var, "PORT")?.unwrap_or(DEFAULT_PORT),
        })
    }
}

fn parse<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.parse().map_err(|_| {
                AnalyticsError::Configuration(format!("{} has an invalid value: '{}'", key, raw))
            })
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdummy_analytics_core::ErrorKind;
    use serial_test::serial;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.project_id, "your-project-id");
        assert_eq!(config.dataset_id, "analytics_XXXXXX");
        assert_eq!(config.redirect_uri, "http://localhost:5000/oauth2callback");
        assert_eq!(
            config.client_secrets_file,
            PathBuf::from("client_secrets.json")
        );
        assert_eq!(config.bigquery_url, "https://bigquery.googleapis.com");
        assert_eq!(
            config.oauth.token_uri,
            "https://oauth2.googleapis.com/token"
        );
        assert!(config.bigquery_timeout.is_none());
        assert_eq!(config.cost_model.cost_per_tib(), 5.0);
        assert!(!config.cancel_on_disconnect);
        assert!(config.gemini.is_none());
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("BIGQUERY_PROJECT_ID", "acme-analytics"),
            ("GA4_DATASET_ID", "analytics_987654"),
            ("GOOGLE_CLIENT_ID", "cid"),
            ("BIGQUERY_TIMEOUT_SECS", "120"),
            ("BIGQUERY_LOCATION", "EU"),
            ("BIGDUMMY_COST_PER_TIB", "6.25"),
            ("BIGDUMMY_CANCEL_ON_DISCONNECT", "true"),
            ("GEMINI_API_KEY", "key"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(config.project_id, "acme-analytics");
        assert_eq!(config.oauth.client_id, "cid");
        assert_eq!(config.bigquery_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.bigquery_location.as_deref(), Some("EU"));
        assert_eq!(config.cost_model.cost_per_tib(), 6.25);
        assert!(config.cancel_on_disconnect);
        assert_eq!(config.gemini.unwrap().model, "gemini-1.5-flash");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = from_map(&[("BIGQUERY_PROJECT_ID", "  "), ("GEMINI_API_KEY", "")]).unwrap();
        assert_eq!(config.project_id, "your-project-id");
        assert!(config.gemini.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for pairs in [
            [("BIGQUERY_PROJECT_ID", "bad project")],
            [("GA4_DATASET_ID", "analytics-1")],
            [("PORT", "http")],
            [("BIGDUMMY_COST_PER_TIB", "-1")],
            [("BIGDUMMY_CANCEL_ON_DISCONNECT", "maybe")],
            [("BIGQUERY_TIMEOUT_SECS", "soon")],
        ] {
            let err = from_map(&pairs).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{:?}", pairs);
        }
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("GA4_DATASET_ID", "analytics_555");
        std::env::set_var("BIGDUMMY_COST_PER_TIB", "7.5");
        let config = AppConfig::from_env();
        std::env::remove_var("GA4_DATASET_ID");
        std::env::remove_var("BIGDUMMY_COST_PER_TIB");

        let config = config.unwrap();
        assert_eq!(config.dataset_id, "analytics_555");
        assert_eq!(config.cost_model.cost_per_tib(), 7.5);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = from_map(&[
            ("GOOGLE_CLIENT_SECRET", "top-secret"),
            ("GEMINI_API_KEY", "AIza-key"),
        ])
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("AIza-key"));
    }
}
