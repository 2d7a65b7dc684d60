//! Gemini-backed translator.
//!
//! Sends the question plus the dataset layout to `generateContent` and takes
//! the first candidate's text as SQL. The output is not validated; it goes
//! back to the caller for review like the rule-based translation does.

use crate::error::{GcpError, Result};
use async_trait::async_trait;
use bigdummy_analytics_core::translate::{TemplateContext, NO_QUERY_PROVIDED};
use bigdummy_analytics_core::{AnalyticsError, TranslationResult, Translator};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini endpoint settings. `Debug` masks the API key.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_URL.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(GcpError::Config(
                "Gemini API key cannot be empty".to_string(),
            ));
        }
        if self.model.is_empty() {
            return Err(GcpError::Config("Gemini model cannot be empty".to_string()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| GcpError::Config(format!("Invalid Gemini base_url: {}", e)))?;
        Ok(())
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"***REDACTED***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Translator that asks a Gemini model for GA4 SQL.
#[derive(Debug, Clone)]
pub struct ModelBackedTranslator {
    http: reqwest::Client,
    config: GeminiConfig,
    project_id: String,
    dataset_id: String,
}

impl ModelBackedTranslator {
    pub fn new(
        http: reqwest::Client,
        config: GeminiConfig,
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http,
            config,
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
        })
    }

    /// Prompt sent for `text`, with the date window anchored at `today`.
    pub fn prompt(&self, text: &str, today: NaiveDate) -> String {
        let ctx = TemplateContext::new(&self.project_id, &self.dataset_id, today);
        format!(
            "You write BigQuery standard SQL for a Google Analytics 4 export.\n\
             Table: `{table}` (daily shards, filter with _TABLE_SUFFIX).\n\
             Restrict to _TABLE_SUFFIX BETWEEN '{start}' AND '{end}' unless the question names another range.\n\
             Read event parameters with UNNEST(event_params).\n\
             Never select user_id, user_pseudo_id or other personal identifiers.\n\
             Reply with a single SQL statement and nothing else.\n\n\
             Question: {text}",
            table = ctx.table,
            start = ctx.start_suffix,
            end = ctx.end_suffix,
            text = text,
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.model)
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.config.api_key.as_str())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        tracing::debug!(
            model = %self.config.model,
            status = %status.as_u16(),
            duration_ms = %start.elapsed().as_millis(),
            "Model response received"
        );

        if !status.is_success() {
            let message = serde_json::from_slice::<crate::types::ApiErrorBody>(&bytes)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).to_string());
            return Err(GcpError::Api {
                status: status.as_u16(),
                message: format!("Translator request failed: {}", message),
                reason: None,
            });
        }

        let parsed: GenerateResponse = serde_json::from_slice(&bytes)?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let sql = strip_code_fence(&text);
        if sql.is_empty() {
            return Err(GcpError::InvalidResponse(
                "Translator returned no SQL".to_string(),
            ));
        }
        Ok(sql.to_string())
    }
}

/// Remove a surrounding Markdown code fence (```sql ... ```), if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[async_trait]
impl Translator for ModelBackedTranslator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn translate(&self, text: &str) -> bigdummy_analytics_core::Result<TranslationResult> {
        if text.is_empty() {
            return Err(AnalyticsError::Validation(NO_QUERY_PROVIDED.to_string()));
        }

        let prompt = self.prompt(text, Utc::now().date_naive());
        let sql_query = self.generate(&prompt).await?;

        Ok(TranslationResult {
            natural_language_query: text.to_string(),
            sql_query,
            is_mock: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> ModelBackedTranslator {
        ModelBackedTranslator::new(
            reqwest::Client::new(),
            GeminiConfig::new("key"),
            "my-project",
            "analytics_123",
        )
        .unwrap()
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("SELECT 1"), "SELECT 1");
        assert_eq!(strip_code_fence("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fence("  ```\nSELECT 1\n```  "), "SELECT 1");
    }

    #[test]
    fn test_prompt_mentions_table_and_window() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let prompt = translator().prompt("top pages", today);
        assert!(prompt.contains("`my-project.analytics_123.events_*`"));
        assert!(prompt.contains("BETWEEN '20240301' AND '20240331'"));
        assert!(prompt.ends_with("Question: top pages"));
    }

    #[test]
    fn test_config_validation() {
        assert!(GeminiConfig::new("").validate().is_err());
        let mut config = GeminiConfig::new("key");
        config.base_url = "nope".to_string();
        assert!(config.validate().is_err());
        assert!(!format!("{:?}", GeminiConfig::new("AIza-secret")).contains("AIza"));
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let err = translator().translate("").await.unwrap_err();
        assert_eq!(err.to_string(), "No query provided");
    }
}
