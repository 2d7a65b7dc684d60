//! Natural-language to SQL translation.
//!
//! [`Translator`] is the seam between the HTTP layer and a translation
//! backend. [`MockTranslator`] is a keyword rule list that stands in for a
//! real model: rules are evaluated in order and the first match wins.

use crate::{AnalyticsError, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Trailing window, in days, every template filters on.
pub const WINDOW_DAYS: i64 = 30;

/// Message returned when no text was supplied.
pub const NO_QUERY_PROVIDED: &str = "No query provided";

/// Outcome of a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub natural_language_query: String,
    pub sql_query: String,
    /// True when the SQL came from the rule list rather than a model.
    pub is_mock: bool,
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    async fn translate(&self, text: &str) -> Result<TranslationResult>;
}

/// Values interpolated into every template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    /// Fully-qualified wildcard table, e.g. `my-project.analytics_123.events_*`
    pub table: String,
    /// First day of the window, `YYYYMMDD`
    pub start_suffix: String,
    /// Last day of the window, `YYYYMMDD`
    pub end_suffix: String,
}

impl TemplateContext {
    pub fn new(project_id: &str, dataset_id: &str, today: NaiveDate) -> Self {
        let start = today - Duration::days(WINDOW_DAYS);
        Self {
            table: format!("{}.{}.events_*", project_id, dataset_id),
            start_suffix: start.format("%Y%m%d").to_string(),
            end_suffix: today.format("%Y%m%d").to_string(),
        }
    }
}

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;
type Template = fn(&TemplateContext) -> String;

/// One (predicate, template) pair. Predicates receive lowercased text.
pub struct TranslationRule {
    pub name: &'static str,
    predicate: Predicate,
    template: Template,
}

impl TranslationRule {
    pub fn new(
        name: &'static str,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        template: Template,
    ) -> Self {
        Self {
            name,
            predicate: Box::new(predicate),
            template,
        }
    }

    /// Rule matching when every keyword occurs in the text.
    pub fn all_keywords(
        name: &'static str,
        keywords: &'static [&'static str],
        template: Template,
    ) -> Self {
        Self::new(
            name,
            move |text| keywords.iter().all(|k| text.contains(k)),
            template,
        )
    }

    pub fn matches(&self, lowered: &str) -> bool {
        (self.predicate)(lowered)
    }

    pub fn render(&self, ctx: &TemplateContext) -> String {
        (self.template)(ctx)
    }
}

impl std::fmt::Debug for TranslationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Default rules in priority order.
pub fn default_rules() -> Vec<TranslationRule> {
    vec![
        TranslationRule::all_keywords(
            "revenue_by_country",
            &["revenue", "country"],
            revenue_by_country,
        ),
        TranslationRule::all_keywords("users_by_device", &["users", "device"], users_by_device),
        TranslationRule::all_keywords("top_pages", &["pageviews"], top_pages),
    ]
}

fn revenue_by_country(ctx: &TemplateContext) -> String {
    format!(
        "SELECT\n  country,\n  SUM(event_value_in_usd) AS revenue\nFROM `{table}`\n\
         WHERE event_name = 'purchase'\n  AND _TABLE_SUFFIX BETWEEN '{start}' AND '{end}'\n\
         GROUP BY country\nORDER BY revenue DESC",
        table = ctx.table,
        start = ctx.start_suffix,
        end = ctx.end_suffix,
    )
}

fn users_by_device(ctx: &TemplateContext) -> String {
    format!(
        "SELECT\n  device.category AS device_type,\n  COUNT(DISTINCT user_pseudo_id) AS users\n\
         FROM `{table}`\nWHERE _TABLE_SUFFIX BETWEEN '{start}' AND '{end}'\n\
         GROUP BY device_type\nORDER BY users DESC",
        table = ctx.table,
        start = ctx.start_suffix,
        end = ctx.end_suffix,
    )
}

fn top_pages(ctx: &TemplateContext) -> String {
    format!(
        "SELECT\n  page_title,\n  COUNT(*) AS pageviews\nFROM `{table}`\n\
         WHERE event_name = 'page_view'\n  AND _TABLE_SUFFIX BETWEEN '{start}' AND '{end}'\n\
         GROUP BY page_title\nORDER BY pageviews DESC\nLIMIT 10",
        table = ctx.table,
        start = ctx.start_suffix,
        end = ctx.end_suffix,
    )
}

fn top_events(ctx: &TemplateContext) -> String {
    format!(
        "SELECT\n  event_name,\n  COUNT(*) AS event_count\nFROM `{table}`\n\
         WHERE _TABLE_SUFFIX BETWEEN '{start}' AND '{end}'\n\
         GROUP BY event_name\nORDER BY event_count DESC\nLIMIT 10",
        table = ctx.table,
        start = ctx.start_suffix,
        end = ctx.end_suffix,
    )
}

/// Rule-based translator returning canned GA4 queries.
pub struct MockTranslator {
    project_id: String,
    dataset_id: String,
    rules: Vec<TranslationRule>,
    fallback: Template,
}

impl MockTranslator {
    pub fn new(project_id: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self::with_rules(project_id, dataset_id, default_rules())
    }

    pub fn with_rules(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        rules: Vec<TranslationRule>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            rules,
            fallback: top_events,
        }
    }

    pub fn rules(&self) -> &[TranslationRule] {
        &self.rules
    }

    /// Name of the rule that would handle `text`, or `"top_events"` for the fallback.
    pub fn rule_for(&self, text: &str) -> &'static str {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.name)
            .unwrap_or("top_events")
    }

    /// Translate against an explicit "today", for deterministic output.
    pub fn translate_on(&self, text: &str, today: NaiveDate) -> Result<TranslationResult> {
        if text.is_empty() {
            return Err(AnalyticsError::Validation(NO_QUERY_PROVIDED.to_string()));
        }

        let lowered = text.to_lowercase();
        let ctx = TemplateContext::new(&self.project_id, &self.dataset_id, today);
        let sql_query = match self.rules.iter().find(|rule| rule.matches(&lowered)) {
            Some(rule) => rule.render(&ctx),
            None => (self.fallback)(&ctx),
        };

        Ok(TranslationResult {
            natural_language_query: text.to_string(),
            sql_query,
            is_mock: true,
        })
    }
}

impl std::fmt::Debug for MockTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTranslator")
            .field("project_id", &self.project_id)
            .field("dataset_id", &self.dataset_id)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn translate(&self, text: &str) -> Result<TranslationResult> {
        self.translate_on(text, Utc::now().date_naive())
    }
}
