//! BigQuery REST v2 client.
//!
//! Every call carries the caller's bearer token; the client itself holds no
//! credentials. Calls are made once, without retries.

use crate::config::ClientConfig;
use crate::error::{GcpError, Result};
use crate::types::{
    ApiErrorBody, JobReference, QueryRequest, QueryResponse, Table, TableList, TableReference,
    TableRow, TableSchema,
};
use bigdummy_analytics_core::Credential;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder};
use std::sync::Arc;

const API_PREFIX: &str = "/bigquery/v2";

/// Fully fetched result set of a query job.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub job: Option<JobReference>,
    pub schema: TableSchema,
    pub rows: Vec<TableRow>,
    pub bytes_processed: u64,
    pub cache_hit: bool,
}

/// BigQuery client sharing one connection pool across clones.
#[derive(Clone)]
pub struct BigQueryClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BigQueryClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("bigdummy-gcp-client")),
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// List every table in a dataset, following `nextPageToken`.
    pub async fn list_tables(
        &self,
        credential: &Credential,
        project_id: &str,
        dataset_id: &str,
    ) -> Result<Vec<TableReference>> {
        let path = format!(
            "/projects/{}/datasets/{}/tables",
            urlencoding::encode(project_id),
            urlencoding::encode(dataset_id)
        );

        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.request(Method::GET, &path, credential);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: TableList = self.send(Method::GET, &path, request).await?;
            tables.extend(page.tables.into_iter().map(|t| t.table_reference));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(
            project = %project_id,
            dataset = %dataset_id,
            tables = tables.len(),
            "Listed tables"
        );
        Ok(tables)
    }

    /// Fetch one table's metadata, including its schema.
    pub async fn get_table(
        &self,
        credential: &Credential,
        table: &TableReference,
    ) -> Result<Table> {
        let path = format!(
            "/projects/{}/datasets/{}/tables/{}",
            urlencoding::encode(&table.project_id),
            urlencoding::encode(&table.dataset_id),
            urlencoding::encode(&table.table_id)
        );
        let request = self.request(Method::GET, &path, credential);
        self.send(Method::GET, &path, request).await
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Issue `jobs.query`.
    pub async fn query(
        &self,
        credential: &Credential,
        project_id: &str,
        body: &QueryRequest,
    ) -> Result<QueryResponse> {
        let path = format!("/projects/{}/queries", urlencoding::encode(project_id));
        let request = self.request(Method::POST, &path, credential).json(body);
        self.send(Method::POST, &path, request).await
    }

    /// Issue `jobs.getQueryResults`, waiting server-side up to `poll_wait`.
    pub async fn get_query_results(
        &self,
        credential: &Credential,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let path = format!(
            "/projects/{}/queries/{}",
            urlencoding::encode(&job.project_id),
            urlencoding::encode(&job.job_id)
        );

        let mut params: Vec<(&str, String)> = vec![
            ("timeoutMs", self.config.poll_wait.as_millis().to_string()),
            ("formatOptions.useInt64Timestamp", "true".to_string()),
        ];
        if let Some(location) = job.location.as_ref().or(self.config.location.as_ref()) {
            params.push(("location", location.clone()));
        }
        if let Some(rows) = self.config.page_size {
            params.push(("maxResults", rows.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let request = self.request(Method::GET, &path, credential).query(&params);
        self.send(Method::GET, &path, request).await
    }

    /// Request cancellation of a running job. The engine may still finish it.
    pub async fn cancel_job(&self, credential: &Credential, job: &JobReference) -> Result<()> {
        let path = format!(
            "/projects/{}/jobs/{}/cancel",
            urlencoding::encode(&job.project_id),
            urlencoding::encode(&job.job_id)
        );
        let mut request = self.request(Method::POST, &path, credential);
        if let Some(ref location) = job.location {
            request = request.query(&[("location", location.as_str())]);
        }
        let _: serde_json::Value = self.send(Method::POST, &path, request).await?;
        tracing::info!(job_id = %job.job_id, "Requested job cancellation");
        Ok(())
    }

    /// Plan a query without running it and return the bytes it would scan.
    pub async fn dry_run(
        &self,
        credential: &Credential,
        project_id: &str,
        sql: &str,
    ) -> Result<u64> {
        let mut body = QueryRequest::dry_run(sql);
        body.location = self.config.location.clone();
        let response = self.query(credential, project_id, &body).await?;
        response.bytes_processed()
    }

    /// Run a query to completion and collect every result page.
    ///
    /// With `cancel_on_drop`, dropping the returned future before it resolves
    /// sends a best-effort `jobs.cancel` for the job.
    pub async fn run_query(
        &self,
        credential: &Credential,
        project_id: &str,
        sql: &str,
        cancel_on_drop: bool,
    ) -> Result<QueryOutcome> {
        let mut body = QueryRequest::standard(sql, self.config.poll_wait.as_millis() as u64);
        body.location = self.config.location.clone();
        body.max_results = self.config.page_size;

        let mut page = self.query(credential, project_id, &body).await?;
        let job = page.job_reference.clone();

        let mut guard = match (cancel_on_drop, job.as_ref()) {
            (true, Some(job)) if !page.job_complete => Some(JobCancelGuard::new(
                self.clone(),
                credential.clone(),
                job.clone(),
            )),
            _ => None,
        };

        while !page.job_complete {
            let job = job.as_ref().ok_or_else(|| {
                GcpError::InvalidResponse("incomplete query returned no job reference".to_string())
            })?;
            tracing::debug!(job_id = %job.job_id, "Query still running, polling");
            page = self.get_query_results(credential, job, None).await?;
        }

        let mut outcome = QueryOutcome {
            job: job.clone(),
            schema: page.schema.take().unwrap_or_default(),
            bytes_processed: page.bytes_processed()?,
            cache_hit: page.cache_hit,
            rows: std::mem::take(&mut page.rows),
        };

        let mut next_token = page.page_token.take();
        while let Some(token) = next_token {
            let job = job.as_ref().ok_or_else(|| {
                GcpError::InvalidResponse("paged result returned no job reference".to_string())
            })?;
            let mut next = self
                .get_query_results(credential, job, Some(&token))
                .await?;
            outcome.rows.append(&mut next.rows);
            next_token = next.page_token.take();
        }

        if let Some(ref mut guard) = guard {
            guard.disarm();
        }

        tracing::info!(
            job_id = ?outcome.job.as_ref().map(|j| j.job_id.as_str()),
            rows = outcome.rows.len(),
            bytes_processed = outcome.bytes_processed,
            cache_hit = outcome.cache_hit,
            "Query completed"
        );
        Ok(outcome)
    }

    // =========================================================================
    // Internal HTTP Methods
    // =========================================================================

    fn request(&self, method: Method, path: &str, credential: &Credential) -> RequestBuilder {
        let url = format!("{}{}{}", self.config.api_root(), API_PREFIX, path);
        self.http
            .request(method, url)
            .bearer_auth(credential.bearer_token())
    }

    /// Send a prepared request and deserialize the response.
    async fn send<T>(&self, method: Method, path: &str, request: RequestBuilder) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let start = std::time::Instant::now();

        tracing::debug!(
            method = %method,
            path = %path,
            "Sending request"
        );

        let response = request.send().await?;
        let status = response.status();
        let duration = start.elapsed();

        tracing::debug!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Received response"
        );

        let body = response.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&body).map_err(|e| {
                GcpError::InvalidResponse(format!(
                    "Failed to parse response: {} (body: {})",
                    e,
                    String::from_utf8_lossy(&body)
                ))
            })
        } else {
            let api_error: Option<ApiErrorBody> = serde_json::from_slice(&body).ok();
            let reason = api_error
                .as_ref()
                .and_then(|e| e.error.errors.iter().find_map(|item| item.reason.clone()));
            let message = api_error
                .map(|e| e.error.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status.to_string()
                    } else {
                        String::from_utf8_lossy(&body).to_string()
                    }
                });

            tracing::warn!(
                method = %method,
                path = %path,
                status = %status.as_u16(),
                duration_ms = %duration.as_millis(),
                reason = ?reason,
                error = %message,
                "Request failed"
            );

            Err(GcpError::Api {
                status: status.as_u16(),
                message,
                reason,
            })
        }
    }
}

/// Cancels a running job if dropped while still armed.
struct JobCancelGuard {
    client: BigQueryClient,
    credential: Credential,
    job: JobReference,
    armed: bool,
}

impl JobCancelGuard {
    fn new(client: BigQueryClient, credential: Credential, job: JobReference) -> Self {
        Self {
            client,
            credential,
            job,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for JobCancelGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        tracing::warn!(
            job_id = %self.job.job_id,
            "Query abandoned before completion, cancelling job"
        );
        let client = self.client.clone();
        let credential = self.credential.clone();
        let job = self.job.clone();
        handle.spawn(async move {
            if let Err(e) = client.cancel_job(&credential, &job).await {
                tracing::warn!(job_id = %job.job_id, error = %e, "Job cancellation failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_applies_config() {
        let config = ClientConfig::builder("http://localhost:9050/")
            .timeout(Duration::from_secs(10))
            .location("EU")
            .build()
            .unwrap();

        let client = BigQueryClient::new(config).unwrap();
        assert_eq!(client.config().api_root(), "http://localhost:9050");
        assert_eq!(client.config().location.as_deref(), Some("EU"));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ClientConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(BigQueryClient::new(config).is_err());
    }

    #[test]
    fn test_debug_omits_http_internals() {
        let client = BigQueryClient::new(ClientConfig::default()).unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("BigQueryClient"));
        assert!(debug.contains("bigquery.googleapis.com"));
    }
}
