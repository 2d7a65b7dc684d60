//! Warehouse operations exposed to the API: schema report, cost estimate
//! and masked query execution against the configured GA4 dataset.

use crate::bigquery::BigQueryClient;
use crate::rows::decode_rows;
use crate::types::TableFieldSchema;
use bigdummy_analytics_core::{
    mask_rows, ColumnSchema, CostEstimate, CostModel, Credential, Result, RowMapping,
    SchemaReport,
};

/// BigQuery-backed warehouse bound to one project and dataset.
#[derive(Debug, Clone)]
pub struct Warehouse {
    client: BigQueryClient,
    project_id: String,
    dataset_id: String,
    cost_model: CostModel,
    cancel_on_disconnect: bool,
}

impl Warehouse {
    pub fn new(
        client: BigQueryClient,
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        cost_model: CostModel,
    ) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            cost_model,
            cancel_on_disconnect: false,
        }
    }

    /// Cancel the running job when an execution is abandoned mid-flight.
    pub fn with_cancel_on_disconnect(mut self, enabled: bool) -> Self {
        self.cancel_on_disconnect = enabled;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn cost_model(&self) -> CostModel {
        self.cost_model
    }

    /// Columns of every table in the dataset, tables in listing order.
    pub async fn get_schema(&self, credential: &Credential) -> Result<SchemaReport> {
        let tables = self
            .client
            .list_tables(credential, &self.project_id, &self.dataset_id)
            .await?;

        let mut report = SchemaReport::new();
        for reference in &tables {
            let table = self.client.get_table(credential, reference).await?;
            let columns = table
                .schema
                .map(|s| s.fields.iter().map(to_column).collect())
                .unwrap_or_default();
            report.push(reference.table_id.clone(), columns);
        }

        tracing::info!(
            project = %self.project_id,
            dataset = %self.dataset_id,
            tables = report.len(),
            "Schema report built"
        );
        Ok(report)
    }

    /// Dry-run the query and price the bytes it would scan.
    pub async fn estimate(&self, credential: &Credential, sql: &str) -> Result<CostEstimate> {
        let bytes = self.client.dry_run(credential, &self.project_id, sql).await?;
        let estimate = self.cost_model.estimate(bytes);

        tracing::info!(
            bytes_processed = estimate.bytes_processed,
            estimated_cost = estimate.estimated_cost,
            "Query estimated"
        );
        Ok(estimate)
    }

    /// Run the query to completion and return PII-masked rows in result order.
    pub async fn execute(&self, credential: &Credential, sql: &str) -> Result<Vec<RowMapping>> {
        let outcome = self
            .client
            .run_query(credential, &self.project_id, sql, self.cancel_on_disconnect)
            .await?;

        let mut rows = decode_rows(&outcome.schema, outcome.rows)?;
        let masked = mask_rows(&mut rows);

        tracing::info!(rows = rows.len(), masked_values = masked, "Query executed");
        Ok(rows)
    }
}

fn to_column(field: &TableFieldSchema) -> ColumnSchema {
    let mut column = ColumnSchema::new(field.name.clone(), field.field_type.clone());
    if field.is_repeated() {
        column.mode = field.mode.clone();
    }
    column.fields = field.fields.iter().map(to_column).collect();
    column
}
