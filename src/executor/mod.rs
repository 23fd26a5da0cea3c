//! Executor Module - Runs a single statement against the data store
//!
//! Every call opens its own context from the store and drops it on return.
//! Failures are reported once, with the engine's message, and never retried.
//! Only queries run: DDL, DML (including `COPY ... TO`) and session
//! statements are refused by the planner before anything executes.

use std::sync::Arc;
use arrow::record_batch::RecordBatch;
use datafusion::common::ScalarValue;
use datafusion::execution::context::SQLOptions;
use tracing::{debug, warn};

use crate::common::{ResultSet, Row, SimpleValue, SqlCandidate};
use crate::storage::DataStore;

/// The store could not run a statement.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionFailed {
    pub message: String,
}

impl ExecutionFailed {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<datafusion::error::DataFusionError> for ExecutionFailed {
    fn from(e: datafusion::error::DataFusionError) -> Self {
        Self::new(e.to_string())
    }
}

#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn DataStore>,
}

/// Planner options for untrusted statements: read-only queries.
pub fn read_only_options() -> SQLOptions {
    SQLOptions::new()
        .with_allow_ddl(false)
        .with_allow_dml(false)
        .with_allow_statements(false)
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Execute a resolved candidate.
    pub async fn execute(&self, candidate: &SqlCandidate) -> Result<ResultSet, ExecutionFailed> {
        debug!("Executing {:?} statement: {}", candidate.origin, candidate.statement);
        self.run(&candidate.statement).await
    }

    /// Execute a raw statement.
    pub async fn run(&self, sql: &str) -> Result<ResultSet, ExecutionFailed> {
        let result = async {
            let ctx = self.store.connect().await?;
            let df = ctx.sql_with_options(sql, read_only_options()).await?;
            let batches = df.collect().await?;
            batches_to_result_set(&batches)
        }
        .await;

        if let Err(e) = &result {
            warn!("Statement rejected by {}: {}", self.store.describe(), e.message);
        }
        result
    }
}

/// Flatten record batches into rows, keeping the engine's order.
pub fn batches_to_result_set(batches: &[RecordBatch]) -> Result<ResultSet, ExecutionFailed> {
    let mut rows = Vec::new();
    for batch in batches {
        for row_idx in 0..batch.num_rows() {
            let mut row: Row = Vec::with_capacity(batch.num_columns());
            for col in batch.columns() {
                let scalar = ScalarValue::try_from_array(col, row_idx)?;
                row.push(scalar_to_simple(&scalar));
            }
            rows.push(row);
        }
    }
    Ok(ResultSet::new(rows))
}

fn scalar_to_simple(scalar: &ScalarValue) -> SimpleValue {
    if scalar.is_null() {
        return SimpleValue::Null;
    }
    match scalar {
        ScalarValue::Boolean(Some(v)) => SimpleValue::Bool(*v),
        ScalarValue::Int8(Some(v)) => SimpleValue::Int(*v as i64),
        ScalarValue::Int16(Some(v)) => SimpleValue::Int(*v as i64),
        ScalarValue::Int32(Some(v)) => SimpleValue::Int(*v as i64),
        ScalarValue::Int64(Some(v)) => SimpleValue::Int(*v),
        ScalarValue::UInt8(Some(v)) => SimpleValue::Int(*v as i64),
        ScalarValue::UInt16(Some(v)) => SimpleValue::Int(*v as i64),
        ScalarValue::UInt32(Some(v)) => SimpleValue::Int(*v as i64),
        ScalarValue::UInt64(Some(v)) => match i64::try_from(*v) {
            Ok(i) => SimpleValue::Int(i),
            Err(_) => SimpleValue::Float(*v as f64),
        },
        ScalarValue::Float32(Some(v)) => SimpleValue::Float(*v as f64),
        ScalarValue::Float64(Some(v)) => SimpleValue::Float(*v),
        ScalarValue::Decimal128(Some(v), _, scale) => {
            SimpleValue::Float(*v as f64 / 10f64.powi(*scale as i32))
        }
        ScalarValue::Utf8(Some(v)) | ScalarValue::LargeUtf8(Some(v)) => SimpleValue::String(v.clone()),
        // Dates, timestamps, string views: the engine's own text form
        other => SimpleValue::String(other.to_string()),
    }
}
