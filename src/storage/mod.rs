//! Storage Module - Data stores backing the three catalog tables
//!
//! A store hands out a fresh DataFusion `SessionContext` per call with every
//! catalog table registered. The context is dropped when the call finishes, so
//! nothing is shared between requests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::error::Result;
use datafusion::prelude::*;
use tracing::{debug, warn};

use crate::common::{Row, SimpleValue};
use crate::schema::{self, SchemaTable};

/// Source of short-lived query contexts.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Open a context with all catalog tables registered.
    async fn connect(&self) -> Result<SessionContext>;
    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads `<data_dir>/<table>.csv` in place on every connect.
#[derive(Clone, Debug)]
pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", table))
    }

    /// Catalog tables whose CSV file is absent.
    pub fn missing_files(&self) -> Vec<PathBuf> {
        schema::catalog().iter()
            .map(|t| self.table_path(t.name))
            .filter(|p| !p.exists())
            .collect()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[async_trait]
impl DataStore for CsvStore {
    async fn connect(&self) -> Result<SessionContext> {
        let ctx = SessionContext::new();
        for table in schema::catalog() {
            let path = self.table_path(table.name);
            if !path.exists() {
                // Queries against this table will fail with "table not found"
                warn!("Data file {} is missing", path.display());
                continue;
            }
            let arrow_schema = table.arrow_schema();
            let options = CsvReadOptions::new()
                .has_header(true)
                .schema(arrow_schema.as_ref());
            let location = path.to_string_lossy().to_string();
            ctx.register_csv(table.name, &location, options).await?;
        }
        debug!("Opened CSV context over {}", self.data_dir.display());
        Ok(ctx)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.data_dir.display())
    }
}

/// Keeps record batches in memory; used by tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<&'static str, Vec<RecordBatch>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a catalog table. Values are converted to the column types
    /// declared in the catalog.
    pub fn with_rows(mut self, table: &str, rows: Vec<Row>) -> std::result::Result<Self, ArrowError> {
        let table = schema::table(table)
            .ok_or_else(|| ArrowError::InvalidArgumentError(format!("unknown table '{}'", table)))?;
        let batch = batch_from_rows(table, &rows)?;
        self.tables.entry(table.name).or_default().push(batch);
        Ok(self)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table)
            .map(|batches| batches.iter().map(|b| b.num_rows()).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn connect(&self) -> Result<SessionContext> {
        let ctx = SessionContext::new();
        for table in schema::catalog() {
            let batches = self.tables.get(table.name).cloned().unwrap_or_default();
            let provider = MemTable::try_new(table.arrow_schema(), vec![batches])?;
            ctx.register_table(table.name, Arc::new(provider))?;
        }
        Ok(ctx)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Build a record batch for `table` from loosely typed rows.
pub fn batch_from_rows(table: &SchemaTable, rows: &[Row]) -> std::result::Result<RecordBatch, ArrowError> {
    if let Some(bad) = rows.iter().find(|r| r.len() != table.columns.len()) {
        return Err(ArrowError::InvalidArgumentError(format!(
            "{} expects {} values per row, got {}",
            table.name,
            table.columns.len(),
            bad.len()
        )));
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns.len());
    for (idx, column) in table.columns.iter().enumerate() {
        let values = rows.iter().map(|r| &r[idx]);
        let array: ArrayRef = match column.semantic_type.arrow_type() {
            DataType::Float64 => Arc::new(values.map(|v| v.as_f64()).collect::<Float64Array>()),
            DataType::Int64 => Arc::new(
                values.map(|v| match v {
                    SimpleValue::Int(i) => Some(*i),
                    _ => None,
                }).collect::<Int64Array>(),
            ),
            _ => Arc::new(
                values.map(|v| (!v.is_null()).then(|| v.to_string())).collect::<StringArray>(),
            ),
        };
        arrays.push(array);
    }
    RecordBatch::try_new(table.arrow_schema(), arrays)
}
