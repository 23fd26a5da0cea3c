//! Testing Module - Fake collaborators and sample data for tests and demos

use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tracing::warn;

use crate::ai::{AiError, LlmProvider};
use crate::common::Row;
use crate::schema::{AD_SALES_TABLE, ELIGIBILITY_TABLE, TOTAL_SALES_TABLE};
use crate::storage::MemoryStore;

/// Replies with a fixed completion and remembers every prompt it saw.
pub struct ScriptedLlm {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), prompts: Mutex::new(Vec::new()) }
    }

    pub fn shared(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(reply))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Always fails, the way an unreachable or unauthorised service does.
pub struct FailingLlm {
    message: String,
}

impl FailingLlm {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl Default for FailingLlm {
    fn default() -> Self {
        Self::new("quota exceeded")
    }
}

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::Http(self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// A few days of data for three items.
///
/// Total sales sum to 1523.5; item `1` leads sales, item `2` leads ad spend.
pub fn sample_store() -> MemoryStore {
    let sales: Vec<Row> = vec![
        vec!["2025-06-01".into(), "0".into(), 250.25f64.into(), 2i64.into()],
        vec!["2025-06-01".into(), "1".into(), 600.0f64.into(), 5i64.into()],
        vec!["2025-06-02".into(), "1".into(), 400.0f64.into(), 3i64.into()],
        vec!["2025-06-02".into(), "2".into(), 273.25f64.into(), 1i64.into()],
    ];
    let ads: Vec<Row> = vec![
        vec!["2025-06-01".into(), "0".into(), 120.0f64.into(), 1000i64.into(), 40.0f64.into(), 20i64.into(), 2i64.into()],
        vec!["2025-06-01".into(), "1".into(), 300.0f64.into(), 2500i64.into(), 60.0f64.into(), 50i64.into(), 5i64.into()],
        vec!["2025-06-02".into(), "2".into(), 80.0f64.into(), 3000i64.into(), 100.0f64.into(), 25i64.into(), 1i64.into()],
    ];
    let eligibility: Vec<Row> = vec![
        vec!["2025-06-01 08:00:00".into(), "0".into(), "TRUE".into(), "".into()],
        vec!["2025-06-01 08:00:00".into(), "2".into(), "FALSE".into(), "Missing product images".into()],
    ];

    let store = append(MemoryStore::new(), TOTAL_SALES_TABLE, sales);
    let store = append(store, AD_SALES_TABLE, ads);
    append(store, ELIGIBILITY_TABLE, eligibility)
}

fn append(store: MemoryStore, table: &str, rows: Vec<Row>) -> MemoryStore {
    match store.clone().with_rows(table, rows) {
        Ok(s) => s,
        Err(e) => {
            warn!("Sample rows for {} rejected: {}", table, e);
            store
        }
    }
}
