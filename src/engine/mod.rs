//! Sales Engine - Question answering and reports over the sales catalog
//!
//! `ask` runs the full pipeline: normalize, try the rule table, fall back to
//! the SQL generator on a miss, execute, format. `report` runs one of the
//! fixed top-N reports. Nothing is cached or shared between calls apart from
//! the rule table and the catalog.

use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregate::{ReportError, ReportKind, ReportOutcome, Reporter};
use crate::ai::{GenerationError, LlmProvider, SqlGenerator};
use crate::chart::ChartRenderer;
use crate::common::{AnswerResponse, SqlCandidate};
use crate::executor::{ExecutionFailed, QueryExecutor};
use crate::format::ResultFormatter;
use crate::rule::{normalize_question, RuleMatcher, SqlResolver};
use crate::storage::DataStore;

/// Why a question could not be answered.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("Question must not be empty")]
    EmptyQuestion,
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Execution(#[from] ExecutionFailed),
}

impl AskError {
    /// Pipeline stage that failed: `request`, `translation` or `execution`.
    pub fn stage(&self) -> &'static str {
        match self {
            AskError::EmptyQuestion => "request",
            AskError::Generation(_) => "translation",
            AskError::Execution(_) => "execution",
        }
    }
}

pub struct SalesEngine {
    rules: RuleMatcher,
    generator: SqlGenerator,
    executor: QueryExecutor,
    reporter: Reporter,
}

impl SalesEngine {
    pub fn new(
        store: Arc<dyn DataStore>,
        provider: Arc<dyn LlmProvider>,
        renderer: Arc<dyn ChartRenderer>,
    ) -> Self {
        let executor = QueryExecutor::new(store);
        Self {
            rules: RuleMatcher::with_default_rules(),
            generator: SqlGenerator::new(provider),
            reporter: Reporter::new(executor.clone(), renderer),
            executor,
        }
    }

    /// Replace the rule table.
    pub fn with_rules(mut self, rules: RuleMatcher) -> Self {
        self.rules = rules;
        self
    }

    pub fn chart_content_type(&self) -> &'static str {
        self.reporter.content_type()
    }

    /// Pick the statement for a question: rules first, then the generator.
    pub async fn resolve(&self, question: &str) -> Result<SqlCandidate, AskError> {
        let normalized = normalize_question(question);
        if normalized.is_empty() {
            return Err(AskError::EmptyQuestion);
        }
        if let Some(candidate) = self.rules.try_resolve(&normalized) {
            info!("Answered from rule table");
            return Ok(candidate);
        }
        info!("No rule matched, asking {}", self.generator.provider_name());
        Ok(self.generator.generate(question.trim()).await?)
    }

    pub async fn ask(&self, question: &str) -> Result<AnswerResponse, AskError> {
        let candidate = self.resolve(question).await?;
        let result = self.executor.execute(&candidate).await.map_err(|e| {
            warn!("Execution failed for {:?} statement", candidate.origin);
            e
        })?;
        let answer = ResultFormatter::answer(&result);

        Ok(AnswerResponse {
            question: question.to_string(),
            sql_query: candidate.statement,
            sql_origin: candidate.origin,
            result,
            answer,
        })
    }

    pub async fn report(&self, kind: ReportKind) -> Result<ReportOutcome, ReportError> {
        self.reporter.report(kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::BitmapBarChart;
    use crate::common::{SimpleValue, SqlOrigin};
    use crate::rule::{Rule, ROAS_SQL, TOTAL_SALES_SQL};
    use crate::testing::{sample_store, FailingLlm, ScriptedLlm};

    fn engine(llm: Arc<dyn LlmProvider>) -> SalesEngine {
        SalesEngine::new(Arc::new(sample_store()), llm, Arc::new(BitmapBarChart::default()))
    }

    #[tokio::test]
    async fn test_rule_hit_skips_generator() {
        let llm = ScriptedLlm::shared("SELECT 1");
        let engine = engine(llm.clone());
        let response = engine.ask("What are my TOTAL SALES?").await.unwrap();
        assert_eq!(response.sql_query, TOTAL_SALES_SQL);
        assert_eq!(response.sql_origin, SqlOrigin::Rule);
        assert_eq!(response.answer, "The answer is 1523.5");
        assert_eq!(response.question, "What are my TOTAL SALES?");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_roas_rule() {
        let engine = engine(Arc::new(FailingLlm::default()));
        let response = engine.ask("what is my return on ad spend").await.unwrap();
        assert_eq!(response.sql_query, ROAS_SQL);
        // 500 ad sales over 200 spend
        assert_eq!(response.result.rows, vec![vec![SimpleValue::Float(2.5)]]);
    }

    #[tokio::test]
    async fn test_generated_statement_is_cleaned_and_run() {
        let llm = ScriptedLlm::shared("```sql\nSELECT COUNT(*) AS n FROM product_eligibility\n```");
        let engine = engine(llm.clone());
        let response = engine.ask("How many eligibility records are there?").await.unwrap();
        assert_eq!(response.sql_query, "SELECT COUNT(*) AS n FROM product_eligibility");
        assert_eq!(response.sql_origin, SqlOrigin::Generated);
        assert_eq!(response.answer, "The answer is 2");
        assert!(llm.prompts()[0].contains("Question: \"How many eligibility records are there?\""));
    }

    #[tokio::test]
    async fn test_provider_failure_is_translation_error() {
        let engine = engine(Arc::new(FailingLlm::default()));
        let err = engine.ask("Which item sold best last week?").await.unwrap_err();
        assert!(matches!(err, AskError::Generation(_)));
        assert_eq!(err.stage(), "translation");
    }

    #[tokio::test]
    async fn test_store_error_is_execution_error() {
        let engine = engine(ScriptedLlm::shared("SELECT revenue FROM product_total_sales_metrics"));
        let err = engine.ask("What is my revenue?").await.unwrap_err();
        assert_eq!(err.stage(), "execution");
        assert!(err.to_string().contains("revenue"), "{}", err);

        // Still serving afterwards
        let ok = engine.ask("total sales").await.unwrap();
        assert_eq!(ok.answer, "The answer is 1523.5");
    }

    #[tokio::test]
    async fn test_empty_question() {
        let llm = ScriptedLlm::shared("SELECT 1");
        let engine = engine(llm.clone());
        let err = engine.ask("   ").await.unwrap_err();
        assert!(matches!(err, AskError::EmptyQuestion));
        assert_eq!(err.stage(), "request");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_rules() {
        static ONLY: [Rule; 1] = [Rule::new("units", &["units"], "SELECT SUM(total_units_ordered) FROM product_total_sales_metrics")];
        let matcher = RuleMatcher::new(ONLY.iter().cloned().map(|r| Box::new(r) as Box<dyn SqlResolver>).collect());
        let engine = engine(Arc::new(FailingLlm::default())).with_rules(matcher);
        let response = engine.ask("units sold?").await.unwrap();
        assert_eq!(response.answer, "The answer is 11");
        assert!(engine.ask("total sales").await.is_err());
    }

    #[tokio::test]
    async fn test_report_through_engine() {
        let engine = engine(Arc::new(FailingLlm::default()));
        let outcome = engine.report(ReportKind::Sales).await.unwrap();
        let ReportOutcome::Chart { labels, png, .. } = outcome else {
            panic!("expected a chart");
        };
        assert_eq!(labels, vec!["1", "2", "0"]);
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(engine.chart_content_type(), "image/png");
    }
}
