//! Text-to-SQL fallback - asks an LlmProvider for SQL over the fixed catalog.

use crate::ai::provider::{AiError, LlmProvider};
use crate::common::SqlCandidate;
use crate::schema::{self, SchemaTable};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why the fallback could not produce a statement.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("SQL generation failed: {0}")]
    Provider(#[from] AiError),
    #[error("SQL generation failed: the model returned no SQL")]
    EmptyStatement,
}

pub struct SqlGenerator {
    provider: Arc<dyn LlmProvider>,
    tables: &'static [SchemaTable],
}

impl SqlGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider, tables: schema::catalog() }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the full prompt: instruction + catalog + literal question.
    pub fn build_prompt(&self, question: &str) -> String {
        let tables: Vec<String> = self.tables.iter().map(|t| t.describe()).collect();
        format!(
            "You are a SQL expert. Convert the following natural language question into a single SQL query\n\
             for the database with these tables:\n\
             {}\n\n\
             Use only the tables and columns listed above. Dates are stored as 'YYYY-MM-DD' text.\n\n\
             Question: \"{}\"\n\n\
             Return ONLY the SQL statement, no explanation, no markdown code fences.\n\
             SQL:",
            tables.join("\n"),
            question
        )
    }

    /// Translate a question the rules did not recognise.
    pub async fn generate(&self, question: &str) -> Result<SqlCandidate, GenerationError> {
        let prompt = self.build_prompt(question);
        debug!("Prompt for {}: {}", self.provider.name(), prompt);

        let raw = self.provider.complete(&prompt).await.map_err(|e| {
            warn!("LLM provider '{}' failed: {}", self.provider.name(), e);
            e
        })?;

        let sql = strip_code_fences(&raw);
        if sql.is_empty() {
            warn!("LLM provider '{}' returned no SQL", self.provider.name());
            return Err(GenerationError::EmptyStatement);
        }
        info!("Generated SQL via {} ({} chars)", self.provider.name(), sql.len());
        Ok(SqlCandidate::generated(sql))
    }
}

/// Remove markdown code fences and surrounding whitespace.
///
/// Handles an opening fence with or without a language tag (```` ```sql ````),
/// the closing fence, and anything the model wrote after the closing fence.
/// Clean SQL passes through unchanged apart from trimming.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.strip_suffix("```").unwrap_or(trimmed).trim().to_string();
    };
    let rest = drop_language_tag(rest);
    let body = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    body.trim().to_string()
}

fn drop_language_tag(after_fence: &str) -> &str {
    if let Some((first_line, remainder)) = after_fence.split_once('\n') {
        let tag = first_line.trim();
        if tag.is_empty() || is_language_tag(tag) {
            return remainder;
        }
    }
    // Same-line form: ```sql SELECT ...
    match after_fence.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("sql")
            && after_fence[3..].starts_with(char::is_whitespace) => &after_fence[3..],
        _ => after_fence,
    }
}

fn is_language_tag(token: &str) -> bool {
    let leading_keyword = ["select", "with"].iter().any(|k| token.eq_ignore_ascii_case(k));
    !leading_keyword
        && token.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{AiError, LlmProvider};
    use crate::common::SqlOrigin;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockLlm(String);

    #[async_trait]
    impl LlmProvider for MockLlm {
        async fn complete(&self, _p: &str) -> Result<String, AiError> { Ok(self.0.clone()) }
        fn name(&self) -> &str { "mock" }
    }

    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn complete(&self, p: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(p.to_string());
            Ok("SELECT 1".to_string())
        }
        fn name(&self) -> &str { "recording" }
    }

    struct DownLlm;

    #[async_trait]
    impl LlmProvider for DownLlm {
        async fn complete(&self, _p: &str) -> Result<String, AiError> {
            Err(AiError::Http("429 Too Many Requests".to_string()))
        }
        fn name(&self) -> &str { "down" }
    }

    #[tokio::test]
    async fn test_generate_plain_sql() {
        let gen = SqlGenerator::new(Arc::new(MockLlm("SELECT SUM(clicks) FROM product_ad_sales_metrics".to_string())));
        let c = gen.generate("how many clicks?").await.unwrap();
        assert_eq!(c.statement, "SELECT SUM(clicks) FROM product_ad_sales_metrics");
        assert_eq!(c.origin, SqlOrigin::Generated);
    }

    #[tokio::test]
    async fn test_generate_strips_fences() {
        let gen = SqlGenerator::new(Arc::new(MockLlm("```sql\nSELECT 1;\n```".to_string())));
        assert_eq!(gen.generate("one").await.unwrap().statement, "SELECT 1;");
    }

    #[tokio::test]
    async fn test_generate_provider_failure_propagates() {
        let gen = SqlGenerator::new(Arc::new(DownLlm));
        let err = gen.generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::Provider(AiError::Http(_))));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_generate_empty_reply_is_failure() {
        let gen = SqlGenerator::new(Arc::new(MockLlm("```sql\n```".to_string())));
        assert!(matches!(gen.generate("x").await, Err(GenerationError::EmptyStatement)));
        let gen = SqlGenerator::new(Arc::new(MockLlm("   \n".to_string())));
        assert!(matches!(gen.generate("x").await, Err(GenerationError::EmptyStatement)));
    }

    #[tokio::test]
    async fn test_generate_sends_built_prompt() {
        let llm = Arc::new(RecordingLlm { prompts: Mutex::new(Vec::new()) });
        let gen = SqlGenerator::new(llm.clone());
        gen.generate("Which item had the most impressions?").await.unwrap();
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], gen.build_prompt("Which item had the most impressions?"));
    }

    #[test]
    fn test_build_prompt_contains_catalog_and_question() {
        let gen = SqlGenerator::new(Arc::new(MockLlm(String::new())));
        let prompt = gen.build_prompt("Which item had the most impressions?");
        assert!(prompt.contains("- product_total_sales_metrics (columns: date, item_id, total_sales, total_units_ordered)"));
        assert!(prompt.contains("- product_ad_sales_metrics (columns: date, item_id, ad_sales, impressions, ad_spend, clicks, units_sold)"));
        assert!(prompt.contains("- product_eligibility (columns: eligibility_datetime_utc, item_id, eligibility, message)"));
        assert!(prompt.contains("ad_spend: amount spent on ads"));
        assert!(prompt.contains("Question: \"Which item had the most impressions?\""));
        assert!(prompt.contains("Return ONLY the SQL statement"));
    }

    #[test]
    fn test_strip_fence_variants() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```SQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```sqlite\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```SELECT 1```"), "SELECT 1");
        assert_eq!(strip_code_fences("```sql SELECT 1```"), "SELECT 1");
        assert_eq!(strip_code_fences("  SELECT 1\n```  "), "SELECT 1");
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```\nThis sums the values."), "SELECT 1");
    }

    #[test]
    fn test_strip_keeps_leading_keyword_line() {
        assert_eq!(
            strip_code_fences("```SELECT\n  item_id FROM product_eligibility\n```"),
            "SELECT\n  item_id FROM product_eligibility"
        );
    }

    #[test]
    fn test_strip_is_idempotent_on_clean_sql() {
        let clean = "SELECT item_id, SUM(clicks) FROM product_ad_sales_metrics GROUP BY item_id";
        let once = strip_code_fences(clean);
        assert_eq!(once, clean);
        assert_eq!(strip_code_fences(&once), once);

        let fenced = "```sql\nSELECT 2\n```";
        let once = strip_code_fences(fenced);
        assert_eq!(strip_code_fences(&once), once);
    }
}
