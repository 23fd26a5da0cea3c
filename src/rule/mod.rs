//! Rule Module - Known question patterns mapped to fixed SQL
//!
//! Rules are tried in declaration order before the LLM is consulted. The first
//! rule whose pattern occurs in the question wins; there is no scoring. A
//! question mentioning both "total sales" and "roas" therefore gets the sales
//! query.

use crate::common::SqlCandidate;
use tracing::debug;

/// Sum of all sales.
pub const TOTAL_SALES_SQL: &str =
    "SELECT SUM(total_sales) AS total_sales FROM product_total_sales_metrics";

/// Return on ad spend. A zero spend total yields NULL instead of a division error.
pub const ROAS_SQL: &str =
    "SELECT SUM(ad_sales) / NULLIF(SUM(ad_spend), 0) AS roas FROM product_ad_sales_metrics";

/// Item with the highest cost per click. Items without clicks are skipped.
pub const HIGHEST_CPC_SQL: &str =
    "SELECT item_id, SUM(ad_spend) / NULLIF(SUM(clicks), 0) AS cpc \
     FROM product_ad_sales_metrics \
     GROUP BY item_id \
     ORDER BY cpc DESC NULLS LAST, item_id ASC \
     LIMIT 1";

/// Anything that can turn a normalized question into SQL without side effects.
pub trait SqlResolver: Send + Sync {
    /// Return a candidate if this resolver recognises the question.
    fn try_resolve(&self, question: &str) -> Option<SqlCandidate>;
    fn name(&self) -> &str;
}

/// Rule definition
#[derive(Clone, Debug)]
pub struct Rule {
    pub name: &'static str,
    /// Any one of these substrings triggers the rule
    pub patterns: &'static [&'static str],
    pub sql: &'static str,
}

impl Rule {
    pub const fn new(name: &'static str, patterns: &'static [&'static str], sql: &'static str) -> Self {
        Self { name, patterns, sql }
    }

    pub fn matches(&self, question: &str) -> bool {
        self.patterns.iter().any(|p| question.contains(p))
    }
}

impl SqlResolver for Rule {
    fn try_resolve(&self, question: &str) -> Option<SqlCandidate> {
        self.matches(question).then(|| SqlCandidate::rule(self.sql))
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Built-in rules, in precedence order.
pub static DEFAULT_RULES: [Rule; 3] = [
    Rule::new("total_sales", &["total sales"], TOTAL_SALES_SQL),
    Rule::new("roas", &["roas", "return on ad spend"], ROAS_SQL),
    Rule::new("highest_cpc", &["highest cpc"], HIGHEST_CPC_SQL),
];

/// Lower-case and trim a question before matching.
pub fn normalize_question(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Ordered set of resolvers; first hit wins.
pub struct RuleMatcher {
    resolvers: Vec<Box<dyn SqlResolver>>,
}

impl RuleMatcher {
    pub fn new(resolvers: Vec<Box<dyn SqlResolver>>) -> Self {
        Self { resolvers }
    }

    /// Matcher over [`DEFAULT_RULES`].
    pub fn with_default_rules() -> Self {
        Self::new(
            DEFAULT_RULES.iter()
                .cloned()
                .map(|r| Box::new(r) as Box<dyn SqlResolver>)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl SqlResolver for RuleMatcher {
    fn try_resolve(&self, question: &str) -> Option<SqlCandidate> {
        self.resolvers.iter().find_map(|r| {
            let hit = r.try_resolve(question);
            if hit.is_some() {
                debug!("Rule '{}' matched", r.name());
            }
            hit
        })
    }

    fn name(&self) -> &str {
        "rules"
    }
}
