//! Aggregate Module - Fixed top-N reports rendered as bar charts
//!
//! Each report is one grouped query: sum a metric per item, highest first,
//! ten items at most. Rows go to the chart renderer as two parallel series.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chart::{BarChart, ChartError, ChartRenderer, LIGHT_GREEN, SKY_BLUE};
use crate::common::ResultSet;
use crate::executor::{ExecutionFailed, QueryExecutor};

pub const TOP_N: usize = 10;

pub const NO_DATA_AVAILABLE: &str = "No data available.";

pub const TOP_SALES_SQL: &str = "SELECT item_id, SUM(total_sales) AS total_sales \
     FROM product_total_sales_metrics \
     GROUP BY item_id \
     ORDER BY SUM(total_sales) DESC NULLS LAST, item_id ASC \
     LIMIT 10";

pub const TOP_AD_SPEND_SQL: &str = "SELECT item_id, SUM(ad_spend) AS ad_spend \
     FROM product_ad_sales_metrics \
     GROUP BY item_id \
     ORDER BY SUM(ad_spend) DESC NULLS LAST, item_id ASC \
     LIMIT 10";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Sales,
    AdSpend,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::Sales, ReportKind::AdSpend];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Sales => "sales",
            ReportKind::AdSpend => "ad_spend",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            ReportKind::Sales => TOP_SALES_SQL,
            ReportKind::AdSpend => TOP_AD_SPEND_SQL,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Sales => "Top 10 Products by Total Sales",
            ReportKind::AdSpend => "Top 10 Products by Ad Spend",
        }
    }

    pub fn y_label(&self) -> &'static str {
        match self {
            ReportKind::Sales => "Total Sales",
            ReportKind::AdSpend => "Ad Spend",
        }
    }

    pub fn color(&self) -> [u8; 3] {
        match self {
            ReportKind::Sales => SKY_BLUE,
            ReportKind::AdSpend => LIGHT_GREEN,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown report '{0}', expected one of: sales, ad_spend")]
pub struct UnknownReport(pub String);

impl FromStr for ReportKind {
    type Err = UnknownReport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sales" => Ok(ReportKind::Sales),
            "ad_spend" => Ok(ReportKind::AdSpend),
            other => Err(UnknownReport(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Report query failed: {0}")]
    Execution(#[from] ExecutionFailed),
    #[error(transparent)]
    Render(#[from] ChartError),
}

/// Outcome of a report run. No rows is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Chart {
        labels: Vec<String>,
        values: Vec<f64>,
        png: Vec<u8>,
    },
    NoData,
}

pub struct Reporter {
    executor: QueryExecutor,
    renderer: Arc<dyn ChartRenderer>,
}

impl Reporter {
    pub fn new(executor: QueryExecutor, renderer: Arc<dyn ChartRenderer>) -> Self {
        Self { executor, renderer }
    }

    pub fn content_type(&self) -> &'static str {
        self.renderer.content_type()
    }

    pub async fn report(&self, kind: ReportKind) -> Result<ReportOutcome, ReportError> {
        let rows = self.executor.run(kind.sql()).await?;
        let (labels, values) = series(&rows);
        if labels.is_empty() {
            info!("Report {} has no data", kind);
            return Ok(ReportOutcome::NoData);
        }

        let chart = BarChart {
            title: kind.title().to_string(),
            x_label: "Item ID".to_string(),
            y_label: kind.y_label().to_string(),
            labels,
            values,
            color: kind.color(),
        };
        let png = self.renderer.render(&chart)?;
        info!("Report {} rendered: {} items, {} bytes", kind, chart.labels.len(), png.len());

        Ok(ReportOutcome::Chart { labels: chart.labels, values: chart.values, png })
    }
}

/// Split `(item, value)` rows into parallel label/value sequences, capped at
/// [`TOP_N`]. Null sums chart as zero.
pub fn series(rows: &ResultSet) -> (Vec<String>, Vec<f64>) {
    let mut labels = Vec::with_capacity(rows.len().min(TOP_N));
    let mut values = Vec::with_capacity(rows.len().min(TOP_N));
    for row in rows.rows.iter().take(TOP_N) {
        let (Some(label), Some(value)) = (row.first(), row.get(1)) else {
            debug!("Skipping short report row: {:?}", row);
            continue;
        };
        labels.push(label.to_string());
        values.push(value.as_f64().unwrap_or(0.0));
    }
    (labels, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::common::{Row, SimpleValue};
    use crate::schema::{AD_SALES_TABLE, TOTAL_SALES_TABLE};
    use crate::storage::MemoryStore;

    /// Records every chart it is asked to draw.
    #[derive(Default)]
    struct RecordingRenderer {
        charts: Mutex<Vec<BarChart>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, chart: &BarChart) -> Result<Vec<u8>, ChartError> {
            self.charts.lock().unwrap().push(chart.clone());
            Ok(b"png".to_vec())
        }
    }

    fn sale(item: &str, amount: f64) -> Row {
        vec!["2025-06-01".into(), item.into(), amount.into(), 1i64.into()]
    }

    fn reporter(store: MemoryStore) -> (Reporter, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::default());
        let executor = QueryExecutor::new(Arc::new(store));
        (Reporter::new(executor, renderer.clone()), renderer)
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("sales".parse::<ReportKind>().unwrap(), ReportKind::Sales);
        assert_eq!("AD_SPEND".parse::<ReportKind>().unwrap(), ReportKind::AdSpend);
        assert!("revenue".parse::<ReportKind>().is_err());
        assert_eq!(ReportKind::AdSpend.to_string(), "ad_spend");
    }

    #[tokio::test]
    async fn test_sales_report_orders_descending() {
        let store = MemoryStore::new()
            .with_rows(TOTAL_SALES_TABLE, vec![sale("X", 60.0), sale("Y", 300.0), sale("Z", 50.0), sale("X", 40.0)])
            .unwrap();
        let (reporter, renderer) = reporter(store);

        let outcome = reporter.report(ReportKind::Sales).await.unwrap();
        let ReportOutcome::Chart { labels, values, png } = outcome else {
            panic!("expected a chart");
        };
        assert_eq!(labels, vec!["Y", "X", "Z"]);
        assert_eq!(values, vec![300.0, 100.0, 50.0]);
        assert_eq!(png, b"png".to_vec());

        let charts = renderer.charts.lock().unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].title, "Top 10 Products by Total Sales");
        assert_eq!(charts[0].x_label, "Item ID");
        assert_eq!(charts[0].color, SKY_BLUE);
    }

    #[tokio::test]
    async fn test_report_truncates_to_ten() {
        let rows: Vec<Row> = (0..15).map(|i| sale(&format!("item{:02}", i), i as f64)).collect();
        let store = MemoryStore::new().with_rows(TOTAL_SALES_TABLE, rows).unwrap();
        let (reporter, _) = reporter(store);

        let ReportOutcome::Chart { labels, .. } = reporter.report(ReportKind::Sales).await.unwrap() else {
            panic!("expected a chart");
        };
        assert_eq!(labels.len(), 10);
        assert_eq!(labels[0], "item14");
        assert_eq!(labels[9], "item05");
    }

    #[tokio::test]
    async fn test_ties_break_on_item_id() {
        let store = MemoryStore::new()
            .with_rows(TOTAL_SALES_TABLE, vec![sale("b", 10.0), sale("a", 10.0), sale("c", 20.0)])
            .unwrap();
        let (reporter, _) = reporter(store);
        let ReportOutcome::Chart { labels, .. } = reporter.report(ReportKind::Sales).await.unwrap() else {
            panic!("expected a chart");
        };
        assert_eq!(labels, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_no_data_skips_renderer() {
        let (reporter, renderer) = reporter(MemoryStore::new());
        let outcome = reporter.report(ReportKind::AdSpend).await.unwrap();
        assert_eq!(outcome, ReportOutcome::NoData);
        assert!(renderer.charts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ad_spend_report() {
        let store = MemoryStore::new()
            .with_rows(AD_SALES_TABLE, vec![
                vec!["2025-06-01".into(), "A".into(), 10.0f64.into(), 100i64.into(), 4.0f64.into(), 2i64.into(), 1i64.into()],
                vec!["2025-06-01".into(), "B".into(), 10.0f64.into(), 100i64.into(), 9.5f64.into(), 3i64.into(), 1i64.into()],
            ])
            .unwrap();
        let (reporter, renderer) = reporter(store);
        let ReportOutcome::Chart { labels, values, .. } = reporter.report(ReportKind::AdSpend).await.unwrap() else {
            panic!("expected a chart");
        };
        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(values, vec![9.5, 4.0]);
        let charts = renderer.charts.lock().unwrap();
        assert_eq!(charts[0].y_label, "Ad Spend");
        assert_eq!(charts[0].color, LIGHT_GREEN);
    }

    #[test]
    fn test_series_null_value_is_zero() {
        let rows = ResultSet::new(vec![vec!["A".into(), SimpleValue::Null]]);
        assert_eq!(series(&rows), (vec!["A".to_string()], vec![0.0]));
    }
}
