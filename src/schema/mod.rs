//! Schema Module - The fixed three-table catalog
//!
//! The catalog is static data: it is built into the binary, never mutated, and
//! shared freely between requests. It drives both the LLM prompt and the Arrow
//! schemas used to register the tables with the query engine.

use std::sync::Arc;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::Serialize;

/// Total sales per item and day.
pub const TOTAL_SALES_TABLE: &str = "product_total_sales_metrics";
/// Advertising performance per item and day.
pub const AD_SALES_TABLE: &str = "product_ad_sales_metrics";
/// Advertising eligibility snapshots per item.
pub const ELIGIBILITY_TABLE: &str = "product_eligibility";

/// Kind of number stored in a numeric column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Money amount (fractional)
    Amount,
    /// Whole-number count
    Count,
}

/// Semantic type of a catalog column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Date,
    Identifier,
    Numeric(Measure),
    Flag,
    Text,
}

impl SemanticType {
    /// Arrow type used when the column is loaded into the query engine.
    ///
    /// Dates and timestamps stay textual, the same way they arrive in the
    /// exported CSV files.
    pub fn arrow_type(&self) -> DataType {
        match self {
            SemanticType::Numeric(Measure::Amount) => DataType::Float64,
            SemanticType::Numeric(Measure::Count) => DataType::Int64,
            SemanticType::Date
            | SemanticType::Identifier
            | SemanticType::Flag
            | SemanticType::Text => DataType::Utf8,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Numeric(_))
    }
}

/// One column of a catalog table
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SchemaColumn {
    pub name: &'static str,
    pub semantic_type: SemanticType,
    pub description: &'static str,
}

/// One table of the catalog
#[derive(Clone, Copy, Debug, Serialize)]
pub struct SchemaTable {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: &'static [SchemaColumn],
}

const fn col(name: &'static str, semantic_type: SemanticType, description: &'static str) -> SchemaColumn {
    SchemaColumn { name, semantic_type, description }
}

static CATALOG: [SchemaTable; 3] = [
    SchemaTable {
        name: TOTAL_SALES_TABLE,
        description: "daily total sales per item",
        columns: &[
            col("date", SemanticType::Date, "calendar day of the metrics (YYYY-MM-DD)"),
            col("item_id", SemanticType::Identifier, "product identifier"),
            col("total_sales", SemanticType::Numeric(Measure::Amount), "total sales amount for the day"),
            col("total_units_ordered", SemanticType::Numeric(Measure::Count), "total units ordered for the day"),
        ],
    },
    SchemaTable {
        name: AD_SALES_TABLE,
        description: "daily advertising metrics per item",
        columns: &[
            col("date", SemanticType::Date, "calendar day of the metrics (YYYY-MM-DD)"),
            col("item_id", SemanticType::Identifier, "product identifier"),
            col("ad_sales", SemanticType::Numeric(Measure::Amount), "sales amount attributed to ads"),
            col("impressions", SemanticType::Numeric(Measure::Count), "number of ad impressions"),
            col("ad_spend", SemanticType::Numeric(Measure::Amount), "amount spent on ads"),
            col("clicks", SemanticType::Numeric(Measure::Count), "number of ad clicks"),
            col("units_sold", SemanticType::Numeric(Measure::Count), "units sold through ads"),
        ],
    },
    SchemaTable {
        name: ELIGIBILITY_TABLE,
        description: "advertising eligibility status per item",
        columns: &[
            col("eligibility_datetime_utc", SemanticType::Date, "UTC timestamp of the eligibility check"),
            col("item_id", SemanticType::Identifier, "product identifier"),
            col("eligibility", SemanticType::Flag, "whether the item is eligible for ads (TRUE/FALSE)"),
            col("message", SemanticType::Text, "reason given for the eligibility status"),
        ],
    },
];

/// All catalog tables, in declaration order.
pub fn catalog() -> &'static [SchemaTable] {
    &CATALOG
}

/// Look up a table by name.
pub fn table(name: &str) -> Option<&'static SchemaTable> {
    CATALOG.iter().find(|t| t.name == name)
}

impl SchemaTable {
    pub fn column(&self, name: &str) -> Option<&'static SchemaColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Arrow schema for registering this table. Every column is nullable since
    /// exported CSV files routinely contain blanks.
    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self.columns.iter()
            .map(|c| Field::new(c.name, c.semantic_type.arrow_type(), true))
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Prompt line: `- name (columns: a, b, c)` followed by one indented line per column meaning.
    pub fn describe(&self) -> String {
        let mut out = format!("- {} (columns: {})", self.name, self.column_names().join(", "));
        for column in self.columns {
            out.push_str(&format!("\n    - {}: {}", column.name, column.description));
        }
        out
    }
}
