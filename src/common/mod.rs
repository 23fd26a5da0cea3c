//! Shared types passed between the resolver, executor and formatter.

use serde::{Deserialize, Serialize};

/// A single scalar coming back from the query engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SimpleValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl SimpleValue {
    /// Numeric view of the value, used for chart series.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SimpleValue::Int(v) => Some(*v as f64),
            SimpleValue::Float(v) => Some(*v),
            SimpleValue::String(s) => s.trim().parse().ok(),
            SimpleValue::Null | SimpleValue::Bool(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SimpleValue::Null)
    }
}

impl std::fmt::Display for SimpleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimpleValue::Null => write!(f, "None"),
            SimpleValue::Bool(true) => write!(f, "True"),
            SimpleValue::Bool(false) => write!(f, "False"),
            SimpleValue::Int(v) => write!(f, "{}", v),
            SimpleValue::Float(v) => write!(f, "{}", float_repr(*v)),
            SimpleValue::String(v) => write!(f, "{}", v),
        }
    }
}

/// Shortest round-trip digits, `.0` on whole numbers, and an exponent written
/// as `e+16` / `e-05` (sign plus at least two digits).
pub fn float_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // Debug switches to exponent form below 1e-4 and from 1e16 on
    let repr = format!("{:?}", v);
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

impl From<i64> for SimpleValue {
    fn from(v: i64) -> Self {
        SimpleValue::Int(v)
    }
}

impl From<f64> for SimpleValue {
    fn from(v: f64) -> Self {
        SimpleValue::Float(v)
    }
}

impl From<&str> for SimpleValue {
    fn from(v: &str) -> Self {
        SimpleValue::String(v.to_string())
    }
}

/// One result row, columns in select-list order.
pub type Row = Vec<SimpleValue>;

/// Rows in the order the store returned them.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ResultSet {
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Where a SQL statement came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlOrigin {
    Rule,
    Generated,
}

/// A statement ready for the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlCandidate {
    pub statement: String,
    pub origin: SqlOrigin,
}

impl SqlCandidate {
    pub fn rule(statement: impl Into<String>) -> Self {
        Self { statement: statement.into(), origin: SqlOrigin::Rule }
    }

    pub fn generated(statement: impl Into<String>) -> Self {
        Self { statement: statement.into(), origin: SqlOrigin::Generated }
    }
}

/// Successful answer to a question.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnswerResponse {
    pub question: String,
    pub sql_query: String,
    pub sql_origin: SqlOrigin,
    pub result: ResultSet,
    pub answer: String,
}
