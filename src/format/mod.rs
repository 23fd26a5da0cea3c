//! Format Module - Turns result sets into answer text
//!
//! The answer policy is deliberately coarse and must stay byte-compatible
//! with existing consumers:
//! - no rows: `No data found for your query.`
//! - one row with one column: `The answer is <value>`
//! - anything else: the rows dumped as a list of tuples, e.g. `[(1, 'A'), (2, 'B')]`

use crate::common::{ResultSet, SimpleValue};

pub const NO_DATA_MESSAGE: &str = "No data found for your query.";

/// Shape of a result set, as far as answer text is concerned.
#[derive(Debug, PartialEq)]
pub enum AnswerShape<'a> {
    Empty,
    Scalar(&'a SimpleValue),
    Table(&'a ResultSet),
}

impl<'a> AnswerShape<'a> {
    pub fn of(result: &'a ResultSet) -> Self {
        match result.rows.as_slice() {
            [] => AnswerShape::Empty,
            [row] if row.len() == 1 => AnswerShape::Scalar(&row[0]),
            _ => AnswerShape::Table(result),
        }
    }
}

/// Result formatter
pub struct ResultFormatter;

impl ResultFormatter {
    /// Answer text for a result set
    pub fn answer(result: &ResultSet) -> String {
        match AnswerShape::of(result) {
            AnswerShape::Empty => NO_DATA_MESSAGE.to_string(),
            AnswerShape::Scalar(value) => format!("The answer is {}", value),
            AnswerShape::Table(rows) => Self::dump(rows),
        }
    }

    /// Literal dump of every row, in store order.
    pub fn dump(result: &ResultSet) -> String {
        let rows: Vec<String> = result.rows.iter()
            .map(|row| {
                let values: Vec<String> = row.iter().map(Self::literal).collect();
                match values.len() {
                    1 => format!("({},)", values[0]),
                    _ => format!("({})", values.join(", ")),
                }
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }

    /// A value as it appears inside a dumped tuple: strings are quoted.
    pub fn literal(value: &SimpleValue) -> String {
        match value {
            SimpleValue::String(s) => quote(s),
            other => other.to_string(),
        }
    }
}

fn quote(s: &str) -> String {
    // Prefer single quotes unless the text contains one and no double quote
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rs(rows: Vec<Vec<SimpleValue>>) -> ResultSet {
        ResultSet::new(rows)
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(ResultFormatter::answer(&rs(vec![])), "No data found for your query.");
    }

    #[test]
    fn test_single_integer() {
        assert_eq!(ResultFormatter::answer(&rs(vec![vec![SimpleValue::Int(42)]])), "The answer is 42");
    }

    #[test]
    fn test_single_float_keeps_precision() {
        assert_eq!(ResultFormatter::answer(&rs(vec![vec![SimpleValue::Float(1523.5)]])), "The answer is 1523.5");
        assert_eq!(
            ResultFormatter::answer(&rs(vec![vec![SimpleValue::Float(7.253012048192771)]])),
            "The answer is 7.253012048192771"
        );
        assert_eq!(ResultFormatter::answer(&rs(vec![vec![SimpleValue::Float(2e-5)]])), "The answer is 2e-05");
    }

    #[test]
    fn test_single_null_and_text() {
        assert_eq!(ResultFormatter::answer(&rs(vec![vec![SimpleValue::Null]])), "The answer is None");
        assert_eq!(ResultFormatter::answer(&rs(vec![vec!["21".into()]])), "The answer is 21");
    }

    #[test]
    fn test_two_rows_dumped() {
        let result = rs(vec![
            vec![SimpleValue::Int(1), "A".into()],
            vec![SimpleValue::Int(2), "B".into()],
        ]);
        assert_eq!(ResultFormatter::answer(&result), "[(1, 'A'), (2, 'B')]");
    }

    #[test]
    fn test_single_row_many_columns_dumped() {
        let result = rs(vec![vec!["17".into(), SimpleValue::Float(3.5)]]);
        assert_eq!(ResultFormatter::answer(&result), "[('17', 3.5)]");
    }

    #[test]
    fn test_many_rows_single_column_dumped() {
        let result = rs(vec![vec![SimpleValue::Int(1)], vec![SimpleValue::Null]]);
        assert_eq!(ResultFormatter::answer(&result), "[(1,), (None,)]");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(ResultFormatter::literal(&"it's".into()), "\"it's\"");
        assert_eq!(ResultFormatter::literal(&"say \"hi\"".into()), "'say \"hi\"'");
        assert_eq!(ResultFormatter::literal(&"a'b\"c".into()), "'a\\'b\"c'");
        assert_eq!(ResultFormatter::literal(&SimpleValue::Bool(false)), "False");
    }

    #[test]
    fn test_shape() {
        let empty = rs(vec![]);
        assert_eq!(AnswerShape::of(&empty), AnswerShape::Empty);
        let one = rs(vec![vec![SimpleValue::Int(1)]]);
        assert!(matches!(AnswerShape::of(&one), AnswerShape::Scalar(SimpleValue::Int(1))));
        let wide = rs(vec![vec![SimpleValue::Int(1), SimpleValue::Int(2)]]);
        assert!(matches!(AnswerShape::of(&wide), AnswerShape::Table(_)));
    }
}
