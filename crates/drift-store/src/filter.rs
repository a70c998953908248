//! Record filters
//!
//! A `list` call takes a conjunction of filters. Each filter compares one
//! field of the stored record (dotted path, e.g. `data.repository`) against a
//! plain value.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" | "==" => Ok(Op::Eq),
            ">" => Ok(Op::Gt),
            ">=" => Ok(Op::Gte),
            "<" => Ok(Op::Lt),
            "<=" => Ok(Op::Lte),
            other => Err(Error::InvalidFilter {
                field: String::new(),
                reason: format!("unknown operator '{}'", other),
            }),
        }
    }
}

/// A single `(field, operator, value)` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Op::Eq, value)
    }

    /// Check whether a record satisfies this filter.
    ///
    /// Ordering operators compare numbers numerically and strings
    /// lexicographically (RFC 3339 timestamps therefore order correctly).
    /// A missing field never satisfies an ordering operator.
    pub fn matches(&self, record: &Value) -> bool {
        let actual = lookup(record, &self.field).unwrap_or(&Value::Null);

        if self.op == Op::Eq {
            return actual == &self.value;
        }

        match compare(actual, &self.value) {
            Some(ordering) => match self.op {
                Op::Gt => ordering == Ordering::Greater,
                Op::Gte => ordering != Ordering::Less,
                Op::Lt => ordering == Ordering::Less,
                Op::Lte => ordering != Ordering::Greater,
                Op::Eq => unreachable!(),
            },
            None => false,
        }
    }
}

/// Check a record against every filter.
pub fn matches_all(record: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(record))
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |value, segment| value.get(segment))
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eq_matches_nested_field() {
        let record = json!({"name": "api", "data": {"repository": "charts"}});
        assert!(Filter::eq("data.repository", "charts").matches(&record));
        assert!(!Filter::eq("data.repository", "other").matches(&record));
    }

    #[test]
    fn eq_null_matches_missing_field() {
        let record = json!({"name": "api"});
        assert!(Filter::eq("previous_id", Value::Null).matches(&record));
    }

    #[test]
    fn ordering_on_numbers_and_strings() {
        let record = json!({"retries": 2, "created_at": "2024-03-01T00:00:00Z"});
        assert!(Filter::new("retries", Op::Gt, 1).matches(&record));
        assert!(Filter::new("retries", Op::Lte, 2).matches(&record));
        assert!(!Filter::new("retries", Op::Lt, 2).matches(&record));
        assert!(Filter::new("created_at", Op::Gte, "2024-01-01T00:00:00Z").matches(&record));
    }

    #[test]
    fn ordering_on_missing_field_is_false() {
        let record = json!({});
        assert!(!Filter::new("retries", Op::Gt, 0).matches(&record));
        assert!(!Filter::new("retries", Op::Lt, 0).matches(&record));
    }

    #[test]
    fn op_parses_from_str() {
        assert_eq!(">=".parse::<Op>().unwrap(), Op::Gte);
        assert_eq!("=".parse::<Op>().unwrap(), Op::Eq);
        assert!("!=".parse::<Op>().is_err());
    }
}
