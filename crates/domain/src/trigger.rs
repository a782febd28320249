//! Trigger conditions — the threshold test a standing rule applies to a
//! device metric.
//!
//! The action a trigger runs is behaviour and lives in the `app` crate.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A device reading that triggers can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
}

impl FromStr for Metric {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("temperature") {
            Ok(Self::Temperature)
        } else {
            Err(ParseError::Metric(s.to_string()))
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => f.write_str("temperature"),
        }
    }
}

/// Comparison applied between a reading and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// Strictly greater than.
    Gt,
    /// Strictly less than.
    Lt,
    /// Exact equality, no tolerance.
    Eq,
}

impl Operator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gt => "GT",
            Self::Lt => "LT",
            Self::Eq => "EQ",
        }
    }

    /// Apply the comparison as `value <op> threshold`.
    ///
    /// `Eq` compares bit-for-bit through [`f64::total_cmp`], so `-0.0` and
    /// `0.0` differ and readings that only come close never match.
    #[must_use]
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Eq => value.total_cmp(&threshold) == Ordering::Equal,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ">" | "gt" => Ok(Self::Gt),
            "<" | "lt" => Ok(Self::Lt),
            "==" | "=" | "eq" => Ok(Self::Eq),
            _ => Err(ParseError::Operator(s.to_string())),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

/// The threshold test of a trigger.
///
/// The metric is kept as written so that rules naming a metric the hub does
/// not (yet) understand can be registered; they simply never fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: String,
    pub operator: Operator,
    pub threshold: f64,
}

impl Condition {
    #[must_use]
    pub fn new(metric: impl Into<String>, operator: Operator, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            operator,
            threshold,
        }
    }

    /// The recognised metric, or `None` when the name is unknown.
    #[must_use]
    pub fn recognized_metric(&self) -> Option<Metric> {
        self.metric.parse().ok()
    }

    /// Whether `value` satisfies this condition.
    #[must_use]
    pub fn holds(&self, value: f64) -> bool {
        self.operator.compare(value, self.threshold)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:.2}", self.metric, self.operator, self.threshold)
    }
}
