//! The evaluation algebra used inside assertions.
//!
//! An [`Evaluation`] wraps an expected value, or combines two evaluations
//! with AND/OR. Composites evaluate both sides unconditionally so that each
//! side can contribute to the rendered explanation of a failure; negation is
//! a parameter of [`Evaluation::evaluate`], not a node type. This lets an
//! assertion author express "contains A and B, or C" as data and lets the
//! engine explain why a check passed or failed without re-running the
//! predicates.

use std::fmt;

use regex::Regex;

use crate::value::Value;

/// A predicate over (expected, actual) pairs. See [`predicates`] for the
/// stock set.
pub type Predicate = fn(expected: &Value, actual: &Value) -> bool;

/// A composable boolean predicate wrapper.
#[derive(Debug, Clone)]
pub enum Evaluation {
    Leaf(Value),
    And(Box<Evaluation>, Box<Evaluation>),
    Or(Box<Evaluation>, Box<Evaluation>),
}

impl Evaluation {
    /// Wraps a raw value. Passing an existing evaluation is a no-op.
    pub fn wrap(value: impl Into<Evaluation>) -> Evaluation {
        value.into()
    }

    /// Combines this evaluation with another under logical AND.
    pub fn and(self, other: impl Into<Evaluation>) -> Evaluation {
        Evaluation::And(Box::new(self), Box::new(other.into()))
    }

    /// Combines this evaluation with another under logical OR.
    pub fn or(self, other: impl Into<Evaluation>) -> Evaluation {
        Evaluation::Or(Box::new(self), Box::new(other.into()))
    }

    /// Computes `negate XOR predicate(expected, actual)` for a leaf. For a
    /// composite, both sides are always evaluated (no short-circuit) and
    /// their negate-aware results combined.
    pub fn evaluate(&self, predicate: Predicate, actual: &Value, negate: bool) -> bool {
        match self {
            Evaluation::Leaf(expected) => negate ^ predicate(expected, actual),
            Evaluation::And(left, right) => {
                let l = left.evaluate(predicate, actual, negate);
                let r = right.evaluate(predicate, actual, negate);
                l && r
            }
            Evaluation::Or(left, right) => {
                let l = left.evaluate(predicate, actual, negate);
                let r = right.evaluate(predicate, actual, negate);
                l || r
            }
        }
    }

    /// Human-readable form of the expected condition, with composite-level
    /// negation rendered as `not <repr>`.
    pub fn describe(&self, negate: bool) -> String {
        if negate {
            format!("not {}", self)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Leaf(value) => write!(f, "{}", value),
            Evaluation::And(left, right) => write!(f, "{} and {}", left, right),
            Evaluation::Or(left, right) => write!(f, "{} or {}", left, right),
        }
    }
}

impl From<Value> for Evaluation {
    fn from(value: Value) -> Self {
        Evaluation::Leaf(value)
    }
}

impl From<&str> for Evaluation {
    fn from(s: &str) -> Self {
        Evaluation::Leaf(Value::from(s))
    }
}

impl From<String> for Evaluation {
    fn from(s: String) -> Self {
        Evaluation::Leaf(Value::from(s))
    }
}

impl From<i64> for Evaluation {
    fn from(n: i64) -> Self {
        Evaluation::Leaf(Value::from(n))
    }
}

impl From<i32> for Evaluation {
    fn from(n: i32) -> Self {
        Evaluation::Leaf(Value::from(n))
    }
}

impl From<f64> for Evaluation {
    fn from(n: f64) -> Self {
        Evaluation::Leaf(Value::from(n))
    }
}

impl From<bool> for Evaluation {
    fn from(b: bool) -> Self {
        Evaluation::Leaf(Value::from(b))
    }
}

/// The stock predicates used by the assertion helpers.
pub mod predicates {
    use super::*;

    /// Value equality with string normalization of typed scalars, so that
    /// `42` compares equal to `"42"`.
    pub fn equals(expected: &Value, actual: &Value) -> bool {
        if expected == actual {
            return true;
        }
        scalar_form(expected)
            .zip(scalar_form(actual))
            .map(|(e, a)| e == a)
            .unwrap_or(false)
    }

    /// Exists-in-collection semantics: the expected value is an element of
    /// the actual list, a key of the actual map, or a substring of the
    /// actual string.
    pub fn contains(expected: &Value, actual: &Value) -> bool {
        match actual {
            Value::List(items) => items.iter().any(|item| equals(expected, item)),
            Value::Map(entries) => expected
                .as_str()
                .map(|key| entries.contains_key(key))
                .unwrap_or(false),
            Value::String(s) => expected
                .as_str()
                .map(|needle| s.contains(needle))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Regex match-anywhere semantics; the expected value is the pattern.
    pub fn matches(expected: &Value, actual: &Value) -> bool {
        let (Some(pattern), Some(haystack)) = (expected.as_str(), actual.as_str()) else {
            return false;
        };
        Regex::new(pattern)
            .map(|re| re.is_match(haystack))
            .unwrap_or(false)
    }

    /// Numeric strict less-than: actual < expected.
    pub fn less_than(expected: &Value, actual: &Value) -> bool {
        actual
            .as_number()
            .zip(expected.as_number())
            .map(|(a, e)| a < e)
            .unwrap_or(false)
    }

    /// Numeric strict greater-than: actual > expected.
    pub fn greater_than(expected: &Value, actual: &Value) -> bool {
        actual
            .as_number()
            .zip(expected.as_number())
            .map(|(a, e)| a > e)
            .unwrap_or(false)
    }

    fn scalar_form(value: &Value) -> Option<String> {
        match value {
            Value::Number(_) | Value::String(_) | Value::Bool(_) => Some(value.to_string()),
            _ => None,
        }
    }
}
