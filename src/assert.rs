//! Assertion helpers over the evaluation algebra.
//!
//! Call sites wrap the value under test in an [`Assertable`] via
//! [`assert_that`] and apply a condition; a failed condition returns an
//! [`EngineError::Failure`] carrying the rendered explanation, which the
//! runner records and swallows at the spec-body boundary.
//!
//! Failure message policy: a direct condition that did not hold explains
//! itself with an inspection of the actual value; a negated condition that
//! held anyway reads "it does not".

use crate::algebra::{predicates, Evaluation, Predicate};
use crate::errors::{EngineError, EngineResult};
use crate::value::Value;

/// A value under test.
#[derive(Debug, Clone)]
pub struct Assertable {
    actual: Value,
}

/// Wraps a value for assertion.
pub fn assert_that(actual: impl Into<Value>) -> Assertable {
    Assertable {
        actual: actual.into(),
    }
}

impl Assertable {
    pub fn value(&self) -> &Value {
        &self.actual
    }

    /// Asserts value equality against an evaluation (raw values auto-wrap).
    pub fn should_be(&self, expected: impl Into<Evaluation>) -> EngineResult<()> {
        self.check(predicates::equals, expected.into(), false, "to be")
    }

    pub fn should_not_be(&self, expected: impl Into<Evaluation>) -> EngineResult<()> {
        self.check(predicates::equals, expected.into(), true, "not to be")
    }

    /// Asserts exists-in-collection containment (substring for strings).
    pub fn should_contain(&self, expected: impl Into<Evaluation>) -> EngineResult<()> {
        self.check(predicates::contains, expected.into(), false, "to contain")
    }

    pub fn should_not_contain(&self, expected: impl Into<Evaluation>) -> EngineResult<()> {
        self.check(predicates::contains, expected.into(), true, "not to contain")
    }

    /// Asserts that the value matches a regex pattern anywhere.
    pub fn should_match(&self, pattern: &str) -> EngineResult<()> {
        self.check(predicates::matches, Evaluation::from(pattern), false, "to match")
    }

    pub fn should_not_match(&self, pattern: &str) -> EngineResult<()> {
        self.check(predicates::matches, Evaluation::from(pattern), true, "not to match")
    }

    pub fn should_be_less_than(&self, expected: impl Into<Evaluation>) -> EngineResult<()> {
        self.check(
            predicates::less_than,
            expected.into(),
            false,
            "to be less than",
        )
    }

    pub fn should_be_greater_than(&self, expected: impl Into<Evaluation>) -> EngineResult<()> {
        self.check(
            predicates::greater_than,
            expected.into(),
            false,
            "to be greater than",
        )
    }

    /// Asserts that a string, list or map has no elements.
    pub fn should_be_empty(&self) -> EngineResult<()> {
        let empty = match &self.actual {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            Value::Nil => true,
            _ => false,
        };
        if empty {
            Ok(())
        } else {
            Err(EngineError::failure(format!(
                "expected to be empty, got {}",
                self.actual.inspect()
            )))
        }
    }

    fn check(
        &self,
        predicate: Predicate,
        evaluation: Evaluation,
        negate: bool,
        verb: &str,
    ) -> EngineResult<()> {
        if evaluation.evaluate(predicate, &self.actual, negate) {
            return Ok(());
        }
        let message = if negate {
            // The negated condition held anyway.
            format!("expected {} {}, but it does not", verb, evaluation)
        } else {
            format!(
                "expected {} {}, got {}",
                verb,
                evaluation,
                self.actual.inspect()
            )
        };
        Err(EngineError::failure(message))
    }
}
