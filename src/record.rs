//! Run records: the recorded outcome of executing one spec or one
//! setup/teardown pseudo-run.
//!
//! A record is created when execution begins, mutated only by the runner and
//! by the running body through its `RunContext`, and left untouched once
//! finished. The ordered sequence of records handed back by a run is the
//! sole contract between the engine and report generators; everything here
//! serializes with serde for that boundary.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::errors::{EngineError, SpecLocation};
use crate::value::Value;

/// A run record shared between the runner, the run context, and observers.
pub type SharedRecord = Rc<RefCell<RunRecord>>;

/// Terminal classification of a run or expectation, in precedence order
/// error > failed > skipped > success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
    Error,
    Skipped,
}

/// The kind of unit a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Spec,
    Setup,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub level: LogLevel,
    pub message: String,
}

/// One observed assertion and how it went.
#[derive(Debug, Clone, Serialize)]
pub struct ExpectationOutcome {
    pub description: String,
    pub status: Status,
}

/// An unexpected error as recorded on a run: originating type, message, and
/// the specification declaration it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub class: String,
    pub message: String,
    pub location: Option<SpecLocation>,
}

#[derive(Debug, Serialize)]
pub struct RunRecord {
    /// Generated unique name of the spec (`<subject-slug>-<n>`), or a
    /// synthetic `<subject-slug>-setup`/`-teardown` name for pseudo-runs.
    pub name: String,
    pub description: String,
    pub kind: RunKind,
    /// The data element this instantiation ran with, if the spec is
    /// parameterized.
    pub data: Option<Value>,
    pub location: Option<SpecLocation>,
    pub started: SystemTime,
    pub finished: Option<SystemTime>,
    pub logs: Vec<LogEntry>,
    pub expectations: Vec<ExpectationOutcome>,
    pub properties: Vec<(String, Value)>,
    pub failure: Option<String>,
    pub error: Option<ErrorReport>,
    pub skipped: bool,
    pub skip_reason: Option<String>,
}

impl RunRecord {
    pub fn start(
        kind: RunKind,
        name: impl Into<String>,
        description: impl Into<String>,
        data: Option<Value>,
        location: Option<SpecLocation>,
    ) -> SharedRecord {
        Rc::new(RefCell::new(RunRecord {
            name: name.into(),
            description: description.into(),
            kind,
            data,
            location,
            started: SystemTime::now(),
            finished: None,
            logs: Vec::new(),
            expectations: Vec::new(),
            properties: Vec::new(),
            failure: None,
            error: None,
            skipped: false,
            skip_reason: None,
        }))
    }

    pub fn finish(&mut self) {
        if self.finished.is_none() {
            self.finished = Some(SystemTime::now());
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.finished
            .and_then(|finished| finished.duration_since(self.started).ok())
    }

    /// Error classification outranks failure, failure outranks skip.
    pub fn status(&self) -> Status {
        if self.error.is_some() {
            Status::Error
        } else if self.failure.is_some() {
            Status::Failed
        } else if self.skipped {
            Status::Skipped
        } else {
            Status::Success
        }
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(LogEntry {
            timestamp: SystemTime::now(),
            level,
            message: message.into(),
        });
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.push((key.into(), value.into()));
    }

    pub fn add_expectation(&mut self, description: impl Into<String>, status: Status) {
        self.expectations.push(ExpectationOutcome {
            description: description.into(),
            status,
        });
    }

    /// Applies a unit outcome with the engine's precedence rules: the first
    /// unexpected error and the first expectation failure stick; later
    /// failures never mask an earlier error's reporting priority.
    pub fn record_outcome(&mut self, error: &EngineError) {
        match error {
            EngineError::Failure { message } => {
                if self.failure.is_none() {
                    self.failure = Some(message.clone());
                }
            }
            EngineError::Skip { reason } => {
                self.skipped = true;
                if self.skip_reason.is_none() {
                    self.skip_reason = reason.clone();
                }
            }
            other => {
                if self.error.is_none() {
                    let (class, message) = match other {
                        EngineError::Unexpected { class, message, .. } => {
                            (class.clone(), message.clone())
                        }
                        _ => (error_class(other), other.to_string()),
                    };
                    self.error = Some(ErrorReport {
                        class,
                        message,
                        location: self.location,
                    });
                }
            }
        }
    }
}

fn error_class(error: &EngineError) -> String {
    match error {
        EngineError::Unexpected { class, .. } => class.clone(),
        EngineError::UndefinedCapability { .. } => "UndefinedCapability".to_string(),
        EngineError::UndefinedMixin { .. } => "UndefinedMixin".to_string(),
        EngineError::MalformedData { .. } => "MalformedData".to_string(),
        EngineError::LockedContext { .. } => "LockedContext".to_string(),
        EngineError::Failure { .. } | EngineError::Skip { .. } => "EngineError".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> RunRecord {
        let shared = RunRecord::start(RunKind::Spec, "general-1", "does things", None, None);
        Rc::try_unwrap(shared).expect("sole owner").into_inner()
    }

    #[test]
    fn status_precedence_error_over_failure_over_skip() {
        let mut record = fresh();
        assert_eq!(record.status(), Status::Success);
        record.record_outcome(&EngineError::skip("later"));
        assert_eq!(record.status(), Status::Skipped);
        record.record_outcome(&EngineError::failure("nope"));
        assert_eq!(record.status(), Status::Failed);
        record.record_outcome(&EngineError::unexpected("Boom", "exploded", None));
        assert_eq!(record.status(), Status::Error);
    }

    #[test]
    fn first_error_sticks() {
        let mut record = fresh();
        record.record_outcome(&EngineError::unexpected("First", "one", None));
        record.record_outcome(&EngineError::unexpected("Second", "two", None));
        assert_eq!(record.error.as_ref().map(|e| e.class.as_str()), Some("First"));
    }

    #[test]
    fn later_failure_does_not_mask_error() {
        let mut record = fresh();
        record.record_outcome(&EngineError::unexpected("Boom", "exploded", None));
        record.record_outcome(&EngineError::failure("after block failed"));
        assert_eq!(record.status(), Status::Error);
        // Reported alongside, not instead of.
        assert_eq!(record.failure.as_deref(), Some("after block failed"));
    }

    #[test]
    fn finish_is_idempotent() {
        let mut record = fresh();
        record.finish();
        let first = record.finished;
        record.finish();
        assert_eq!(record.finished, first);
        assert!(record.duration().is_some());
    }
}
