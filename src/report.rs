//! Run-record consumption: summary aggregation, a console progress
//! observer, and JSON serialization of finished records.
//!
//! Reporters are collaborators of the engine, not part of it; everything
//! here is built purely on the event-bus and run-record boundaries.

use std::io::Write;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::SpecLocation;
use crate::events::{Phase, RunEvent, RunObserver};
use crate::record::{SharedRecord, Status};

/// Aggregated outcome counts plus per-record detail for everything that did
/// not succeed.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub problems: Vec<ProblemDetail>,
}

/// What a consumer needs to print for one non-success record: the
/// originating description and either the failure explanation or the
/// unexpected error's type, message, and location.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDetail {
    pub name: String,
    pub description: String,
    pub status: Status,
    pub detail: String,
    pub location: Option<SpecLocation>,
}

impl Summary {
    pub fn from_records(records: &[SharedRecord]) -> Summary {
        let mut summary = Summary::default();
        for shared in records {
            let record = shared.borrow();
            summary.total += 1;
            let status = record.status();
            match status {
                Status::Success => summary.succeeded += 1,
                Status::Failed => summary.failed += 1,
                Status::Error => summary.errored += 1,
                Status::Skipped => summary.skipped += 1,
            }
            if status == Status::Success {
                continue;
            }
            let detail = match (&record.error, &record.failure) {
                (Some(error), _) => format!("{}: {}", error.class, error.message),
                (None, Some(failure)) => failure.clone(),
                (None, None) => record
                    .skip_reason
                    .clone()
                    .unwrap_or_else(|| "skipped".to_string()),
            };
            summary.problems.push(ProblemDetail {
                name: record.name.clone(),
                description: record.description.clone(),
                status,
                detail,
                location: record.location,
            });
        }
        summary
    }

    pub fn all_green(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// One-line rendering:
    /// `total 4, passed 2, failed 1, errors 1, skipped 0`.
    pub fn line(&self) -> String {
        format!(
            "total {}, passed {}, failed {}, errors {}, skipped {}",
            self.total, self.succeeded, self.failed, self.errored, self.skipped
        )
    }
}

/// Serializes finished records as JSON, the machine-readable reporting
/// boundary.
pub fn records_to_json(records: &[SharedRecord]) -> serde_json::Result<String> {
    let owned: Vec<_> = records.iter().map(|r| r.borrow()).collect();
    let borrowed: Vec<&crate::record::RunRecord> = owned.iter().map(|r| &**r).collect();
    serde_json::to_string_pretty(&borrowed)
}

/// An event-bus observer that renders bracketed progress to stderr,
/// indenting on start events and dedenting on end events.
pub struct ConsoleReporter {
    stream: StandardStream,
    indent: usize,
    use_colors: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let use_colors = atty::is(atty::Stream::Stderr);
        let choice = if use_colors {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            stream: StandardStream::stderr(choice),
            indent: 0,
            use_colors,
        }
    }

    fn line(&mut self, text: &str, color: Option<Color>) {
        let indent = "  ".repeat(self.indent);
        if self.use_colors {
            if let Some(color) = color {
                let _ = self.stream.set_color(ColorSpec::new().set_fg(Some(color)));
            }
        }
        let _ = writeln!(self.stream, "{}{}", indent, text);
        let _ = self.stream.reset();
    }

    fn status_color(status: Status) -> Color {
        match status {
            Status::Success => Color::Green,
            Status::Failed => Color::Red,
            Status::Error => Color::Red,
            Status::Skipped => Color::Yellow,
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RunObserver for ConsoleReporter {
    fn notify(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Started { phase, label, .. } => {
                match phase {
                    Phase::Subject | Phase::Context => self.line(label, Some(Color::Cyan)),
                    Phase::Spec => self.line(label, None),
                    // Hook phases render only when they end with a problem.
                    _ => {}
                }
                self.indent += 1;
            }
            RunEvent::Ended { phase, record, .. } => {
                self.indent = self.indent.saturating_sub(1);
                if let (Phase::Spec | Phase::Setup | Phase::Teardown, Some(record)) =
                    (phase, record)
                {
                    let status = record.borrow().status();
                    if *phase == Phase::Spec || status != Status::Success {
                        let text = format!("{} {:?}", record.borrow().name, status);
                        self.line(&text, Some(Self::status_color(status)));
                    }
                }
            }
            RunEvent::Log { level, message, .. } => {
                let text = format!("[{}] {}", level.name(), message);
                self.line(&text, None);
            }
            RunEvent::Group { message, .. } => self.line(message, Some(Color::Cyan)),
            RunEvent::SpecSkipped { record } => {
                let text = format!("skipped {}", record.borrow().name);
                self.line(&text, Some(Color::Yellow));
            }
            RunEvent::SpecErrored { record } => {
                let text = format!("error in {}", record.borrow().name);
                self.line(&text, Some(Color::Red));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use crate::record::{RunKind, RunRecord};

    #[test]
    fn summary_counts_and_details() {
        let ok = RunRecord::start(RunKind::Spec, "general-1", "works", None, None);
        let failed = RunRecord::start(RunKind::Spec, "general-2", "fails", None, None);
        failed
            .borrow_mut()
            .record_outcome(&EngineError::failure("expected to be 42, got 666"));
        let errored = RunRecord::start(RunKind::Spec, "general-3", "blows up", None, None);
        errored
            .borrow_mut()
            .record_outcome(&EngineError::unexpected("Boom", "exploded", None));

        let summary = Summary::from_records(&[ok, failed, errored]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errored, 1);
        assert!(!summary.all_green());
        assert_eq!(summary.problems.len(), 2);
        assert_eq!(summary.problems[0].detail, "expected to be 42, got 666");
        assert!(summary.problems[1].detail.starts_with("Boom:"));
        assert_eq!(summary.line(), "total 3, passed 1, failed 1, errors 1, skipped 0");
    }

    #[test]
    fn records_serialize_to_json() {
        let record = RunRecord::start(RunKind::Spec, "general-1", "works", None, None);
        record.borrow_mut().finish();
        let json = records_to_json(&[record]).unwrap();
        assert!(json.contains("\"general-1\""));
        assert!(json.contains("\"spec\""));
    }
}
