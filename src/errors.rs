//! The engine's outcome and configuration error taxonomy.
//!
//! Three outcome signals travel through a running spec body: a deliberate
//! expectation [`EngineError::Failure`], a cooperative [`EngineError::Skip`],
//! and an [`EngineError::Unexpected`] error for everything else. The runner
//! catches all three at the unit boundary and records them on the run
//! record; they never abort sibling specs. The remaining variants are
//! configuration errors: authoring mistakes that fail fast at the point of
//! use and are not classified as test outcomes.

use miette::Diagnostic;
use serde::Serialize;
use std::fmt;
use std::panic::Location;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Points at a line in the specification source (the `it`/hook declaration),
/// not at engine internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SpecLocation {
    /// Captures the location of the calling declaration site.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for SpecLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    /// A check did not hold. Raised deliberately by assertion helpers and
    /// swallowed at the spec-body boundary.
    #[error("expectation failed: {message}")]
    #[diagnostic(code(specrun::expectation_failure))]
    Failure { message: String },

    /// Cooperative early termination of the current unit only. Not an error.
    #[error("skipped")]
    #[diagnostic(code(specrun::skip))]
    Skip { reason: Option<String> },

    /// Anything else raised during a hook or spec body. Carries the
    /// originating type name and the declaration the unit came from.
    #[error("{class}: {message}")]
    #[diagnostic(code(specrun::unexpected_error))]
    Unexpected {
        class: String,
        message: String,
        location: Option<SpecLocation>,
    },

    /// Dispatch of a capability name no factory was registered for.
    #[error("undefined capability '{name}'")]
    #[diagnostic(
        code(specrun::undefined_capability),
        help("register a factory for this name on the scope before any spec runs")
    )]
    UndefinedCapability { name: String },

    /// Invocation of a mixin description that was never registered.
    #[error("undefined mixin '{description}'")]
    #[diagnostic(
        code(specrun::undefined_mixin),
        help("register the mixin by description before invoking it from a spec body")
    )]
    UndefinedMixin { description: String },

    /// Spec data parameters that cannot be instantiated.
    #[error("malformed data for spec '{spec}': {reason}")]
    #[diagnostic(code(specrun::malformed_data))]
    MalformedData { spec: String, reason: String },

    /// Retroactive mutation of a context whose specs already began executing.
    #[error("context '{context}' is locked: specs under it have already run")]
    #[diagnostic(code(specrun::locked_context))]
    LockedContext { context: String },
}

impl EngineError {
    pub fn failure(message: impl Into<String>) -> Self {
        EngineError::Failure {
            message: message.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        EngineError::Skip {
            reason: Some(reason.into()),
        }
    }

    pub fn unexpected(
        class: impl Into<String>,
        message: impl Into<String>,
        location: Option<SpecLocation>,
    ) -> Self {
        EngineError::Unexpected {
            class: class.into(),
            message: message.into(),
            location,
        }
    }

    /// Wraps an arbitrary error as an unexpected outcome, keeping its type
    /// name as the originating class.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        EngineError::Unexpected {
            class: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            location: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EngineError::Failure { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, EngineError::Skip { .. })
    }

    /// True for authoring mistakes that must surface immediately instead of
    /// being recorded as test outcomes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::UndefinedCapability { .. }
                | EngineError::UndefinedMixin { .. }
                | EngineError::MalformedData { .. }
                | EngineError::LockedContext { .. }
        )
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::from_error(&error)
    }
}
