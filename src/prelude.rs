//! One-stop import for writing and running specs.
//!
//! ```
//! use specrun::prelude::*;
//! ```

pub use crate::algebra::{predicates, Evaluation};
pub use crate::assert::{assert_that, Assertable};
pub use crate::bag::Bag;
pub use crate::errors::{EngineError, EngineResult, SpecLocation};
pub use crate::events::{EventBus, Phase, RunEvent, RunObserver, SharedBus};
pub use crate::filter::RunFilter;
pub use crate::record::{LogLevel, RunKind, RunRecord, SharedRecord, Status};
pub use crate::registry::{Capability, ExtensionRegistry, MixinRegistry, RunSeed};
pub use crate::report::{records_to_json, ConsoleReporter, ProblemDetail, Summary};
pub use crate::runctx::RunContext;
pub use crate::scope::Scope;
pub use crate::taskgroup::{TaskGroups, DEFAULT_GROUP};
pub use crate::value::Value;
