//! A declarative specification-execution engine.
//!
//! Specs are declared against subjects and nested contexts, scheduled with
//! inherited setup/teardown and before/after lifecycles, executed against a
//! persistent key/value bag with copy-on-write isolation, and observed over
//! an event bus. Assertions build a boolean evaluation algebra whose
//! failure messages explain exactly what was expected and what arrived.

pub use crate::errors::{EngineError, EngineResult};
pub use crate::scope::Scope;

pub mod algebra;
pub mod assert;
pub mod bag;
pub mod errors;
pub mod events;
pub mod filter;
pub mod model;
pub mod prelude;
pub mod record;
pub mod registry;
pub mod report;
pub mod runctx;
pub mod runner;
pub mod scope;
pub mod taskgroup;
pub mod value;
