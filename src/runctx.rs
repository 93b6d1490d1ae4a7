//! The explicit per-run handle passed into every hook and spec body.
//!
//! A `RunContext` binds together the pristine bag copy for this run, the
//! shared run record, the event bus, the scope's mixins, and one instance of
//! every registered capability. It is constructed fresh for each run record
//! and dropped when the unit completes, which tears its capability
//! instances down with it.

use std::collections::HashMap;

use crate::bag::Bag;
use crate::errors::{EngineError, EngineResult};
use crate::events::{Phase, RunEvent, SharedBus};
use crate::record::{LogLevel, SharedRecord, Status};
use crate::registry::{Capability, ExtensionRegistry, MixinRegistry, RunSeed};
use crate::value::Value;

use std::cell::RefCell;
use std::rc::Rc;

pub struct RunContext {
    bag: Bag,
    record: SharedRecord,
    events: SharedBus,
    mixins: MixinRegistry,
    capabilities: HashMap<String, Rc<RefCell<Box<dyn Capability>>>>,
    data: Option<Value>,
}

impl RunContext {
    pub fn new(
        record: SharedRecord,
        events: SharedBus,
        extensions: &ExtensionRegistry,
        mixins: MixinRegistry,
        bag: Bag,
        data: Option<Value>,
    ) -> Self {
        let seed = RunSeed {
            record: Rc::clone(&record),
            events: Rc::clone(&events),
        };
        let capabilities = extensions.bind(&seed);
        Self {
            bag,
            record,
            events,
            mixins,
            capabilities,
            data,
        }
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut Bag {
        &mut self.bag
    }

    /// The data element this instantiation runs with, for parameterized
    /// specs.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn record(&self) -> SharedRecord {
        Rc::clone(&self.record)
    }

    pub(crate) fn into_bag(self) -> Bag {
        self.bag
    }

    // ------------------------------------------------------------------
    // Logging and properties
    // ------------------------------------------------------------------

    pub fn log(&mut self, level: LogLevel, message: &str) {
        self.record.borrow_mut().log(level, message);
        self.events.borrow_mut().trigger(&RunEvent::Log {
            level,
            message: message.to_string(),
            record: Some(Rc::clone(&self.record)),
        });
    }

    pub fn debug(&mut self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Emits a free-form grouping marker to observers.
    pub fn group(&mut self, message: &str) {
        self.events.borrow_mut().trigger(&RunEvent::Group {
            message: message.to_string(),
            record: Some(Rc::clone(&self.record)),
        });
    }

    /// Records a custom key/value property on the run record.
    pub fn property(&mut self, key: &str, value: impl Into<Value>) {
        self.record.borrow_mut().set_property(key, value);
    }

    // ------------------------------------------------------------------
    // Outcome signals
    // ------------------------------------------------------------------

    /// Cooperatively stops the current unit: `return ctx.skip("reason");`.
    pub fn skip<T>(&self, reason: &str) -> EngineResult<T> {
        Err(EngineError::skip(reason))
    }

    /// Runs a named, observed assertion. The outcome is recorded on the run
    /// record individually, bracketed by expect events, and the block's
    /// result propagates unchanged.
    pub fn expect(
        &mut self,
        description: &str,
        block: impl FnOnce(&mut RunContext) -> EngineResult<()>,
    ) -> EngineResult<()> {
        self.events.borrow_mut().trigger(&RunEvent::Started {
            phase: Phase::Expect,
            label: description.to_string(),
            record: Some(Rc::clone(&self.record)),
        });
        let result = block(self);
        let status = match &result {
            Ok(()) => Status::Success,
            Err(EngineError::Failure { .. }) => Status::Failed,
            Err(EngineError::Skip { .. }) => Status::Skipped,
            Err(_) => Status::Error,
        };
        self.record.borrow_mut().add_expectation(description, status);
        self.events.borrow_mut().trigger(&RunEvent::Ended {
            phase: Phase::Expect,
            label: description.to_string(),
            record: Some(Rc::clone(&self.record)),
        });
        result
    }

    // ------------------------------------------------------------------
    // Extension dispatch
    // ------------------------------------------------------------------

    /// Dispatches a registered capability by name. An unknown name is an
    /// authoring error, not a silent no-op.
    pub fn invoke(&mut self, capability: &str, args: &[Value]) -> EngineResult<Value> {
        let instance = self.capabilities.get(capability).cloned().ok_or_else(|| {
            EngineError::UndefinedCapability {
                name: capability.to_string(),
            }
        })?;
        let result = instance.borrow_mut().call(args);
        result
    }

    /// Invokes a registered mixin by description with positional
    /// (`Value::List`) or keyed (`Value::Map`) arguments.
    pub fn run_mixin(&mut self, description: &str, args: Value) -> EngineResult<()> {
        let mixin = self.mixins.get(description)?;
        mixin(self, &args)
    }
}
