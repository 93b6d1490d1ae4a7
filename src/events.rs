//! Synchronous lifecycle event broadcast.
//!
//! The runner announces every transition on an [`EventBus`]; observers
//! (console loggers, progress reporters) react to the events they care about
//! without the engine depending on any rendering logic. Events are delivered
//! in registration order with no buffering and no persistence.

use std::cell::RefCell;
use std::rc::Rc;

use crate::record::{LogLevel, SharedRecord};

/// Which lifecycle unit an event brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Subject,
    Context,
    Setup,
    Teardown,
    Before,
    After,
    Spec,
    Expect,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Subject => "subject",
            Phase::Context => "context",
            Phase::Setup => "setup",
            Phase::Teardown => "teardown",
            Phase::Before => "before",
            Phase::After => "after",
            Phase::Spec => "spec",
            Phase::Expect => "expect",
        }
    }
}

#[derive(Clone)]
pub enum RunEvent {
    /// Emitted before a unit begins, with the active record when one exists.
    Started {
        phase: Phase,
        label: String,
        record: Option<SharedRecord>,
    },
    /// Emitted after a unit ends, with the active record when one exists.
    Ended {
        phase: Phase,
        label: String,
        record: Option<SharedRecord>,
    },
    /// A log message from a running body, streamed as it happens.
    Log {
        level: LogLevel,
        message: String,
        record: Option<SharedRecord>,
    },
    /// A free-form grouping marker from a running body.
    Group {
        message: String,
        record: Option<SharedRecord>,
    },
    /// The current spec ended with the skipped flag set.
    SpecSkipped { record: SharedRecord },
    /// The current spec ended with an unexpected error.
    SpecErrored { record: SharedRecord },
}

/// An observer of lifecycle transitions. Implementations react to the
/// events they understand and ignore the rest.
pub trait RunObserver {
    fn notify(&mut self, event: &RunEvent);
}

#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn RunObserver>>,
}

pub type SharedBus = Rc<RefCell<EventBus>>;

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedBus {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Adds a listener. Observers are notified in registration order.
    pub fn register(&mut self, observer: Box<dyn RunObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Notifies every observer synchronously.
    pub fn trigger(&mut self, event: &RunEvent) {
        for observer in &mut self.observers {
            observer.notify(event);
        }
    }
}

/// Runs `block` bracketed by a `Started`/`Ended` pair. The `Ended` event is
/// emitted even when the block returns an error, so indent-on-start,
/// dedent-on-end observers stay balanced.
pub fn trigger_scoped<R>(
    bus: &SharedBus,
    phase: Phase,
    label: &str,
    record: Option<&SharedRecord>,
    block: impl FnOnce() -> R,
) -> R {
    bus.borrow_mut().trigger(&RunEvent::Started {
        phase,
        label: label.to_string(),
        record: record.cloned(),
    });
    let out = block();
    bus.borrow_mut().trigger(&RunEvent::Ended {
        phase,
        label: label.to_string(),
        record: record.cloned(),
    });
    out
}
