//! Capability and mixin registries: the engine's extension boundary.
//!
//! Collaborators register capability factories and reusable mixin blocks
//! during scope construction, before any spec runs. Each run context binds
//! one instance per factory (shared across all of that factory's names);
//! dispatching an unregistered name is an authoring error surfaced
//! immediately, never a silent no-op.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::{EngineError, EngineResult};
use crate::events::SharedBus;
use crate::record::SharedRecord;
use crate::runctx::RunContext;
use crate::value::Value;

/// A run-scoped capability instance (e.g. a stopwatch, a client handle).
pub trait Capability {
    fn call(&mut self, args: &[Value]) -> EngineResult<Value>;
}

/// What a capability factory gets to see of the run it is bound to.
#[derive(Clone)]
pub struct RunSeed {
    pub record: SharedRecord,
    pub events: SharedBus,
}

pub type CapabilityFactory = Rc<dyn Fn(&RunSeed) -> Box<dyn Capability>>;

type BoundCapability = Rc<RefCell<Box<dyn Capability>>>;

/// Maps capability names to factories. One factory may serve several names.
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    factories: Vec<(Vec<String>, CapabilityFactory)>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates one or more capability names with a single factory.
    pub fn register<F>(&mut self, names: &[&str], factory: F)
    where
        F: Fn(&RunSeed) -> Box<dyn Capability> + 'static,
    {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.factories.push((names, Rc::new(factory)));
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Invokes every factory exactly once and binds the instance under all
    /// of its names. Called at run-context construction; instances live for
    /// that run record and are dropped with it.
    pub fn bind(&self, seed: &RunSeed) -> HashMap<String, BoundCapability> {
        let mut bound = HashMap::new();
        for (names, factory) in &self.factories {
            let instance: BoundCapability = Rc::new(RefCell::new(factory(seed)));
            for name in names {
                bound.insert(name.clone(), Rc::clone(&instance));
            }
        }
        bound
    }
}

/// A named, parameterized, reusable block of test logic invoked by
/// description from within a spec body.
pub type MixinFn = Rc<dyn Fn(&mut RunContext, &Value) -> EngineResult<()>>;

#[derive(Default, Clone)]
pub struct MixinRegistry {
    mixins: HashMap<String, MixinFn>,
}

impl MixinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, description: &str, mixin: F)
    where
        F: Fn(&mut RunContext, &Value) -> EngineResult<()> + 'static,
    {
        self.mixins.insert(description.to_string(), Rc::new(mixin));
    }

    pub fn contains(&self, description: &str) -> bool {
        self.mixins.contains_key(description)
    }

    /// Looks up a mixin by description, failing fast when it was never
    /// registered.
    pub fn get(&self, description: &str) -> EngineResult<MixinFn> {
        self.mixins
            .get(description)
            .cloned()
            .ok_or_else(|| EngineError::UndefinedMixin {
                description: description.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::record::{RunKind, RunRecord};

    struct Counter {
        calls: usize,
    }

    impl Capability for Counter {
        fn call(&mut self, _args: &[Value]) -> EngineResult<Value> {
            self.calls += 1;
            Ok(Value::from(self.calls))
        }
    }

    fn seed() -> RunSeed {
        RunSeed {
            record: RunRecord::start(RunKind::Spec, "s-1", "spec", None, None),
            events: EventBus::shared(),
        }
    }

    #[test]
    fn one_instance_is_shared_across_all_names() {
        let mut registry = ExtensionRegistry::new();
        registry.register(&["count", "tally"], |_seed| {
            Box::new(Counter { calls: 0 }) as Box<dyn Capability>
        });
        let bound = registry.bind(&seed());
        assert_eq!(
            bound["count"].borrow_mut().call(&[]).unwrap(),
            Value::from(1)
        );
        // Same instance, so the counter carries over under the other name.
        assert_eq!(
            bound["tally"].borrow_mut().call(&[]).unwrap(),
            Value::from(2)
        );
    }

    #[test]
    fn each_bind_creates_fresh_instances() {
        let mut registry = ExtensionRegistry::new();
        registry.register(&["count"], |_seed| {
            Box::new(Counter { calls: 0 }) as Box<dyn Capability>
        });
        let first = registry.bind(&seed());
        first.get("count").unwrap().borrow_mut().call(&[]).unwrap();
        let second = registry.bind(&seed());
        assert_eq!(
            second["count"].borrow_mut().call(&[]).unwrap(),
            Value::from(1)
        );
    }

    #[test]
    fn unknown_mixin_fails_fast() {
        let registry = MixinRegistry::new();
        let Err(err) = registry.get("warm the cache") else {
            panic!("expected UndefinedMixin");
        };
        assert!(matches!(err, EngineError::UndefinedMixin { .. }));
    }
}
