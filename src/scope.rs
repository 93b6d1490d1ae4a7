//! The single explicit holder of everything one test run needs: the
//! definition model, the base bag, the event bus, and the extension and
//! mixin registries. There are no process-wide singletons; a scope is
//! constructed per run and passed by reference to the execution engine.

use std::rc::Rc;

use crate::bag::Bag;
use crate::errors::EngineResult;
use crate::events::{EventBus, RunObserver, SharedBus};
use crate::filter::RunFilter;
use crate::model::{ContextBuilder, SharedContext, SharedSubject, Spec, Subject};
use crate::record::SharedRecord;
use crate::registry::{Capability, ExtensionRegistry, MixinRegistry, RunSeed};
use crate::runctx::RunContext;
use crate::runner::Runner;
use crate::value::Value;

pub struct Scope {
    subjects: Vec<SharedSubject>,
    bag: Bag,
    events: SharedBus,
    extensions: ExtensionRegistry,
    mixins: MixinRegistry,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            subjects: Vec::new(),
            bag: Bag::new(),
            events: EventBus::shared(),
            extensions: ExtensionRegistry::new(),
            mixins: MixinRegistry::new(),
        }
    }

    /// Finds-or-creates a subject by exact description and returns a builder
    /// scoped to its root context. Declarations sharing a description merge
    /// into the same subject.
    pub fn describe(&mut self, description: &str) -> ContextBuilder {
        if let Some(existing) = self
            .subjects
            .iter()
            .find(|s| s.borrow().description == description)
        {
            let root = existing.borrow().root.clone();
            return ContextBuilder::new(Rc::clone(existing), root);
        }
        let subject = Subject::create(description);
        self.subjects.push(Rc::clone(&subject));
        let root = subject.borrow().root.clone();
        ContextBuilder::new(subject, root)
    }

    pub fn subjects(&self) -> &[SharedSubject] {
        &self.subjects
    }

    /// The base bag cloned into every run episode; seed configuration values
    /// here before running.
    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut Bag {
        &mut self.bag
    }

    pub fn events(&self) -> &SharedBus {
        &self.events
    }

    pub fn register_observer(&self, observer: Box<dyn RunObserver>) {
        self.events.borrow_mut().register(observer);
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Registers a capability factory under one or more names; called during
    /// scope construction, before any spec runs.
    pub fn register_capability<F>(&mut self, names: &[&str], factory: F)
    where
        F: Fn(&RunSeed) -> Box<dyn Capability> + 'static,
    {
        self.extensions.register(names, factory);
    }

    pub fn mixins(&self) -> &MixinRegistry {
        &self.mixins
    }

    pub fn register_mixin<F>(&mut self, description: &str, mixin: F)
    where
        F: Fn(&mut RunContext, &Value) -> EngineResult<()> + 'static,
    {
        self.mixins.register(description, mixin);
    }

    /// The filtered spec list in execution order: subjects in declaration
    /// order, each context's own specs before its nested contexts'.
    pub fn specs(&self, filter: &RunFilter) -> Vec<Rc<Spec>> {
        let mut selected = Vec::new();
        for subject in &self.subjects {
            let root = subject.borrow().root.clone();
            collect_specs(&root, filter, &mut selected);
        }
        selected
    }

    /// Runs every spec the filter selects and returns the records.
    pub fn run(&self, filter: &RunFilter) -> Vec<SharedRecord> {
        let specs = self.specs(filter);
        Runner::new(self).run(&specs)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_specs(node: &SharedContext, filter: &RunFilter, out: &mut Vec<Rc<Spec>>) {
    let node = node.borrow();
    for spec in &node.specs {
        if filter.matches(spec) {
            out.push(Rc::clone(spec));
        }
    }
    for child in &node.children {
        collect_specs(child, filter, out);
    }
}
