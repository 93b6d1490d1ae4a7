//! The definition model: the Subject → Context → Spec tree built by
//! specification code, immutable once execution begins.
//!
//! Subjects are found-or-created by exact description, so several
//! declarations sharing one description merge into one subject. Every
//! subject owns an anonymous root context; subject-level hooks and specs
//! live there. Hook lists (setup/teardown/before/after) are inherited down
//! the nesting chain, outermost ancestor first.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{EngineError, EngineResult, SpecLocation};
use crate::runctx::RunContext;
use crate::value::Value;

/// A lifecycle hook: setup, teardown, before, or after.
pub type HookFn = Rc<dyn Fn(&mut RunContext) -> EngineResult<()>>;

/// The executable body of a spec.
pub type SpecBody = Rc<dyn Fn(&mut RunContext) -> EngineResult<()>>;

pub type SharedSubject = Rc<RefCell<Subject>>;
pub type SharedContext = Rc<RefCell<ContextNode>>;

static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Derives a stable short name: lowercase, with runs of non-alphanumeric
/// characters collapsed to a single `-`.
pub fn slugify(description: &str) -> String {
    let lowered = description.to_lowercase();
    SLUG_SEPARATORS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// One executable test case.
pub struct Spec {
    /// Unique within the owning subject: `<subject-slug>-<counter>`.
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Literal "with" parameters; when non-empty the spec runs once per
    /// element, in sequence order.
    pub data: Vec<Value>,
    pub body: SpecBody,
    /// Where the spec was declared, for diagnostics.
    pub location: SpecLocation,
    pub subject: Weak<RefCell<Subject>>,
    pub context: Weak<RefCell<ContextNode>>,
}

impl Spec {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tags", &self.tags)
            .field("location", &self.location)
            .finish()
    }
}

/// A named or anonymous grouping carrying its own lifecycle hooks. Holds a
/// weak back-reference to its parent; ownership flows strictly downward.
pub struct ContextNode {
    pub description: Option<String>,
    pub setup: Vec<HookFn>,
    pub teardown: Vec<HookFn>,
    pub before: Vec<HookFn>,
    pub after: Vec<HookFn>,
    pub specs: Vec<Rc<Spec>>,
    pub children: Vec<SharedContext>,
    pub parent: Weak<RefCell<ContextNode>>,
    locked: bool,
}

impl ContextNode {
    fn empty(description: Option<String>, parent: Weak<RefCell<ContextNode>>) -> Self {
        Self {
            description,
            setup: Vec::new(),
            teardown: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            specs: Vec::new(),
            children: Vec::new(),
            parent,
            locked: false,
        }
    }

    pub fn label(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| "(root)".to_string())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Freezes the hook lists; called by the runner once any spec under this
    /// context begins executing.
    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }
}

/// A top-level named grouping of behavior.
pub struct Subject {
    pub description: String,
    pub slug: String,
    pub root: SharedContext,
    counter: usize,
}

impl Subject {
    pub fn create(description: &str) -> SharedSubject {
        Rc::new(RefCell::new(Subject {
            description: description.to_string(),
            slug: slugify(description),
            root: Rc::new(RefCell::new(ContextNode::empty(None, Weak::new()))),
            counter: 0,
        }))
    }

    /// The next generated spec name; the counter is monotonic per subject.
    pub fn next_spec_name(&mut self) -> String {
        self.counter += 1;
        format!("{}-{}", self.slug, self.counter)
    }
}

/// Returns the context chain from the outermost ancestor down to (and
/// including) `node`.
pub fn lineage(node: &SharedContext) -> Vec<SharedContext> {
    let mut chain = vec![Rc::clone(node)];
    let mut current = Rc::clone(node);
    loop {
        let parent = current.borrow().parent.upgrade();
        match parent {
            Some(parent) => {
                chain.push(Rc::clone(&parent));
                current = parent;
            }
            None => break,
        }
    }
    chain.reverse();
    chain
}

/// A spec's effective before chain: every ancestor's before blocks,
/// outermost first, then its own context's.
pub fn effective_before(node: &SharedContext) -> Vec<HookFn> {
    lineage(node)
        .iter()
        .flat_map(|ctx| ctx.borrow().before.clone())
        .collect()
}

/// A spec's effective after chain, in the same outermost-first order the
/// teardown chain uses.
pub fn effective_after(node: &SharedContext) -> Vec<HookFn> {
    lineage(node)
        .iter()
        .flat_map(|ctx| ctx.borrow().after.clone())
        .collect()
}

/// Builder scoped to one context of one subject. `Scope::describe` hands out
/// a builder for the subject's root context.
pub struct ContextBuilder {
    subject: SharedSubject,
    node: SharedContext,
}

impl ContextBuilder {
    pub(crate) fn new(subject: SharedSubject, node: SharedContext) -> Self {
        Self { subject, node }
    }

    pub fn node(&self) -> SharedContext {
        Rc::clone(&self.node)
    }

    /// Creates a nested context and returns a builder for it.
    pub fn context(&self, description: &str) -> EngineResult<ContextBuilder> {
        self.ensure_unlocked()?;
        let child = Rc::new(RefCell::new(ContextNode::empty(
            Some(description.to_string()),
            Rc::downgrade(&self.node),
        )));
        self.node.borrow_mut().children.push(Rc::clone(&child));
        Ok(ContextBuilder::new(Rc::clone(&self.subject), child))
    }

    /// Appends one spec to this context.
    #[track_caller]
    pub fn it(
        &self,
        description: &str,
        tags: &[&str],
        body: impl Fn(&mut RunContext) -> EngineResult<()> + 'static,
    ) -> EngineResult<()> {
        self.add_spec(description, tags, Vec::new(), Rc::new(body), SpecLocation::caller())
    }

    /// Appends one data-parameterized spec: its run produces one record per
    /// data element, in sequence order.
    #[track_caller]
    pub fn it_with(
        &self,
        description: &str,
        tags: &[&str],
        data: Vec<Value>,
        body: impl Fn(&mut RunContext) -> EngineResult<()> + 'static,
    ) -> EngineResult<()> {
        let location = SpecLocation::caller();
        if data.is_empty() {
            return Err(EngineError::MalformedData {
                spec: description.to_string(),
                reason: "\"with\" data must be a non-empty sequence".to_string(),
            });
        }
        self.add_spec(description, tags, data, Rc::new(body), location)
    }

    pub fn setup(
        &self,
        hook: impl Fn(&mut RunContext) -> EngineResult<()> + 'static,
    ) -> EngineResult<()> {
        self.ensure_unlocked()?;
        self.node.borrow_mut().setup.push(Rc::new(hook));
        Ok(())
    }

    pub fn teardown(
        &self,
        hook: impl Fn(&mut RunContext) -> EngineResult<()> + 'static,
    ) -> EngineResult<()> {
        self.ensure_unlocked()?;
        self.node.borrow_mut().teardown.push(Rc::new(hook));
        Ok(())
    }

    pub fn before(
        &self,
        hook: impl Fn(&mut RunContext) -> EngineResult<()> + 'static,
    ) -> EngineResult<()> {
        self.ensure_unlocked()?;
        self.node.borrow_mut().before.push(Rc::new(hook));
        Ok(())
    }

    pub fn after(
        &self,
        hook: impl Fn(&mut RunContext) -> EngineResult<()> + 'static,
    ) -> EngineResult<()> {
        self.ensure_unlocked()?;
        self.node.borrow_mut().after.push(Rc::new(hook));
        Ok(())
    }

    fn add_spec(
        &self,
        description: &str,
        tags: &[&str],
        data: Vec<Value>,
        body: SpecBody,
        location: SpecLocation,
    ) -> EngineResult<()> {
        self.ensure_unlocked()?;
        let name = self.subject.borrow_mut().next_spec_name();
        let spec = Rc::new(Spec {
            name,
            description: description.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            data,
            body,
            location,
            subject: Rc::downgrade(&self.subject),
            context: Rc::downgrade(&self.node),
        });
        self.node.borrow_mut().specs.push(spec);
        Ok(())
    }

    fn ensure_unlocked(&self) -> EngineResult<()> {
        let node = self.node.borrow();
        if node.is_locked() {
            return Err(EngineError::LockedContext {
                context: node.label(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("General"), "general");
        assert_eq!(slugify("HTTP  --  Client (v2)"), "http-client-v2");
        assert_eq!(slugify("  spaced out  "), "spaced-out");
    }

    #[test]
    fn spec_names_are_unique_and_monotonic_per_subject() {
        let subject = Subject::create("General");
        let builder = ContextBuilder::new(Rc::clone(&subject), subject.borrow().root.clone());
        builder.it("first", &[], |_| Ok(())).unwrap();
        builder.it("second", &[], |_| Ok(())).unwrap();
        let root = subject.borrow().root.clone();
        let names: Vec<String> = root.borrow().specs.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["general-1", "general-2"]);
    }

    #[test]
    fn nested_context_counter_stays_subject_scoped() {
        let subject = Subject::create("General");
        let builder = ContextBuilder::new(Rc::clone(&subject), subject.borrow().root.clone());
        builder.it("top", &[], |_| Ok(())).unwrap();
        let inner = builder.context("when nested").unwrap();
        inner.it("nested", &[], |_| Ok(())).unwrap();
        let node = inner.node();
        assert_eq!(node.borrow().specs[0].name, "general-2");
    }

    #[test]
    fn lineage_runs_outermost_first() {
        let subject = Subject::create("General");
        let builder = ContextBuilder::new(Rc::clone(&subject), subject.borrow().root.clone());
        let mid = builder.context("mid").unwrap();
        let leaf = mid.context("leaf").unwrap();
        let chain = lineage(&leaf.node());
        let labels: Vec<String> = chain.iter().map(|c| c.borrow().label()).collect();
        assert_eq!(labels, vec!["(root)", "mid", "leaf"]);
    }

    #[test]
    fn locked_context_rejects_hook_mutation() {
        let subject = Subject::create("General");
        let builder = ContextBuilder::new(Rc::clone(&subject), subject.borrow().root.clone());
        builder.node().borrow_mut().lock();
        let err = builder.before(|_| Ok(())).unwrap_err();
        assert!(matches!(err, EngineError::LockedContext { .. }));
    }

    #[test]
    fn empty_with_data_is_malformed() {
        let subject = Subject::create("General");
        let builder = ContextBuilder::new(Rc::clone(&subject), subject.borrow().root.clone());
        let err = builder
            .it_with("parameterized", &[], Vec::new(), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedData { .. }));
    }
}
