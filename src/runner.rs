//! The execution engine: walks a filtered list of specs and produces one run
//! record per executed unit, enforcing lifecycle ordering and failure
//! semantics.
//!
//! Specs are grouped by subject (first-seen order), then by their immediate
//! context. Each group runs the lineage setup chain outermost-ancestor
//! first, its specs in declaration order, and the lineage teardown chain;
//! teardown always runs, whatever happened before it. A setup failure is
//! group-fatal; a before-chain failure is spec-fatal; the after chain is
//! best-effort cleanup attempted in full for every spec run. Every
//! transition is broadcast on the event bus so observers can render
//! progress without the engine knowing about rendering.
//!
//! The engine itself is single-threaded and strictly sequential: one spec
//! and its hooks run to completion before the next begins.

use std::rc::Rc;

use crate::bag::Bag;
use crate::events::{trigger_scoped, Phase, RunEvent, SharedBus};
use crate::model::{self, HookFn, SharedContext, SharedSubject, Spec};
use crate::record::{RunKind, RunRecord, SharedRecord, Status};
use crate::runctx::RunContext;
use crate::scope::Scope;
use crate::value::Value;

pub struct Runner<'a> {
    scope: &'a Scope,
}

struct ContextGroup {
    node: SharedContext,
    specs: Vec<Rc<Spec>>,
}

struct SubjectGroup {
    subject: SharedSubject,
    contexts: Vec<ContextGroup>,
}

impl<'a> Runner<'a> {
    pub fn new(scope: &'a Scope) -> Self {
        Self { scope }
    }

    /// Runs the given specs and returns their records in execution order,
    /// including the synthetic setup/teardown pseudo-runs.
    pub fn run(&self, specs: &[Rc<Spec>]) -> Vec<SharedRecord> {
        let bus = self.bus();
        let mut records = Vec::new();
        for group in group_specs(specs) {
            let description = group.subject.borrow().description.clone();
            trigger_scoped(&bus, Phase::Subject, &description, None, || {
                for context_group in &group.contexts {
                    let label = context_group.node.borrow().label();
                    trigger_scoped(&bus, Phase::Context, &label, None, || {
                        self.run_context_group(&group.subject, context_group, &mut records);
                    });
                }
            });
        }
        records
    }

    fn bus(&self) -> SharedBus {
        Rc::clone(self.scope.events())
    }

    /// One (subject, context) group: lineage setup, specs, lineage teardown.
    fn run_context_group(
        &self,
        subject: &SharedSubject,
        group: &ContextGroup,
        records: &mut Vec<SharedRecord>,
    ) {
        let slug = subject.borrow().slug.clone();
        let chain = model::lineage(&group.node);

        // Hook lists are frozen from the moment any spec under the lineage
        // begins executing.
        for context in &chain {
            context.borrow_mut().lock();
        }

        let mut episode = self.scope.bag().snapshot();

        let mut setup_ok = true;
        for ancestor in &chain {
            let (hooks, label) = {
                let node = ancestor.borrow();
                (node.setup.clone(), node.label())
            };
            if hooks.is_empty() {
                continue;
            }
            let (record, bag) = self.run_pseudo(
                RunKind::Setup,
                Phase::Setup,
                &format!("{}-setup", slug),
                &label,
                &hooks,
                episode,
                true,
            );
            episode = bag;
            let failed = matches!(record.borrow().status(), Status::Error | Status::Failed);
            records.push(record);
            if failed {
                // Group-fatal: no specs, no before/after. Teardown still runs.
                setup_ok = false;
                break;
            }
        }

        let snapshot = episode.snapshot();

        if setup_ok {
            for spec in &group.specs {
                let instantiations: Vec<Option<Value>> = if spec.data.is_empty() {
                    vec![None]
                } else {
                    spec.data.iter().cloned().map(Some).collect()
                };
                for data in instantiations {
                    let (record, bag) = self.run_spec(spec, &group.node, snapshot.snapshot(), data);
                    // Teardown observes whatever the last executed spec left.
                    episode = bag;
                    records.push(record);
                }
            }
        }

        for ancestor in &chain {
            let (hooks, label) = {
                let node = ancestor.borrow();
                (node.teardown.clone(), node.label())
            };
            if hooks.is_empty() {
                continue;
            }
            let (record, bag) = self.run_pseudo(
                RunKind::Teardown,
                Phase::Teardown,
                &format!("{}-teardown", slug),
                &label,
                &hooks,
                episode,
                false,
            );
            episode = bag;
            records.push(record);
        }
    }

    /// One spec instantiation: before chain, body, after chain.
    fn run_spec(
        &self,
        spec: &Rc<Spec>,
        node: &SharedContext,
        bag: Bag,
        data: Option<Value>,
    ) -> (SharedRecord, Bag) {
        let bus = self.bus();
        let record = RunRecord::start(
            RunKind::Spec,
            &spec.name,
            &spec.description,
            data.clone(),
            Some(spec.location),
        );
        let mut ctx = RunContext::new(
            Rc::clone(&record),
            Rc::clone(&bus),
            self.scope.extensions(),
            self.scope.mixins().clone(),
            bag,
            data,
        );

        trigger_scoped(&bus, Phase::Spec, &spec.name, Some(&record), || {
            let before = model::effective_before(node);
            let mut body_allowed = true;
            if !before.is_empty() {
                let outcome = trigger_scoped(&bus, Phase::Before, &spec.name, Some(&record), || {
                    for hook in &before {
                        hook(&mut ctx)?;
                    }
                    Ok(())
                });
                if let Err(err) = outcome {
                    // Spec-fatal, but the after chain still runs.
                    record.borrow_mut().record_outcome(&err);
                    body_allowed = false;
                }
            }

            if body_allowed {
                if let Err(err) = (spec.body)(&mut ctx) {
                    record.borrow_mut().record_outcome(&err);
                }
            }

            let after = model::effective_after(node);
            if !after.is_empty() {
                trigger_scoped(&bus, Phase::After, &spec.name, Some(&record), || {
                    // Every after block is attempted; a failing one never
                    // stops the rest of the cleanup.
                    for hook in &after {
                        if let Err(err) = hook(&mut ctx) {
                            record.borrow_mut().record_outcome(&err);
                        }
                    }
                });
            }
        });

        record.borrow_mut().finish();
        match record.borrow().status() {
            Status::Skipped => bus.borrow_mut().trigger(&RunEvent::SpecSkipped {
                record: Rc::clone(&record),
            }),
            Status::Error => bus.borrow_mut().trigger(&RunEvent::SpecErrored {
                record: Rc::clone(&record),
            }),
            _ => {}
        }
        (record, ctx.into_bag())
    }

    /// One setup or teardown pseudo-run over a context's own blocks.
    #[allow(clippy::too_many_arguments)]
    fn run_pseudo(
        &self,
        kind: RunKind,
        phase: Phase,
        name: &str,
        label: &str,
        hooks: &[HookFn],
        bag: Bag,
        stop_on_error: bool,
    ) -> (SharedRecord, Bag) {
        let bus = self.bus();
        let record = RunRecord::start(
            kind,
            name,
            format!("{} {}", phase.name(), label),
            None,
            None,
        );
        let mut ctx = RunContext::new(
            Rc::clone(&record),
            Rc::clone(&bus),
            self.scope.extensions(),
            self.scope.mixins().clone(),
            bag,
            None,
        );
        trigger_scoped(&bus, phase, label, Some(&record), || {
            for hook in hooks {
                if let Err(err) = hook(&mut ctx) {
                    record.borrow_mut().record_outcome(&err);
                    if stop_on_error {
                        break;
                    }
                }
            }
        });
        record.borrow_mut().finish();
        (record, ctx.into_bag())
    }
}

/// Groups specs by subject, then by immediate context, preserving first-seen
/// order at both levels.
fn group_specs(specs: &[Rc<Spec>]) -> Vec<SubjectGroup> {
    let mut groups: Vec<SubjectGroup> = Vec::new();
    for spec in specs {
        let (Some(subject), Some(node)) = (spec.subject.upgrade(), spec.context.upgrade()) else {
            // Orphaned spec: its scope is gone, nothing to run against.
            continue;
        };
        let subject_index = match groups
            .iter()
            .position(|g| Rc::ptr_eq(&g.subject, &subject))
        {
            Some(index) => index,
            None => {
                groups.push(SubjectGroup {
                    subject: Rc::clone(&subject),
                    contexts: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let subject_group = &mut groups[subject_index];
        let context_index = match subject_group
            .contexts
            .iter()
            .position(|c| Rc::ptr_eq(&c.node, &node))
        {
            Some(index) => index,
            None => {
                subject_group.contexts.push(ContextGroup {
                    node: Rc::clone(&node),
                    specs: Vec::new(),
                });
                subject_group.contexts.len() - 1
            }
        };
        subject_group.contexts[context_index]
            .specs
            .push(Rc::clone(spec));
    }
    groups
}
