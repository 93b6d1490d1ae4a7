//! Named groups of concurrently started tasks with ordered join semantics.
//!
//! This primitive is orthogonal to the runner's own strictly sequential
//! spec scheduling: it exists for spec bodies that fan out several
//! concurrent actions (warming endpoints, say) and later converge. `join`
//! consumes the group and collects results in start order, not completion
//! order; a panicking task propagates to the joining caller.

use std::collections::HashMap;
use std::panic;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// The group used when callers do not name one.
pub const DEFAULT_GROUP: &str = "default";

pub struct TaskGroups<T = crate::value::Value> {
    groups: Mutex<HashMap<String, Vec<JoinHandle<T>>>>,
}

impl<T: Send + 'static> TaskGroups<T> {
    pub fn new() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Launches `task` as an independent OS thread and appends its handle to
    /// the named group, creating the group if absent.
    pub fn start<F>(&self, group: &str, task: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::spawn(task);
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(group.to_string())
            .or_default()
            .push(handle);
    }

    /// Starts a task in the default group.
    pub fn start_default<F>(&self, task: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.start(DEFAULT_GROUP, task);
    }

    /// Blocks until every task in the group has finished and returns their
    /// results in start order. The group is removed; joining it again yields
    /// an empty result. A task that panicked re-raises in the caller.
    pub fn join(&self, group: &str) -> Vec<T> {
        let handles = self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(group)
            .unwrap_or_default();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            })
            .collect()
    }

    pub fn join_default(&self) -> Vec<T> {
        self.join(DEFAULT_GROUP)
    }

    /// Number of tasks currently registered in the named group.
    pub fn pending(&self, group: &str) -> usize {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl<T: Send + 'static> Default for TaskGroups<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn join_returns_results_in_start_order() {
        let groups: TaskGroups<&'static str> = TaskGroups::new();
        groups.start("g", || {
            thread::sleep(Duration::from_millis(100));
            "A"
        });
        groups.start("g", || "B");
        assert_eq!(groups.join("g"), vec!["A", "B"]);
    }

    #[test]
    fn groups_are_independent() {
        let groups: TaskGroups<i32> = TaskGroups::new();
        groups.start("fast", || 1);
        groups.start("slow", || {
            thread::sleep(Duration::from_millis(50));
            2
        });
        assert_eq!(groups.join("fast"), vec![1]);
        assert_eq!(groups.pending("slow"), 1);
        assert_eq!(groups.join("slow"), vec![2]);
    }

    #[test]
    fn join_consumes_the_group() {
        let groups: TaskGroups<i32> = TaskGroups::new();
        groups.start_default(|| 7);
        assert_eq!(groups.join_default(), vec![7]);
        assert!(groups.join_default().is_empty());
    }

    #[test]
    #[should_panic(expected = "worker exploded")]
    fn task_panic_propagates_to_the_joiner() {
        let groups: TaskGroups<()> = TaskGroups::new();
        groups.start("g", || panic!("worker exploded"));
        groups.join("g");
    }
}
