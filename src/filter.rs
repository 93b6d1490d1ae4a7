//! Spec selection by name pattern and tag.

use regex::Regex;

use crate::model::Spec;

/// Selects specs for a run. An empty filter selects everything; name
/// patterns support `*` globs (`general-*`), tags match exactly. When both
/// are present a spec must satisfy both. Selection preserves declaration
/// order.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    names: Vec<String>,
    tags: Vec<String>,
}

impl RunFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, pattern: &str) -> Self {
        self.names.push(pattern.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.tags.is_empty()
    }

    pub fn matches(&self, spec: &Spec) -> bool {
        let name_ok = self.names.is_empty()
            || self
                .names
                .iter()
                .any(|pattern| glob_match(pattern, &spec.name));
        let tag_ok = self.tags.is_empty() || self.tags.iter().any(|tag| spec.has_tag(tag));
        name_ok && tag_ok
    }
}

/// Anchored glob match where `*` stands for any run of characters.
fn glob_match(pattern: &str, name: &str) -> bool {
    let source = format!("^{}$", regex::escape(pattern).replace(r"\*", ".*"));
    Regex::new(&source)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContextBuilder, Subject};
    use std::rc::Rc;

    fn named_specs(descriptions: &[(&str, &[&str])]) -> Vec<Rc<Spec>> {
        let subject = Subject::create("General");
        let builder = ContextBuilder::new(Rc::clone(&subject), subject.borrow().root.clone());
        for (description, tags) in descriptions {
            builder.it(description, tags, |_| Ok(())).unwrap();
        }
        let root = subject.borrow().root.clone();
        let specs = root.borrow().specs.clone();
        specs
    }

    #[test]
    fn glob_is_anchored() {
        assert!(glob_match("general-*", "general-1"));
        assert!(glob_match("general-1", "general-1"));
        assert!(!glob_match("general-*", "other-general-1"));
        assert!(!glob_match("general", "general-1"));
    }

    #[test]
    fn name_filter_preserves_declaration_order() {
        let specs = named_specs(&[("a", &[]), ("b", &[]), ("c", &[])]);
        let filter = RunFilter::new().with_name("general-*");
        let selected: Vec<&str> = specs
            .iter()
            .filter(|s| filter.matches(s))
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(selected, vec!["general-1", "general-2", "general-3"]);
    }

    #[test]
    fn tag_filter_requires_membership() {
        let specs = named_specs(&[("a", &["success"]), ("b", &["slow"])]);
        let filter = RunFilter::new().with_tag("success");
        let selected: Vec<&str> = specs
            .iter()
            .filter(|s| filter.matches(s))
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(selected, vec!["general-1"]);
    }

    #[test]
    fn empty_filter_selects_everything() {
        let specs = named_specs(&[("a", &[]), ("b", &[])]);
        let filter = RunFilter::new();
        assert!(specs.iter().all(|s| filter.matches(s)));
    }
}
