use std::collections::BTreeSet;

use super::DialogSpec;

/// Version identifiers the user asked never to be shown again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredVersionSet(BTreeSet<String>);

impl IgnoredVersionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the version was already ignored.
    pub fn insert(&mut self, version: impl Into<String>) -> bool {
        self.0.insert(version.into())
    }

    pub fn contains(&self, version: &str) -> bool {
        self.0.contains(version)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoredVersionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A spec is suppressed only when it names a version the user ignored.
pub fn should_show(spec: &DialogSpec, ignored: &IgnoredVersionSet) -> bool {
    match spec.version.as_deref() {
        Some(version) => !ignored.contains(version),
        None => true,
    }
}
