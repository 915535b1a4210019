use std::collections::HashSet;

use crate::storage::types::{Finding, FindingKey};

/// Collapses findings that share the same request path, host and referer.
///
/// The first finding inserted for a given triple is kept, including its
/// capture time; later equivalents are dropped. Insertion order is preserved.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<FindingKey>,
    findings: Vec<Finding>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `finding` unless an equivalent one is already present.
    ///
    /// Returns `true` when the finding was kept.
    pub fn insert(&mut self, finding: Finding) -> bool {
        if !self.seen.insert(finding.key()) {
            return false;
        }
        self.findings.push(finding);
        true
    }

    /// Hands out every distinct finding and leaves the set empty.
    pub fn drain(&mut self) -> Vec<Finding> {
        self.seen.clear();
        std::mem::take(&mut self.findings)
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}
