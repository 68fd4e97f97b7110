// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writing result trees back onto the persistent test tree.
//!
//! A result tree only covers the part of the test tree that was run, so it is matched against
//! [`TestNode`]s by id rather than by position.

use crate::{
    node::{NodeRef, TestNode},
    result::TestResult,
};
use smol_str::SmolStr;
use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    sync::Arc,
};
use tracing::{debug, trace};

/// The nodes interested in results from a run, keyed by id.
///
/// Nodes with an empty id can't be matched and are left out. If several nodes share an id, the
/// first one wins.
#[derive(Clone, Debug, Default)]
pub struct ReconcileTargets {
    by_id: HashMap<SmolStr, NodeRef>,
}

impl ReconcileTargets {
    /// Collects targets from a flat list of nodes.
    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeRef>) -> Self {
        let mut by_id = HashMap::new();
        for node in nodes {
            if node.id().is_empty() {
                continue;
            }
            if let Entry::Vacant(entry) = by_id.entry(SmolStr::new(node.id())) {
                entry.insert(node);
            }
        }
        Self { by_id }
    }

    /// Collects `root` and all of its loaded descendants.
    pub fn from_tree(root: &NodeRef) -> Self {
        Self::from_nodes(std::iter::once(root.clone()).chain(root.descendants()))
    }

    /// Returns the number of targets.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if there are no targets.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Returns the target with this id.
    pub fn get(&self, id: &str) -> Option<&TestNode> {
        self.by_id.get(id).map(|node| &**node)
    }
}

/// What a call to [`reconcile`] did.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ReconcileSummary {
    /// The number of result nodes examined.
    pub visited: usize,
    /// The number of targets that received a result.
    pub matched: usize,
    /// The number of targets that didn't appear in the result tree.
    pub unmatched: usize,
}

/// Applies each result in `result` to the target with the same id.
///
/// The result tree is walked depth-first in pre-order. The walk stops as soon as every target
/// has received a result. If an id appears more than once, only its first occurrence is
/// applied. Targets without a matching result keep whatever result they had; a missing result
/// tree leaves every target untouched.
pub fn reconcile(result: Option<&Arc<TestResult>>, targets: &ReconcileTargets) -> ReconcileSummary {
    let mut summary = ReconcileSummary {
        unmatched: targets.len(),
        ..Default::default()
    };
    let Some(result) = result else {
        return summary;
    };

    let mut matched: HashSet<&str> = HashSet::new();
    let mut stack = vec![result];
    while matched.len() < targets.len() {
        let Some(result) = stack.pop() else {
            break;
        };
        summary.visited += 1;

        if let Some(node) = targets.get(&result.test_id) {
            if matched.insert(result.test_id.as_str()) {
                trace!("reconcile: `{}` -> {}", result.test_id, result.status);
                node.set_result(Some(result.clone()));
            } else {
                trace!("reconcile: ignoring duplicate result for `{}`", result.test_id);
            }
        }

        stack.extend(result.children().iter().rev());
    }

    summary.matched = matched.len();
    summary.unmatched = targets.len() - summary.matched;
    debug!(
        "reconciled {} of {} targets ({} result nodes visited)",
        summary.matched,
        targets.len(),
        summary.visited,
    );
    summary
}
