// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data models for fixture collections.

use smol_str::SmolStr;
use std::{collections::BTreeSet, sync::Arc};
use suitetree_runner::{
    framework::{DescriptorRef, TestDescriptor},
    result::TestStatus,
};

/// The scripted outcome of a fixture test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FixtureOutcome {
    Pass,
    Fail { message: &'static str },
    Skip,
    Inconclusive,
    Error { message: &'static str },
}

impl FixtureOutcome {
    pub fn status(self) -> TestStatus {
        match self {
            FixtureOutcome::Pass => TestStatus::Passed,
            FixtureOutcome::Fail { .. } => TestStatus::Failed,
            FixtureOutcome::Skip => TestStatus::Skipped,
            FixtureOutcome::Inconclusive => TestStatus::Inconclusive,
            FixtureOutcome::Error { .. } => TestStatus::Error,
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            FixtureOutcome::Fail { message } | FixtureOutcome::Error { message } => Some(message),
            FixtureOutcome::Pass | FixtureOutcome::Skip | FixtureOutcome::Inconclusive => None,
        }
    }
}

/// A node of a fixture collection: either a test with a scripted outcome, or a suite.
#[derive(Clone, Debug)]
pub struct FixtureNode {
    pub id: SmolStr,
    pub name: SmolStr,
    pub categories: BTreeSet<SmolStr>,
    pub outcome: Option<FixtureOutcome>,
    // `None` entries stand in for children the framework failed to materialize.
    pub children: Vec<Option<Arc<FixtureNode>>>,
}

impl FixtureNode {
    /// A test named after the last component of its id.
    pub fn test(id: &str, outcome: FixtureOutcome) -> Self {
        Self {
            id: id.into(),
            name: short_name(id).into(),
            categories: BTreeSet::new(),
            outcome: Some(outcome),
            children: Vec::new(),
        }
    }

    /// A suite named after the last component of its id.
    pub fn suite(id: &str, children: impl IntoIterator<Item = FixtureNode>) -> Self {
        Self {
            id: id.into(),
            name: short_name(id).into(),
            categories: BTreeSet::new(),
            outcome: None,
            children: children.into_iter().map(|child| Some(Arc::new(child))).collect(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn with_malformed_child(mut self) -> Self {
        self.children.push(None);
        self
    }

    /// Returns this node and all of its descendants in pre-order.
    pub fn walk(&self) -> Vec<&FixtureNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev().flatten().map(|child| &**child));
        }
        out
    }
}

fn short_name(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

impl TestDescriptor for FixtureNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> BTreeSet<SmolStr> {
        self.categories.clone()
    }

    fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    fn children(&self) -> Vec<Option<DescriptorRef>> {
        self.children
            .iter()
            .map(|child| child.clone().map(|child| child as DescriptorRef))
            .collect()
    }
}
