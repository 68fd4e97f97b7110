// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persistent test tree.
//!
//! A [`TestNode`] wraps one [`TestDescriptor`](crate::framework::TestDescriptor) and stays
//! identity-stable across runs: results from every run are written back onto the same node.

use crate::{
    framework::DescriptorRef,
    helpers::{lock, plural_s},
    observe::{Observers, SubscriptionId},
    result::{TestResult, TestStatus},
};
use smol_str::SmolStr;
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};
use suitetree_filtering::{Filterset, NameMatcher, NodeQuery};
use tracing::debug;

/// A shared handle to a [`TestNode`].
pub type NodeRef = Arc<TestNode>;

/// A change to a [`TestNode`], delivered to subscribers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum NodeEvent {
    /// The last known result was replaced or cleared.
    ResultChanged {
        /// The status the node now reports.
        status: TestStatus,
    },

    /// The children were reloaded.
    ChildrenReplaced {
        /// The number of children now loaded.
        count: usize,
    },
}

/// A node of the discovered test tree, optionally holding the last known result for it.
///
/// The identifying fields are fixed at construction. Everything else lives behind a lock and is
/// handed out as snapshots, so readers may observe values changing between two reads.
#[derive(Debug)]
pub struct TestNode {
    descriptor: DescriptorRef,
    id: SmolStr,
    name: SmolStr,
    categories: BTreeSet<SmolStr>,
    state: Mutex<NodeState>,
    observers: Observers<NodeEvent>,
}

#[derive(Debug)]
struct NodeState {
    is_suite: bool,
    children: Vec<NodeRef>,
    last_result: Option<Arc<TestResult>>,
    filter: Option<Filterset>,
}

impl TestNode {
    /// Wraps a framework descriptor.
    ///
    /// Children are not loaded until [`Self::load_children`] is called.
    pub fn new(descriptor: DescriptorRef) -> NodeRef {
        let id = SmolStr::new(descriptor.id());
        let name = SmolStr::new(descriptor.name());
        let categories = descriptor.categories();
        let is_suite = descriptor.has_children();
        Arc::new(Self {
            descriptor,
            id,
            name,
            categories,
            state: Mutex::new(NodeState {
                is_suite,
                children: Vec::new(),
                last_result: None,
                filter: None,
            }),
            observers: Observers::new(),
        })
    }

    /// Returns the framework-assigned identifier. May be empty.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the categories this node belongs to.
    pub fn categories(&self) -> &BTreeSet<SmolStr> {
        &self.categories
    }

    /// Returns the framework descriptor this node wraps.
    pub fn descriptor(&self) -> &DescriptorRef {
        &self.descriptor
    }

    /// Returns a query over this node, for filter evaluation.
    pub fn query(&self) -> NodeQuery<'_> {
        NodeQuery::new(&self.id, &self.name).with_categories(&self.categories)
    }

    /// Returns true if this node has, or may have, children.
    pub fn is_suite(&self) -> bool {
        lock(&self.state).is_suite
    }

    /// Returns the currently loaded children.
    pub fn children(&self) -> Vec<NodeRef> {
        lock(&self.state).children.clone()
    }

    /// Reloads children from the framework descriptor, replacing any previously loaded ones.
    ///
    /// Children the framework failed to materialize are skipped. Previously loaded children and
    /// their results are discarded. If the descriptor has no children, this node stops being a
    /// suite.
    pub fn load_children(&self) -> Vec<NodeRef> {
        let raw = if self.descriptor.has_children() {
            self.descriptor.children()
        } else {
            Vec::new()
        };
        let is_suite = !raw.is_empty();
        let total = raw.len();
        let children: Vec<NodeRef> = raw.into_iter().flatten().map(TestNode::new).collect();
        let skipped = total - children.len();
        if skipped > 0 {
            debug!(
                "node `{}`: skipped {skipped} malformed child entr{}",
                self.id,
                if skipped == 1 { "y" } else { "ies" },
            );
        }

        {
            let mut state = lock(&self.state);
            state.is_suite = is_suite;
            state.children = children.clone();
        }
        debug!(
            "node `{}`: loaded {} child node{}",
            self.id,
            children.len(),
            plural_s(children.len()),
        );
        self.observers.notify(&NodeEvent::ChildrenReplaced {
            count: children.len(),
        });
        children
    }

    /// Returns the last known result for this node.
    pub fn last_result(&self) -> Option<Arc<TestResult>> {
        lock(&self.state).last_result.clone()
    }

    /// Replaces the last known result. Children are not affected.
    pub fn set_result(&self, result: Option<Arc<TestResult>>) {
        let status = result
            .as_ref()
            .map_or(TestStatus::NotExecuted, |result| result.status);
        lock(&self.state).last_result = result;
        self.observers.notify(&NodeEvent::ResultChanged { status });
    }

    /// Returns the status of the last known result, or `NotExecuted` if there is none.
    pub fn status(&self) -> TestStatus {
        lock(&self.state)
            .last_result
            .as_ref()
            .map_or(TestStatus::NotExecuted, |result| result.status)
    }

    /// Returns the status as displayed to users.
    pub fn status_text(&self) -> String {
        self.status().to_string()
    }

    /// Returns the filter stored at this scope, if any.
    pub fn filter(&self) -> Option<Filterset> {
        lock(&self.state).filter.clone()
    }

    /// Sets or clears the filter stored at this scope.
    pub fn set_filter(&self, filter: Option<Filterset>) {
        lock(&self.state).filter = filter;
    }

    /// Returns the filter used for runs started from this node.
    ///
    /// This is the node's own filter if set, otherwise a filter selecting only this node. A node
    /// without an id is selected by exact name instead.
    pub fn effective_filter(&self) -> Filterset {
        if let Some(filter) = self.filter() {
            filter
        } else if !self.id.is_empty() {
            Filterset::id(self.id.clone())
        } else {
            Filterset::name(NameMatcher::Equal(self.name.to_string()))
        }
    }

    /// Returns all loaded descendants of this node in pre-order, not including the node itself.
    pub fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeRef> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    /// Registers a callback invoked on every change to this node.
    ///
    /// The subscription stays active until [`Self::unsubscribe`] is called.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&NodeEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Removes a subscription. Returns false if it wasn't active.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
