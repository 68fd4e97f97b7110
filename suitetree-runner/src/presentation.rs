// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State for a view of the test tree.
//!
//! [`TestTreeView`] tracks the node currently being browsed and its children, and turns user
//! actions into fire-and-forget loads and runs on a [`RunCoordinator`]. It doesn't render
//! anything.

use crate::{
    coordinator::{CoordinatorEvent, RunCoordinator, RunOutcome},
    framework::TestFramework,
    helpers::lock,
    node::{NodeEvent, NodeRef, TestNode},
    observe::SubscriptionId,
    result::TestStatus,
};
use std::sync::{Arc, Mutex};
use suitetree_filtering::Filterset;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::debug;

/// A displayed node, with its status text kept current.
#[derive(Debug)]
pub struct NodeItem {
    node: NodeRef,
    status_text: Arc<Mutex<String>>,
    subscription: SubscriptionId,
}

impl NodeItem {
    /// Starts tracking `node`.
    ///
    /// The item stays subscribed to the node until [`Self::detach`] is called.
    pub fn new(node: NodeRef) -> Self {
        let status_text = Arc::new(Mutex::new(node.status_text()));
        let subscription = {
            let status_text = status_text.clone();
            node.subscribe(move |event| {
                if let NodeEvent::ResultChanged { status } = event {
                    *lock(&status_text) = status.to_string();
                }
            })
        };
        Self {
            node,
            status_text,
            subscription,
        }
    }

    /// Returns the tracked node.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Returns the status text as of the node's most recent change.
    pub fn status_text(&self) -> String {
        lock(&self.status_text).clone()
    }

    /// Stops tracking the node. Returns false if already detached.
    pub fn detach(&self) -> bool {
        self.node.unsubscribe(self.subscription)
    }
}

#[derive(Debug, Default)]
struct ViewState {
    current: Option<NodeRef>,
    items: Vec<Arc<NodeItem>>,
}

impl ViewState {
    fn replace(&mut self, current: NodeRef, children: Vec<NodeRef>) {
        for item in self.items.drain(..) {
            item.detach();
        }
        self.items = children
            .into_iter()
            .map(|node| Arc::new(NodeItem::new(node)))
            .collect();
        self.current = Some(current);
    }
}

/// The browsing state of a test tree view.
pub struct TestTreeView<F: TestFramework> {
    coordinator: RunCoordinator<F>,
    handle: Handle,
    state: Arc<Mutex<ViewState>>,
}

impl<F: TestFramework> TestTreeView<F> {
    /// Creates a view over `coordinator`, spawning work on `handle`.
    pub fn new(coordinator: RunCoordinator<F>, handle: Handle) -> Self {
        Self {
            coordinator,
            handle,
            state: Arc::new(Mutex::new(ViewState::default())),
        }
    }

    /// Returns the coordinator this view drives.
    pub fn coordinator(&self) -> &RunCoordinator<F> {
        &self.coordinator
    }

    /// Returns true while the coordinator is busy.
    pub fn is_busy(&self) -> bool {
        self.coordinator.is_busy()
    }

    /// Registers a callback invoked whenever the busy state changes.
    pub fn subscribe_busy<C>(&self, callback: C) -> SubscriptionId
    where
        C: Fn(bool) + Send + Sync + 'static,
    {
        self.coordinator.subscribe(move |event| {
            if let CoordinatorEvent::BusyChanged { busy } = event {
                callback(*busy);
            }
        })
    }

    /// Removes a subscription made through [`Self::subscribe_busy`].
    pub fn unsubscribe_busy(&self, id: SubscriptionId) -> bool {
        self.coordinator.unsubscribe(id)
    }

    /// Returns the node whose children are displayed.
    pub fn current(&self) -> Option<NodeRef> {
        lock(&self.state).current.clone()
    }

    /// Returns the displayed children of the current node.
    pub fn items(&self) -> Vec<Arc<NodeItem>> {
        lock(&self.state).items.clone()
    }

    /// Loads the children of `node` and displays them.
    ///
    /// The task resolves to false if the coordinator dropped the request.
    pub fn trigger_load(&self, node: NodeRef) -> JoinHandle<bool> {
        let coordinator = self.coordinator.clone();
        let state = self.state.clone();
        self.handle.spawn(async move {
            let Some(children) = coordinator.load_children(&node).await else {
                return false;
            };
            lock(&state).replace(node, children);
            true
        })
    }

    /// Runs the tests under `node` (default: the root) selected by `filter`.
    ///
    /// If the profile asks for it, displayed items selected by the run's filter have their
    /// results cleared once the coordinator accepts the run. Nothing is cleared if the run is
    /// dropped.
    pub fn trigger_run(
        &self,
        node: Option<NodeRef>,
        filter: Option<Filterset>,
    ) -> JoinHandle<RunOutcome> {
        let coordinator = self.coordinator.clone();
        let state = self.state.clone();
        let reset = coordinator.profile().reset_before_run();
        self.handle.spawn(async move {
            coordinator
                .run_with(node.as_ref(), filter, move |_, filter| {
                    if reset {
                        reset_items(&state, filter);
                    }
                })
                .await
        })
    }
}

fn reset_items(state: &Mutex<ViewState>, filter: &Filterset) {
    let items = lock(state).items.clone();
    let mut cleared = 0;
    for item in items {
        if filter.matches(&item.node().query()) {
            item.node().set_result(None);
            cleared += 1;
        }
    }
    debug!("cleared results on {cleared} displayed items matching {filter}");
}

impl<F: TestFramework> Drop for TestTreeView<F> {
    fn drop(&mut self) {
        for item in lock(&self.state).items.drain(..) {
            item.detach();
        }
    }
}

/// Derives the status to display for `node`.
///
/// A node's own result wins. Otherwise the status is derived from its loaded children, taking
/// the most severe status among them: `Error`, then `Failed`, `Inconclusive`, `Passed`,
/// `Skipped`, and finally `NotExecuted`.
pub fn aggregate_status(node: &TestNode) -> TestStatus {
    if let Some(result) = node.last_result() {
        return result.status;
    }
    node.children()
        .iter()
        .map(|child| aggregate_status(child))
        .max_by_key(|status| severity(*status))
        .unwrap_or(TestStatus::NotExecuted)
}

fn severity(status: TestStatus) -> u8 {
    match status {
        TestStatus::NotExecuted => 0,
        TestStatus::Skipped => 1,
        TestStatus::Passed => 2,
        TestStatus::Inconclusive => 3,
        TestStatus::Failed => 4,
        TestStatus::Error => 5,
    }
}
