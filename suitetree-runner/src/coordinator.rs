// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-flight coordination of loads and runs.
//!
//! A [`RunCoordinator`] owns the root of the test tree and a busy gate. At most one load or run
//! is in flight at a time: requests made while busy are dropped, not queued.

use crate::{
    config::SuitetreeProfile,
    errors::{ExecuteError, FrameworkError},
    framework::TestFramework,
    helpers::lock,
    node::{NodeRef, TestNode},
    observe::{Observers, SubscriptionId},
    reconcile::{ReconcileSummary, ReconcileTargets, reconcile},
    result::{ResultCounts, TestResult},
};
use smol_str::SmolStr;
use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use suitetree_filtering::Filterset;
use tracing::{debug, info, warn};

/// A change in coordinator state, delivered to subscribers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum CoordinatorEvent {
    /// The busy gate was entered or left.
    BusyChanged {
        /// Whether the coordinator is now busy.
        busy: bool,
    },

    /// A run finished, successfully or not.
    RunFinished {
        /// The result tree, or `None` if the framework faulted.
        result: Option<Arc<TestResult>>,
    },
}

/// Why a request was dropped without doing anything.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// Another load or run was in flight.
    Busy,
    /// An execution request was still outstanding.
    Executing,
    /// No test collection has been loaded.
    NoCollection,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "another operation is in progress"),
            Self::Executing => write!(f, "a run is currently executing"),
            Self::NoCollection => write!(f, "no test collection is loaded"),
        }
    }
}

/// Statistics about a completed run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// The id of the node the run was started from.
    pub node_id: SmolStr,
    /// The filter the run was executed with.
    pub filter: Filterset,
    /// The result tree produced by the framework.
    pub result: Arc<TestResult>,
    /// Leaf counts over `result`.
    pub counts: ResultCounts,
    /// What reconciliation did.
    pub reconciled: ReconcileSummary,
}

/// The outcome of [`RunCoordinator::run`].
#[derive(Debug)]
pub enum RunOutcome {
    /// The request was dropped. Nothing was changed.
    Skipped(SkipReason),
    /// The framework produced a result tree, and it was reconciled.
    Completed(RunSummary),
    /// The framework faulted. Node results were left untouched.
    Faulted(ExecuteError),
}

impl RunOutcome {
    /// Returns the summary if the run completed.
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::Skipped(_) | Self::Faulted(_) => None,
        }
    }

    /// Returns the skip reason if the request was dropped.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped(reason) => Some(*reason),
            Self::Completed(_) | Self::Faulted(_) => None,
        }
    }
}

/// Coordinates loading and running a test collection.
///
/// This is a cheap handle: clones share the same state.
pub struct RunCoordinator<F: TestFramework> {
    inner: Arc<CoordinatorInner<F>>,
}

impl<F: TestFramework> Clone for RunCoordinator<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F: TestFramework + fmt::Debug> fmt::Debug for RunCoordinator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("framework", &self.inner.framework)
            .field("profile", &self.inner.profile.name())
            .field("busy", &self.is_busy())
            .field("executing", &self.is_executing())
            .finish_non_exhaustive()
    }
}

struct CoordinatorInner<F> {
    framework: Arc<F>,
    profile: SuitetreeProfile,
    busy: AtomicBool,
    // Shared with the blocking task so it stays set until the engine returns, even if the run
    // future is dropped first.
    executing: Arc<AtomicBool>,
    state: Mutex<CoordinatorState>,
    observers: Observers<CoordinatorEvent>,
}

#[derive(Default)]
struct CoordinatorState {
    root: Option<NodeRef>,
    last_result: Option<Arc<TestResult>>,
}

impl<F: TestFramework> RunCoordinator<F> {
    /// Creates a coordinator with no collection loaded.
    pub fn new(framework: F, profile: SuitetreeProfile) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                framework: Arc::new(framework),
                profile,
                busy: AtomicBool::new(false),
                executing: Arc::new(AtomicBool::new(false)),
                state: Mutex::new(CoordinatorState::default()),
                observers: Observers::new(),
            }),
        }
    }

    /// Returns the framework this coordinator drives.
    pub fn framework(&self) -> &F {
        &self.inner.framework
    }

    /// Returns the profile this coordinator was created with.
    pub fn profile(&self) -> &SuitetreeProfile {
        &self.inner.profile
    }

    /// Returns true while a load or run is in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Returns true while the framework is executing tests.
    pub fn is_executing(&self) -> bool {
        self.inner.executing.load(Ordering::Acquire)
    }

    /// Returns the root of the loaded collection.
    pub fn root(&self) -> Option<NodeRef> {
        lock(&self.inner.state).root.clone()
    }

    /// Returns the result tree of the most recent run, or `None` if it faulted or there hasn't
    /// been one.
    pub fn last_result(&self) -> Option<Arc<TestResult>> {
        lock(&self.inner.state).last_result.clone()
    }

    /// Registers a callback invoked on every coordinator event.
    pub fn subscribe<C>(&self, callback: C) -> SubscriptionId
    where
        C: Fn(&CoordinatorEvent) + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(callback)
    }

    /// Removes a subscription. Returns false if it wasn't active.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    /// Loads the test collection for `assembly`, replacing any previously loaded collection.
    ///
    /// Returns `Ok(None)` without doing anything if the coordinator is busy. The new root's
    /// filter is seeded from the profile's default filter.
    pub fn load_collection(
        &self,
        assembly: &F::Assembly,
    ) -> Result<Option<NodeRef>, FrameworkError> {
        let Some(_busy) = self.inner.try_enter() else {
            debug!("load of {assembly:?} requested while busy, ignoring");
            return Ok(None);
        };

        let descriptor = self.inner.framework.load_test_collection(assembly)?;
        let root = TestNode::new(descriptor);
        root.set_filter(self.inner.profile.default_filter().cloned());

        {
            let mut state = lock(&self.inner.state);
            state.root = Some(root.clone());
            state.last_result = None;
        }
        info!(
            "loaded test collection `{}` (profile `{}`)",
            root.name(),
            self.inner.profile.name(),
        );
        Ok(Some(root))
    }

    /// Reloads the children of `node`.
    ///
    /// Returns `None` without doing anything if the coordinator is busy, a run is executing, or
    /// no collection is loaded.
    pub async fn load_children(&self, node: &NodeRef) -> Option<Vec<NodeRef>> {
        let Some(_busy) = self.inner.try_enter() else {
            debug!("load of `{}` requested while busy, ignoring", node.id());
            return None;
        };
        if self.is_executing() {
            debug!("load of `{}` requested while executing, ignoring", node.id());
            return None;
        }
        if self.root().is_none() {
            debug!("load of `{}` requested with no collection loaded", node.id());
            return None;
        }

        let loading = node.clone();
        match tokio::task::spawn_blocking(move || loading.load_children()).await {
            Ok(children) => Some(children),
            Err(error) => {
                warn!("loading children of `{}` did not complete: {error}", node.id());
                None
            }
        }
    }

    /// Runs the tests under `node` (default: the root) selected by `filter`.
    ///
    /// The filter defaults to the node's effective filter. The framework executes the whole
    /// collection with that filter, and the resulting tree is reconciled onto `node` and its
    /// loaded descendants.
    ///
    /// Returns [`RunOutcome::Skipped`] without doing anything if the coordinator is busy, a
    /// previous execution is still outstanding, or no collection is loaded.
    pub async fn run(&self, node: Option<&NodeRef>, filter: Option<Filterset>) -> RunOutcome {
        self.run_with(node, filter, |_, _| {}).await
    }

    /// Like [`Self::run`], calling `before_execute` with the resolved node and filter once the
    /// request has been accepted and before the framework starts executing.
    ///
    /// `before_execute` is not called if the request is dropped.
    pub async fn run_with<B>(
        &self,
        node: Option<&NodeRef>,
        filter: Option<Filterset>,
        before_execute: B,
    ) -> RunOutcome
    where
        B: FnOnce(&NodeRef, &Filterset) + Send,
    {
        let Some(_busy) = self.inner.try_enter() else {
            debug!("run requested while busy, ignoring");
            return RunOutcome::Skipped(SkipReason::Busy);
        };
        let Some(root) = self.root() else {
            debug!("run requested with no collection loaded, ignoring");
            return RunOutcome::Skipped(SkipReason::NoCollection);
        };
        let node = node.cloned().unwrap_or_else(|| root.clone());
        let filter = filter.unwrap_or_else(|| node.effective_filter());

        let Some(executing) = self.inner.try_execute() else {
            debug!("run requested while a previous execution is outstanding, ignoring");
            return RunOutcome::Skipped(SkipReason::Executing);
        };
        before_execute(&node, &filter);
        info!("running `{}` with filter {filter}", node.id());

        let framework = self.inner.framework.clone();
        let descriptor = root.descriptor().clone();
        let engine_filter = filter.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _executing = executing;
            framework.execute(&descriptor, &engine_filter)
        });
        let result = match task.await {
            Ok(result) => result.map(Arc::new),
            Err(error) => Err(ExecuteError::TaskFailed(error)),
        };

        match result {
            Ok(result) => {
                lock(&self.inner.state).last_result = Some(result.clone());
                let reconciled = reconcile(Some(&result), &ReconcileTargets::from_tree(&node));
                let counts = result.counts();
                info!(
                    "run of `{}` finished: {} passed, {} failed, {} skipped, {} inconclusive, \
                     {} errors",
                    node.id(),
                    counts.passed,
                    counts.failed,
                    counts.skipped,
                    counts.inconclusive,
                    counts.errors,
                );
                self.inner.observers.notify(&CoordinatorEvent::RunFinished {
                    result: Some(result.clone()),
                });
                RunOutcome::Completed(RunSummary {
                    node_id: SmolStr::new(node.id()),
                    filter,
                    result,
                    counts,
                    reconciled,
                })
            }
            Err(error) => {
                lock(&self.inner.state).last_result = None;
                warn!("run of `{}` produced no results: {error}", node.id());
                self.inner
                    .observers
                    .notify(&CoordinatorEvent::RunFinished { result: None });
                RunOutcome::Faulted(error)
            }
        }
    }
}

impl<F> CoordinatorInner<F> {
    fn try_enter(&self) -> Option<BusyGuard<'_, F>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.observers
            .notify(&CoordinatorEvent::BusyChanged { busy: true });
        Some(BusyGuard { inner: self })
    }

    fn try_execute(&self) -> Option<ExecutingGuard> {
        self.executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(ExecutingGuard {
            executing: self.executing.clone(),
        })
    }
}

/// Holds the busy gate, releasing it on drop.
struct BusyGuard<'a, F> {
    inner: &'a CoordinatorInner<F>,
}

impl<F> Drop for BusyGuard<'_, F> {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
        self.inner
            .observers
            .notify(&CoordinatorEvent::BusyChanged { busy: false });
    }
}

/// Marks an execution as outstanding until the engine call returns.
struct ExecutingGuard {
    executing: Arc<AtomicBool>,
}

impl Drop for ExecutingGuard {
    fn drop(&mut self) {
        self.executing.store(false, Ordering::Release);
    }
}
