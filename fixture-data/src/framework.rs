// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory test framework executing fixture collections.

use crate::registry::FixtureRegistry;
use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use smol_str::SmolStr;
use suitetree_filtering::{FilterExpr, Filterset, NodeQuery};
use suitetree_runner::{
    errors::{ExecuteError, FrameworkError},
    framework::{DescriptorRef, TestFramework},
    result::{TestResult, TestStatus},
};

/// Executes fixture collections from a [`FixtureRegistry`].
///
/// Tests are selected by evaluating the filter against them, with `id` predicates also matching
/// the ids of enclosing suites: `id(Suite)` selects every test under `Suite`, while a filter
/// such as `not category(slow)` is decided test by test. A suite appears in the result tree if
/// any test under it ran.
///
/// By default suites are reported as rollups without an id, the way frameworks that synthesize
/// suite results do. Use [`Self::with_suite_ids`] to report them under their own ids.
#[derive(Debug)]
pub struct FixtureFramework {
    registry: FixtureRegistry,
    identify_suites: bool,
    execute_calls: AtomicUsize,
    fault: AtomicBool,
    gate: Mutex<Option<Arc<ExecutionGate>>>,
}

impl FixtureFramework {
    pub fn new(registry: FixtureRegistry) -> Self {
        Self {
            registry,
            identify_suites: false,
            execute_calls: AtomicUsize::new(0),
            fault: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    pub fn with_suite_ids(mut self) -> Self {
        self.identify_suites = true;
        self
    }

    /// The number of times `execute` has been called.
    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    /// Makes subsequent executions fail without producing a result tree.
    pub fn set_fault(&self, fault: bool) {
        self.fault.store(fault, Ordering::SeqCst);
    }

    /// Makes the next execution block until the returned gate is released.
    pub fn arm_gate(&self) -> Arc<ExecutionGate> {
        let gate = Arc::new(ExecutionGate::default());
        *lock(&self.gate) = Some(gate.clone());
        gate
    }

    fn run_node(
        &self,
        node: &DescriptorRef,
        filter: &Filterset,
        ancestors: &mut Vec<SmolStr>,
    ) -> Option<TestResult> {
        let children = node.children();
        if children.is_empty() {
            let categories = node.categories();
            let query = NodeQuery::new(node.id(), node.name()).with_categories(&categories);
            if !selects(filter.expr(), &query, ancestors) {
                return None;
            }
            // Empty suites have no outcome, and nothing runs for them.
            let outcome = self.registry.outcome(node.id())?;
            let mut result = TestResult::leaf(node.id(), outcome.status());
            if let Some(message) = outcome.message() {
                result = result.with_message(message);
            }
            return Some(result);
        }

        ancestors.push(SmolStr::new(node.id()));
        let results: Vec<TestResult> = children
            .iter()
            .flatten()
            .filter_map(|child| self.run_node(child, filter, ancestors))
            .collect();
        ancestors.pop();
        if results.is_empty() {
            return None;
        }
        let status = suite_status(&results);
        Some(TestResult::suite(self.suite_id(node), status, results))
    }

    fn suite_id<'a>(&self, node: &'a DescriptorRef) -> &'a str {
        if self.identify_suites { node.id() } else { "" }
    }
}

fn selects(expr: &FilterExpr, query: &NodeQuery<'_>, ancestors: &[SmolStr]) -> bool {
    match expr {
        FilterExpr::Id(id) => query.id == id.as_str() || ancestors.contains(id),
        FilterExpr::Not(child) => !selects(child, query, ancestors),
        FilterExpr::And(children) => children
            .iter()
            .all(|child| selects(child, query, ancestors)),
        FilterExpr::Or(children) => children
            .iter()
            .any(|child| selects(child, query, ancestors)),
        other => other.matches(query),
    }
}

fn suite_status(results: &[TestResult]) -> TestStatus {
    let any = |status: TestStatus| results.iter().any(|result| result.status == status);
    if results.iter().any(|result| result.status.is_failure()) {
        TestStatus::Failed
    } else if any(TestStatus::Inconclusive) {
        TestStatus::Inconclusive
    } else if any(TestStatus::Passed) {
        TestStatus::Passed
    } else {
        TestStatus::Skipped
    }
}

impl TestFramework for FixtureFramework {
    type Assembly = String;

    fn load_test_collection(&self, assembly: &String) -> Result<DescriptorRef, FrameworkError> {
        match self.registry.collection(assembly) {
            Some(root) => Ok(root.clone() as DescriptorRef),
            None => Err(FrameworkError::new(
                assembly.as_str(),
                "no fixture collection registered under this name",
            )),
        }
    }

    fn execute(
        &self,
        root: &DescriptorRef,
        filter: &Filterset,
    ) -> Result<TestResult, ExecuteError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.enter_and_wait();
        }
        if self.fault.load(Ordering::SeqCst) {
            return Err(ExecuteError::fault("fixture framework scripted to fault"));
        }

        // A run that selects nothing still produces a (childless) result for the root.
        Ok(self
            .run_node(root, filter, &mut Vec::new())
            .unwrap_or_else(|| TestResult::suite(self.suite_id(root), TestStatus::Skipped, [])))
    }
}

/// Holds an execution in place until released.
#[derive(Debug, Default)]
pub struct ExecutionGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct GateState {
    entered: bool,
    released: bool,
}

impl ExecutionGate {
    /// Blocks until an execution has reached the gate.
    pub fn wait_entered(&self) {
        let mut state = lock(&self.state);
        while !state.entered {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Lets the execution continue.
    pub fn release(&self) {
        lock(&self.state).released = true;
        self.changed.notify_all();
    }

    fn enter_and_wait(&self) {
        let mut state = lock(&self.state);
        state.entered = true;
        self.changed.notify_all();
        while !state.released {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
