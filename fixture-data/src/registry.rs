// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicitly constructed collections of fixtures.

use crate::models::{FixtureNode, FixtureOutcome};
use smol_str::SmolStr;
use std::{collections::HashMap, sync::Arc};

/// Fixture collections by name, along with the scripted outcome of every test in them.
///
/// Each test gets its own registry, so tests can't observe each other's fixtures.
#[derive(Clone, Debug, Default)]
pub struct FixtureRegistry {
    collections: HashMap<SmolStr, Arc<FixtureNode>>,
    outcomes: HashMap<SmolStr, FixtureOutcome>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collection under `name`, replacing any previous collection with that name.
    pub fn register(&mut self, name: &str, root: FixtureNode) -> &mut Self {
        for node in root.walk() {
            if let Some(outcome) = node.outcome {
                self.outcomes.insert(node.id.clone(), outcome);
            }
        }
        self.collections.insert(name.into(), Arc::new(root));
        self
    }

    pub fn collection(&self, name: &str) -> Option<&Arc<FixtureNode>> {
        self.collections.get(name)
    }

    pub fn outcome(&self, id: &str) -> Option<FixtureOutcome> {
        self.outcomes.get(id).copied()
    }

    /// A registry with the standard collections:
    ///
    /// * [`CALC_TESTS`]: `Calc.Tests` with tests `Add` and `Subtract`, and a nested suite
    ///   `Calc.Tests.Advanced` with the test `Divide`.
    /// * [`MIXED_TESTS`]: one test of every outcome, plus a malformed child entry.
    pub fn with_standard_collections() -> Self {
        let mut registry = Self::new();
        registry
            .register(CALC_TESTS, calc_tests(FixtureOutcome::Pass))
            .register(MIXED_TESTS, mixed_tests());
        registry
    }
}

pub const CALC_TESTS: &str = "calc-tests";
pub const MIXED_TESTS: &str = "mixed-tests";

pub const CALC_ROOT: &str = "Calc.Tests";
pub const CALC_ADD: &str = "Calc.Tests.Add";
pub const CALC_SUBTRACT: &str = "Calc.Tests.Subtract";
pub const CALC_ADVANCED: &str = "Calc.Tests.Advanced";
pub const CALC_DIVIDE: &str = "Calc.Tests.Advanced.Divide";

/// `Calc.Tests`, with every test scripted to `outcome`.
pub fn calc_tests(outcome: FixtureOutcome) -> FixtureNode {
    FixtureNode::suite(
        CALC_ROOT,
        [
            FixtureNode::test(CALC_ADD, outcome).with_category("fast"),
            FixtureNode::test(CALC_SUBTRACT, outcome).with_category("fast"),
            FixtureNode::suite(
                CALC_ADVANCED,
                [FixtureNode::test(CALC_DIVIDE, outcome).with_category("slow")],
            ),
        ],
    )
}

fn mixed_tests() -> FixtureNode {
    FixtureNode::suite(
        "Mixed",
        [
            FixtureNode::test("Mixed.Pass", FixtureOutcome::Pass),
            FixtureNode::test(
                "Mixed.Fail",
                FixtureOutcome::Fail {
                    message: "expected 4, got 5",
                },
            ),
            FixtureNode::test("Mixed.Skip", FixtureOutcome::Skip),
            FixtureNode::test("Mixed.Inconclusive", FixtureOutcome::Inconclusive),
            FixtureNode::test(
                "Mixed.Error",
                FixtureOutcome::Error {
                    message: "fixture setup threw",
                },
            ),
            FixtureNode::suite("Mixed.Empty", []),
        ],
    )
    .with_malformed_child()
}
