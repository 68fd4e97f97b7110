// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result trees produced by a test framework.

use crate::errors::TestStatusParseError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{fmt, str::FromStr, sync::Arc, time::Duration};

/// The outcome of a single test or suite.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// The test passed.
    Passed,

    /// The test failed an assertion.
    Failed,

    /// The test was skipped or ignored.
    Skipped,

    /// The test ran but couldn't determine an outcome.
    Inconclusive,

    /// The test raised an unexpected error, or couldn't be run at all.
    Error,

    /// No result is known for this test.
    ///
    /// This is the default.
    #[default]
    NotExecuted,
}

impl TestStatus {
    /// Returns the string values accepted by [`FromStr`].
    pub fn variants() -> [&'static str; 6] {
        [
            "passed",
            "failed",
            "skipped",
            "inconclusive",
            "error",
            "not-executed",
        ]
    }

    /// Returns true if this status represents a failing outcome.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "Passed"),
            Self::Failed => write!(f, "Failed"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Inconclusive => write!(f, "Inconclusive"),
            Self::Error => write!(f, "Error"),
            Self::NotExecuted => write!(f, "Not Executed"),
        }
    }
}

impl FromStr for TestStatus {
    type Err = TestStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "skipped" => Self::Skipped,
            "inconclusive" => Self::Inconclusive,
            "error" => Self::Error,
            "not-executed" => Self::NotExecuted,
            other => return Err(TestStatusParseError::new(other)),
        };
        Ok(val)
    }
}

/// One node of a result tree.
///
/// Result trees mirror the part of the test tree that was actually run: a suite's `children`
/// are only present if some of its children were executed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestResult {
    /// The identifier of the test this result is for.
    pub test_id: SmolStr,

    /// The outcome.
    pub status: TestStatus,

    /// A failure or skip message reported by the framework.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// How long the test took.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,

    /// Results for the executed children of a suite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Arc<TestResult>>>,
}

impl TestResult {
    /// Creates a result for a test without children.
    pub fn leaf(test_id: impl Into<SmolStr>, status: TestStatus) -> Self {
        Self {
            test_id: test_id.into(),
            status,
            message: None,
            duration: None,
            children: None,
        }
    }

    /// Creates a result for a suite with executed children.
    pub fn suite(
        test_id: impl Into<SmolStr>,
        status: TestStatus,
        children: impl IntoIterator<Item = TestResult>,
    ) -> Self {
        Self {
            children: Some(children.into_iter().map(Arc::new).collect()),
            ..Self::leaf(test_id, status)
        }
    }

    /// Sets the message for this result.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the duration for this result.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Returns the children of this result, or an empty slice if there are none.
    pub fn children(&self) -> &[Arc<TestResult>] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Counts the leaf results in this tree by status.
    pub fn counts(&self) -> ResultCounts {
        let mut counts = ResultCounts::default();
        let mut stack = vec![self];
        while let Some(result) = stack.pop() {
            match &result.children {
                Some(children) if !children.is_empty() => {
                    stack.extend(children.iter().map(|child| &**child));
                }
                _ => counts.add(result.status),
            }
        }
        counts
    }
}

/// Leaf counts for a result tree, by status.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ResultCounts {
    /// The number of passed leaves.
    pub passed: usize,
    /// The number of failed leaves.
    pub failed: usize,
    /// The number of skipped leaves.
    pub skipped: usize,
    /// The number of inconclusive leaves.
    pub inconclusive: usize,
    /// The number of errored leaves.
    pub errors: usize,
    /// The number of leaves reported without an outcome.
    pub not_executed: usize,
}

impl ResultCounts {
    fn add(&mut self, status: TestStatus) {
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Inconclusive => self.inconclusive += 1,
            TestStatus::Error => self.errors += 1,
            TestStatus::NotExecuted => self.not_executed += 1,
        }
    }

    /// Returns the total number of leaves counted.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.inconclusive + self.errors + self.not_executed
    }

    /// Returns true if any leaf failed or errored.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.errors > 0
    }
}
