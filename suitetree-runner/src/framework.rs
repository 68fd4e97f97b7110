// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the underlying test framework.
//!
//! suitetree doesn't discover or run tests itself. A [`TestFramework`] hands out a tree of
//! [`TestDescriptor`]s for a loaded test collection, and executes (a filtered part of) that
//! tree, returning a [`TestResult`] tree.

use crate::{
    errors::{ExecuteError, FrameworkError},
    result::TestResult,
};
use smol_str::SmolStr;
use std::{collections::BTreeSet, fmt, sync::Arc};
use suitetree_filtering::Filterset;

/// A shared handle to a [`TestDescriptor`].
pub type DescriptorRef = Arc<dyn TestDescriptor>;

/// One node of a discovered test hierarchy, as reported by the framework.
///
/// Descriptors are opaque to suitetree beyond the accessors here.
pub trait TestDescriptor: fmt::Debug + Send + Sync {
    /// The stable identifier of this node, unique within its collection.
    ///
    /// May be empty if the framework couldn't assign one.
    fn id(&self) -> &str;

    /// The display name of this node.
    fn name(&self) -> &str;

    /// The categories this node belongs to.
    fn categories(&self) -> BTreeSet<SmolStr> {
        BTreeSet::new()
    }

    /// Returns true if this node has, or may have, children.
    fn has_children(&self) -> bool;

    /// Returns the children of this node in order.
    ///
    /// `None` entries are children the framework failed to materialize.
    fn children(&self) -> Vec<Option<DescriptorRef>>;
}

/// A test framework that can load and execute test collections.
pub trait TestFramework: Send + Sync + 'static {
    /// The handle used to locate a test collection, for example a path to a test binary.
    type Assembly: fmt::Debug + Send + Sync;

    /// Loads the test collection for `assembly`, returning its root descriptor.
    fn load_test_collection(&self, assembly: &Self::Assembly)
    -> Result<DescriptorRef, FrameworkError>;

    /// Executes the tests under `root` accepted by `filter`.
    ///
    /// This is a long-running call. Failures of individual tests are reported through the
    /// returned result tree; `Err` means no result tree could be produced at all.
    fn execute(&self, root: &DescriptorRef, filter: &Filterset)
    -> Result<TestResult, ExecuteError>;
}
