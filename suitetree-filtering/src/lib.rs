// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter expressions for selecting parts of a discovered test tree.
//!
//! A [`Filterset`] is an immutable, cheaply clonable predicate over test nodes. Filtersets are
//! either assembled directly with the combinators on [`Filterset`], or incrementally through a
//! [`FilterBuilder`] which validates the structure as it goes.

mod builder;
pub mod errors;
mod expression;
#[cfg(any(test, feature = "internal-testing"))]
mod proptest_helpers;

pub use builder::FilterBuilder;
pub use expression::{CompositeKind, FilterExpr, Filterset, NameMatcher, NodeQuery};
#[cfg(any(test, feature = "internal-testing"))]
#[doc(hidden)]
pub use proptest_helpers::ArbitraryNode;
