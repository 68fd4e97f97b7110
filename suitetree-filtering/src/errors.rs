// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while building filtersets.

use crate::CompositeKind;
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// The position of a composite within a filter under construction.
///
/// Rendered as a path from the root, for example `root/or[0]/not[1]`, where each index is the
/// composite's position among its parent's children.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompositePosition {
    segments: Vec<(CompositeKind, usize)>,
}

impl CompositePosition {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    pub(crate) fn child(&self, kind: CompositeKind, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push((kind, index));
        Self { segments }
    }

    /// Returns the number of composites between the root and this position.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns the kind of the composite at this position, or `None` at the root.
    pub fn kind(&self) -> Option<CompositeKind> {
        self.segments.last().map(|&(kind, _)| kind)
    }

    /// Returns the position of the enclosing composite, or `None` at the root.
    pub fn parent(&self) -> Option<CompositePosition> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    fn enclosing(&self) -> CompositePosition {
        self.parent().unwrap_or_default()
    }
}

impl fmt::Display for CompositePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root")?;
        for (kind, index) in &self.segments {
            write!(f, "/{kind}[{index}]")?;
        }
        Ok(())
    }
}

/// An error that occurred while building a [`Filterset`](crate::Filterset).
#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterBuildError {
    /// A leaf predicate was given an unusable value.
    #[error("invalid value for `{param}`: {value:?} ({reason})")]
    #[diagnostic(
        code(suitetree::filter::invalid_argument),
        help("identifiers, names and categories must be non-empty, and patterns must be valid regexes")
    )]
    InvalidArgument {
        /// The name of the offending parameter.
        param: &'static str,
        /// The value that was passed in.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A composite was closed or finalized without any children.
    #[error("`{kind}` composite at {position} has no children (enclosing: {})", .position.enclosing())]
    #[diagnostic(
        code(suitetree::filter::empty_composite),
        help("add at least one predicate before closing a composite")
    )]
    EmptyComposite {
        /// The kind of the empty composite.
        kind: CompositeKind,
        /// Where the composite sits in the filter.
        position: CompositePosition,
    },

    /// The filter was finalized while a composite was still open.
    #[error(
        "`{kind}` composite at {position} was never closed \
         ({open} open composite(s), enclosing: {})",
        .position.enclosing()
    )]
    #[diagnostic(
        code(suitetree::filter::unclosed_composite),
        help("call `pop` once for every `push_and`, `push_or` and `push_not`")
    )]
    UnclosedComposite {
        /// The kind of the innermost open composite.
        kind: CompositeKind,
        /// Where the innermost open composite sits in the filter.
        position: CompositePosition,
        /// The number of composites still open.
        open: usize,
    },

    /// `pop` was called without a matching push.
    #[error("no composite is open to close")]
    #[diagnostic(
        code(suitetree::filter::unbalanced_pop),
        help("`pop` was called more times than `push_and`, `push_or` and `push_not` combined")
    )]
    UnbalancedPop,

    /// A second child was attached to a `not` composite.
    #[error("`not` composite at {position} already has a child (enclosing: {})", .position.enclosing())]
    #[diagnostic(
        code(suitetree::filter::not_child_already_set),
        help("`not` takes exactly one child: wrap several predicates in `push_and` or `push_or`")
    )]
    NotChildAlreadySet {
        /// Where the `not` composite sits in the filter.
        position: CompositePosition,
    },

    /// The builder was used after it produced a filterset.
    #[error("filter has already been built and can no longer be modified")]
    #[diagnostic(code(suitetree::filter::already_built))]
    AlreadyBuilt,
}

impl FilterBuildError {
    pub(crate) fn invalid_argument(
        param: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            param,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
