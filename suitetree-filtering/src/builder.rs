// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    CompositeKind, FilterExpr, Filterset, NameMatcher,
    errors::{CompositePosition, FilterBuildError},
};
use smol_str::SmolStr;
use std::{mem, sync::Arc};

/// Incrementally builds a [`Filterset`].
///
/// Predicates are added to the innermost open composite. `push_and`, `push_or` and `push_not`
/// open a new composite; `pop` closes it and attaches it to its parent. Anything added outside
/// a composite is combined with an implicit `and`: a builder with nothing added produces the
/// match-everything filterset.
///
/// ```
/// use suitetree_filtering::FilterBuilder;
///
/// let mut builder = FilterBuilder::new();
/// builder
///     .push_or()?
///     .add_id("A")?
///     .push_not()?
///     .add_category("slow")?
///     .pop()?
///     .pop()?;
/// let filterset = builder.build()?;
/// assert_eq!(filterset.to_string(), "(id(A) | not category(slow))");
/// # Ok::<_, suitetree_filtering::errors::FilterBuildError>(())
/// ```
#[derive(Debug, Default)]
pub struct FilterBuilder {
    root: Vec<Arc<FilterExpr>>,
    open: Vec<OpenComposite>,
    built: bool,
}

#[derive(Debug)]
struct OpenComposite {
    kind: CompositeKind,
    position: CompositePosition,
    children: Vec<Arc<FilterExpr>>,
}

impl FilterBuilder {
    /// Creates a new, empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate matching the node with this identifier.
    pub fn add_id(&mut self, id: impl Into<SmolStr>) -> Result<&mut Self, FilterBuildError> {
        self.check_not_built()?;
        let id = id.into();
        if id.is_empty() {
            return Err(FilterBuildError::invalid_argument(
                "id",
                id.as_str(),
                "must not be empty",
            ));
        }
        self.attach(FilterExpr::Id(id))
    }

    /// Adds a predicate matching nodes by name.
    pub fn add_name(&mut self, matcher: NameMatcher) -> Result<&mut Self, FilterBuildError> {
        self.check_not_built()?;
        if matcher.text().is_empty() {
            return Err(FilterBuildError::invalid_argument(
                "name",
                matcher.text(),
                "must not be empty",
            ));
        }
        self.attach(FilterExpr::Name(matcher))
    }

    /// Adds a predicate matching nodes in a category.
    pub fn add_category(
        &mut self,
        category: impl Into<SmolStr>,
    ) -> Result<&mut Self, FilterBuildError> {
        self.check_not_built()?;
        let category = category.into();
        if category.is_empty() {
            return Err(FilterBuildError::invalid_argument(
                "category",
                category.as_str(),
                "must not be empty",
            ));
        }
        self.attach(FilterExpr::Category(category))
    }

    /// Adds an already-built filterset as a child of the current composite.
    ///
    /// The filterset is shared, not copied.
    pub fn add_filterset(&mut self, filterset: &Filterset) -> Result<&mut Self, FilterBuildError> {
        self.check_not_built()?;
        self.attach_shared(filterset.shared_expr())
    }

    /// Opens an `and` composite.
    pub fn push_and(&mut self) -> Result<&mut Self, FilterBuildError> {
        self.push(CompositeKind::And)
    }

    /// Opens an `or` composite.
    pub fn push_or(&mut self) -> Result<&mut Self, FilterBuildError> {
        self.push(CompositeKind::Or)
    }

    /// Opens a `not` composite, which accepts exactly one child.
    pub fn push_not(&mut self) -> Result<&mut Self, FilterBuildError> {
        self.push(CompositeKind::Not)
    }

    /// Closes the innermost open composite and attaches it to its parent.
    ///
    /// On error, the builder is left unchanged.
    pub fn pop(&mut self) -> Result<&mut Self, FilterBuildError> {
        self.check_not_built()?;
        let Some(top) = self.open.last() else {
            return Err(FilterBuildError::UnbalancedPop);
        };
        if top.children.is_empty() {
            return Err(FilterBuildError::EmptyComposite {
                kind: top.kind,
                position: top.position.clone(),
            });
        }

        let Some(mut top) = self.open.pop() else {
            return Err(FilterBuildError::UnbalancedPop);
        };
        let expr = match top.kind {
            CompositeKind::And => FilterExpr::And(mem::take(&mut top.children)),
            CompositeKind::Or => FilterExpr::Or(mem::take(&mut top.children)),
            CompositeKind::Not => match top.children.pop() {
                Some(child) => FilterExpr::Not(child),
                None => {
                    return Err(FilterBuildError::EmptyComposite {
                        kind: top.kind,
                        position: top.position,
                    });
                }
            },
        };
        self.current_children().push(Arc::new(expr));
        Ok(self)
    }

    /// Finalizes the builder, producing a [`Filterset`].
    ///
    /// Fails if any composite is still open. After a successful build, every further call on
    /// this builder returns [`FilterBuildError::AlreadyBuilt`].
    pub fn build(&mut self) -> Result<Filterset, FilterBuildError> {
        self.check_not_built()?;
        if let Some(innermost) = self.open.last() {
            return Err(FilterBuildError::UnclosedComposite {
                kind: innermost.kind,
                position: innermost.position.clone(),
                open: self.open.len(),
            });
        }

        let mut root = mem::take(&mut self.root);
        let expr = match root.len() {
            0 => Arc::new(FilterExpr::All),
            1 => root.remove(0),
            _ => Arc::new(FilterExpr::And(root)),
        };
        self.built = true;
        Ok(Filterset::from_arc(expr))
    }

    /// Returns the number of composites that are currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    // ---
    // Helper methods
    // ---

    fn check_not_built(&self) -> Result<(), FilterBuildError> {
        if self.built {
            Err(FilterBuildError::AlreadyBuilt)
        } else {
            Ok(())
        }
    }

    fn push(&mut self, kind: CompositeKind) -> Result<&mut Self, FilterBuildError> {
        self.check_not_built()?;
        self.check_can_attach()?;
        let (parent, index) = match self.open.last() {
            Some(top) => (top.position.clone(), top.children.len()),
            None => (CompositePosition::root(), self.root.len()),
        };
        self.open.push(OpenComposite {
            kind,
            position: parent.child(kind, index),
            children: Vec::new(),
        });
        Ok(self)
    }

    fn attach(&mut self, expr: FilterExpr) -> Result<&mut Self, FilterBuildError> {
        self.attach_shared(Arc::new(expr))
    }

    fn attach_shared(&mut self, expr: Arc<FilterExpr>) -> Result<&mut Self, FilterBuildError> {
        self.check_can_attach()?;
        self.current_children().push(expr);
        Ok(self)
    }

    fn check_can_attach(&self) -> Result<(), FilterBuildError> {
        match self.open.last() {
            Some(top) if top.kind == CompositeKind::Not && !top.children.is_empty() => {
                Err(FilterBuildError::NotChildAlreadySet {
                    position: top.position.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn current_children(&mut self) -> &mut Vec<Arc<FilterExpr>> {
        match self.open.last_mut() {
            Some(top) => &mut top.children,
            None => &mut self.root,
        }
    }
}
