// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{CompositePosition, FilterBuildError};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use smol_str::SmolStr;
use std::{collections::BTreeSet, fmt, sync::Arc};

static NO_CATEGORIES: BTreeSet<SmolStr> = BTreeSet::new();

/// Matcher for test names.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    /// Exact value
    Equal(String),
    /// Simple contains test
    Contains(String),
    /// Test against a regex
    Regex(regex::Regex),
}

impl NameMatcher {
    /// Creates a regex matcher, returning an error if `pattern` isn't a valid regex.
    pub fn regex(pattern: &str) -> Result<Self, FilterBuildError> {
        if pattern.is_empty() {
            return Err(FilterBuildError::invalid_argument(
                "pattern",
                pattern,
                "must not be empty",
            ));
        }
        regex::Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|err| FilterBuildError::invalid_argument("pattern", pattern, err.to_string()))
    }

    /// Returns true if `input` is accepted by this matcher.
    pub fn is_match(&self, input: &str) -> bool {
        match self {
            Self::Equal(text) => text == input,
            Self::Contains(text) => input.contains(text.as_str()),
            Self::Regex(reg) => reg.is_match(input),
        }
    }

    pub(crate) fn text(&self) -> &str {
        match self {
            Self::Equal(text) | Self::Contains(text) => text,
            Self::Regex(reg) => reg.as_str(),
        }
    }
}

impl PartialEq for NameMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Contains(s1), Self::Contains(s2)) => s1 == s2,
            (Self::Equal(s1), Self::Equal(s2)) => s1 == s2,
            (Self::Regex(r1), Self::Regex(r2)) => r1.as_str() == r2.as_str(),
            _ => false,
        }
    }
}

impl Eq for NameMatcher {}

impl fmt::Display for NameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal(text) => write!(f, "={text}"),
            Self::Contains(text) => write!(f, "~{text}"),
            Self::Regex(reg) => write!(f, "/{}/", reg.as_str()),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum NameMatcherRepr {
    Equal(String),
    Contains(String),
    Regex(String),
}

impl Serialize for NameMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Self::Equal(text) => NameMatcherRepr::Equal(text.clone()),
            Self::Contains(text) => NameMatcherRepr::Contains(text.clone()),
            Self::Regex(reg) => NameMatcherRepr::Regex(reg.as_str().to_owned()),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NameMatcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NameMatcherRepr::deserialize(deserializer)? {
            NameMatcherRepr::Equal(text) => Ok(Self::Equal(text)),
            NameMatcherRepr::Contains(text) => Ok(Self::Contains(text)),
            NameMatcherRepr::Regex(pattern) => Self::regex(&pattern).map_err(D::Error::custom),
        }
    }
}

/// The kind of a composite filter node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CompositeKind {
    /// All children must match.
    And,
    /// At least one child must match.
    Or,
    /// Inverts its single child.
    Not,
}

impl fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
        }
    }
}

/// A query passed into [`Filterset::matches`].
///
/// Describes the identity and metadata of a single node in the test tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NodeQuery<'a> {
    /// The stable identifier assigned by the test framework.
    pub id: &'a str,

    /// The display name of the node.
    pub name: &'a str,

    /// The categories the node belongs to.
    pub categories: &'a BTreeSet<SmolStr>,
}

impl<'a> NodeQuery<'a> {
    /// Creates a query for a node that doesn't belong to any categories.
    pub fn new(id: &'a str, name: &'a str) -> Self {
        Self {
            id,
            name,
            categories: &NO_CATEGORIES,
        }
    }

    /// Sets the categories for this query.
    pub fn with_categories(mut self, categories: &'a BTreeSet<SmolStr>) -> Self {
        self.categories = categories;
        self
    }
}

/// A filter expression tree.
///
/// Children of composite nodes are reference-counted, so combining expressions never copies
/// the operands. Most callers should use [`Filterset`], which guarantees the tree is
/// well-formed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterExpr {
    /// Matches every node.
    All,
    /// Matches the node with this identifier.
    Id(SmolStr),
    /// Matches nodes whose name is accepted by the matcher.
    Name(NameMatcher),
    /// Matches nodes in this category.
    Category(SmolStr),
    /// Matches nodes accepted by every child.
    And(Vec<Arc<FilterExpr>>),
    /// Matches nodes accepted by any child.
    Or(Vec<Arc<FilterExpr>>),
    /// Matches nodes not accepted by the child.
    Not(Arc<FilterExpr>),
}

impl FilterExpr {
    /// Returns true if the given node is accepted by this expression.
    pub fn matches(&self, query: &NodeQuery<'_>) -> bool {
        match self {
            Self::All => true,
            Self::Id(id) => query.id == id.as_str(),
            Self::Name(matcher) => matcher.is_match(query.name),
            Self::Category(category) => query.categories.contains(category),
            Self::And(children) => children.iter().all(|child| child.matches(query)),
            Self::Or(children) => children.iter().any(|child| child.matches(query)),
            Self::Not(child) => !child.matches(query),
        }
    }

    /// Checks that every leaf carries a value and every composite has children.
    pub fn validate(&self) -> Result<(), FilterBuildError> {
        self.validate_at(&CompositePosition::root(), 0)
    }

    fn validate_at(&self, parent: &CompositePosition, index: usize) -> Result<(), FilterBuildError> {
        match self {
            Self::All => Ok(()),
            Self::Id(id) => check_leaf("id", id),
            Self::Name(matcher) => check_leaf("name", matcher.text()),
            Self::Category(category) => check_leaf("category", category),
            Self::And(children) | Self::Or(children) => {
                let kind = if matches!(self, Self::And(_)) {
                    CompositeKind::And
                } else {
                    CompositeKind::Or
                };
                let position = parent.child(kind, index);
                if children.is_empty() {
                    return Err(FilterBuildError::EmptyComposite { kind, position });
                }
                children
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, child)| child.validate_at(&position, index))
            }
            Self::Not(child) => child.validate_at(&parent.child(CompositeKind::Not, index), 0),
        }
    }

    /// Returns the composite kind, or `None` for leaves.
    pub fn composite_kind(&self) -> Option<CompositeKind> {
        match self {
            Self::And(_) => Some(CompositeKind::And),
            Self::Or(_) => Some(CompositeKind::Or),
            Self::Not(_) => Some(CompositeKind::Not),
            Self::All | Self::Id(_) | Self::Name(_) | Self::Category(_) => None,
        }
    }
}

fn check_leaf(param: &'static str, value: &str) -> Result<(), FilterBuildError> {
    if value.is_empty() {
        Err(FilterBuildError::invalid_argument(
            param,
            value,
            "must not be empty",
        ))
    } else {
        Ok(())
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(
            f: &mut fmt::Formatter<'_>,
            children: &[Arc<FilterExpr>],
            op: &str,
        ) -> fmt::Result {
            write!(f, "(")?;
            for (index, child) in children.iter().enumerate() {
                if index > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")
        }

        match self {
            Self::All => write!(f, "all()"),
            Self::Id(id) => write!(f, "id({id})"),
            Self::Name(matcher) => write!(f, "name({matcher})"),
            Self::Category(category) => write!(f, "category({category})"),
            Self::And(children) => join(f, children, "&"),
            Self::Or(children) => join(f, children, "|"),
            Self::Not(child) => write!(f, "not {child}"),
        }
    }
}

/// A well-formed, immutable filter expression.
///
/// Cloning a `Filterset` is cheap, and [`and`](Self::and), [`or`](Self::or) and
/// [`not`](Self::not) wrap their operands without traversing them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filterset {
    expr: Arc<FilterExpr>,
}

impl Filterset {
    /// Returns a filterset that matches every node.
    pub fn all() -> Self {
        Self::from_arc(Arc::new(FilterExpr::All))
    }

    /// Returns a filterset matching the node with this identifier.
    ///
    /// The identifier isn't validated: use [`FilterBuilder`](crate::FilterBuilder) for input
    /// that hasn't been checked yet.
    pub fn id(id: impl Into<SmolStr>) -> Self {
        Self::from_arc(Arc::new(FilterExpr::Id(id.into())))
    }

    /// Returns a filterset matching nodes by name.
    pub fn name(matcher: NameMatcher) -> Self {
        Self::from_arc(Arc::new(FilterExpr::Name(matcher)))
    }

    /// Returns a filterset matching nodes in a category.
    pub fn category(category: impl Into<SmolStr>) -> Self {
        Self::from_arc(Arc::new(FilterExpr::Category(category.into())))
    }

    /// Validates an expression tree and wraps it.
    pub fn from_expr(expr: FilterExpr) -> Result<Self, FilterBuildError> {
        expr.validate()?;
        Ok(Self::from_arc(Arc::new(expr)))
    }

    pub(crate) fn from_arc(expr: Arc<FilterExpr>) -> Self {
        Self { expr }
    }

    pub(crate) fn shared_expr(&self) -> Arc<FilterExpr> {
        self.expr.clone()
    }

    /// Returns a filterset accepting nodes accepted by both `self` and `other`.
    pub fn and(&self, other: &Filterset) -> Filterset {
        Self::from_arc(Arc::new(FilterExpr::And(vec![
            self.shared_expr(),
            other.shared_expr(),
        ])))
    }

    /// Returns a filterset accepting nodes accepted by either `self` or `other`.
    pub fn or(&self, other: &Filterset) -> Filterset {
        Self::from_arc(Arc::new(FilterExpr::Or(vec![
            self.shared_expr(),
            other.shared_expr(),
        ])))
    }

    /// Returns a filterset accepting exactly the nodes `self` rejects.
    pub fn not(&self) -> Filterset {
        Self::from_arc(Arc::new(FilterExpr::Not(self.shared_expr())))
    }

    /// Returns true if the given node is accepted by this filterset.
    pub fn matches(&self, query: &NodeQuery<'_>) -> bool {
        self.expr.matches(query)
    }

    /// Returns true if this is the match-everything filterset.
    pub fn is_all(&self) -> bool {
        matches!(*self.expr, FilterExpr::All)
    }

    /// Returns the underlying expression.
    pub fn expr(&self) -> &FilterExpr {
        &self.expr
    }
}

impl Default for Filterset {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for Filterset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.expr, f)
    }
}

impl Serialize for Filterset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.expr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filterset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expr = FilterExpr::deserialize(deserializer)?;
        Self::from_expr(expr).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proptest_helpers::ArbitraryNode;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[proptest]
    fn and_is_conjunction(
        #[strategy(Filterset::strategy())] f: Filterset,
        #[strategy(Filterset::strategy())] g: Filterset,
        node: ArbitraryNode,
    ) {
        let query = node.as_query();
        prop_assert_eq!(
            f.and(&g).matches(&query),
            f.matches(&query) && g.matches(&query)
        );
    }

    #[proptest]
    fn or_is_disjunction(
        #[strategy(Filterset::strategy())] f: Filterset,
        #[strategy(Filterset::strategy())] g: Filterset,
        node: ArbitraryNode,
    ) {
        let query = node.as_query();
        prop_assert_eq!(
            f.or(&g).matches(&query),
            f.matches(&query) || g.matches(&query)
        );
    }

    #[proptest]
    fn not_is_negation(#[strategy(Filterset::strategy())] f: Filterset, node: ArbitraryNode) {
        let query = node.as_query();
        prop_assert_eq!(f.not().matches(&query), !f.matches(&query));
    }

    #[test]
    fn combining_shares_operands() {
        let big = Filterset::id("a").or(&Filterset::category("slow"));
        let combined = big.and(&Filterset::id("b"));
        let FilterExpr::And(children) = combined.expr() else {
            panic!("expected an and expression, found {combined}");
        };
        assert!(Arc::ptr_eq(&children[0], &big.shared_expr()));
    }

    #[test]
    fn no_categories_is_an_empty_set() {
        let query = NodeQuery::new("a", "test_a");
        assert!(!Filterset::category("slow").matches(&query));
        assert!(Filterset::category("slow").not().matches(&query));
        assert!(Filterset::all().matches(&query));
    }

    #[test_case(Filterset::all(), "all()" ; "all")]
    #[test_case(
        Filterset::id("A").or(&Filterset::category("slow")),
        "(id(A) | category(slow))"
        ; "or of leaves"
    )]
    #[test_case(
        Filterset::name(NameMatcher::Contains("parse".to_owned())).and(&Filterset::id("B").not()),
        "(name(~parse) & not id(B))"
        ; "and with not"
    )]
    fn display(filterset: Filterset, expected: &str) {
        assert_eq!(filterset.to_string(), expected);
    }

    #[test]
    fn deserialize_filterset() {
        let filterset: Filterset = serde_json::from_str(
            r#"{ "or": [{ "id": "A" }, { "not": { "name": { "regex": "^slow_" } } }] }"#,
        )
        .expect("filterset is valid");
        assert_eq!(
            filterset.to_string(),
            "(id(A) | not name(/^slow_/))",
            "deserialized structure matches"
        );

        let serialized = serde_json::to_string(&filterset).expect("serialization succeeds");
        let reparsed: Filterset = serde_json::from_str(&serialized).expect("reparse succeeds");
        assert_eq!(filterset, reparsed);
    }

    #[test_case(r#"{ "or": [] }"#, "`or` composite at root/or[0] has no children" ; "empty or")]
    #[test_case(
        r#"{ "and": [{ "id": "A" }, { "not": { "or": [] } }] }"#,
        "`or` composite at root/and[0]/not[1]/or[0] has no children"
        ; "nested empty or"
    )]
    #[test_case(r#"{ "category": "" }"#, "invalid value for `category`" ; "empty category")]
    #[test_case(r#"{ "name": { "regex": "(" } }"#, "invalid value for `pattern`" ; "invalid regex")]
    fn deserialize_invalid(input: &str, expected: &str) {
        let error = serde_json::from_str::<Filterset>(input)
            .expect_err("filterset should fail validation");
        assert!(
            error.to_string().contains(expected),
            "error {error} contains {expected:?}"
        );
    }
}
