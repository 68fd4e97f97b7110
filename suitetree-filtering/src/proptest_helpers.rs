// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{FilterExpr, Filterset, NameMatcher, NodeQuery};
use proptest::{collection::btree_set, prelude::*};
use smol_str::SmolStr;
use std::{collections::BTreeSet, sync::Arc};

// Identifiers, names and categories are drawn from tiny alphabets so that generated filters
// actually match generated nodes some of the time.

fn small_string() -> impl Strategy<Value = String> {
    "[a-d]{1,2}"
}

impl NameMatcher {
    #[doc(hidden)]
    pub fn strategy() -> impl Strategy<Value = Self> {
        prop_oneof![
            small_string().prop_map(Self::Equal),
            small_string().prop_map(Self::Contains),
            prop::sample::select(vec!["^a", "b$", "c+", "^(a|d)b"]).prop_map(|pattern| {
                Self::Regex(regex::Regex::new(pattern).expect("hardcoded regex is valid"))
            }),
        ]
    }
}

impl FilterExpr {
    #[doc(hidden)]
    pub fn strategy() -> impl Strategy<Value = Self> {
        let leaf = prop_oneof![
            1 => Just(Self::All),
            3 => small_string().prop_map(|id| Self::Id(id.into())),
            2 => NameMatcher::strategy().prop_map(Self::Name),
            2 => small_string().prop_map(|category| Self::Category(category.into())),
        ];

        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone().prop_map(Arc::new), 1..4)
                    .prop_map(Self::And),
                prop::collection::vec(inner.clone().prop_map(Arc::new), 1..4)
                    .prop_map(Self::Or),
                inner.prop_map(|child| Self::Not(Arc::new(child))),
            ]
        })
    }
}

impl Filterset {
    #[doc(hidden)]
    pub fn strategy() -> impl Strategy<Value = Self> {
        FilterExpr::strategy().prop_map(|expr| Self::from_arc(Arc::new(expr)))
    }
}

/// An owned node description that can be turned into a [`NodeQuery`].
#[derive(Clone, Debug)]
#[doc(hidden)]
pub struct ArbitraryNode {
    pub id: String,
    pub name: String,
    pub categories: BTreeSet<SmolStr>,
}

impl ArbitraryNode {
    pub fn as_query(&self) -> NodeQuery<'_> {
        NodeQuery::new(&self.id, &self.name).with_categories(&self.categories)
    }
}

impl Arbitrary for ArbitraryNode {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            small_string(),
            "[a-d]{0,4}",
            btree_set(small_string().prop_map(SmolStr::from), 0..3),
        )
            .prop_map(|(id, name, categories)| Self {
                id,
                name,
                categories,
            })
            .boxed()
    }
}
