// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use color_eyre::eyre::{OptionExt, Result};
use fixture_data::{framework::FixtureFramework, registry::FixtureRegistry};
use std::sync::Once;
use suitetree_runner::{
    config::SuitetreeProfile, coordinator::RunCoordinator, node::NodeRef,
};

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Ignore the error if another test binary in the same process installed a hook.
        let _ = color_eyre::install();
    });
}

pub(crate) fn coordinator(framework: FixtureFramework) -> RunCoordinator<FixtureFramework> {
    coordinator_with_profile(framework, SuitetreeProfile::default())
}

pub(crate) fn coordinator_with_profile(
    framework: FixtureFramework,
    profile: SuitetreeProfile,
) -> RunCoordinator<FixtureFramework> {
    test_init();
    RunCoordinator::new(framework, profile)
}

pub(crate) fn standard_framework() -> FixtureFramework {
    FixtureFramework::new(FixtureRegistry::with_standard_collections())
}

/// Loads `collection` and every level of children below its root.
pub(crate) async fn load_all(
    coordinator: &RunCoordinator<FixtureFramework>,
    collection: &str,
) -> Result<NodeRef> {
    let root = coordinator
        .load_collection(&collection.to_owned())?
        .ok_or_eyre("coordinator was busy loading the collection")?;

    let mut pending = vec![root.clone()];
    while let Some(node) = pending.pop() {
        let children = coordinator
            .load_children(&node)
            .await
            .ok_or_eyre("coordinator was busy loading children")?;
        pending.extend(children);
    }
    Ok(root)
}

pub(crate) fn find(root: &NodeRef, id: &str) -> Result<NodeRef> {
    root.descendants()
        .into_iter()
        .find(|node| node.id() == id)
        .ok_or_else(|| color_eyre::eyre::eyre!("node `{id}` not found under `{}`", root.id()))
}
