// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{OptionExt, Result, ensure};
use fixture_data::registry::{CALC_ADD, CALC_ADVANCED, CALC_SUBTRACT, CALC_TESTS};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use suitetree_filtering::Filterset;
use suitetree_runner::{
    config::SuitetreeProfile, coordinator::SkipReason, presentation::TestTreeView,
    result::TestStatus,
};
use tokio::runtime::Handle;

fn item_texts(view: &TestTreeView<fixture_data::framework::FixtureFramework>) -> Vec<String> {
    view.items().iter().map(|item| item.status_text()).collect()
}

#[tokio::test]
async fn load_and_run_update_items() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = coordinator
        .load_collection(&CALC_TESTS.to_owned())?
        .ok_or_eyre("coordinator is idle")?;
    let view = TestTreeView::new(coordinator, Handle::current());

    ensure!(view.trigger_load(root.clone()).await?, "load was accepted");
    assert!(Arc::ptr_eq(&view.current().ok_or_eyre("current node set")?, &root));
    let ids: Vec<_> = view
        .items()
        .iter()
        .map(|item| item.node().id().to_owned())
        .collect();
    assert_eq!(ids, [CALC_ADD, CALC_SUBTRACT, CALC_ADVANCED]);
    assert_eq!(item_texts(&view), ["Not Executed"; 3]);

    let outcome = view.trigger_run(None, None).await?;
    ensure!(outcome.summary().is_some(), "run completed: {outcome:?}");
    // Advanced's children weren't loaded, and suites get no direct result.
    assert_eq!(item_texts(&view), ["Passed", "Passed", "Not Executed"]);
    Ok(())
}

#[tokio::test]
async fn reset_before_run_clears_selected_items() -> Result<()> {
    let profile = SuitetreeProfile::default().with_reset_before_run(true);
    let coordinator = coordinator_with_profile(standard_framework(), profile);
    let root = load_all(&coordinator, CALC_TESTS).await?;
    let view = TestTreeView::new(coordinator.clone(), Handle::current());
    ensure!(view.trigger_load(root.clone()).await?, "load was accepted");
    view.trigger_run(None, None).await?;

    // Hold the next run at the gate to observe the cleared state.
    let gate = coordinator.framework().arm_gate();
    let run = view.trigger_run(None, Some(Filterset::id(CALC_ADD)));
    {
        let gate = gate.clone();
        tokio::task::spawn_blocking(move || gate.wait_entered()).await?;
    }
    assert_eq!(item_texts(&view), ["Not Executed", "Passed", "Not Executed"]);
    gate.release();
    run.await?;

    assert_eq!(item_texts(&view), ["Passed", "Passed", "Not Executed"]);
    assert_eq!(find(&root, CALC_SUBTRACT)?.status(), TestStatus::Passed);
    Ok(())
}

#[tokio::test]
async fn dropped_run_keeps_results() -> Result<()> {
    let profile = SuitetreeProfile::default().with_reset_before_run(true);
    let coordinator = coordinator_with_profile(standard_framework(), profile);
    let root = load_all(&coordinator, CALC_TESTS).await?;
    let view = TestTreeView::new(coordinator.clone(), Handle::current());
    ensure!(view.trigger_load(root.clone()).await?, "load was accepted");
    view.trigger_run(None, None).await?;

    let gate = coordinator.framework().arm_gate();
    let first = view.trigger_run(None, Some(Filterset::id(CALC_SUBTRACT)));
    {
        let gate = gate.clone();
        tokio::task::spawn_blocking(move || gate.wait_entered()).await?;
    }

    // Issued while the first run holds the gate: dropped, so Add's result must survive.
    let second = view
        .trigger_run(None, Some(Filterset::id(CALC_ADD)))
        .await?;
    assert_eq!(second.skip_reason(), Some(SkipReason::Busy));
    assert_eq!(item_texts(&view), ["Passed", "Not Executed", "Not Executed"]);
    assert_eq!(find(&root, CALC_ADD)?.status(), TestStatus::Passed);

    gate.release();
    first.await?;
    assert_eq!(item_texts(&view), ["Passed", "Passed", "Not Executed"]);
    assert_eq!(coordinator.framework().execute_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn busy_view_drops_requests() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;
    let view = TestTreeView::new(coordinator.clone(), Handle::current());

    let busy_changes = Arc::new(Mutex::new(Vec::new()));
    let subscription = {
        let busy_changes = busy_changes.clone();
        view.subscribe_busy(move |busy| {
            busy_changes
                .lock()
                .expect("lock isn't poisoned")
                .push(busy)
        })
    };

    let gate = coordinator.framework().arm_gate();
    let first = view.trigger_run(Some(root.clone()), None);
    {
        let gate = gate.clone();
        tokio::task::spawn_blocking(move || gate.wait_entered()).await?;
    }
    assert!(view.is_busy());

    let second = view.trigger_run(None, None).await?;
    assert_eq!(second.skip_reason(), Some(SkipReason::Busy));
    ensure!(!view.trigger_load(root.clone()).await?, "load was dropped");
    assert!(view.current().is_none());

    gate.release();
    first.await?;
    assert!(view.unsubscribe_busy(subscription));
    assert!(!view.is_busy());

    // Dropped requests never enter the gate, so they don't show up as busy changes.
    assert_eq!(
        *busy_changes.lock().expect("lock isn't poisoned"),
        [true, false]
    );
    assert_eq!(coordinator.framework().execute_calls(), 1);
    Ok(())
}
