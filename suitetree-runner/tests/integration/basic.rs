// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use fixture_data::{
    framework::FixtureFramework,
    models::FixtureOutcome,
    registry::{
        CALC_ADD, CALC_ADVANCED, CALC_DIVIDE, CALC_ROOT, CALC_SUBTRACT, CALC_TESTS,
        FixtureRegistry, MIXED_TESTS, calc_tests,
    },
};
use pretty_assertions::assert_eq;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use suitetree_filtering::{FilterBuilder, Filterset};
use suitetree_runner::{
    config::SuitetreeProfile,
    coordinator::{RunOutcome, SkipReason},
    errors::ExecuteError,
    presentation::aggregate_status,
    result::{ResultCounts, TestResult, TestStatus},
};

#[tokio::test]
async fn run_everything_passes() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;

    let outcome = coordinator.run(None, None).await;
    let summary = outcome.summary().expect("run completed");
    assert_eq!(summary.filter, Filterset::id(CALC_ROOT));
    assert_eq!(
        summary.counts,
        ResultCounts {
            passed: 3,
            ..Default::default()
        }
    );

    for id in [CALC_ADD, CALC_SUBTRACT, CALC_DIVIDE] {
        assert_eq!(find(&root, id)?.status_text(), "Passed", "for {id}");
    }
    // Suites are reported as anonymous rollups, so they get no direct result.
    for suite in [root.clone(), find(&root, CALC_ADVANCED)?] {
        assert!(suite.last_result().is_none(), "for {}", suite.id());
        assert_eq!(suite.status_text(), "Not Executed");
        assert_eq!(aggregate_status(&suite), TestStatus::Passed);
    }
    assert_eq!(coordinator.framework().execute_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn filtered_run_keeps_other_results() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;
    coordinator.run(None, None).await;

    let add = find(&root, CALC_ADD)?;
    add.set_result(Some(Arc::new(TestResult::leaf(CALC_ADD, TestStatus::Failed))));
    let subtract = find(&root, CALC_SUBTRACT)?;
    subtract.set_result(None);

    let outcome = coordinator
        .run(None, Some(Filterset::id(CALC_SUBTRACT)))
        .await;
    let summary = outcome.summary().expect("run completed");
    assert_eq!(summary.counts.total(), 1);

    assert_eq!(add.status(), TestStatus::Failed, "Add keeps its prior result");
    assert_eq!(subtract.status(), TestStatus::Passed, "Subtract was rerun");
    assert_eq!(find(&root, CALC_DIVIDE)?.status(), TestStatus::Passed);
    assert_eq!(coordinator.framework().execute_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn run_from_subtree() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;
    let advanced = find(&root, CALC_ADVANCED)?;

    let outcome = coordinator.run(Some(&advanced), None).await;
    let summary = outcome.summary().expect("run completed");
    assert_eq!(summary.node_id, CALC_ADVANCED);
    assert_eq!(summary.filter, Filterset::id(CALC_ADVANCED));
    // Only the subtree is reconciled: Advanced and Divide.
    assert_eq!(summary.reconciled.matched + summary.reconciled.unmatched, 2);

    assert_eq!(find(&root, CALC_DIVIDE)?.status(), TestStatus::Passed);
    assert_eq!(find(&root, CALC_ADD)?.status(), TestStatus::NotExecuted);
    Ok(())
}

#[tokio::test]
async fn built_filter_selects_by_category() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;

    let filter = FilterBuilder::new()
        .push_not()?
        .add_category("slow")?
        .pop()?
        .build()?;
    let outcome = coordinator.run(None, Some(filter)).await;
    ensure!(outcome.summary().is_some(), "run completed: {outcome:?}");

    assert_eq!(find(&root, CALC_ADD)?.status(), TestStatus::Passed);
    assert_eq!(find(&root, CALC_SUBTRACT)?.status(), TestStatus::Passed);
    assert_eq!(find(&root, CALC_DIVIDE)?.status(), TestStatus::NotExecuted);
    Ok(())
}

#[tokio::test]
async fn suite_id_with_exclusion() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;

    let filter = Filterset::id(CALC_ROOT).and(&Filterset::category("slow").not());
    let outcome = coordinator.run(None, Some(filter)).await;
    let summary = outcome.summary().expect("run completed");
    assert_eq!(summary.counts.passed, 2);

    assert_eq!(find(&root, CALC_ADD)?.status(), TestStatus::Passed);
    assert_eq!(find(&root, CALC_DIVIDE)?.status(), TestStatus::NotExecuted);
    Ok(())
}

#[tokio::test]
async fn default_filter_from_profile() -> Result<()> {
    let profile =
        SuitetreeProfile::default().with_default_filter(Some(Filterset::category("slow")));
    let coordinator = coordinator_with_profile(standard_framework(), profile);
    let root = load_all(&coordinator, CALC_TESTS).await?;
    assert_eq!(root.filter(), Some(Filterset::category("slow")));

    coordinator.run(None, None).await;
    assert_eq!(find(&root, CALC_DIVIDE)?.status(), TestStatus::Passed);
    assert_eq!(find(&root, CALC_ADD)?.status(), TestStatus::NotExecuted);
    Ok(())
}

#[tokio::test]
async fn requests_while_busy_are_dropped() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;
    let add = find(&root, CALC_ADD)?;
    let advanced = find(&root, CALC_ADVANCED)?;
    let advanced_children = advanced.children();

    let gate = coordinator.framework().arm_gate();
    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run(None, None).await })
    };
    {
        let gate = gate.clone();
        tokio::task::spawn_blocking(move || gate.wait_entered()).await?;
    }
    assert!(coordinator.is_busy());
    assert!(coordinator.is_executing());

    let second = coordinator.run(None, None).await;
    assert_eq!(second.skip_reason(), Some(SkipReason::Busy));
    assert!(coordinator.load_children(&advanced).await.is_none());
    assert!(
        coordinator.load_collection(&CALC_TESTS.to_owned())?.is_none(),
        "collection load is dropped too"
    );

    // Nothing changed while the first run was in flight.
    assert_eq!(add.status(), TestStatus::NotExecuted);
    assert!(Arc::ptr_eq(&advanced.children()[0], &advanced_children[0]));
    assert!(Arc::ptr_eq(
        &coordinator.root().expect("collection loaded"),
        &root
    ));

    gate.release();
    let first = first.await?;
    ensure!(first.summary().is_some(), "first run completed: {first:?}");
    assert_eq!(coordinator.framework().execute_calls(), 1);
    assert_eq!(add.status(), TestStatus::Passed);
    assert!(!coordinator.is_busy());
    assert!(!coordinator.is_executing());
    Ok(())
}

#[tokio::test]
async fn cancelled_run_blocks_until_engine_returns() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;
    let advanced = find(&root, CALC_ADVANCED)?;

    let gate = coordinator.framework().arm_gate();
    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run(None, None).await })
    };
    {
        let gate = gate.clone();
        tokio::task::spawn_blocking(move || gate.wait_entered()).await?;
    }

    first.abort();
    let error = first.await.expect_err("run was aborted");
    ensure!(error.is_cancelled(), "run was cancelled: {error}");

    // The busy gate went with the dropped future, but the engine is still held at the gate.
    assert!(!coordinator.is_busy());
    assert!(coordinator.is_executing());
    let second = coordinator.run(None, None).await;
    assert_eq!(second.skip_reason(), Some(SkipReason::Executing));
    assert!(coordinator.load_children(&advanced).await.is_none());
    assert_eq!(coordinator.framework().execute_calls(), 1);

    gate.release();
    let started = Instant::now();
    while coordinator.is_executing() {
        ensure!(
            started.elapsed() < Duration::from_secs(10),
            "engine didn't return after the gate was released"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let third = coordinator.run(None, None).await;
    ensure!(third.summary().is_some(), "run completed: {third:?}");
    assert_eq!(coordinator.framework().execute_calls(), 2);
    assert_eq!(find(&root, CALC_ADD)?.status(), TestStatus::Passed);
    Ok(())
}

#[tokio::test]
async fn fault_leaves_results_untouched() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, CALC_TESTS).await?;
    coordinator.run(None, None).await;
    assert!(coordinator.last_result().is_some());

    coordinator.framework().set_fault(true);
    let outcome = coordinator.run(None, None).await;
    assert!(
        matches!(outcome, RunOutcome::Faulted(ExecuteError::Fault { .. })),
        "unexpected outcome: {outcome:?}"
    );
    assert!(!coordinator.is_busy(), "gate released after a fault");
    assert!(coordinator.last_result().is_none());
    for id in [CALC_ADD, CALC_SUBTRACT, CALC_DIVIDE] {
        assert_eq!(find(&root, id)?.status(), TestStatus::Passed, "for {id}");
    }

    coordinator.framework().set_fault(false);
    let outcome = coordinator.run(None, None).await;
    ensure!(outcome.summary().is_some(), "coordinator recovers: {outcome:?}");
    Ok(())
}

#[tokio::test]
async fn failures_are_results() -> Result<()> {
    let coordinator = coordinator(standard_framework());
    let root = load_all(&coordinator, MIXED_TESTS).await?;

    // The malformed entry is skipped; the empty suite loads as a leaf.
    let ids: Vec<_> = root.children().iter().map(|node| node.id().to_owned()).collect();
    assert_eq!(
        ids,
        [
            "Mixed.Pass",
            "Mixed.Fail",
            "Mixed.Skip",
            "Mixed.Inconclusive",
            "Mixed.Error",
            "Mixed.Empty",
        ]
    );
    let empty = find(&root, "Mixed.Empty")?;
    assert!(!empty.is_suite());

    let outcome = coordinator.run(None, None).await;
    let summary = outcome.summary().expect("run completed");
    assert_eq!(
        summary.counts,
        ResultCounts {
            passed: 1,
            failed: 1,
            skipped: 1,
            inconclusive: 1,
            errors: 1,
            not_executed: 0,
        }
    );
    assert!(!coordinator.is_busy());

    let fail = find(&root, "Mixed.Fail")?;
    assert_eq!(fail.status_text(), "Failed");
    assert_eq!(
        fail.last_result().and_then(|result| result.message.clone()).as_deref(),
        Some("expected 4, got 5")
    );
    assert_eq!(find(&root, "Mixed.Error")?.status_text(), "Error");
    assert_eq!(empty.status_text(), "Not Executed");
    assert_eq!(aggregate_status(&root), TestStatus::Error);
    Ok(())
}

#[tokio::test]
async fn identified_suites_receive_results() -> Result<()> {
    let mut registry = FixtureRegistry::new();
    registry.register(
        CALC_TESTS,
        calc_tests(FixtureOutcome::Fail {
            message: "off by one",
        }),
    );
    let coordinator = coordinator(FixtureFramework::new(registry).with_suite_ids());
    let root = load_all(&coordinator, CALC_TESTS).await?;

    let outcome = coordinator.run(None, None).await;
    let summary = outcome.summary().expect("run completed");
    assert_eq!(summary.reconciled.matched, 5);
    assert_eq!(summary.reconciled.visited, 5);
    assert_eq!(root.status_text(), "Failed");
    assert_eq!(find(&root, CALC_ADVANCED)?.status_text(), "Failed");
    Ok(())
}

#[tokio::test]
async fn unknown_collection() {
    let coordinator = coordinator(standard_framework());
    let error = coordinator
        .load_collection(&"missing".to_owned())
        .expect_err("collection isn't registered");
    assert_eq!(error.collection(), "missing");
    assert!(coordinator.root().is_none());
    assert!(!coordinator.is_busy());

    let outcome = coordinator.run(None, None).await;
    assert_eq!(outcome.skip_reason(), Some(SkipReason::NoCollection));
}
