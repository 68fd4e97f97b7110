// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for suitetree.
//!
//! suitetree maintains a persistent, observable tree of discovered tests, runs filtered parts of
//! it through a [`TestFramework`](framework::TestFramework), and writes the results back onto
//! the tree by id.
//!
//! The main entry point is [`RunCoordinator`](coordinator::RunCoordinator).

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod framework;
mod helpers;
pub mod node;
pub mod observe;
pub mod output;
pub mod presentation;
pub mod reconcile;
pub mod result;
