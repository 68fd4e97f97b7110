// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture collections and an in-memory test framework for suitetree's integration tests.

pub mod framework;
pub mod models;
pub mod registry;
