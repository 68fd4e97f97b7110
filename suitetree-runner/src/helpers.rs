// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, ignoring poisoning.
///
/// All state guarded this way is replaced wholesale, so a panic while the lock was held can't
/// leave it half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns "s" if `count` isn't 1.
pub(crate) fn plural_s(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
