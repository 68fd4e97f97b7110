// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change notification for observable state.

use crate::helpers::lock;
use debug_ignore::DebugIgnore;
use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifies a subscription, for use with `unsubscribe`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription-{}", self.0)
    }
}

/// A list of callbacks invoked on every event.
///
/// Callbacks are invoked outside the internal lock, so a callback may subscribe or unsubscribe
/// (including itself) without deadlocking. Subscriptions stay active until explicitly removed.
#[derive(Debug)]
pub(crate) struct Observers<E> {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionId, DebugIgnore<Callback<E>>)>>,
}

impl<E> Observers<E> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.callbacks).push((id, DebugIgnore(Arc::new(callback))));
        id
    }

    /// Returns true if the subscription was active.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = lock(&self.callbacks);
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub(crate) fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = lock(&self.callbacks)
            .iter()
            .map(|(_, callback)| callback.0.clone())
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.callbacks).len()
    }
}
