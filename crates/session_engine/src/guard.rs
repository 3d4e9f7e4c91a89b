//! At-most-one-in-flight bookkeeping for mutating actions.
//!
//! A guard never queues and never blocks on the underlying operation: a second
//! `try_begin` for an entity that is already in flight is refused on the spot.

use std::{
    collections::HashSet,
    fmt,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    Register,
    Enable,
    Disable,
}

impl ActionClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionClass::Register => "register",
            ActionClass::Enable => "enable",
            ActionClass::Disable => "disable",
        }
    }
}

impl fmt::Display for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight markers for one action class. Cloning shares the marker set.
pub struct MutationGuard<K> {
    action: ActionClass,
    in_flight: Arc<Mutex<HashSet<K>>>,
}

impl<K> Clone for MutationGuard<K> {
    fn clone(&self) -> Self {
        Self {
            action: self.action,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<K> MutationGuard<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new(action: ActionClass) -> Self {
        Self {
            action,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn action(&self) -> ActionClass {
        self.action
    }

    /// Marks `key` in flight. Returns `false` without side effects if it already was.
    pub fn try_begin(&self, key: &K) -> bool {
        let inserted = self.markers().insert(key.clone());
        if !inserted {
            debug!(action = %self.action, ?key, "mutation already in flight; rejecting duplicate");
        }
        inserted
    }

    /// Clears the marker for `key`. Safe to call when nothing is in flight.
    pub fn end(&self, key: &K) {
        self.markers().remove(key);
    }

    /// Like [`try_begin`](Self::try_begin) but returns a ticket that ends the
    /// marker when dropped.
    pub fn begin(&self, key: &K) -> Option<InFlightTicket<K>> {
        self.try_begin(key).then(|| InFlightTicket {
            guard: self.clone(),
            key: key.clone(),
        })
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.markers().contains(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.markers().len()
    }

    fn markers(&self) -> MutexGuard<'_, HashSet<K>> {
        // The set is never left half-updated, so a poisoned lock is still usable.
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that a mutation owns the in-flight marker for `key`.
pub struct InFlightTicket<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    guard: MutationGuard<K>,
    key: K,
}

impl<K> InFlightTicket<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> Drop for InFlightTicket<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn drop(&mut self) {
        self.guard.end(&self.key);
    }
}

#[cfg(test)]
#[path = "tests/guard_tests.rs"]
mod tests;
