//! Coordinators that tie evaluation, guarded mutations, and query state to
//! the external collaborators.

mod accounts;
mod sessions;

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use serde::Serialize;
use tokio::{runtime::Handle, sync::broadcast, time::Duration};
use tracing::warn;

use crate::{
    driver::QueryDriver,
    guard::ActionClass,
    query::{LoadRequest, DEFAULT_DEBOUNCE, DEFAULT_PAGE_SIZE},
};

pub use accounts::AccountRoster;
pub use sessions::{build_view, BoardView, SessionBoard, SessionCounts, SessionRow};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSettings {
    pub page_size: u32,
    pub debounce: Duration,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListingEvent {
    Loaded {
        seq: u64,
        item_count: usize,
    },
    LoadFailed {
        seq: u64,
        message: String,
    },
    StaleDiscarded {
        seq: u64,
        latest: u64,
    },
    MutationSettled {
        action: ActionClass,
        entity_id: i64,
        succeeded: bool,
    },
}

/// Result of a guarded mutation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied { message: String },
    /// The same action was already in flight for this entity; nothing was sent.
    Rejected,
}

/// Tracks which issued load was the last to settle.
struct LoadTracker {
    settled: AtomicU64,
    events: broadcast::Sender<ListingEvent>,
}

impl LoadTracker {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settled: AtomicU64::new(0),
            events,
        }
    }

    fn loading(&self, query: &QueryDriver) -> bool {
        query.last_issued_seq() > self.settled.load(Ordering::SeqCst)
    }

    fn settle(&self, seq: u64) {
        self.settled.fetch_max(seq, Ordering::SeqCst);
    }

    fn publish(&self, event: ListingEvent) {
        let _ = self.events.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<ListingEvent> {
        self.events.subscribe()
    }
}

/// Routes every reload the driver emits to `load` on a spawned task.
fn wire_driver<T, F, Fut>(query: &QueryDriver, target: Weak<T>, load: F)
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, LoadRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    query.on_load(move |request| {
        let Some(target) = target.upgrade() else {
            return;
        };
        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(load(target, request));
            }
            Err(_) => warn!(seq = request.seq, "no tokio runtime; dropping reload"),
        }
    });
}
