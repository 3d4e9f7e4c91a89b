//! Runs a [`QueryOrchestrator`] against the tokio timer and forwards every
//! reload intent to a registered handler.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::{
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::debug;

use crate::{
    error::StaleResponse,
    query::{DebounceTimer, LoadRequest, PageInfo, QueryOrchestrator, QueryState, Tab},
};

type LoadHandler = Arc<dyn Fn(LoadRequest) + Send + Sync>;

struct DriverState {
    orchestrator: QueryOrchestrator,
    handler: Option<LoadHandler>,
    timer: Option<JoinHandle<()>>,
}

/// Cheaply cloneable handle; clones drive the same orchestrator.
///
/// Setters that arm the debounce timer spawn onto the current tokio runtime
/// and must be called from within one.
#[derive(Clone)]
pub struct QueryDriver {
    inner: Arc<Mutex<DriverState>>,
}

impl QueryDriver {
    pub fn new(orchestrator: QueryOrchestrator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DriverState {
                orchestrator,
                handler: None,
                timer: None,
            })),
        }
    }

    /// Registers the side effect run for every reload. Replaces any previous handler.
    pub fn on_load<F>(&self, handler: F)
    where
        F: Fn(LoadRequest) + Send + Sync + 'static,
    {
        self.lock().handler = Some(Arc::new(handler));
    }

    pub fn state(&self) -> QueryState {
        self.lock().orchestrator.state().clone()
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.lock().orchestrator.total_pages()
    }

    pub fn has_pending_search(&self) -> bool {
        self.lock().orchestrator.pending_timer().is_some()
    }

    pub fn set_search(&self, text: impl Into<String>) {
        let mut guard = self.lock();
        let Some(timer) = guard.orchestrator.set_search(text, Instant::now()) else {
            return;
        };
        if let Some(previous) = guard.timer.take() {
            previous.abort();
        }
        guard.timer = Some(self.arm(timer));
    }

    pub fn set_status_filter(&self, filter: Option<String>) -> Option<LoadRequest> {
        self.apply(|orchestrator| orchestrator.set_status_filter(filter))
    }

    pub fn set_tab(&self, tab: Tab) -> Option<LoadRequest> {
        self.apply(|orchestrator| orchestrator.set_tab(tab))
    }

    pub fn set_page(&self, page: u32) -> Option<LoadRequest> {
        self.apply(|orchestrator| orchestrator.set_page(page))
    }

    pub fn set_page_size(&self, page_size: u32) -> Option<LoadRequest> {
        self.apply(|orchestrator| orchestrator.set_page_size(page_size))
    }

    pub fn reload(&self) -> LoadRequest {
        let mut guard = self.lock();
        let request = guard.orchestrator.reload();
        let handler = guard.handler.clone();
        drop(guard);
        dispatch(handler, request.clone());
        request
    }

    /// Issues a reload without invoking the handler; the caller performs it.
    pub fn issue_reload(&self) -> LoadRequest {
        self.lock().orchestrator.reload()
    }

    pub fn last_issued_seq(&self) -> u64 {
        self.lock().orchestrator.last_issued_seq()
    }

    pub fn accept_response(&self, seq: u64, info: PageInfo) -> Result<(), StaleResponse> {
        self.lock().orchestrator.accept_response(seq, info)
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        self.last_issued_seq() == seq
    }

    fn apply<F>(&self, update: F) -> Option<LoadRequest>
    where
        F: FnOnce(&mut QueryOrchestrator) -> Option<LoadRequest>,
    {
        let mut guard = self.lock();
        let request = update(&mut guard.orchestrator)?;
        if guard.orchestrator.pending_timer().is_none() {
            if let Some(timer) = guard.timer.take() {
                timer.abort();
            }
        }
        let handler = guard.handler.clone();
        drop(guard);
        dispatch(handler, request.clone());
        Some(request)
    }

    fn arm(&self, timer: DebounceTimer) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            sleep_until(timer.deadline).await;
            fire(&inner, timer.token);
        })
    }

    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn fire(inner: &Weak<Mutex<DriverState>>, token: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(request) = guard.orchestrator.fire_debounce(token) else {
        return;
    };
    // This task is the armed timer; dropping its own handle does not abort it.
    guard.timer = None;
    let handler = guard.handler.clone();
    drop(guard);
    debug!(seq = request.seq, search = %request.query.search, "debounced search fired");
    dispatch(handler, request);
}

fn dispatch(handler: Option<LoadHandler>, request: LoadRequest) {
    match handler {
        Some(handler) => handler(request),
        None => debug!(seq = request.seq, "no load handler registered; dropping reload"),
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
