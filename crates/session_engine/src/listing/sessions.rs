use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{Role, SessionId},
    protocol::{Registration, Session, SessionEntry},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::{wire_driver, ListingEvent, ListingSettings, LoadTracker, MutationOutcome};
use crate::{
    clock::Clock,
    driver::QueryDriver,
    error::ListingError,
    guard::{ActionClass, MutationGuard},
    ports::{RegistrationService, SessionCatalog},
    query::{LoadRequest, PageInfo, QueryOrchestrator, QueryState, Tab},
    status::{evaluate_entry, DisplayState, PhaseGroup},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRow {
    pub session: Session,
    pub registration: Registration,
    pub display: DisplayState,
}

/// Per-group tallies over every session matching search and status filter,
/// independent of the selected tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    pub upcoming: usize,
    pub live: usize,
    pub ended: usize,
    pub cancelled: usize,
}

impl SessionCounts {
    fn record(&mut self, group: PhaseGroup) {
        match group {
            PhaseGroup::Upcoming => self.upcoming += 1,
            PhaseGroup::Live => self.live += 1,
            PhaseGroup::Ended => self.ended += 1,
            PhaseGroup::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.upcoming + self.live + self.ended + self.cancelled
    }

    pub fn for_tab(&self, tab: Tab) -> usize {
        match tab {
            Tab::Upcoming => self.upcoming + self.live,
            Tab::Past => self.ended + self.cancelled,
            Tab::All => self.total(),
        }
    }
}

/// Everything a renderer needs, derived from a single evaluation per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub evaluated_at: DateTime<Utc>,
    pub counts: SessionCounts,
    pub rows: Vec<SessionRow>,
    pub page: u32,
    pub total_pages: u32,
    pub total_rows: usize,
}

pub fn build_view(
    entries: &[SessionEntry],
    role: Role,
    query: &QueryState,
    now: DateTime<Utc>,
) -> BoardView {
    let mut counts = SessionCounts::default();
    let mut rows: Vec<SessionRow> = entries
        .iter()
        .filter(|entry| matches_query(&entry.session, query))
        .map(|entry| {
            let display = evaluate_entry(entry, role, now);
            counts.record(display.phase.group());
            SessionRow {
                session: entry.session.clone(),
                registration: entry.registration,
                display,
            }
        })
        .filter(|row| query.tab.admits(row.display.phase))
        .collect();

    match query.tab {
        Tab::Past => rows.sort_by(|a, b| b.session.scheduled_at.cmp(&a.session.scheduled_at)),
        Tab::Upcoming | Tab::All => {
            rows.sort_by(|a, b| a.session.scheduled_at.cmp(&b.session.scheduled_at))
        }
    }

    let page_size = query.page_size.max(1) as usize;
    let total_rows = rows.len();
    let total_pages = u32::try_from(total_rows.div_ceil(page_size)).unwrap_or(u32::MAX);
    let page = query.page.clamp(1, total_pages.max(1));
    let rows = rows
        .into_iter()
        .skip((page as usize - 1) * page_size)
        .take(page_size)
        .collect();

    BoardView {
        evaluated_at: now,
        counts,
        rows,
        page,
        total_pages,
        total_rows,
    }
}

fn matches_query(session: &Session, query: &QueryState) -> bool {
    if let Some(status) = query.status_filter.as_deref() {
        if !session.backend_status.as_str().eq_ignore_ascii_case(status) {
            return false;
        }
    }
    match query.search_term() {
        Some(term) => session
            .title
            .to_lowercase()
            .contains(&term.to_lowercase()),
        None => true,
    }
}

/// The session listing for one actor: catalog snapshot, query state, and the
/// register action.
pub struct SessionBoard {
    role: Role,
    clock: Arc<dyn Clock>,
    catalog: Arc<dyn SessionCatalog>,
    registrations: Arc<dyn RegistrationService>,
    register_guard: MutationGuard<SessionId>,
    query: QueryDriver,
    entries: Mutex<Vec<SessionEntry>>,
    tracker: LoadTracker,
}

impl SessionBoard {
    pub fn new(
        role: Role,
        clock: Arc<dyn Clock>,
        catalog: Arc<dyn SessionCatalog>,
        registrations: Arc<dyn RegistrationService>,
        settings: ListingSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|board| {
            let query = QueryDriver::new(QueryOrchestrator::new(
                settings.page_size,
                settings.debounce,
            ));
            wire_driver(&query, board.clone(), |board: Arc<Self>, request| async move {
                let _ = board.load(request).await;
            });
            Self {
                role,
                clock,
                catalog,
                registrations,
                register_guard: MutationGuard::new(ActionClass::Register),
                query,
                entries: Mutex::new(Vec::new()),
                tracker: LoadTracker::new(),
            }
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn query_state(&self) -> QueryState {
        self.query.state()
    }

    /// True while the most recently issued reload has not settled.
    pub fn loading(&self) -> bool {
        self.tracker.loading(&self.query)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ListingEvent> {
        self.tracker.subscribe()
    }

    pub fn is_registering(&self, session_id: SessionId) -> bool {
        self.register_guard.is_in_flight(&session_id)
    }

    pub fn set_search(&self, text: impl Into<String>) {
        self.query.set_search(text);
    }

    pub fn set_status_filter(&self, filter: Option<String>) {
        self.query.set_status_filter(filter);
    }

    pub fn set_tab(&self, tab: Tab) {
        self.query.set_tab(tab);
    }

    /// Pagination is disabled while a reload is outstanding. Returns whether
    /// a reload was issued.
    pub fn set_page(&self, page: u32) -> bool {
        if self.loading() {
            debug!(page, "pagination ignored while loading");
            return false;
        }
        self.query.set_page(page).is_some()
    }

    pub fn refresh(&self) {
        self.query.reload();
    }

    /// Reloads the current query and waits for it to settle.
    pub async fn refresh_now(&self) -> Result<(), ListingError> {
        let request = self.query.issue_reload();
        self.load(request).await
    }

    pub async fn load(&self, request: LoadRequest) -> Result<(), ListingError> {
        let seq = request.seq;
        let fetched = match self
            .catalog
            .fetch_sessions(request.query.tab.upcoming_filter())
            .await
        {
            Ok(entries) => entries,
            Err(err) => {
                let message = format!("{err:#}");
                if !self.query.is_latest(seq) {
                    let latest = self.query.last_issued_seq();
                    debug!(seq, latest, error = %message, "discarding failure of superseded load");
                    self.tracker.publish(ListingEvent::StaleDiscarded { seq, latest });
                    return Ok(());
                }
                self.tracker.settle(seq);
                warn!(seq, error = %message, "session catalog fetch failed");
                self.tracker.publish(ListingEvent::LoadFailed {
                    seq,
                    message: message.clone(),
                });
                return Err(ListingError::LoadFailed(message));
            }
        };

        let mut entries = self.entries.lock().await;
        let view = build_view(&fetched, self.role, &request.query, self.clock.now());
        let info = PageInfo {
            current_page: request.query.page,
            total_pages: view.total_pages,
        };
        if let Err(stale) = self.query.accept_response(seq, info) {
            debug!(seq, latest = stale.latest, "discarding stale session listing");
            self.tracker.publish(ListingEvent::StaleDiscarded {
                seq,
                latest: stale.latest,
            });
            return Ok(());
        }
        *entries = fetched;
        drop(entries);

        self.tracker.settle(seq);
        debug!(seq, rows = view.total_rows, "session listing loaded");
        self.tracker.publish(ListingEvent::Loaded {
            seq,
            item_count: view.total_rows,
        });
        Ok(())
    }

    /// Evaluates the current snapshot at the clock's current instant.
    pub async fn view(&self) -> BoardView {
        let query = self.query.state();
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        build_view(&entries, self.role, &query, now)
    }

    pub async fn register(&self, session_id: SessionId) -> Result<MutationOutcome, ListingError> {
        let entry = self
            .entries
            .lock()
            .await
            .iter()
            .find(|entry| entry.session.id == session_id)
            .cloned()
            .ok_or(ListingError::UnknownSession(session_id))?;

        let display = evaluate_entry(&entry, self.role, self.clock.now());
        if !display.can_register {
            return Err(ListingError::RegistrationClosed {
                session_id,
                phase: display.phase,
            });
        }

        let Some(ticket) = self.register_guard.begin(&session_id) else {
            info!(
                session_id = session_id.0,
                "registration already in flight; ignoring duplicate request"
            );
            return Ok(MutationOutcome::Rejected);
        };

        info!(session_id = session_id.0, "registering for session");
        let result = self.registrations.register(session_id).await;
        drop(ticket);

        self.tracker.publish(ListingEvent::MutationSettled {
            action: ActionClass::Register,
            entity_id: session_id.0,
            succeeded: result.is_ok(),
        });

        match result {
            Ok(()) => {
                info!(session_id = session_id.0, "registration confirmed");
                self.query.reload();
                Ok(MutationOutcome::Applied {
                    message: format!("Registered for {}", entry.session.title),
                })
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(session_id = session_id.0, error = %message, "registration failed");
                Err(ListingError::operation(ActionClass::Register, &err))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/sessions_tests.rs"]
mod tests;
