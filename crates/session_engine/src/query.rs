//! Filter and pagination state plus the rules that decide when a reload is
//! issued and with which parameters.
//!
//! The orchestrator performs no I/O and owns no timer. Callers pass `now` in
//! and arm the returned [`DebounceTimer`] themselves (see
//! [`QueryDriver`](crate::driver::QueryDriver)).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::{
    domain::UnknownVariant,
    protocol::{ListPage, ListQuery},
};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::{error::StaleResponse, status::Phase};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Upcoming,
    Past,
    All,
}

impl Tab {
    /// Catalog-side filter for this tab.
    pub const fn upcoming_filter(self) -> Option<bool> {
        match self {
            Tab::Upcoming => Some(true),
            Tab::Past => Some(false),
            Tab::All => None,
        }
    }

    pub const fn admits(self, phase: Phase) -> bool {
        match self {
            Tab::Upcoming => matches!(
                phase,
                Phase::ScheduledFar | Phase::ScheduledJoinable | Phase::Live
            ),
            Tab::Past => matches!(
                phase,
                Phase::EndedAttended | Phase::EndedAbsent | Phase::EndedUnknown | Phase::Cancelled
            ),
            Tab::All => true,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Tab::Upcoming => "upcoming",
            Tab::Past => "past",
            Tab::All => "all",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = UnknownVariant;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Tab::Upcoming),
            "past" => Ok(Tab::Past),
            "all" => Ok(Tab::All),
            _ => Err(UnknownVariant {
                kind: "tab",
                value: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryState {
    pub search: String,
    pub status_filter: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub tab: Tab,
}

impl QueryState {
    pub fn new(page_size: u32) -> Self {
        Self {
            search: String::new(),
            status_filter: None,
            page: 1,
            page_size: page_size.max(1),
            tab: Tab::default(),
        }
    }

    pub fn search_term(&self) -> Option<&str> {
        let term = self.search.trim();
        (!term.is_empty()).then_some(term)
    }

    pub fn to_list_query(&self) -> ListQuery {
        ListQuery {
            page: self.page,
            limit: self.page_size,
            status: self.status_filter.clone(),
            search: self.search_term().map(str::to_string),
        }
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// One reload intent. `seq` increases with every request issued by the same
/// orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub seq: u64,
    pub query: QueryState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer {
    pub token: u64,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
}

impl<T> From<&ListPage<T>> for PageInfo {
    fn from(page: &ListPage<T>) -> Self {
        Self {
            current_page: page.current_page,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug)]
pub struct QueryOrchestrator {
    state: QueryState,
    debounce: Duration,
    pending: Option<DebounceTimer>,
    next_token: u64,
    last_issued: u64,
    last_applied: u64,
    total_pages: Option<u32>,
}

impl QueryOrchestrator {
    pub fn new(page_size: u32, debounce: Duration) -> Self {
        Self {
            state: QueryState::new(page_size),
            debounce,
            pending: None,
            next_token: 0,
            last_issued: 0,
            last_applied: 0,
            total_pages: None,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn pending_timer(&self) -> Option<DebounceTimer> {
        self.pending
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn last_issued_seq(&self) -> u64 {
        self.last_issued
    }

    pub fn last_applied_seq(&self) -> u64 {
        self.last_applied
    }

    /// Records new search text and (re)starts the debounce timer.
    ///
    /// Returns the timer the caller must arm, or `None` when the text did not
    /// change. Any earlier timer is superseded and will be ignored if it fires.
    pub fn set_search(&mut self, text: impl Into<String>, now: Instant) -> Option<DebounceTimer> {
        let text = text.into();
        if text == self.state.search {
            return None;
        }
        self.state.search = text;
        self.next_token += 1;
        let timer = DebounceTimer {
            token: self.next_token,
            deadline: now + self.debounce,
        };
        self.pending = Some(timer);
        Some(timer)
    }

    pub fn set_status_filter(&mut self, filter: Option<String>) -> Option<LoadRequest> {
        let filter = filter
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty());
        if filter == self.state.status_filter {
            return None;
        }
        self.state.status_filter = filter;
        Some(self.reset_to_first_page())
    }

    pub fn set_tab(&mut self, tab: Tab) -> Option<LoadRequest> {
        if tab == self.state.tab {
            return None;
        }
        self.state.tab = tab;
        Some(self.reset_to_first_page())
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Option<LoadRequest> {
        let page_size = page_size.max(1);
        if page_size == self.state.page_size {
            return None;
        }
        self.state.page_size = page_size;
        Some(self.reset_to_first_page())
    }

    /// Moves to `page`, keeping search and filters. Out-of-range pages are
    /// clamped against the last known page count.
    pub fn set_page(&mut self, page: u32) -> Option<LoadRequest> {
        let page = self.clamp_page(page);
        if page == self.state.page {
            return None;
        }
        self.state.page = page;
        Some(self.issue())
    }

    /// Reissues the current query unchanged.
    pub fn reload(&mut self) -> LoadRequest {
        self.issue()
    }

    /// Fires the debounce timer identified by `token`. Superseded tokens are
    /// ignored.
    pub fn fire_debounce(&mut self, token: u64) -> Option<LoadRequest> {
        match self.pending {
            Some(timer) if timer.token == token => {
                self.pending = None;
                if self.state.page == 1 {
                    Some(self.issue())
                } else {
                    self.set_page(1)
                }
            }
            _ => {
                debug!(token, "ignoring superseded debounce timer");
                None
            }
        }
    }

    /// Fires the pending timer if its deadline has passed.
    pub fn poll_debounce(&mut self, now: Instant) -> Option<LoadRequest> {
        let timer = self.pending?;
        if now < timer.deadline {
            return None;
        }
        self.fire_debounce(timer.token)
    }

    /// Applies the page metadata of a response, or rejects it when a newer
    /// request has been issued since.
    pub fn accept_response(&mut self, seq: u64, info: PageInfo) -> Result<(), StaleResponse> {
        if seq != self.last_issued {
            return Err(StaleResponse {
                seq,
                latest: self.last_issued,
            });
        }
        self.last_applied = seq;
        self.total_pages = Some(info.total_pages);
        self.state.page = info.current_page.clamp(1, info.total_pages.max(1));
        Ok(())
    }

    fn reset_to_first_page(&mut self) -> LoadRequest {
        // The immediate reload already carries the latest search text.
        self.pending = None;
        self.state.page = 1;
        self.issue()
    }

    fn clamp_page(&self, page: u32) -> u32 {
        let upper = self.total_pages.map_or(u32::MAX, |total| total.max(1));
        page.clamp(1, upper)
    }

    fn issue(&mut self) -> LoadRequest {
        self.last_issued += 1;
        LoadRequest {
            seq: self.last_issued,
            query: self.state.clone(),
        }
    }
}

impl Default for QueryOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
