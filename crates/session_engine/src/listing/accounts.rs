use std::sync::Arc;

use shared::{
    domain::AccountId,
    protocol::{AccountSummary, ListPage},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::{wire_driver, ListingEvent, ListingSettings, LoadTracker, MutationOutcome};
use crate::{
    driver::QueryDriver,
    error::ListingError,
    guard::{ActionClass, MutationGuard},
    ports::{AccountDirectory, AccountService},
    query::{LoadRequest, PageInfo, QueryOrchestrator, QueryState},
};

/// Server-paginated account listing with enable/disable actions.
pub struct AccountRoster {
    directory: Arc<dyn AccountDirectory>,
    accounts: Arc<dyn AccountService>,
    enable_guard: MutationGuard<AccountId>,
    disable_guard: MutationGuard<AccountId>,
    query: QueryDriver,
    page: Mutex<ListPage<AccountSummary>>,
    tracker: LoadTracker,
}

impl AccountRoster {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        accounts: Arc<dyn AccountService>,
        settings: ListingSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|roster| {
            let query = QueryDriver::new(QueryOrchestrator::new(
                settings.page_size,
                settings.debounce,
            ));
            wire_driver(&query, roster.clone(), |roster: Arc<Self>, request| async move {
                let _ = roster.load(request).await;
            });
            Self {
                directory,
                accounts,
                enable_guard: MutationGuard::new(ActionClass::Enable),
                disable_guard: MutationGuard::new(ActionClass::Disable),
                query,
                page: Mutex::new(ListPage::empty()),
                tracker: LoadTracker::new(),
            }
        })
    }

    pub fn query_state(&self) -> QueryState {
        self.query.state()
    }

    pub fn loading(&self) -> bool {
        self.tracker.loading(&self.query)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ListingEvent> {
        self.tracker.subscribe()
    }

    pub fn is_in_flight(&self, action: ActionClass, account_id: AccountId) -> bool {
        match action {
            ActionClass::Enable => self.enable_guard.is_in_flight(&account_id),
            ActionClass::Disable => self.disable_guard.is_in_flight(&account_id),
            ActionClass::Register => false,
        }
    }

    pub fn set_search(&self, text: impl Into<String>) {
        self.query.set_search(text);
    }

    pub fn set_status_filter(&self, filter: Option<String>) {
        self.query.set_status_filter(filter);
    }

    pub fn set_page_size(&self, page_size: u32) {
        self.query.set_page_size(page_size);
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

    pub async fn refresh_now(&self) -> Result<(), ListingError> {
        let request = self.query.issue_reload();
        self.load(request).await
    }

    pub async fn current_page(&self) -> ListPage<AccountSummary> {
        self.page.lock().await.clone()
    }

    pub async fn load(&self, request: LoadRequest) -> Result<(), ListingError> {
        let seq = request.seq;
        let fetched = match self.directory.list(&request.query.to_list_query()).await {
            Ok(page) => page,
            Err(err) => {
                let message = format!("{err:#}");
                if !self.query.is_latest(seq) {
                    let latest = self.query.last_issued_seq();
                    debug!(seq, latest, error = %message, "discarding failure of superseded load");
                    self.tracker.publish(ListingEvent::StaleDiscarded { seq, latest });
                    return Ok(());
                }
                self.tracker.settle(seq);
                warn!(seq, error = %message, "account listing fetch failed");
                self.tracker.publish(ListingEvent::LoadFailed {
                    seq,
                    message: message.clone(),
                });
                return Err(ListingError::LoadFailed(message));
            }
        };

        let mut page = self.page.lock().await;
        if let Err(stale) = self.query.accept_response(seq, PageInfo::from(&fetched)) {
            debug!(seq, latest = stale.latest, "discarding stale account listing");
            self.tracker.publish(ListingEvent::StaleDiscarded {
                seq,
                latest: stale.latest,
            });
            return Ok(());
        }
        let item_count = fetched.items.len();
        *page = fetched;
        drop(page);

        self.tracker.settle(seq);
        debug!(seq, item_count, "account listing loaded");
        self.tracker.publish(ListingEvent::Loaded { seq, item_count });
        Ok(())
    }

    pub async fn enable(&self, account_id: AccountId) -> Result<MutationOutcome, ListingError> {
        self.set_enabled(account_id, true).await
    }

    pub async fn disable(&self, account_id: AccountId) -> Result<MutationOutcome, ListingError> {
        self.set_enabled(account_id, false).await
    }

    async fn set_enabled(
        &self,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<MutationOutcome, ListingError> {
        let (action, guard) = if enabled {
            (ActionClass::Enable, &self.enable_guard)
        } else {
            (ActionClass::Disable, &self.disable_guard)
        };

        let Some(ticket) = guard.begin(&account_id) else {
            info!(
                account_id = account_id.0,
                %action,
                "account mutation already in flight; ignoring duplicate request"
            );
            return Ok(MutationOutcome::Rejected);
        };

        info!(account_id = account_id.0, %action, "updating account");
        let result = if enabled {
            self.accounts.enable(account_id).await
        } else {
            self.accounts.disable(account_id).await
        };
        drop(ticket);

        self.tracker.publish(ListingEvent::MutationSettled {
            action,
            entity_id: account_id.0,
            succeeded: result.is_ok(),
        });

        match result {
            Ok(confirmation) => {
                info!(account_id = account_id.0, %action, "account updated");
                self.query.reload();
                Ok(MutationOutcome::Applied {
                    message: confirmation.message,
                })
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(account_id = account_id.0, %action, error = %message, "account update failed");
                Err(ListingError::operation(action, &err))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/accounts_tests.rs"]
mod tests;
