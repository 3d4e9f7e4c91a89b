//! Collaborators the engine talks to but does not implement.

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{AccountId, SessionId},
    protocol::{AccountSummary, ListPage, ListQuery, MutationMessage, SessionEntry},
};

#[async_trait]
pub trait SessionCatalog: Send + Sync {
    /// Sessions visible to the current actor, each paired with the actor's
    /// registration. `upcoming` narrows to upcoming (`Some(true)`) or past
    /// (`Some(false)`) sessions.
    async fn fetch_sessions(&self, upcoming: Option<bool>) -> Result<Vec<SessionEntry>>;
}

#[async_trait]
pub trait RegistrationService: Send + Sync {
    async fn register(&self, session_id: SessionId) -> Result<()>;
}

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn enable(&self, account_id: AccountId) -> Result<MutationMessage>;
    async fn disable(&self, account_id: AccountId) -> Result<MutationMessage>;
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<ListPage<AccountSummary>>;
}
