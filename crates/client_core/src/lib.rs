use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use session_engine::{AccountDirectory, AccountService, RegistrationService, SessionCatalog};
use shared::{
    domain::{AccountId, SessionId},
    protocol::{AccountSummary, ListPage, ListQuery, MutationMessage, SessionEntry},
};
use tracing::{debug, info};
use url::Url;

pub mod error;

pub use error::ClientError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP adapter for the classroom REST backend.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
        }
        if parsed.cannot_be_a_base() {
            return Err(invalid("url cannot carry a path".to_string()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Setup)?;
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, url: &Url, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await.map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "api response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ClientError::from_response_body(status, &body);
        debug!(%url, status = status.as_u16(), error = %err, "api request rejected");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        url: Url,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        self.send(&url, request)
            .await?
            .json()
            .await
            .map_err(|source| ClientError::Decode {
                url: url.to_string(),
                source,
            })
    }

    pub async fn sessions(&self, upcoming: Option<bool>) -> Result<Vec<SessionEntry>, ClientError> {
        let url = self.endpoint(&["sessions"]);
        let mut request = self.http.get(url.clone());
        if let Some(upcoming) = upcoming {
            request = request.query(&[("upcoming", upcoming)]);
        }
        self.send_json(url, request).await
    }

    pub async fn register_for(&self, session_id: SessionId) -> Result<(), ClientError> {
        let id = session_id.to_string();
        let url = self.endpoint(&["sessions", &id, "register"]);
        self.send(&url, self.http.post(url.clone())).await?;
        info!(session_id = session_id.0, "registration accepted");
        Ok(())
    }

    pub async fn set_account_enabled(
        &self,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<MutationMessage, ClientError> {
        let id = account_id.to_string();
        let action = if enabled { "enable" } else { "disable" };
        let url = self.endpoint(&["accounts", &id, action]);
        self.send_json(url.clone(), self.http.patch(url)).await
    }

    pub async fn accounts(
        &self,
        query: &ListQuery,
    ) -> Result<ListPage<AccountSummary>, ClientError> {
        let url = self.endpoint(&["accounts"]);
        let request = self.http.get(url.clone()).query(query);
        self.send_json(url, request).await
    }
}

#[async_trait]
impl SessionCatalog for RestClient {
    async fn fetch_sessions(&self, upcoming: Option<bool>) -> Result<Vec<SessionEntry>> {
        Ok(self.sessions(upcoming).await?)
    }
}

#[async_trait]
impl RegistrationService for RestClient {
    async fn register(&self, session_id: SessionId) -> Result<()> {
        Ok(self.register_for(session_id).await?)
    }
}

#[async_trait]
impl AccountService for RestClient {
    async fn enable(&self, account_id: AccountId) -> Result<MutationMessage> {
        Ok(self.set_account_enabled(account_id, true).await?)
    }

    async fn disable(&self, account_id: AccountId) -> Result<MutationMessage> {
        Ok(self.set_account_enabled(account_id, false).await?)
    }
}

#[async_trait]
impl AccountDirectory for RestClient {
    async fn list(&self, query: &ListQuery) -> Result<ListPage<AccountSummary>> {
        Ok(self.accounts(query).await?)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
