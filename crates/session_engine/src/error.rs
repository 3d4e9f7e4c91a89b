use shared::domain::SessionId;
use thiserror::Error;

use crate::{guard::ActionClass, status::Phase};

/// A reload response that arrived after a newer request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("response for load #{seq} is stale; latest issued is #{latest}")]
pub struct StaleResponse {
    pub seq: u64,
    pub latest: u64,
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("failed to load listing: {0}")]
    LoadFailed(String),
    #[error("{action} failed: {message}")]
    OperationFailed {
        action: ActionClass,
        message: String,
    },
    #[error("session {session_id} is not open for registration ({phase_name})", phase_name = .phase.as_str())]
    RegistrationClosed { session_id: SessionId, phase: Phase },
    #[error("session {0} is not in the current listing")]
    UnknownSession(SessionId),
}

impl ListingError {
    pub(crate) fn operation(action: ActionClass, source: &anyhow::Error) -> Self {
        ListingError::OperationFailed {
            action,
            message: format!("{source:#}"),
        }
    }
}
