use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

impl ErrorCode {
    /// Best-effort code for a response that carried no error envelope.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 422 => ErrorCode::Validation,
            409 => ErrorCode::Conflict,
            _ => ErrorCode::Internal,
        }
    }
}

/// Error envelope returned by the REST backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_code_and_message() {
        let err = ApiError::new(ErrorCode::Conflict, "already registered");
        assert_eq!(err.to_string(), "Conflict: already registered");
    }

    #[test]
    fn api_error_is_a_std_error_without_source() {
        let err: Box<dyn std::error::Error + Send + Sync> =
            Box::new(ApiError::new(ErrorCode::NotFound, "no such session"));
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "NotFound: no such session");
    }

    #[test]
    fn unknown_statuses_map_to_internal() {
        assert_eq!(ErrorCode::from_status(409), ErrorCode::Conflict);
        assert_eq!(ErrorCode::from_status(418), ErrorCode::Internal);
    }
}
