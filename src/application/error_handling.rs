// src/application/error_handling.rs
//
// Error mapping for callers outside the crate
//
// ARCHITECTURE:
// - Maps internal errors -> categorized, caller-facing responses
// - Never exposes internal implementation details
// - Logs infrastructure errors for debugging

use log::error;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::error::AppError;

/// Standard error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_type: ErrorType,
    pub message: String,
    pub details: Option<String>,
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Resource not found (404)
    NotFound,

    /// Invalid input or state transition (400)
    Validation,

    /// Action not permitted in the current state (403)
    Authorization,

    /// Infrastructure failure, retry may succeed (503)
    Transient,

    /// Other/unknown error (500)
    Internal,
}

impl ErrorResponse {
    fn new(error_type: ErrorType, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error_type,
            message: message.into(),
            details,
        }
    }

    /// Create error response from AppError
    pub fn from_app_error(error: AppError) -> Self {
        match error {
            AppError::NotFound => Self::new(ErrorType::NotFound, "Resource not found", None),

            AppError::Domain(domain_error) => Self::from_domain_error(domain_error),

            AppError::Broker(message) => {
                error!("[ERROR] Broker failure: {}", message);
                Self::new(
                    ErrorType::Transient,
                    "Change saved but notification failed; retry the request",
                    None,
                )
            }

            storage if storage.is_transient() => {
                error!("[ERROR] Storage failure: {}", storage);
                Self::new(
                    ErrorType::Transient,
                    "Storage temporarily unavailable",
                    Some("Check logs for details".to_string()),
                )
            }

            AppError::Serialization(e) => {
                error!("[ERROR] Serialization failure: {}", e);
                Self::new(ErrorType::Internal, "Data serialization failed", None)
            }

            AppError::Config(message) => {
                error!("[ERROR] Configuration: {}", message);
                Self::new(ErrorType::Internal, "Service misconfigured", None)
            }

            AppError::Other(message) => {
                error!("[ERROR] {}", message);
                Self::new(ErrorType::Internal, message, None)
            }

            other => {
                error!("[ERROR] Unexpected failure: {}", other);
                Self::new(ErrorType::Internal, "Internal error", None)
            }
        }
    }

    fn from_domain_error(error: DomainError) -> Self {
        let message = error.to_string();
        match error {
            DomainError::InvalidStateTransition { .. }
            | DomainError::ScoreOutOfRange { .. }
            | DomainError::InvariantViolation(_) => {
                Self::new(ErrorType::Validation, message, None)
            }
            DomainError::ReviewNotAllowed { current } => Self::new(
                ErrorType::Authorization,
                message,
                Some(format!("current_state={}", current)),
            ),
            DomainError::NotFound(what) => {
                Self::new(ErrorType::NotFound, format!("{} not found", what), None)
            }
        }
    }
}

/// Helper trait to convert Results to a serialized ErrorResponse
pub trait ToErrorResponse<T> {
    fn to_error_response(self) -> Result<T, String>;
}

impl<T> ToErrorResponse<T> for Result<T, AppError> {
    fn to_error_response(self) -> Result<T, String> {
        self.map_err(|e| {
            let error_response = ErrorResponse::from_app_error(e);
            serde_json::to_string(&error_response).unwrap_or_else(|_| "Internal error".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WatchingStatus;

    #[test]
    fn test_review_not_allowed_is_authorization_naming_both_states() {
        let response = ErrorResponse::from_app_error(AppError::Domain(
            DomainError::ReviewNotAllowed {
                current: WatchingStatus::InProgress,
            },
        ));
        assert_eq!(response.error_type, ErrorType::Authorization);
        assert!(response.message.contains("finish watching all episodes first"));
        assert!(response.message.contains("in_progress"));
        assert_eq!(response.details.as_deref(), Some("current_state=in_progress"));
    }

    #[test]
    fn test_invalid_transition_is_validation() {
        let response = ErrorResponse::from_app_error(AppError::Domain(
            DomainError::InvalidStateTransition {
                current: WatchingStatus::ToWatch,
                attempted: WatchingStatus::Finished,
            },
        ));
        assert_eq!(response.error_type, ErrorType::Validation);
    }

    #[test]
    fn test_infrastructure_errors_are_transient() {
        let broker = ErrorResponse::from_app_error(AppError::Broker("down".to_string()));
        assert_eq!(broker.error_type, ErrorType::Transient);

        let pool = ErrorResponse::from_app_error(AppError::Pool("timeout".to_string()));
        assert_eq!(pool.error_type, ErrorType::Transient);
        assert_eq!(pool.message, "Storage temporarily unavailable");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let io = ErrorResponse::from_app_error(AppError::Io(io));
        assert_eq!(io.error_type, ErrorType::Transient);

        let config = ErrorResponse::from_app_error(AppError::Config("no home".to_string()));
        assert_eq!(config.error_type, ErrorType::Internal);
    }

    #[test]
    fn test_serialized_result() {
        let result: Result<(), AppError> = Err(AppError::NotFound);
        let json = result.to_error_response().unwrap_err();
        assert!(json.contains("not_found"));
        assert!(json.contains("Resource not found"));
    }
}
