use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error taxonomy for the reconciliation layer.
///
/// `ProviderUnavailable` is the only transient variant; everything else is
/// terminal and requires a user decision (reconnect, change the amount,
/// resubmit). Writes are never retried automatically.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("no wallet connected")]
    NotConnected,

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("transaction rejected by signer: {0}")]
    UserRejected(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("transaction reverted: {reason}")]
    TransactionReverted { reason: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Whether a caller may safely retry the failed operation as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::ProviderUnavailable(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotConnected | AppError::UserRejected(_) => StatusCode::CONFLICT,
            AppError::InsufficientFunds(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TransactionReverted { .. } => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "retryable": self.is_transient(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_failures_are_transient() {
        assert!(AppError::ProviderUnavailable("timeout".into()).is_transient());
        assert!(!AppError::NotConnected.is_transient());
        assert!(!AppError::UserRejected("declined".into()).is_transient());
        assert!(!AppError::InsufficientFunds("2.6 > 2.5".into()).is_transient());
        assert!(!AppError::TransactionReverted { reason: "health factor".into() }.is_transient());
    }

    #[test]
    fn display_carries_context() {
        let err = AppError::InsufficientFunds("requested 2.6, available 2.5".into());
        assert_eq!(
            err.to_string(),
            "insufficient funds: requested 2.6, available 2.5"
        );
    }
}
