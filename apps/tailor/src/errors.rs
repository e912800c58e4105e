use thiserror::Error;

use crate::api_client::ApiError;

/// Client-level error type.
/// Returned by the operations that surface failure to screen code: base prep
/// fetch/generate/delete, annotation persistence and caller-side validation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A refresh or delete for the same key landed while this fetch was in flight.
    #[error("Interview prep for tailored resume {0} was invalidated while loading")]
    Superseded(i64),
}

impl ClientError {
    /// Message suitable for an inline banner or alert.
    /// Backend-reported failures surface their own reason when one was given.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(ApiError::Rejected(Some(message))) => message.clone(),
            ClientError::Api(ApiError::Rejected(None)) => "The request was rejected".to_string(),
            ClientError::Api(ApiError::Status { message, .. }) if !message.is_empty() => {
                message.clone()
            }
            ClientError::Api(_) => "Could not reach the server".to_string(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Storage(_) => "Could not save changes on this device".to_string(),
            ClientError::Superseded(_) => "Interview prep changed while loading".to_string(),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Storage(format!("corrupt local data: {e}"))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_backend_reason() {
        let err = ClientError::Api(ApiError::Rejected(Some("Prep not found".to_string())));
        assert_eq!(err.user_message(), "Prep not found");
    }

    #[test]
    fn test_user_message_falls_back_for_transport_errors() {
        let err = ClientError::Api(ApiError::Transport("connection refused".to_string()));
        assert_eq!(err.user_message(), "Could not reach the server");
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = ClientError::Validation("Enter at least one job URL".to_string());
        assert_eq!(err.user_message(), "Enter at least one job URL");
    }
}
