use soa_client::ErrorInfo;
use thiserror::Error;

/// Errors that can occur while answering a status request.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The request body does not match the status request shape.
    #[error("Invalid status request field {field}: {message}")]
    InvalidRequest {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Status configuration could not be parsed.
    #[error("Invalid status configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The response could not be converted into an action body.
    #[error("Failed to encode status response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StatusError {
    /// Wire form of this error for an action response.
    #[must_use]
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            Self::InvalidRequest { field, message } => ErrorInfo {
                code: "INVALID".to_string(),
                message: message.clone(),
                field: Some(field.clone()),
            },
            other => ErrorInfo::new("SERVER_ERROR", other.to_string()),
        }
    }
}
