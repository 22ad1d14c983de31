use thiserror::Error;

/// Codec-related errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SerializerError {
    /// Serialization failed.
    #[error("Failed to serialize: {0}")]
    SerializationFailed(String),

    /// Deserialization failed.
    #[error("Failed to deserialize: {0}")]
    DeserializationFailed(String),

    /// Unsupported content type.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
}
