//! Pluggable encoding of job requests and responses.
//!
//! Every serializer exposes a stable content type which clients announce in
//! the dispatch metadata so the receiving side knows how to decode the
//! payload.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod cbor;
mod error;
mod json;

pub use cbor::CborSerializer;
pub use error::SerializerError;
pub use json::JsonSerializer;

use std::fmt::Debug;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Result type alias for serializer operations.
pub type Result<T> = std::result::Result<T, SerializerError>;

/// Converts structured values to and from opaque payloads.
pub trait Serializer: Clone + Debug + Send + Sync + 'static {
    /// The content type announced in dispatch metadata.
    fn content_type(&self) -> &'static str;

    /// Encode a value into a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes>;

    /// Decode a payload into a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or has the wrong shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// Serializer choice as it appears in configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// JSON via `serde_json`.
    #[default]
    Json,
    /// CBOR via `ciborium`.
    Cbor,
}

/// A serializer selected at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnySerializer {
    /// JSON encoding.
    Json(JsonSerializer),
    /// CBOR encoding.
    Cbor(CborSerializer),
}

impl AnySerializer {
    /// Picks the serializer matching a content type.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::UnsupportedContentType`] for unknown types.
    pub fn for_content_type(content_type: &str) -> Result<Self> {
        match content_type {
            json::CONTENT_TYPE => Ok(Self::Json(JsonSerializer)),
            cbor::CONTENT_TYPE => Ok(Self::Cbor(CborSerializer)),
            other => Err(SerializerError::UnsupportedContentType(other.to_string())),
        }
    }
}

impl From<SerializerKind> for AnySerializer {
    fn from(kind: SerializerKind) -> Self {
        match kind {
            SerializerKind::Json => Self::Json(JsonSerializer),
            SerializerKind::Cbor => Self::Cbor(CborSerializer),
        }
    }
}

impl Serializer for AnySerializer {
    fn content_type(&self) -> &'static str {
        match self {
            Self::Json(s) => s.content_type(),
            Self::Cbor(s) => s.content_type(),
        }
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes> {
        match self {
            Self::Json(s) => s.encode(value),
            Self::Cbor(s) => s.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        match self {
            Self::Json(s) => s.decode(data),
            Self::Cbor(s) => s.decode(data),
        }
    }
}
