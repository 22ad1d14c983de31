//! JSON codec implementation.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Result, Serializer, SerializerError};

pub(crate) const CONTENT_TYPE: &str = "application/json";

/// Encodes payloads as JSON documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| SerializerError::SerializationFailed(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| SerializerError::DeserializationFailed(e.to_string()))
    }
}
