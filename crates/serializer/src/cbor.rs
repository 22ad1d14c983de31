//! CBOR codec implementation.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Result, Serializer, SerializerError};

pub(crate) const CONTENT_TYPE: &str = "application/cbor";

/// Encodes payloads as CBOR using ciborium.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CborSerializer;

impl Serializer for CborSerializer {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes> {
        let mut writer = BytesMut::new().writer();
        match ciborium::ser::into_writer(value, &mut writer) {
            Ok(()) => Ok(writer.into_inner().freeze()),
            Err(error) => Err(SerializerError::SerializationFailed(error.to_string())),
        }
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        ciborium::de::from_reader(data)
            .map_err(|error| SerializerError::DeserializationFailed(error.to_string()))
    }
}
