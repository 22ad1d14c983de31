//! Generic transport abstraction for job request/response messages.
//!
//! This crate provides a transport-agnostic interface used by clients to
//! deliver encoded job requests to a service and to collect the encoded job
//! responses that come back. Specific transport implementations (in-memory,
//! message bus, etc.) are provided in separate crates.
//!
//! Transports handle:
//! - Message delivery to the service
//! - Per-request routing keyed by the client-assigned request id
//! - Send/receive timeouts and message size limits
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::TransportError;
pub use error::TransportError as Error;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Client-local request sequence number used for routing responses.
pub type RequestId = u64;

/// Metadata key carrying the serializer's content type.
pub const CONTENT_TYPE_KEY: &str = "content_type";

/// Dispatch metadata sent alongside every request message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metadata announcing the given content type.
    #[must_use]
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        let mut metadata = Self::new();
        metadata.insert(CONTENT_TYPE_KEY, content_type);
        metadata
    }

    /// The content type of the accompanying payload, if announced.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE_KEY)
    }

    /// Looks up a metadata value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Sets a metadata value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An inbound response message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseMessage {
    /// The request id this response answers.
    pub request_id: RequestId,
    /// Metadata supplied by the responder.
    pub metadata: Metadata,
    /// The encoded job response.
    pub payload: Bytes,
}

/// Transport trait for sending job requests and receiving job responses.
///
/// `receive_response_message` returns `Ok(None)` when no more messages are
/// currently available. That is not an error: it ends the current receive
/// pass of the client.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send an encoded job request.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::ConnectionFailed`],
    /// [`TransportError::SendError`], [`TransportError::SendTimeout`] or
    /// [`TransportError::MessageTooLarge`].
    async fn send_request_message(
        &self,
        request_id: RequestId,
        metadata: &Metadata,
        payload: Bytes,
    ) -> Result<(), TransportError>;

    /// Receive the next available response message.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::ReceiveError`] or
    /// [`TransportError::ReceiveTimeout`].
    async fn receive_response_message(&self) -> Result<Option<ResponseMessage>, TransportError>;

    /// Add transport-specific routing hints to outbound metadata.
    fn prepare_metadata(&self, _metadata: &mut Metadata) {}

    /// Stop waiting for the response to `request_id`.
    ///
    /// Called when the client gives up on a request it already sent. A late
    /// response may still be delivered by `receive_response_message`.
    fn abandon_request(&self, _request_id: RequestId) {}
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send_request_message(
        &self,
        request_id: RequestId,
        metadata: &Metadata,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        (**self)
            .send_request_message(request_id, metadata, payload)
            .await
    }

    async fn receive_response_message(&self) -> Result<Option<ResponseMessage>, TransportError> {
        (**self).receive_response_message().await
    }

    fn prepare_metadata(&self, metadata: &mut Metadata) {
        (**self).prepare_metadata(metadata);
    }

    fn abandon_request(&self, request_id: RequestId) {
        (**self).abandon_request(request_id);
    }
}

/// Configuration for transports
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// How long to wait for an outstanding response in milliseconds
    pub receive_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_message_size: 100 * 1024, // 100KB
            receive_timeout_ms: 5000,     // 5 seconds
        }
    }
}
