//! In-memory transport implementation for testing
//!
//! This transport connects a client to a service living in the same process,
//! perfect for testing and local development scenarios. [`MemoryTransport`]
//! is the client half and [`MemoryServer`] is the service half.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashSet;
use flume::TryRecvError;
use soa_transport::{Config, Metadata, RequestId, ResponseMessage, Transport, TransportError};
use tracing::{debug, warn};

/// A request message as seen by the service half.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestMessage {
    /// Client-assigned request id.
    pub request_id: RequestId,
    /// Dispatch metadata sent by the client.
    pub metadata: Metadata,
    /// The encoded job request.
    pub payload: Bytes,
}

/// Client half of an in-memory transport pair.
#[derive(Clone)]
pub struct MemoryTransport {
    config: Config,
    request_tx: flume::Sender<RequestMessage>,
    response_rx: flume::Receiver<ResponseMessage>,
    outstanding: Arc<DashSet<RequestId>>,
}

impl MemoryTransport {
    /// Creates a connected client/server pair.
    #[must_use]
    pub fn pair(config: Config) -> (Self, MemoryServer) {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let transport = Self {
            config,
            request_tx,
            response_rx,
            outstanding: Arc::new(DashSet::new()),
        };
        let server = MemoryServer {
            request_rx,
            response_tx,
        };

        (transport, server)
    }

    /// Number of requests sent that have been neither answered nor abandoned.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.config.receive_timeout_ms)
    }

    fn mark_answered(&self, request_id: RequestId) {
        self.outstanding.remove(&request_id);
    }
}

impl Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("config", &self.config)
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_request_message(
        &self,
        request_id: RequestId,
        metadata: &Metadata,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        if payload.len() > self.config.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max: self.config.max_message_size,
            });
        }

        debug!(
            "Memory transport sending request {} ({} bytes)",
            request_id,
            payload.len()
        );

        self.request_tx
            .send_async(RequestMessage {
                request_id,
                metadata: metadata.clone(),
                payload,
            })
            .await
            .map_err(|_| TransportError::ConnectionFailed("server half dropped".to_string()))?;

        self.outstanding.insert(request_id);

        Ok(())
    }

    async fn receive_response_message(&self) -> Result<Option<ResponseMessage>, TransportError> {
        match self.response_rx.try_recv() {
            Ok(message) => {
                self.mark_answered(message.request_id);
                return Ok(Some(message));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                if self.outstanding() == 0 {
                    return Ok(None);
                }
                return Err(TransportError::ReceiveError(
                    "server half dropped".to_string(),
                ));
            }
        }

        if self.outstanding() == 0 {
            return Ok(None);
        }

        let timeout = self.receive_timeout();
        match tokio::time::timeout(timeout, self.response_rx.recv_async()).await {
            Ok(Ok(message)) => {
                debug!(
                    "Memory transport received response {} ({} bytes)",
                    message.request_id,
                    message.payload.len()
                );
                self.mark_answered(message.request_id);
                Ok(Some(message))
            }
            Ok(Err(_)) => Err(TransportError::ReceiveError(
                "server half dropped".to_string(),
            )),
            Err(_) => {
                warn!("Memory transport timed out after {:?}", timeout);
                Err(TransportError::ReceiveTimeout(timeout))
            }
        }
    }

    fn abandon_request(&self, request_id: RequestId) {
        if self.outstanding.remove(&request_id).is_some() {
            debug!("Memory transport abandoned request {}", request_id);
        }
    }
}

/// Service half of an in-memory transport pair.
#[derive(Clone, Debug)]
pub struct MemoryServer {
    request_rx: flume::Receiver<RequestMessage>,
    response_tx: flume::Sender<ResponseMessage>,
}

impl MemoryServer {
    /// Waits for the next request. Returns `None` once every client half is gone.
    pub async fn receive_request_message(&self) -> Option<RequestMessage> {
        self.request_rx.recv_async().await.ok()
    }

    /// Queues a response for the client half.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::ConnectionFailed`] once every client half is gone.
    pub fn send_response_message(
        &self,
        request_id: RequestId,
        metadata: Metadata,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        self.response_tx
            .send(ResponseMessage {
                request_id,
                metadata,
                payload,
            })
            .map_err(|_| TransportError::ConnectionFailed("client half dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            max_message_size: 16,
            receive_timeout_ms: 50,
        }
    }

    #[tokio::test]
    async fn test_nothing_outstanding_is_sentinel() {
        let (transport, _server) = MemoryTransport::pair(config());

        let received = transport.receive_response_message().await.unwrap();
        assert_eq!(received, None);
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let (transport, server) = MemoryTransport::pair(config());

        let result = transport
            .send_request_message(0, &Metadata::new(), Bytes::from(vec![0u8; 17]))
            .await;

        assert_eq!(
            result,
            Err(TransportError::MessageTooLarge { size: 17, max: 16 })
        );
        assert_eq!(transport.outstanding(), 0);
        assert!(server.request_rx.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outstanding_request_times_out() {
        let (transport, _server) = MemoryTransport::pair(config());

        transport
            .send_request_message(0, &Metadata::new(), Bytes::from_static(b"ping"))
            .await
            .unwrap();

        let result = transport.receive_response_message().await;
        assert_eq!(
            result,
            Err(TransportError::ReceiveTimeout(Duration::from_millis(50)))
        );
    }

    #[tokio::test]
    async fn test_abandoned_request_is_not_awaited() {
        let (transport, server) = MemoryTransport::pair(config());

        transport
            .send_request_message(4, &Metadata::new(), Bytes::from_static(b"ping"))
            .await
            .unwrap();
        transport.abandon_request(4);

        assert_eq!(transport.outstanding(), 0);
        assert_eq!(transport.receive_response_message().await, Ok(None));

        // A late answer is still handed out.
        server
            .send_response_message(4, Metadata::new(), Bytes::from_static(b"late"))
            .unwrap();
        let late = transport.receive_response_message().await.unwrap().unwrap();
        assert_eq!(late.request_id, 4);
        assert_eq!(transport.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_server_dropped() {
        let (transport, server) = MemoryTransport::pair(config());
        drop(server);

        let result = transport
            .send_request_message(0, &Metadata::new(), Bytes::from_static(b"ping"))
            .await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));

        // Nothing was delivered, so there is nothing to wait for.
        assert_eq!(transport.receive_response_message().await, Ok(None));
    }
}
