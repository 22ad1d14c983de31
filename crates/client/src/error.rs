use std::fmt::{self, Display};

use soa_serializer::SerializerError;
use soa_transport::{RequestId, TransportError};
use thiserror::Error;

use crate::types::{ActionResponse, ErrorInfo, describe_errors};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by client calls.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding failure, passed through unchanged.
    #[error(transparent)]
    Serializer(#[from] SerializerError),

    /// The response received belongs to a different request.
    #[error("Got response with ID {actual} for request with ID {expected}")]
    ResponseIdMismatch {
        /// Id of the request that was sent.
        expected: RequestId,
        /// Id carried by the response.
        actual: RequestId,
    },

    /// The transport ran dry before answering the request.
    #[error("No response received for request with ID {0}")]
    NoResponse(RequestId),

    /// More than one response arrived for a single request.
    #[error("Received {count} responses for request with ID {request_id}")]
    ExtraResponses {
        /// Id of the request that was sent.
        request_id: RequestId,
        /// Number of responses received.
        count: usize,
    },

    /// The service answered without a response for the named action.
    #[error("Job response contains no response for action {0}")]
    MissingActionResponse(String),

    /// A job request must carry at least one action.
    #[error("Job request contains no actions")]
    EmptyJob,

    /// No client is configured for the named service.
    #[error("No client configured for service {0}")]
    UnknownService(String),

    /// Client configuration could not be parsed.
    #[error("Invalid client configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The job failed as a whole.
    #[error(transparent)]
    Job(#[from] JobError),

    /// One or more actions failed.
    #[error(transparent)]
    CallAction(#[from] CallActionError),
}

/// Raised when a job response carries job-level errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Error executing job: {}", describe_errors(.errors))]
pub struct JobError {
    /// The job-level errors, in response order.
    pub errors: Vec<ErrorInfo>,
}

/// Raised when one or more action responses carry errors.
///
/// Holds every failed action so callers can react to all of them.
#[derive(Clone, Debug, Error, PartialEq)]
pub struct CallActionError {
    /// The failed action responses, in response order.
    pub actions: Vec<ActionResponse>,
}

impl Display for CallActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error calling action(s):")?;
        for action in &self.actions {
            write!(f, "\n{}: {}", action.action, describe_errors(&action.errors))?;
        }
        Ok(())
    }
}
