//! Client side of the job request/response protocol.
//!
//! A [`Client`] builds a job request from one or more actions, passes it
//! through its middleware, encodes it with a [`soa_serializer::Serializer`]
//! and hands it to a [`soa_transport::Transport`]. The answer is decoded,
//! matched to the request by request id and checked for job and action
//! errors. [`ClientRouter`] holds one client per configured service.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod error;
mod middleware;
mod router;
pub mod types;

pub use client::{CallOptions, Client};
pub use config::{ClientConfig, ServiceConfig};
pub use error::{CallActionError, Error, JobError, Result};
pub use middleware::{Middleware, TracingMiddleware};
pub use router::{ActionCaller, ClientRouter};
pub use types::{ActionRequest, ActionResponse, Body, ErrorInfo, JobRequest, JobResponse};

pub use soa_transport::TransportError;
