//! Observers invoked around every outbound job request and inbound job response.

use soa_transport::{Metadata, RequestId};
use tracing::{debug, warn};

use crate::types::{JobRequest, JobResponse};

/// Hooks run in registration order around every request and response.
///
/// Middleware exists for side effects such as logging, tracing and auditing.
/// It may adjust the job in place but never the request id, and it cannot
/// abort a call.
pub trait Middleware: Send + Sync + 'static {
    /// Called before the job request is encoded and sent.
    fn process_job_request(
        &self,
        _request_id: RequestId,
        _metadata: &Metadata,
        _job_request: &mut JobRequest,
    ) {
    }

    /// Called after a job response is decoded and before it is handed out.
    fn process_job_response(
        &self,
        _request_id: RequestId,
        _metadata: &Metadata,
        _job_response: &mut JobResponse,
    ) {
    }
}

/// Logs every job that passes through a client.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn process_job_request(
        &self,
        request_id: RequestId,
        metadata: &Metadata,
        job_request: &mut JobRequest,
    ) {
        let actions: Vec<&str> = job_request
            .actions
            .iter()
            .map(|action| action.action.as_str())
            .collect();

        debug!(
            request_id,
            correlation_id = %job_request.control.correlation_id,
            content_type = metadata.content_type().unwrap_or("unknown"),
            ?actions,
            "sending job request"
        );
    }

    fn process_job_response(
        &self,
        request_id: RequestId,
        _metadata: &Metadata,
        job_response: &mut JobResponse,
    ) {
        let failed = job_response
            .actions
            .iter()
            .filter(|action| action.is_error())
            .count();

        if job_response.errors.is_empty() && failed == 0 {
            debug!(
                request_id,
                actions = job_response.actions.len(),
                "received job response"
            );
        } else {
            warn!(
                request_id,
                job_errors = job_response.errors.len(),
                failed_actions = failed,
                "received job response with errors"
            );
        }
    }
}
