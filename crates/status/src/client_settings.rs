//! Recursive status probing of dependent services.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value};
use soa_client::types::describe_errors;
use soa_client::{Body, CallOptions, ClientRouter, Error as ClientError, TransportError};
use tracing::{debug, warn};

use crate::STATUS_ACTION;
use crate::check::HealthCheck;
use crate::problem::{Diagnostics, Problem};
use crate::request::StatusRequest;

/// Registry name under which the client settings check is enabled.
pub const CLIENT_SETTINGS_CHECK: &str = "check_client_settings";

/// Diagnostics key holding the terse status of every dependent service.
pub const SERVICES_DIAGNOSTICS_KEY: &str = "services";

/// Why probing a dependent service failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The job failed as a whole.
    Job(String),
    /// The status action itself reported errors.
    Action(String),
    /// Sending or receiving failed or timed out.
    Transport(String),
    /// Anything else.
    Unknown(String),
}

impl ProbeFailure {
    const fn suffix(&self) -> &'static str {
        match self {
            Self::Job(_) => "CALL_ERROR",
            Self::Action(_) => "STATUS_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// The problem code for this failure, e.g. `BILLING_TRANSPORT_ERROR`.
    #[must_use]
    pub fn code(&self, service_name: &str) -> String {
        format!("{}_{}", service_name.to_uppercase(), self.suffix())
    }

    /// Converts the failure into an error-level problem.
    #[must_use]
    pub fn into_problem(self, service_name: &str) -> Problem {
        let code = self.code(service_name);
        let description = match self {
            Self::Job(d) | Self::Action(d) | Self::Transport(d) | Self::Unknown(d) => d,
        };
        Problem::error(code, description)
    }
}

impl From<ClientError> for ProbeFailure {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Job(error) => Self::Job(describe_errors(&error.errors)),
            ClientError::CallAction(error) => Self::Action(
                error
                    .actions
                    .first()
                    .map(|action| describe_errors(&action.errors))
                    .unwrap_or_default(),
            ),
            ClientError::Transport(
                error @ (TransportError::SendError(_)
                | TransportError::SendTimeout(_)
                | TransportError::ReceiveError(_)
                | TransportError::ReceiveTimeout(_)
                | TransportError::Timeout(_)),
            ) => Self::Transport(error.to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Calls `status` with `verbose: false` on every configured service.
///
/// Every response body is recorded under `diagnostics.services[name]`; every
/// failure becomes an error-level problem and never aborts the status
/// request. Services are probed concurrently, each with its own timeout.
#[derive(Clone, Copy, Debug)]
pub struct ClientSettingsCheck {
    timeout: Duration,
}

impl ClientSettingsCheck {
    /// Creates the check with the given per-service timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn probe(&self, client: &ClientRouter, service_name: &str) -> Result<Body, ProbeFailure> {
        let mut body = Body::new();
        body.insert("verbose".to_string(), Value::Bool(false));

        let response = client
            .call_action(
                service_name,
                STATUS_ACTION,
                Some(body),
                CallOptions::default().with_timeout(self.timeout),
            )
            .await?;

        Ok(response.body)
    }
}

impl Default for ClientSettingsCheck {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl HealthCheck for ClientSettingsCheck {
    async fn check(&self, request: &StatusRequest, diagnostics: &mut Diagnostics) -> Vec<Problem> {
        let Some(client) = request.client.as_deref().filter(|client| !client.is_empty()) else {
            return Vec::new();
        };

        let probes = client.service_names().map(|service_name| async move {
            debug!("Probing status of {}", service_name);
            (service_name, self.probe(client, service_name).await)
        });

        let mut services = Map::new();
        let mut problems = Vec::new();

        for (service_name, result) in join_all(probes).await {
            match result {
                Ok(body) => {
                    services.insert(service_name.to_string(), Value::Object(body));
                }
                Err(failure) => {
                    warn!("Status probe of {} failed: {:?}", service_name, failure);
                    problems.push(failure.into_problem(service_name));
                }
            }
        }

        diagnostics.insert(SERVICES_DIAGNOSTICS_KEY, Value::Object(services));

        problems
    }
}
