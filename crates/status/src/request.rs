//! Wire shapes of the status action.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use soa_client::{Body, ClientRouter};

use crate::error::StatusError;

/// An inbound status request as handed to the status action and its checks.
#[derive(Clone, Debug, Default)]
pub struct StatusRequest {
    /// Request body. The only recognised field is `verbose`.
    pub body: Option<Body>,
    /// Clients for the services this service calls.
    pub client: Option<Arc<ClientRouter>>,
}

impl StatusRequest {
    /// Creates a request with the given body.
    #[must_use]
    pub fn new(body: Option<Body>) -> Self {
        Self { body, client: None }
    }

    /// Creates a request asking only for the baseline identity block.
    #[must_use]
    pub fn terse() -> Self {
        let mut body = Body::new();
        body.insert("verbose".to_string(), Value::Bool(false));
        Self::new(Some(body))
    }

    /// Attaches the clients used by recursive checks.
    #[must_use]
    pub fn with_client(mut self, client: Arc<ClientRouter>) -> Self {
        self.client = Some(client);
        self
    }

    /// Whether the full health check was requested. Defaults to `true`.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::InvalidRequest`] for unknown fields or a
    /// non-boolean `verbose`.
    pub fn verbose(&self) -> Result<bool, StatusError> {
        let Some(body) = &self.body else {
            return Ok(true);
        };

        if let Some(field) = body.keys().find(|key| key.as_str() != "verbose") {
            return Err(StatusError::InvalidRequest {
                field: field.clone(),
                message: "Extra field".to_string(),
            });
        }

        match body.get("verbose") {
            None => Ok(true),
            Some(Value::Bool(verbose)) => Ok(*verbose),
            Some(_) => Err(StatusError::InvalidRequest {
                field: "verbose".to_string(),
                message: "Not a boolean".to_string(),
            }),
        }
    }
}

/// Outcome of the health checks: `(code, description)` pairs plus diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckReport {
    /// Error-level problems.
    #[serde(default)]
    pub errors: Vec<(String, String)>,
    /// Warning-level problems.
    #[serde(default)]
    pub warnings: Vec<(String, String)>,
    /// Additional data reported by the checks.
    #[serde(default)]
    pub diagnostics: Map<String, Value>,
}

/// Body of a status response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Version of the responding service.
    pub version: String,
    /// Rust version the service was built for.
    pub rust: String,
    /// Version of the framework in use.
    pub soa: String,
    /// Build string, if the service has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Present only when the full health check ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheckReport>,
}

impl StatusResponse {
    /// Converts the response into an action response body.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Encode`] if a diagnostic value cannot be encoded.
    pub fn into_body(self) -> Result<Body, StatusError> {
        match serde_json::to_value(self)? {
            Value::Object(body) => Ok(body),
            other => Err(StatusError::Encode(serde::ser::Error::custom(format!(
                "expected an object, got {other}"
            )))),
        }
    }
}
