//! Job and action request/response types exchanged with services.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form body of an action request or response.
pub type Body = Map<String, Value>;

/// Opaque feature-flag identifiers passed through to the service.
pub type Switches = BTreeSet<u32>;

/// Control block keys owned by the client.
pub(crate) const RESERVED_CONTROL_KEYS: [&str; 3] =
    ["correlation_id", "switches", "continue_on_error"];

/// Error information for a failed job or action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Invariant error code for categorization.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// The request field the error refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorInfo {
    /// Creates an error not tied to a particular field.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        Ok(())
    }
}

/// Renders a list of errors as `[code: message, ...]`.
#[must_use]
pub fn describe_errors(errors: &[ErrorInfo]) -> String {
    let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

/// One unit of work within a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Name of the action to run.
    pub action: String,
    /// Action arguments. Omitted from the wire when empty.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub body: Body,
}

impl ActionRequest {
    /// Creates a request for `action` with an empty body.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            body: Body::new(),
        }
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }
}

/// The outcome of one action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Name of the action this responds to.
    pub action: String,
    /// Action results.
    #[serde(default)]
    pub body: Body,
    /// Errors raised by the action, empty on success.
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
}

impl ActionResponse {
    /// Whether the action reported any errors.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Control block of a job request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// Log-oriented identifier of the job.
    pub correlation_id: String,
    /// Switches enabled for this job.
    #[serde(default)]
    pub switches: Switches,
    /// Whether the service keeps running actions after one fails.
    #[serde(default)]
    pub continue_on_error: bool,
    /// Caller-supplied control fields.
    #[serde(flatten)]
    pub extra: Body,
}

/// A batch of actions sent to one service in one round trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Control information.
    pub control: Control,
    /// Context shared by all actions. Omitted from the wire when empty.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Body,
    /// Actions to run, in order.
    pub actions: Vec<ActionRequest>,
}

/// The service's answer to a [`JobRequest`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    /// Job-level errors, such as an unknown action or malformed request.
    #[serde(default)]
    pub errors: Vec<ErrorInfo>,
    /// Context returned by the service.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Body,
    /// One response per requested action, in request order.
    #[serde(default)]
    pub actions: Vec<ActionResponse>,
}

impl JobResponse {
    /// The action responses that carry errors, in original order.
    #[must_use]
    pub fn failed_actions(&self) -> Vec<ActionResponse> {
        self.actions
            .iter()
            .filter(|action| action.is_error())
            .cloned()
            .collect()
    }
}
