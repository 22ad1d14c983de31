use std::sync::Arc;

use soa_client::ActionResponse;
use tracing::{debug, instrument};

use crate::check::{HealthCheck, HealthChecks};
use crate::client_settings::{CLIENT_SETTINGS_CHECK, ClientSettingsCheck};
use crate::config::StatusConfig;
use crate::error::StatusError;
use crate::problem::Diagnostics;
use crate::request::{HealthCheckReport, StatusRequest, StatusResponse};

/// Name of the status action.
pub const STATUS_ACTION: &str = "status";

/// Version of this framework, reported as `soa`.
pub const FRAMEWORK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rust version the framework targets, reported as `rust`.
pub const RUST_VERSION: &str = env!("CARGO_PKG_RUST_VERSION");

/// Reports a service's version information and the outcome of its health checks.
#[derive(Debug)]
pub struct StatusAction {
    config: StatusConfig,
    checks: HealthChecks,
}

impl StatusAction {
    /// Creates a status action. The client settings check is enabled when
    /// the configuration asks for it.
    #[must_use]
    pub fn new(config: StatusConfig) -> Self {
        let mut action = Self {
            config,
            checks: HealthChecks::new(),
        };
        if action.config.client_settings_check {
            action.enable_client_settings_check();
        }
        action
    }

    /// Registers a health check.
    #[must_use]
    pub fn with_check(mut self, name: impl Into<String>, check: impl HealthCheck) -> Self {
        self.checks.register(name, check);
        self
    }

    /// Registers every check of a shared registry.
    #[must_use]
    pub fn with_checks(mut self, checks: &HealthChecks) -> Self {
        self.checks.extend(checks);
        self
    }

    /// Turns on recursive status probing of every dependent service.
    pub fn enable_client_settings_check(&mut self) {
        self.checks.register_shared(
            CLIENT_SETTINGS_CHECK,
            Arc::new(ClientSettingsCheck::new(self.config.dependency_timeout())),
        );
    }

    /// The registered health checks.
    #[must_use]
    pub const fn checks(&self) -> &HealthChecks {
        &self.checks
    }

    /// Builds the status response.
    ///
    /// With `verbose: false` only the identity block is returned and no
    /// health check is invoked.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::InvalidRequest`] for a malformed request body.
    #[instrument(skip_all, fields(version = %self.config.version))]
    pub async fn run(&self, request: &StatusRequest) -> Result<StatusResponse, StatusError> {
        let verbose = request.verbose()?;

        let mut response = StatusResponse {
            version: self.config.version.clone(),
            rust: RUST_VERSION.to_string(),
            soa: FRAMEWORK_VERSION.to_string(),
            build: self.config.build.clone(),
            healthcheck: None,
        };

        if !verbose {
            return Ok(response);
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut diagnostics = Diagnostics::new();

        for (name, check) in self.checks.enabled() {
            debug!("Running health check {}", name);

            let mut scratch = Diagnostics::new();
            for problem in check.check(request, &mut scratch).await {
                if problem.is_error {
                    errors.push((problem.code, problem.description));
                } else {
                    warnings.push((problem.code, problem.description));
                }
            }
            diagnostics.merge(scratch);
        }

        response.healthcheck = Some(HealthCheckReport {
            errors,
            warnings,
            diagnostics: diagnostics.into_inner(),
        });

        Ok(response)
    }

    /// Answers a status request as an action response.
    ///
    /// Request validation failures are reported in the response's errors.
    pub async fn handle(&self, request: &StatusRequest) -> ActionResponse {
        match self.run(request).await.and_then(StatusResponse::into_body) {
            Ok(body) => ActionResponse {
                action: STATUS_ACTION.to_string(),
                body,
                errors: Vec::new(),
            },
            Err(error) => ActionResponse {
                action: STATUS_ACTION.to_string(),
                body: soa_client::Body::new(),
                errors: vec![error.to_error_info()],
            },
        }
    }
}
