//! Per-service status configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StatusError;

fn default_dependency_timeout_ms() -> u64 {
    2000
}

/// Identity and behaviour of a service's status action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Version of the service.
    pub version: String,
    /// Build string of the service, if any.
    #[serde(default)]
    pub build: Option<String>,
    /// Whether to probe the status of every configured dependent service.
    #[serde(default)]
    pub client_settings_check: bool,
    /// Timeout for each dependent-service probe in milliseconds
    #[serde(default = "default_dependency_timeout_ms")]
    pub dependency_timeout_ms: u64,
}

impl StatusConfig {
    /// Creates a configuration with only the required version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build: None,
            client_settings_check: false,
            dependency_timeout_ms: default_dependency_timeout_ms(),
        }
    }

    /// Sets the build string.
    #[must_use]
    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    /// Parses a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Config`] if the document is invalid or lacks a
    /// version.
    pub fn from_toml_str(document: &str) -> Result<Self, StatusError> {
        Ok(toml::from_str(document)?)
    }

    /// Timeout applied to each dependent-service probe.
    #[must_use]
    pub const fn dependency_timeout(&self) -> Duration {
        Duration::from_millis(self.dependency_timeout_ms)
    }
}
