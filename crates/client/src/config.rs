//! Client settings: which services this process calls and how.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use soa_serializer::SerializerKind;

use crate::error::Result;
use crate::types::Switches;

/// Settings for every service a process calls, keyed by service name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-service settings.
    pub services: BTreeMap<String, ServiceConfig>,
}

impl ClientConfig {
    /// Parses settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the document is invalid.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        Ok(toml::from_str(document)?)
    }

    /// Whether no services are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Settings for calling one service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Encoding used for jobs sent to this service.
    pub serializer: SerializerKind,
    /// Default round-trip timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Switches added to every job sent to this service.
    pub switches: Switches,
}

impl ServiceConfig {
    /// The default round-trip timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
