//! Standard `status` action with pluggable health checks.
//!
//! Every service answers `status` with its version, the Rust and framework
//! versions, and an optional build string. Unless the request sets
//! `verbose: false`, the registered health checks run too and their problems
//! and diagnostics are returned under `healthcheck`.
//!
//! The optional [`ClientSettingsCheck`] calls `status` with `verbose: false`
//! on every service this service is configured to call, which guarantees no
//! further recursion, and classifies each failure by origin.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod action;
mod check;
mod client_settings;
mod config;
mod error;
mod problem;
mod request;

pub use action::{FRAMEWORK_VERSION, RUST_VERSION, STATUS_ACTION, StatusAction};
pub use check::{CHECK_PREFIX, FnCheck, HealthCheck, HealthChecks, check_fn};
pub use client_settings::{
    CLIENT_SETTINGS_CHECK, ClientSettingsCheck, ProbeFailure, SERVICES_DIAGNOSTICS_KEY,
};
pub use config::StatusConfig;
pub use error::StatusError;
pub use problem::{Diagnostics, Problem};
pub use request::{HealthCheckReport, StatusRequest, StatusResponse};
