//! Health check operations and their registry.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;

use crate::problem::{Diagnostics, Problem};
use crate::request::StatusRequest;

/// Registry names must start with this prefix for the check to run.
pub const CHECK_PREFIX: &str = "check_";

/// A health check operation.
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    /// Runs the check. An empty result means no problems were found.
    async fn check(&self, request: &StatusRequest, diagnostics: &mut Diagnostics) -> Vec<Problem>;
}

/// Adapts a synchronous function into a [`HealthCheck`].
pub struct FnCheck<F>(F);

/// Wraps a synchronous function as a health check.
pub const fn check_fn<F>(f: F) -> FnCheck<F>
where
    F: Fn(&StatusRequest, &mut Diagnostics) -> Vec<Problem> + Send + Sync + 'static,
{
    FnCheck(f)
}

#[async_trait]
impl<F> HealthCheck for FnCheck<F>
where
    F: Fn(&StatusRequest, &mut Diagnostics) -> Vec<Problem> + Send + Sync + 'static,
{
    async fn check(&self, request: &StatusRequest, diagnostics: &mut Diagnostics) -> Vec<Problem> {
        (self.0)(request, diagnostics)
    }
}

/// Named health checks, run in ascending name order.
///
/// Entries whose names lack [`CHECK_PREFIX`] stay registered but disabled,
/// so a registry can carry optional checks that a service switches on by
/// re-registering them under a `check_` name.
#[derive(Clone, Default)]
pub struct HealthChecks {
    checks: BTreeMap<String, Arc<dyn HealthCheck>>,
}

impl HealthChecks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check, replacing any check of the same name.
    pub fn register(&mut self, name: impl Into<String>, check: impl HealthCheck) {
        self.register_shared(name, Arc::new(check));
    }

    /// Registers an already shared check.
    pub fn register_shared(&mut self, name: impl Into<String>, check: Arc<dyn HealthCheck>) {
        self.checks.insert(name.into(), check);
    }

    /// Adds every check of `other`. Checks in `other` win on name clashes.
    pub fn extend(&mut self, other: &Self) {
        for (name, check) in &other.checks {
            self.checks.insert(name.clone(), Arc::clone(check));
        }
    }

    /// Looks up a check by name, enabled or not.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn HealthCheck>> {
        self.checks.get(name)
    }

    /// The checks that will run, in order.
    pub fn enabled(&self) -> impl Iterator<Item = (&str, &Arc<dyn HealthCheck>)> {
        self.checks
            .iter()
            .filter(|(name, _)| name.starts_with(CHECK_PREFIX))
            .map(|(name, check)| (name.as_str(), check))
    }
}

impl Debug for HealthChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.checks.keys()).finish()
    }
}
