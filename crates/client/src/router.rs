//! Routing of calls to per-service clients.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use soa_serializer::{AnySerializer, Serializer};
use soa_transport::Transport;

use crate::client::{CallOptions, Client};
use crate::config::{ClientConfig, ServiceConfig};
use crate::error::{Error, Result};
use crate::middleware::Middleware;
use crate::types::{ActionRequest, ActionResponse, Body, JobResponse};

/// Object-safe view of a client bound to one service.
#[async_trait]
pub trait ActionCaller: Send + Sync + 'static {
    /// The service calls are sent to.
    fn service_name(&self) -> &str;

    /// Sends one job and returns its response.
    async fn call_actions(
        &self,
        actions: Vec<ActionRequest>,
        options: CallOptions,
    ) -> Result<JobResponse>;
}

#[async_trait]
impl<T, S> ActionCaller for Client<T, S>
where
    T: Transport,
    S: Serializer,
{
    fn service_name(&self) -> &str {
        Self::service_name(self)
    }

    async fn call_actions(
        &self,
        actions: Vec<ActionRequest>,
        options: CallOptions,
    ) -> Result<JobResponse> {
        Self::call_actions(self, actions, options).await
    }
}

/// Calls any of a set of configured services by name.
#[derive(Clone, Default)]
pub struct ClientRouter {
    clients: BTreeMap<String, Arc<dyn ActionCaller>>,
}

impl ClientRouter {
    /// Creates a router with no services.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one client per configured service.
    ///
    /// `transport_for` supplies the transport for each service; every client
    /// gets the shared `middleware` in the given order.
    pub fn from_config<F>(
        config: &ClientConfig,
        middleware: &[Arc<dyn Middleware>],
        mut transport_for: F,
    ) -> Self
    where
        F: FnMut(&str, &ServiceConfig) -> Arc<dyn Transport>,
    {
        let mut router = Self::new();

        for (name, service) in &config.services {
            let transport = transport_for(name, service);
            let mut client = Client::new(name.clone(), transport, AnySerializer::from(service.serializer))
                .with_default_switches(service.switches.clone());
            if let Some(timeout) = service.timeout() {
                client = client.with_default_timeout(timeout);
            }
            for m in middleware {
                client = client.with_middleware(Arc::clone(m));
            }
            router.insert(client);
        }

        router
    }

    /// Registers a client under its service name, replacing any previous one.
    pub fn insert(&mut self, caller: impl ActionCaller) {
        self.clients
            .insert(caller.service_name().to_string(), Arc::new(caller));
    }

    /// Adds a client, builder style.
    #[must_use]
    pub fn with_client(mut self, caller: impl ActionCaller) -> Self {
        self.insert(caller);
        self
    }

    /// Whether no services are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Number of configured services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Configured service names in ascending order.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    fn client(&self, service_name: &str) -> Result<&Arc<dyn ActionCaller>> {
        self.clients
            .get(service_name)
            .ok_or_else(|| Error::UnknownService(service_name.to_string()))
    }

    /// Sends a job to the named service.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnknownService`] for unconfigured services and
    /// otherwise exactly as [`Client::call_actions`] does.
    pub async fn call_actions(
        &self,
        service_name: &str,
        actions: Vec<ActionRequest>,
        options: CallOptions,
    ) -> Result<JobResponse> {
        self.client(service_name)?
            .call_actions(actions, options)
            .await
    }

    /// Sends a single action to the named service.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnknownService`] for unconfigured services and
    /// otherwise exactly as [`Client::call_action`] does.
    pub async fn call_action(
        &self,
        service_name: &str,
        action: impl Into<String> + Send,
        body: Option<Body>,
        options: CallOptions,
    ) -> Result<ActionResponse> {
        let mut request = ActionRequest::new(action);
        if let Some(body) = body {
            request.body = body;
        }
        let action = request.action.clone();

        self.call_actions(service_name, vec![request], options)
            .await?
            .actions
            .into_iter()
            .next()
            .ok_or(Error::MissingActionResponse(action))
    }
}

impl Debug for ClientRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRouter")
            .field("services", &self.clients.keys().collect::<Vec<_>>())
            .finish()
    }
}
