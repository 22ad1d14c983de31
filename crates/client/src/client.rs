use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashSet;
use futures::stream::{self, Stream, TryStreamExt};
use soa_serializer::Serializer;
use soa_transport::{Metadata, RequestId, Transport, TransportError};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{CallActionError, Error, JobError, Result};
use crate::middleware::Middleware;
use crate::types::{
    ActionRequest, ActionResponse, Body, Control, JobRequest, JobResponse,
    RESERVED_CONTROL_KEYS, Switches,
};

/// Optional parameters of a single call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallOptions {
    /// Context shared by every action in the job.
    pub context: Body,
    /// Switches enabled for the job.
    pub switches: Switches,
    /// Correlation id to use instead of a freshly generated one.
    pub correlation_id: Option<String>,
    /// Whether the service keeps running actions after one fails.
    pub continue_on_error: bool,
    /// Additional control fields. Client-owned control keys are ignored.
    pub control_extra: Body,
    /// Deadline for the whole round trip.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Sets the job context.
    #[must_use]
    pub fn with_context(mut self, context: Body) -> Self {
        self.context = context;
        self
    }

    /// Sets the job switches.
    #[must_use]
    pub fn with_switches(mut self, switches: impl IntoIterator<Item = u32>) -> Self {
        self.switches = switches.into_iter().collect();
        self
    }

    /// Uses a caller-chosen correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Asks the service to keep going after a failed action.
    #[must_use]
    pub const fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Adds extra control fields.
    #[must_use]
    pub fn with_control_extra(mut self, control_extra: Body) -> Self {
        self.control_extra = control_extra;
        self
    }

    /// Bounds the round trip.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Sends jobs to one service and collects the answers.
///
/// Responses are matched to requests by the request id the client assigns,
/// never by correlation id. Round trips on one client are serialized so that
/// concurrent callers cannot steal each other's responses. Requests given up
/// on, for example after a timeout, are remembered so their late responses
/// are discarded instead of failing a later call.
pub struct Client<T, S>
where
    T: Transport,
    S: Serializer,
{
    service_name: String,
    transport: T,
    serializer: S,
    middleware: Vec<Arc<dyn Middleware>>,
    request_counter: AtomicU64,
    round_trip: Mutex<()>,
    abandoned: DashSet<RequestId>,
    default_timeout: Option<Duration>,
    default_switches: Switches,
}

impl<T, S> Client<T, S>
where
    T: Transport,
    S: Serializer,
{
    /// Creates a client for `service_name`.
    pub fn new(service_name: impl Into<String>, transport: T, serializer: S) -> Self {
        Self {
            service_name: service_name.into(),
            transport,
            serializer,
            middleware: Vec::new(),
            request_counter: AtomicU64::new(0),
            round_trip: Mutex::new(()),
            abandoned: DashSet::new(),
            default_timeout: None,
            default_switches: Switches::new(),
        }
    }

    /// Appends a middleware. Middleware runs in the order it was added.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Timeout applied to calls that do not set their own.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Switches added to every call.
    #[must_use]
    pub fn with_default_switches(mut self, switches: Switches) -> Self {
        self.default_switches = switches;
        self
    }

    /// The service this client talks to.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The serializer used to encode jobs.
    pub const fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Generates a fresh correlation id.
    #[must_use]
    pub fn generate_correlation_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Builds the metadata handed to the transport with every request.
    pub fn prepare_metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_content_type(self.serializer.content_type());
        self.transport.prepare_metadata(&mut metadata);
        metadata
    }

    /// Encodes and sends a job request, returning its request id.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::EmptyJob`] when the job has no actions, and passes
    /// serializer and transport failures through unchanged.
    pub async fn send_request(&self, mut job_request: JobRequest) -> Result<RequestId> {
        if job_request.actions.is_empty() {
            return Err(Error::EmptyJob);
        }

        let request_id = self.request_counter.fetch_add(1, Ordering::SeqCst);
        let metadata = self.prepare_metadata();

        for middleware in &self.middleware {
            middleware.process_job_request(request_id, &metadata, &mut job_request);
        }

        let payload = self.serializer.encode(&job_request)?;

        debug!(
            "Sending request {} to {} ({} bytes)",
            request_id,
            self.service_name,
            payload.len()
        );

        self.transport
            .send_request_message(request_id, &metadata, payload)
            .await?;

        Ok(request_id)
    }

    /// Receives every response currently available from the transport.
    ///
    /// The stream ends when the transport reports that no more messages are
    /// available. A decoding or transport failure is yielded as an error and
    /// ends the stream.
    pub fn receive_responses(&self) -> impl Stream<Item = Result<(RequestId, JobResponse)>> + '_ {
        stream::try_unfold(self, |client| async move {
            client
                .receive_next()
                .await
                .map(|next| next.map(|item| (item, client)))
        })
    }

    async fn receive_next(&self) -> Result<Option<(RequestId, JobResponse)>> {
        let Some(message) = self.transport.receive_response_message().await? else {
            return Ok(None);
        };

        let mut job_response: JobResponse = self.serializer.decode(&message.payload)?;

        for middleware in &self.middleware {
            middleware.process_job_response(message.request_id, &message.metadata, &mut job_response);
        }

        debug!(
            "Received response {} from {}",
            message.request_id, self.service_name
        );

        Ok(Some((message.request_id, job_response)))
    }

    /// Sends one job and returns its response.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Job`] if the job failed as a whole and with
    /// [`Error::CallAction`] if any action failed. Protocol violations
    /// ([`Error::ResponseIdMismatch`], [`Error::NoResponse`],
    /// [`Error::ExtraResponses`]) and transport or serializer failures are
    /// fatal.
    #[instrument(skip(self, actions, options), fields(service = %self.service_name))]
    pub async fn call_actions(
        &self,
        actions: Vec<ActionRequest>,
        options: CallOptions,
    ) -> Result<JobResponse> {
        let timeout = options.timeout.or(self.default_timeout);
        let job_request = self.build_job_request(actions, options);

        let response = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.round_trip(job_request))
                .await
                .map_err(|_| TransportError::Timeout(timeout))??,
            None => self.round_trip(job_request).await?,
        };

        if !response.errors.is_empty() {
            return Err(JobError {
                errors: response.errors,
            }
            .into());
        }

        let failed = response.failed_actions();
        if !failed.is_empty() {
            return Err(CallActionError { actions: failed }.into());
        }

        Ok(response)
    }

    /// Sends a single action and returns its response.
    ///
    /// # Errors
    ///
    /// Fails exactly as [`Client::call_actions`] does.
    pub async fn call_action(
        &self,
        action: impl Into<String> + Send,
        body: Option<Body>,
        options: CallOptions,
    ) -> Result<ActionResponse> {
        let mut request = ActionRequest::new(action);
        if let Some(body) = body {
            request.body = body;
        }
        let action = request.action.clone();

        self.call_actions(vec![request], options)
            .await?
            .actions
            .into_iter()
            .next()
            .ok_or(Error::MissingActionResponse(action))
    }

    fn build_job_request(&self, actions: Vec<ActionRequest>, options: CallOptions) -> JobRequest {
        let mut extra = options.control_extra;
        for key in RESERVED_CONTROL_KEYS {
            extra.remove(key);
        }

        let mut switches = options.switches;
        switches.extend(self.default_switches.iter().copied());

        JobRequest {
            control: Control {
                correlation_id: options
                    .correlation_id
                    .unwrap_or_else(Self::generate_correlation_id),
                switches,
                continue_on_error: options.continue_on_error,
                extra,
            },
            context: options.context,
            actions,
        }
    }

    /// Gives up on a sent request. Its response, if it ever arrives, is dropped.
    fn abandon(&self, request_id: RequestId) {
        warn!("Abandoning request {} to {}", request_id, self.service_name);
        self.abandoned.insert(request_id);
        self.transport.abandon_request(request_id);
    }

    /// Whether a received response answers a request given up on earlier.
    fn is_stale(&self, request_id: RequestId) -> bool {
        if self.abandoned.remove(&request_id).is_some() {
            warn!(
                "Discarding late response {} from {}",
                request_id, self.service_name
            );
            return true;
        }
        false
    }

    async fn round_trip(&self, job_request: JobRequest) -> Result<JobResponse> {
        let _guard = self.round_trip.lock().await;

        let request_id = self.send_request(job_request).await?;
        let mut pending = Pending {
            client: self,
            request_id,
            settled: false,
        };

        let received: Vec<(RequestId, JobResponse)> =
            self.receive_responses().try_collect().await?;
        let responses: Vec<(RequestId, JobResponse)> = received
            .into_iter()
            .filter(|(response_id, _)| !self.is_stale(*response_id))
            .collect();

        if responses.iter().any(|(response_id, _)| *response_id == request_id) {
            pending.settled = true;
        }

        let count = responses.len();
        let Some((response_id, response)) = responses.into_iter().next() else {
            warn!("No response received for request {}", request_id);
            return Err(Error::NoResponse(request_id));
        };

        if response_id != request_id {
            warn!(
                "Got response with ID {} for request with ID {}",
                response_id, request_id
            );
            return Err(Error::ResponseIdMismatch {
                expected: request_id,
                actual: response_id,
            });
        }

        if count > 1 {
            warn!("Received {} responses for request {}", count, request_id);
            return Err(Error::ExtraResponses { request_id, count });
        }

        Ok(response)
    }
}

/// A sent request awaiting its response. Dropping it unsettled, as a timeout
/// does, abandons the request.
struct Pending<'a, T, S>
where
    T: Transport,
    S: Serializer,
{
    client: &'a Client<T, S>,
    request_id: RequestId,
    settled: bool,
}

impl<T, S> Drop for Pending<'_, T, S>
where
    T: Transport,
    S: Serializer,
{
    fn drop(&mut self) {
        if !self.settled {
            self.client.abandon(self.request_id);
        }
    }
}

impl<T, S> Debug for Client<T, S>
where
    T: Transport,
    S: Serializer,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service_name", &self.service_name)
            .field("serializer", &self.serializer)
            .field("middleware", &self.middleware.len())
            .field("request_counter", &self.request_counter)
            .field("abandoned", &self.abandoned.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use soa_serializer::{JsonSerializer, SerializerError};
    use soa_transport::ResponseMessage;

    use crate::types::ErrorInfo;

    type Responder = Box<dyn Fn(RequestId, &JobRequest) -> Vec<(RequestId, JobResponse)> + Send + Sync>;

    struct StubTransport {
        responder: Responder,
        send_error: Option<TransportError>,
        inbox: StdMutex<VecDeque<ResponseMessage>>,
        sent: StdMutex<Vec<(RequestId, Metadata, JobRequest)>>,
    }

    impl StubTransport {
        fn new(
            responder: impl Fn(RequestId, &JobRequest) -> Vec<(RequestId, JobResponse)>
            + Send
            + Sync
            + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                responder: Box::new(responder),
                send_error: None,
                inbox: StdMutex::new(VecDeque::new()),
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn echo() -> Arc<Self> {
            Self::new(|request_id, job| vec![(request_id, echo_response(job))])
        }

        fn failing(error: TransportError) -> Arc<Self> {
            Arc::new(Self {
                responder: Box::new(|_, _| Vec::new()),
                send_error: Some(error),
                inbox: StdMutex::new(VecDeque::new()),
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn push_raw(&self, request_id: RequestId, payload: &'static [u8]) {
            self.inbox.lock().unwrap().push_back(ResponseMessage {
                request_id,
                metadata: Metadata::new(),
                payload: Bytes::from_static(payload),
            });
        }

        fn sent_jobs(&self) -> Vec<(RequestId, Metadata, JobRequest)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send_request_message(
            &self,
            request_id: RequestId,
            metadata: &Metadata,
            payload: Bytes,
        ) -> std::result::Result<(), TransportError> {
            if let Some(error) = &self.send_error {
                return Err(error.clone());
            }

            let job: JobRequest = JsonSerializer.decode(&payload).unwrap();
            let mut inbox = self.inbox.lock().unwrap();
            for (response_id, response) in (self.responder)(request_id, &job) {
                inbox.push_back(ResponseMessage {
                    request_id: response_id,
                    metadata: Metadata::new(),
                    payload: JsonSerializer.encode(&response).unwrap(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((request_id, metadata.clone(), job));
            Ok(())
        }

        async fn receive_response_message(
            &self,
        ) -> std::result::Result<Option<ResponseMessage>, TransportError> {
            Ok(self.inbox.lock().unwrap().pop_front())
        }

        fn prepare_metadata(&self, metadata: &mut Metadata) {
            metadata.insert("route", "stub");
        }
    }

    struct SilentTransport;

    #[async_trait]
    impl Transport for SilentTransport {
        async fn send_request_message(
            &self,
            _request_id: RequestId,
            _metadata: &Metadata,
            _payload: Bytes,
        ) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn receive_response_message(
            &self,
        ) -> std::result::Result<Option<ResponseMessage>, TransportError> {
            futures::future::pending().await
        }
    }

    struct RecordingMiddleware {
        label: &'static str,
        log: Arc<StdMutex<Vec<String>>>,
    }

    impl Middleware for RecordingMiddleware {
        fn process_job_request(
            &self,
            request_id: RequestId,
            _metadata: &Metadata,
            job_request: &mut JobRequest,
        ) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:request:{request_id}", self.label));
            job_request
                .context
                .insert(self.label.to_string(), json!(request_id));
        }

        fn process_job_response(
            &self,
            request_id: RequestId,
            _metadata: &Metadata,
            _job_response: &mut JobResponse,
        ) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:response:{request_id}", self.label));
        }
    }

    fn echo_response(job: &JobRequest) -> JobResponse {
        JobResponse {
            actions: job
                .actions
                .iter()
                .map(|action| ActionResponse {
                    action: action.action.clone(),
                    body: action.body.clone(),
                    errors: Vec::new(),
                })
                .collect(),
            ..JobResponse::default()
        }
    }

    fn body(value: serde_json::Value) -> Body {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("body must be an object"),
        }
    }

    fn client(transport: Arc<StubTransport>) -> Client<Arc<StubTransport>, JsonSerializer> {
        Client::new("example", transport, JsonSerializer)
    }

    #[tokio::test]
    async fn test_send_request_ids_increment() {
        let client = client(StubTransport::echo());

        for expected in 0..5 {
            let job = client.build_job_request(vec![ActionRequest::new("ping")], CallOptions::default());
            assert_eq!(client.send_request(job).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_empty_job_rejected_without_consuming_id() {
        let transport = StubTransport::echo();
        let client = client(Arc::clone(&transport));

        let job = client.build_job_request(Vec::new(), CallOptions::default());
        assert_matches!(client.send_request(job).await, Err(Error::EmptyJob));
        assert!(transport.sent_jobs().is_empty());

        let job = client.build_job_request(vec![ActionRequest::new("ping")], CallOptions::default());
        assert_eq!(client.send_request(job).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_metadata_includes_content_type_and_transport_hints() {
        let transport = StubTransport::echo();
        let client = client(Arc::clone(&transport));

        client
            .call_action("ping", None, CallOptions::default())
            .await
            .unwrap();

        let (_, metadata, _) = &transport.sent_jobs()[0];
        assert_eq!(metadata.content_type(), Some("application/json"));
        assert_eq!(metadata.get("route"), Some("stub"));
    }

    #[tokio::test]
    async fn test_call_actions_preserves_order() {
        let client = client(StubTransport::echo());

        let response = client
            .call_actions(
                vec![
                    ActionRequest::new("first").with_body(body(json!({"n": 1}))),
                    ActionRequest::new("second"),
                    ActionRequest::new("third").with_body(body(json!({"n": 3}))),
                ],
                CallOptions::default(),
            )
            .await
            .unwrap();

        let names: Vec<&str> = response.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(response.actions[2].body, body(json!({"n": 3})));
    }

    #[tokio::test]
    async fn test_call_action_echoes_body() {
        let client = client(StubTransport::echo());

        let response = client
            .call_action("ping", Some(body(json!({"x": 1}))), CallOptions::default())
            .await
            .unwrap();

        assert_eq!(response.action, "ping");
        assert_eq!(response.body, body(json!({"x": 1})));
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_call_actions_collects_every_failed_action() {
        let client = client(StubTransport::new(|request_id, job| {
            let mut response = echo_response(job);
            for action in &mut response.actions {
                if action.action.starts_with("bad") {
                    action.errors.push(ErrorInfo::new("BAD", action.action.clone()));
                }
            }
            vec![(request_id, response)]
        }));

        let result = client
            .call_actions(
                vec![
                    ActionRequest::new("bad_one"),
                    ActionRequest::new("good"),
                    ActionRequest::new("bad_two"),
                ],
                CallOptions::default().continue_on_error(),
            )
            .await;

        let error = assert_matches!(result, Err(Error::CallAction(error)) => error);
        let failed: Vec<&str> = error.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(failed, vec!["bad_one", "bad_two"]);
        assert_eq!(error.actions[1].errors, vec![ErrorInfo::new("BAD", "bad_two")]);
    }

    #[tokio::test]
    async fn test_job_errors_reported_before_action_errors() {
        let client = client(StubTransport::new(|request_id, job| {
            let mut response = echo_response(job);
            response.errors.push(ErrorInfo::new("UNKNOWN", "no such action"));
            response.actions[0]
                .errors
                .push(ErrorInfo::new("BAD", "also bad"));
            vec![(request_id, response)]
        }));

        let result = client.call_action("ping", None, CallOptions::default()).await;

        let error = assert_matches!(result, Err(Error::Job(error)) => error);
        assert_eq!(error.errors, vec![ErrorInfo::new("UNKNOWN", "no such action")]);
    }

    #[tokio::test]
    async fn test_response_id_mismatch_is_fatal() {
        let client = client(StubTransport::new(|request_id, job| {
            vec![(request_id + 1, echo_response(job))]
        }));

        let result = client.call_action("ping", None, CallOptions::default()).await;

        assert_matches!(
            result,
            Err(Error::ResponseIdMismatch {
                expected: 0,
                actual: 1
            })
        );
    }

    #[tokio::test]
    async fn test_no_response() {
        let client = client(StubTransport::new(|_, _| Vec::new()));

        let result = client.call_action("ping", None, CallOptions::default()).await;

        assert_matches!(result, Err(Error::NoResponse(0)));
    }

    #[tokio::test]
    async fn test_late_response_to_abandoned_request_is_dropped() {
        let transport = StubTransport::new(|request_id, job| {
            if request_id == 0 {
                Vec::new()
            } else {
                vec![(request_id, echo_response(job))]
            }
        });
        let client = client(Arc::clone(&transport));

        let result = client.call_action("ping", None, CallOptions::default()).await;
        assert_matches!(result, Err(Error::NoResponse(0)));

        // The answer to request 0 turns up during the next call.
        transport.push_raw(0, br#"{"actions":[{"action":"ping"}]}"#);
        let response = client
            .call_action("ping", Some(body(json!({"n": 1}))), CallOptions::default())
            .await
            .unwrap();
        assert_eq!(response.body, body(json!({"n": 1})));

        // Discarded once; a second copy is a protocol error again.
        transport.push_raw(0, br#"{"actions":[{"action":"ping"}]}"#);
        let result = client.call_action("ping", None, CallOptions::default()).await;
        assert_matches!(
            result,
            Err(Error::ResponseIdMismatch {
                expected: 2,
                actual: 0
            })
        );
    }

    #[tokio::test]
    async fn test_extra_responses_are_a_protocol_error() {
        let client = client(StubTransport::new(|request_id, job| {
            vec![
                (request_id, echo_response(job)),
                (request_id, echo_response(job)),
            ]
        }));

        let result = client.call_action("ping", None, CallOptions::default()).await;

        assert_matches!(
            result,
            Err(Error::ExtraResponses {
                request_id: 0,
                count: 2
            })
        );
    }

    #[tokio::test]
    async fn test_missing_action_response() {
        let client = client(StubTransport::new(|request_id, _| {
            vec![(request_id, JobResponse::default())]
        }));

        let result = client.call_action("ping", None, CallOptions::default()).await;

        assert_matches!(result, Err(Error::MissingActionResponse(action)) if action == "ping");
    }

    #[tokio::test]
    async fn test_decode_failure_propagates() {
        let transport = StubTransport::new(|_, _| Vec::new());
        transport.push_raw(0, b"{not json");
        let client = client(transport);

        let result = client.call_action("ping", None, CallOptions::default()).await;

        assert_matches!(
            result,
            Err(Error::Serializer(SerializerError::DeserializationFailed(_)))
        );
    }

    #[tokio::test]
    async fn test_send_failure_propagates() {
        let client = client(StubTransport::failing(TransportError::MessageTooLarge {
            size: 10,
            max: 5,
        }));

        let result = client.call_action("ping", None, CallOptions::default()).await;

        assert_matches!(
            result,
            Err(Error::Transport(TransportError::MessageTooLarge { size: 10, max: 5 }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_transport_timeout() {
        let client = Client::new("example", SilentTransport, JsonSerializer);

        let result = client
            .call_action(
                "ping",
                None,
                CallOptions::default().with_timeout(Duration::from_secs(2)),
            )
            .await;

        assert_matches!(
            result,
            Err(Error::Transport(TransportError::Timeout(timeout))) if timeout == Duration::from_secs(2)
        );
    }

    #[tokio::test]
    async fn test_control_block() {
        let transport = StubTransport::echo();
        let client = client(Arc::clone(&transport)).with_default_switches(Switches::from([9]));

        client
            .call_action(
                "ping",
                None,
                CallOptions::default()
                    .with_correlation_id("corr-1")
                    .with_switches([2])
                    .with_context(body(json!({"user": "u1"})))
                    .with_control_extra(body(json!({
                        "correlation_id": "hijacked",
                        "continue_on_error": true,
                        "priority": "high",
                    }))),
            )
            .await
            .unwrap();

        let (_, _, job) = &transport.sent_jobs()[0];
        assert_eq!(job.control.correlation_id, "corr-1");
        assert_eq!(job.control.switches, Switches::from([2, 9]));
        assert!(!job.control.continue_on_error);
        assert_eq!(job.control.extra, body(json!({"priority": "high"})));
        assert_eq!(job.context, body(json!({"user": "u1"})));
    }

    #[tokio::test]
    async fn test_correlation_id_generated_per_call() {
        let transport = StubTransport::echo();
        let client = client(Arc::clone(&transport));

        for _ in 0..2 {
            client
                .call_action("ping", None, CallOptions::default())
                .await
                .unwrap();
        }

        let sent = transport.sent_jobs();
        let first = &sent[0].2.control.correlation_id;
        let second = &sent[1].2.control.correlation_id;
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_middleware_runs_in_registration_order() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let transport = StubTransport::echo();
        let client = client(Arc::clone(&transport))
            .with_middleware(Arc::new(RecordingMiddleware {
                label: "outer",
                log: Arc::clone(&log),
            }))
            .with_middleware(Arc::new(RecordingMiddleware {
                label: "inner",
                log: Arc::clone(&log),
            }));

        client
            .call_action("ping", None, CallOptions::default())
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "outer:request:0",
                "inner:request:0",
                "outer:response:0",
                "inner:response:0",
            ]
        );

        let (_, _, job) = &transport.sent_jobs()[0];
        assert_eq!(job.context, body(json!({"outer": 0, "inner": 0})));
    }
}
