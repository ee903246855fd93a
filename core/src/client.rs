//! Event-store client: request building, response parsing and the
//! operations that tie them together over a `Transport`.
//!
//! # Design
//! Every operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`;
//! neither touches the network. The operation methods (`stream_events`,
//! `commit_events`, `q`, `ping`, `audit`) run one request through the
//! client's transport in between. The client holds no per-call state, so a
//! single instance can be shared across threads.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{ApiError, LineDecodeError};
use crate::event::{decode_event, encode_outbound_event, EventRecord, OutboundEvent};
use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport, JSON_MEDIA_TYPE,
    NDJSON_MEDIA_TYPE, TEXT_MEDIA_TYPE,
};
use crate::ndjson::{decode_lines, Decoded};

pub const USER_AGENT: &str = concat!("eventstore-client-rust/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct StreamBody<'a> {
    subject: &'a str,
}

#[derive(Serialize)]
struct CommitBody {
    events: Vec<Value>,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
}

/// Blocking client for the event-store HTTP API.
pub struct EventStoreClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
    diagnostics: Arc<dyn Diagnostics>,
}

impl EventStoreClient<UreqTransport> {
    /// Validate the settings and build a client over the default transport.
    pub fn new(api_url: &str, api_version: &str, auth_token: &str) -> Result<Self, ApiError> {
        Ok(Self::from_config(ClientConfig::new(api_url, api_version, auth_token)?))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::from_config(&config);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> EventStoreClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replace the default `tracing` sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// All events stored under `subject`, in server order. Undecodable lines
    /// are reported to the diagnostics sink and left out.
    pub fn stream_events(&self, subject: &str) -> Result<Vec<EventRecord>, ApiError> {
        self.stream_events_report(subject).map(Decoded::into_items)
    }

    /// Like `stream_events`, but also returns the discarded lines.
    pub fn stream_events_report(&self, subject: &str) -> Result<Decoded<EventRecord>, ApiError> {
        let request = self.build_stream_events(subject)?;
        let response = self.execute("stream", &request)?;
        self.parse_stream_events(response)
    }

    /// Append `events` in order. Succeeds when the server answers 2xx.
    pub fn commit_events(&self, events: &[OutboundEvent]) -> Result<(), ApiError> {
        let request = self.build_commit_events(events)?;
        let response = self.execute("commit", &request)?;
        self.parse_commit_events(response)
    }

    /// Run `query`; each result line is returned as-is.
    pub fn q(&self, query: &str) -> Result<Vec<Value>, ApiError> {
        self.q_report(query).map(Decoded::into_items)
    }

    pub fn q_report(&self, query: &str) -> Result<Decoded<Value>, ApiError> {
        let request = self.build_q(query)?;
        let response = self.execute("q", &request)?;
        self.parse_q(response)
    }

    pub fn ping(&self) -> Result<String, ApiError> {
        let response = self.execute("ping", &self.build_ping())?;
        self.parse_text(response)
    }

    pub fn audit(&self) -> Result<String, ApiError> {
        let response = self.execute("audit", &self.build_audit())?;
        self.parse_text(response)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_stream_events(&self, subject: &str) -> Result<HttpRequest, ApiError> {
        if subject.trim().is_empty() {
            return Err(ApiError::InvalidArgument("subject must not be empty".to_string()));
        }
        let body = serde_json::to_string(&StreamBody { subject })?;
        Ok(self.post("stream", Some(NDJSON_MEDIA_TYPE), body))
    }

    pub fn build_commit_events(&self, events: &[OutboundEvent]) -> Result<HttpRequest, ApiError> {
        let body = CommitBody {
            events: events.iter().map(encode_outbound_event).collect(),
        };
        Ok(self.post("commit", None, serde_json::to_string(&body)?))
    }

    pub fn build_q(&self, query: &str) -> Result<HttpRequest, ApiError> {
        if query.trim().is_empty() {
            return Err(ApiError::InvalidArgument("query must not be empty".to_string()));
        }
        let body = serde_json::to_string(&QueryBody { query })?;
        Ok(self.post("q", Some(NDJSON_MEDIA_TYPE), body))
    }

    pub fn build_ping(&self) -> HttpRequest {
        self.get("status/ping")
    }

    pub fn build_audit(&self) -> HttpRequest {
        self.get("status/audit")
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    pub fn parse_stream_events(&self, response: HttpResponse) -> Result<Decoded<EventRecord>, ApiError> {
        check_status(&response)?;
        let decoded: Decoded<EventRecord> = decode_lines(&response.body, |value| {
            decode_event(&value).map_err(LineDecodeError::from)
        })
        .collect();
        self.report_discarded("stream", &decoded);
        Ok(decoded)
    }

    pub fn parse_commit_events(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_q(&self, response: HttpResponse) -> Result<Decoded<Value>, ApiError> {
        check_status(&response)?;
        let decoded: Decoded<Value> = decode_lines(&response.body, Ok).collect();
        self.report_discarded("q", &decoded);
        Ok(decoded)
    }

    /// Body text of a ping or audit response, unmodified. The whole body
    /// must be valid UTF-8.
    pub fn parse_text(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(String::from_utf8(response.body)?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Send `request` and reject non-2xx statuses. Failures are reported to
    /// the diagnostics sink here and nowhere else. The `parse_*` methods check
    /// the status again because they also accept responses that did not come
    /// through this path; that second check never logs.
    fn execute(&self, operation: &str, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let result = self.transport.execute(request).and_then(|response| {
            check_status(&response)?;
            Ok(response)
        });
        if let Err(error) = &result {
            self.diagnostics.transport_failed(operation, error);
        }
        result
    }

    fn report_discarded<V>(&self, operation: &str, decoded: &Decoded<V>) {
        for line in &decoded.discarded {
            self.diagnostics.line_discarded(operation, line);
        }
    }

    fn base_headers(&self, accept: Option<&str>) -> Vec<(String, String)> {
        let mut headers = vec![
            (
                "authorization".to_string(),
                format!("Bearer {}", self.config.auth_token()),
            ),
            ("user-agent".to_string(), USER_AGENT.to_string()),
        ];
        if let Some(accept) = accept {
            headers.push(("accept".to_string(), accept.to_string()));
        }
        headers
    }

    fn get(&self, endpoint: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.config.endpoint_url(endpoint),
            headers: self.base_headers(Some(TEXT_MEDIA_TYPE)),
            body: None,
        }
    }

    fn post(&self, endpoint: &str, accept: Option<&str>, body: String) -> HttpRequest {
        let mut headers = self.base_headers(accept);
        headers.push(("content-type".to_string(), JSON_MEDIA_TYPE.to_string()));
        HttpRequest {
            method: HttpMethod::Post,
            url: self.config.endpoint_url(endpoint),
            headers,
            body: Some(body),
        }
    }
}

/// 2xx passes; 401/403 become `Unauthorized`; anything else is `HttpStatus`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if matches!(response.status, 401 | 403) {
        return Err(ApiError::Unauthorized {
            status: response.status,
        });
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.body_lossy().into_owned(),
    })
}
