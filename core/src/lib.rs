//! Blocking client for a subject-partitioned event store spoken over HTTP.
//!
//! # Overview
//! `EventStoreClient` commits events, streams a subject's events back as
//! NDJSON, runs ad-hoc queries and performs health checks (`ping`, `audit`).
//!
//! # Design
//! - `ClientConfig` is validated once at construction and never changes.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), with a `Transport` doing the
//!   round-trip in between. `UreqTransport` is the default.
//! - NDJSON bodies are decoded line by line. A bad line is reported to the
//!   injected `Diagnostics` sink and skipped; the rest of the stream survives.
//! - Any non-2xx status is a transport-level error and always reaches the
//!   caller.

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod http;
pub mod ndjson;

pub use client::EventStoreClient;
pub use config::ClientConfig;
pub use diagnostics::{Diagnostic, Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use error::{ApiError, CodecError, LineDecodeError};
pub use event::{decode_event, encode_outbound_event, EventRecord, OutboundEvent};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use ndjson::{decode_lines, Decoded, DiscardedLine, LineOutcome};
