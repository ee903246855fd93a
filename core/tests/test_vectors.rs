//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. No network is involved: simulated responses are
//! fed straight into the `parse_*` methods.

use std::sync::Arc;

use eventstore_client::{
    ApiError, ClientConfig, EventStoreClient, HttpMethod, HttpRequest, HttpResponse,
    MemoryDiagnostics, OutboundEvent,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:3000";

fn client() -> (EventStoreClient, Arc<MemoryDiagnostics>) {
    let config = ClientConfig::new(BASE_URL, "v1", "secret").unwrap();
    let diagnostics = Arc::new(MemoryDiagnostics::new());
    let client = EventStoreClient::from_config(config).with_diagnostics(diagnostics.clone());
    (client, diagnostics)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
    }
}

/// Check method, URL and headers. The user-agent carries the crate version,
/// so it is checked by prefix and left out of the header comparison.
fn assert_request_line(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    let user_agent = req.header("user-agent").unwrap();
    assert!(user_agent.starts_with("eventstore-client-rust/"), "{name}: user-agent");

    let headers: Vec<(String, String)> = req
        .headers
        .iter()
        .filter(|(key, _)| key != "user-agent")
        .cloned()
        .collect();
    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(headers, expected_headers, "{name}: headers");
}

fn request_body(req: &HttpRequest) -> Value {
    serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

#[test]
fn stream_test_vectors() {
    let raw = include_str!("../../test-vectors/stream.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let (c, diagnostics) = client();
        let name = case["name"].as_str().unwrap();
        let subject = case["input_subject"].as_str().unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_stream_events(subject).unwrap();
        assert_request_line(name, &req, expected_req);
        assert_eq!(request_body(&req), expected_req["body"], "{name}: body");

        // Verify parse
        let decoded = c.parse_stream_events(simulated(case)).unwrap();
        let records: Vec<Value> = decoded
            .items
            .iter()
            .map(|record| serde_json::to_value(record).unwrap())
            .collect();
        assert_eq!(Value::Array(records), case["expected_result"], "{name}: parsed result");

        let expected_discarded = case["expected_discarded"].as_u64().unwrap() as usize;
        assert_eq!(decoded.discarded_count(), expected_discarded, "{name}: discarded");
        assert_eq!(diagnostics.discarded_lines(), expected_discarded, "{name}: diagnostics");
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

#[test]
fn commit_test_vectors() {
    let raw = include_str!("../../test-vectors/commit.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let (c, _) = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let events: Vec<OutboundEvent> = case["input"]
            .as_array()
            .unwrap()
            .iter()
            .map(|value| OutboundEvent::from_value(value).unwrap())
            .collect();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_commit_events(&events).unwrap();
        assert_request_line(name, &req, expected_req);
        assert_eq!(
            req.body.as_deref(),
            expected_req["body_text"].as_str(),
            "{name}: body"
        );

        // Verify parse
        c.parse_commit_events(simulated(case)).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[test]
fn q_test_vectors() {
    let raw = include_str!("../../test-vectors/q.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let (c, diagnostics) = client();
        let name = case["name"].as_str().unwrap();
        let query = case["input_query"].as_str().unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = c.build_q(query).unwrap();
        assert_request_line(name, &req, expected_req);
        assert_eq!(request_body(&req), expected_req["body"], "{name}: body");

        // Verify parse
        let decoded = c.parse_q(simulated(case)).unwrap();
        assert_eq!(Value::Array(decoded.items.clone()), case["expected_result"], "{name}: rows");

        let expected_discarded = case["expected_discarded"].as_u64().unwrap() as usize;
        assert_eq!(decoded.discarded_count(), expected_discarded, "{name}: discarded");
        assert_eq!(diagnostics.discarded_lines(), expected_discarded, "{name}: diagnostics");
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn status_test_vectors() {
    let raw = include_str!("../../test-vectors/status.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let (c, _) = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = match case["operation"].as_str().unwrap() {
            "ping" => c.build_ping(),
            "audit" => c.build_audit(),
            other => panic!("unknown operation: {other}"),
        };
        assert_request_line(name, &req, expected_req);
        assert!(req.body.is_none(), "{name}: body should be None");

        // Verify parse
        let result = c.parse_text(simulated(case));
        match case.get("expected_error_status") {
            Some(status) => {
                let expected = status.as_u64().unwrap() as u16;
                assert!(
                    matches!(result, Err(ApiError::HttpStatus { status, .. }) if status == expected),
                    "{name}: expected HTTP {expected}"
                );
            }
            None => assert_eq!(
                result.unwrap(),
                case["expected_result"].as_str().unwrap(),
                "{name}: text"
            ),
        }
    }
}
