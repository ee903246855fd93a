//! Event shapes and the codec between them and wire JSON.
//!
//! # Design
//! Inbound records are decoded field by field from a `serde_json::Value`
//! rather than through `Deserialize`, so a failure names the offending field
//! and timestamp problems are reported separately from missing fields.
//! The `data` payload is kept as an opaque `Value`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::http::JSON_MEDIA_TYPE;

/// One stored event as returned by the `stream` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    #[serde(rename = "datacontenttype")]
    pub content_type: String,
    pub subject: String,
    pub time: DateTime<Utc>,
}

/// An event to be committed. The server assigns id, source and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub subject: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl OutboundEvent {
    pub fn new(subject: impl Into<String>, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            subject: subject.into(),
            event_type: event_type.into(),
            data,
        }
    }

    /// Pick `subject`, `type` and `data` out of an arbitrary JSON object,
    /// ignoring every other field.
    pub fn from_value(value: &Value) -> Result<Self, CodecError> {
        let object = value.as_object().ok_or(CodecError::NotAnObject)?;
        Ok(Self {
            subject: string_field(object, "subject")?.to_string(),
            event_type: string_field(object, "type")?.to_string(),
            data: object.get("data").cloned().ok_or(CodecError::MissingField("data"))?,
        })
    }
}

/// Map one decoded NDJSON value to an `EventRecord`.
pub fn decode_event(value: &Value) -> Result<EventRecord, CodecError> {
    let object = value.as_object().ok_or(CodecError::NotAnObject)?;

    Ok(EventRecord {
        id: string_field(object, "id")?.to_string(),
        source: string_field(object, "source")?.to_string(),
        event_type: string_field(object, "type")?.to_string(),
        data: object.get("data").cloned().ok_or(CodecError::MissingField("data"))?,
        content_type: JSON_MEDIA_TYPE.to_string(),
        subject: string_field(object, "subject")?.to_string(),
        time: parse_time(string_field(object, "time")?)?,
    })
}

/// The minimal commit shape: exactly `subject`, `type` and `data`.
pub fn encode_outbound_event(event: &OutboundEvent) -> Value {
    let mut object = Map::with_capacity(3);
    object.insert("subject".to_string(), Value::String(event.subject.clone()));
    object.insert("type".to_string(), Value::String(event.event_type.clone()));
    object.insert("data".to_string(), event.data.clone());
    Value::Object(object)
}

fn string_field<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, CodecError> {
    match object.get(field) {
        None => Err(CodecError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(CodecError::InvalidField {
            field,
            expected: "string",
        }),
    }
}

/// RFC 3339 first; an ISO-8601 timestamp without offset is read as UTC.
fn parse_time(value: &str) -> Result<DateTime<Utc>, CodecError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(time) => Ok(time.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| CodecError::MalformedTimestamp {
                value: value.to_string(),
                source: rfc_err,
            }),
    }
}
