use serde::Deserialize;
use serde_json::{Map, Value};

pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const PING_TIMESTAMP: i64 = 123_456_789;
pub const UNKNOWN_TYPE: &str = "UNKNOWN";

/// One event pushed by the device-side service. Only the envelope is an
/// object; `type` and `timestamp` take whatever JSON value the device sends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(rename = "type", default)]
    pub kind: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub payload: Payload,
}

impl Event {
    pub fn kind(&self) -> String {
        self.kind
            .as_ref()
            .map_or_else(|| UNKNOWN_TYPE.to_string(), display_value)
    }

    pub fn timestamp(&self) -> Option<String> {
        self.timestamp.as_ref().map(display_value)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_ref().and_then(Value::as_str) == Some(kind)
    }
}

/// Event payloads carry no schema. A JSON object is a mapping, any other
/// value (including `null`) is a scalar, a missing field is absent.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "Value")]
pub enum Payload {
    Mapping(Map<String, Value>),
    Scalar(Value),
    #[default]
    Absent,
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Payload::Mapping(map),
            other => Payload::Scalar(other),
        }
    }
}

/// Frame text that did not decode into an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText(pub String);

impl RawText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub type Frame = Result<Event, RawText>;

/// Best-effort decode of one text frame. Anything that is not a JSON object
/// stays raw.
pub fn decode(text: &str) -> Frame {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
        .and_then(|value| serde_json::from_value::<Event>(value).ok())
        .ok_or_else(|| RawText(text.to_string()))
}

pub fn ping_message(timestamp: i64) -> String {
    serde_json::json!({ "type": PING, "timestamp": timestamp }).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    Passed,
    Failed { reply: String },
}

impl Liveness {
    pub fn from_reply(text: &str) -> Self {
        match decode(text) {
            Ok(event) if event.is_kind(PONG) => Liveness::Passed,
            _ => Liveness::Failed {
                reply: text.to_string(),
            },
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Liveness::Passed)
    }
}

/// Strings print bare, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
