use serde_json::{Map, Value};

/// An inbound message resolved at the transport boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Structured(Map<String, Value>),
    FreeText(String),
}

impl RawPayload {
    /// Anything that is not a JSON object is handed over as free text.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => RawPayload::Structured(map),
            _ => RawPayload::FreeText(text.to_string()),
        }
    }
}
