use rand::Rng;
use serde_json::{Map, Value};

use super::{free_text::FreeTextParser, payload::RawPayload};
use crate::shared::models::SensorFields;

const PM25_KEYS: &[&str] = &["pm25", "PM25"];
const CO2_KEYS: &[&str] = &["co2", "CO2"];
const VOC_KEYS: &[&str] = &["voc", "VOC", "adc"];
const TEMPERATURE_KEYS: &[&str] = &["temperature", "temp"];
const HUMIDITY_KEYS: &[&str] = &["humidity", "humid"];
const DEVICE_ID_KEYS: &[&str] = &["deviceId", "device_id"];

/// Output of normalization, before score and ingestion metadata are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReading {
    pub fields: SensorFields,
    pub device_id: String,
}

/// Maps any payload to canonical fields. Never fails: absent or
/// non-numeric values become 0 and a missing device id becomes `sender`.
pub fn normalize<R: Rng + ?Sized>(
    payload: &RawPayload,
    parser: &FreeTextParser,
    rng: &mut R,
    sender: &str,
) -> NormalizedReading {
    match payload {
        RawPayload::Structured(map) => normalize_map(map, sender),
        RawPayload::FreeText(text) => normalize_map(&parser.parse(text, rng), sender),
    }
}

pub fn normalize_map(map: &Map<String, Value>, sender: &str) -> NormalizedReading {
    let fields = SensorFields {
        pm25: numeric_field(map, PM25_KEYS).max(0.0),
        co2: numeric_field(map, CO2_KEYS).max(0.0),
        voc: numeric_field(map, VOC_KEYS).max(0.0),
        temperature: numeric_field(map, TEMPERATURE_KEYS),
        humidity: numeric_field(map, HUMIDITY_KEYS).clamp(0.0, 100.0),
    };

    let device_id = DEVICE_ID_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(coerce_text))
        .unwrap_or_else(|| sender.to_string());

    NormalizedReading { fields, device_id }
}

/// First key in `keys` holding a usable number, otherwise 0.
fn numeric_field(map: &Map<String, Value>, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|key| {
            let value = map.get(*key)?;
            let number = coerce_number(value);
            if number.is_none() {
                log::debug!("Ignoring non-numeric value for '{}': {}", key, value);
            }
            number
        })
        .unwrap_or(0.0)
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
