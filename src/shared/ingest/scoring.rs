//! Composite health score.
//!
//! Starts at 100 and subtracts one penalty per factor that leaves its
//! comfort range. The sum is clamped to [0, 100] and rounded half-up.
//!
//! | factor      | trigger            | penalty               |
//! |-------------|--------------------|-----------------------|
//! | PM2.5       | > 12 µg/m³         | (pm25 - 12) * 2       |
//! | CO2         | > 400 ppm          | (co2 - 400) / 10      |
//! | VOC         | > 1.0              | (voc - 1.0) * 20      |
//! | temperature | < 20 or > 26 °C    | abs(t - 23) * 3       |
//! | humidity    | < 40 or > 60 %     | abs(h - 50) / 2       |

use crate::shared::models::SensorFields;

const PM25_LIMIT: f64 = 12.0;
const CO2_LIMIT: f64 = 400.0;
const VOC_LIMIT: f64 = 1.0;
const TEMPERATURE_RANGE: (f64, f64) = (20.0, 26.0);
const TEMPERATURE_IDEAL: f64 = 23.0;
const HUMIDITY_RANGE: (f64, f64) = (40.0, 60.0);
const HUMIDITY_IDEAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Penalties {
    pub pm25: f64,
    pub co2: f64,
    pub voc: f64,
    pub temperature: f64,
    pub humidity: f64,
}

impl Penalties {
    pub fn total(&self) -> f64 {
        self.pm25 + self.co2 + self.voc + self.temperature + self.humidity
    }
}

pub fn penalties(fields: &SensorFields) -> Penalties {
    let mut p = Penalties::default();

    if fields.pm25 > PM25_LIMIT {
        p.pm25 = (fields.pm25 - PM25_LIMIT) * 2.0;
    }
    if fields.co2 > CO2_LIMIT {
        p.co2 = (fields.co2 - CO2_LIMIT) / 10.0;
    }
    if fields.voc > VOC_LIMIT {
        p.voc = (fields.voc - VOC_LIMIT) * 20.0;
    }
    if fields.temperature < TEMPERATURE_RANGE.0 || fields.temperature > TEMPERATURE_RANGE.1 {
        p.temperature = (fields.temperature - TEMPERATURE_IDEAL).abs() * 3.0;
    }
    if fields.humidity < HUMIDITY_RANGE.0 || fields.humidity > HUMIDITY_RANGE.1 {
        p.humidity = (fields.humidity - HUMIDITY_IDEAL).abs() / 2.0;
    }

    p
}

pub fn score(fields: &SensorFields) -> u8 {
    let raw = 100.0 - penalties(fields).total();
    if raw.is_nan() {
        return 0;
    }
    // clamped value is non-negative, so round() is half-up here
    raw.clamp(0.0, 100.0).round() as u8
}
