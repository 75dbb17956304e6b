use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How a reading reached the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadingSource {
    Structured,
    FreeText,
    DeviceReported,
}

/// Inbound channel a message arrived on. Each one carries its own liveness timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Http,
    Udp,
    Mqtt,
    Simulator,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channel::Http => "http",
            Channel::Udp => "udp",
            Channel::Mqtt => "mqtt",
            Channel::Simulator => "simulator",
        };
        write!(f, "{}", name)
    }
}

/// The five measured quantities after coercion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorFields {
    pub pm25: f64,
    pub co2: f64,
    pub voc: f64,
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReading {
    pub id: i64,
    pub pm25: f64,
    pub co2: f64,
    pub voc: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub health_score: u8,
    pub timestamp: DateTime<Utc>,
    pub source: ReadingSource,
    pub device_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum HealthBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => HealthBand::Excellent,
            60..=79 => HealthBand::Good,
            40..=59 => HealthBand::Fair,
            _ => HealthBand::Poor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AirQualityLevel {
    Good,
    Moderate,
    Unhealthy,
    Hazardous,
}

impl AirQualityLevel {
    pub fn from_pm25(pm25: f64) -> Self {
        if pm25 <= 12.0 {
            AirQualityLevel::Good
        } else if pm25 <= 35.0 {
            AirQualityLevel::Moderate
        } else if pm25 <= 55.0 {
            AirQualityLevel::Unhealthy
        } else {
            AirQualityLevel::Hazardous
        }
    }
}

/// Response for /sensors/latest
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LatestReading {
    #[serde(flatten)]
    pub reading: CanonicalReading,
    pub health_status: HealthBand,
    pub air_quality: AirQualityLevel,
}

impl From<CanonicalReading> for LatestReading {
    fn from(reading: CanonicalReading) -> Self {
        LatestReading {
            health_status: HealthBand::from_score(reading.health_score),
            air_quality: AirQualityLevel::from_pm25(reading.pm25),
            reading,
        }
    }
}

/// One point of the dashboard chart series.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub time: String,
    pub pm25: f64,
    pub co2: f64,
    pub voc: f64,
    pub health_score: u8,
    pub temperature: f64,
    pub humidity: f64,
}

impl From<&CanonicalReading> for ChartPoint {
    fn from(reading: &CanonicalReading) -> Self {
        ChartPoint {
            time: reading
                .timestamp
                .with_timezone(&Local)
                .format("%H:%M")
                .to_string(),
            pm25: reading.pm25,
            co2: reading.co2,
            voc: reading.voc,
            health_score: reading.health_score,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    Connected,
    Disconnected,
}

/// Response for /health
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LivenessReport {
    pub status: LivenessStatus,
    pub last_update: Option<DateTime<Utc>>,
}

/// Reply sent back to the device after a reading is accepted.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    pub success: bool,
    pub message: String,
    pub health_score: u8,
    pub id: i64,
}

impl From<&CanonicalReading> for IngestAck {
    fn from(reading: &CanonicalReading) -> Self {
        IngestAck {
            success: true,
            message: String::from("Data received successfully"),
            health_score: reading.health_score,
            id: reading.id,
        }
    }
}

/// Response for /test
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub total_readings: usize,
}
