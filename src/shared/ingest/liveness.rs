use chrono::{DateTime, Utc};

use super::store::Accepted;
use crate::shared::{
    config::LivenessConfig,
    models::{Channel, LivenessReport, LivenessStatus},
};

/// Connectivity check against a per-channel timeout. The timeout used is
/// the one of the channel that delivered the last accepted reading.
#[derive(Debug, Clone)]
pub struct LivenessEvaluator {
    http_timeout_ms: i64,
    udp_timeout_ms: i64,
    mqtt_timeout_ms: i64,
}

impl Default for LivenessEvaluator {
    fn default() -> Self {
        LivenessEvaluator::from(&LivenessConfig::default())
    }
}

impl From<&LivenessConfig> for LivenessEvaluator {
    fn from(config: &LivenessConfig) -> Self {
        LivenessEvaluator {
            http_timeout_ms: secs_to_millis(config.http_timeout_secs),
            udp_timeout_ms: secs_to_millis(config.udp_timeout_secs),
            mqtt_timeout_ms: secs_to_millis(config.mqtt_timeout_secs),
        }
    }
}

fn secs_to_millis(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

impl LivenessEvaluator {
    pub fn timeout_ms(&self, channel: Channel) -> i64 {
        match channel {
            Channel::Http | Channel::Simulator => self.http_timeout_ms,
            Channel::Udp => self.udp_timeout_ms,
            Channel::Mqtt => self.mqtt_timeout_ms,
        }
    }

    pub fn evaluate(&self, last: Option<Accepted>, now: DateTime<Utc>) -> LivenessReport {
        match last {
            Some(accepted) => {
                let elapsed = (now - accepted.at).num_milliseconds();
                let status = if elapsed < self.timeout_ms(accepted.channel) {
                    LivenessStatus::Connected
                } else {
                    LivenessStatus::Disconnected
                };
                LivenessReport {
                    status,
                    last_update: Some(accepted.at),
                }
            }
            None => LivenessReport {
                status: LivenessStatus::Disconnected,
                last_update: None,
            },
        }
    }
}
