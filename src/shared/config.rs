use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use warp::http::uri::{Authority, Scheme};

pub const CONFIG_ENV: &str = "HEALTH_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Configs {
    pub log_level: String,
    /// Seed for the synthetic PM2.5 source; entropy when unset.
    pub random_seed: Option<u64>,
    pub api: ApiConfig,
    pub udp: UdpConfig,
    pub mqtt: Option<MqttConfig>,
    pub store: StoreConfig,
    pub liveness: LivenessConfig,
    pub simulator: SimulatorConfig,
}

impl Default for Configs {
    fn default() -> Self {
        Configs {
            log_level: String::from("info"),
            random_seed: None,
            api: ApiConfig::default(),
            udp: UdpConfig::default(),
            mqtt: None,
            store: StoreConfig::default(),
            liveness: LivenessConfig::default(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Configs {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let config_content = fs::read_to_string(&path)?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let configs: Configs = toml::from_str(content)?;
        configs.validate()?;
        Ok(configs)
    }

    /// Rejects values that would only fail once a listener is running.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.api.validate()?;
        if let Some(mqtt) = &self.mqtt {
            mqtt.validate()?;
        }
        Ok(())
    }

    /// Config path from the environment, falling back to `config.toml`.
    pub fn resolve_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub body_limit: u64,
    pub cors_origin: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: String::from("0.0.0.0"),
            port: 3001,
            body_limit: 1024 * 16,
            cors_origin: None,
        }
    }
}

impl ApiConfig {
    /// `cors_origin` must be a bare `scheme://host[:port]` origin.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(origin) = &self.cors_origin else {
            return Ok(());
        };

        let (scheme, authority) = origin
            .split_once("://")
            .ok_or_else(|| format!("cors_origin '{}' is missing a scheme", origin))?;
        Scheme::try_from(scheme)
            .map_err(|e| format!("cors_origin '{}' has an invalid scheme: {}", origin, e))?;
        Authority::try_from(authority)
            .map_err(|e| format!("cors_origin '{}' has an invalid host: {}", origin, e))?;

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UdpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub ack: bool,
}

impl Default for UdpConfig {
    fn default() -> Self {
        UdpConfig {
            enabled: true,
            host: String::from("0.0.0.0"),
            port: 4210,
            ack: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ack_topic_prefix: Option<String>,
}

impl MqttConfig {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !rumqttc::valid_filter(&self.topic) {
            return Err(format!("mqtt topic '{}' is not a valid topic filter", self.topic).into());
        }
        Ok(())
    }
}

fn default_client_id() -> String {
    String::from("home-health-monitor")
}

fn default_topic() -> String {
    String::from("sensors/readings")
}

fn default_keep_alive() -> u16 {
    30
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub capacity: usize,
    pub history_window: usize,
    pub recent_window: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            capacity: 100,
            history_window: 24,
            recent_window: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LivenessConfig {
    pub http_timeout_secs: u64,
    pub udp_timeout_secs: u64,
    pub mqtt_timeout_secs: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        LivenessConfig {
            http_timeout_secs: 60,
            udp_timeout_secs: 30,
            mqtt_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub stale_after_secs: i64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            enabled: false,
            interval_secs: 30,
            stale_after_secs: 80,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let configs = Configs::from_toml("").unwrap();

        assert_eq!(configs.log_level, "info");
        assert_eq!(configs.api.port, 3001);
        assert_eq!(configs.store.capacity, 100);
        assert_eq!(configs.store.history_window, 24);
        assert_eq!(configs.liveness.udp_timeout_secs, 30);
        assert_eq!(configs.liveness.http_timeout_secs, 60);
        assert!(configs.mqtt.is_none());
        assert!(!configs.simulator.enabled);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let content = r#"
            random_seed = 7

            [udp]
            port = 5000

            [mqtt]
            broker = "localhost"
            port = 1883
        "#;
        let configs = Configs::from_toml(content).unwrap();

        assert_eq!(configs.random_seed, Some(7));
        assert_eq!(configs.udp.port, 5000);
        assert!(configs.udp.enabled);

        let mqtt = configs.mqtt.unwrap();
        assert_eq!(mqtt.broker, "localhost");
        assert_eq!(mqtt.topic, "sensors/readings");
        assert_eq!(mqtt.keep_alive, 30);
    }

    #[test]
    fn cors_origin_needs_a_scheme() {
        let missing = Configs::from_toml("[api]\ncors_origin = \"localhost:3000\"");
        let path = Configs::from_toml("[api]\ncors_origin = \"http://localhost:3000/app\"");
        let valid = Configs::from_toml("[api]\ncors_origin = \"http://localhost:3000\"").unwrap();

        assert!(missing.is_err());
        assert!(path.is_err());
        assert_eq!(valid.api.cors_origin.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn mqtt_topic_must_be_a_valid_filter() {
        let base = "[mqtt]\nbroker = \"localhost\"\nport = 1883\n";

        let wildcard = Configs::from_toml(&format!("{}topic = \"sensors/+/readings\"", base)).unwrap();
        assert_eq!(wildcard.mqtt.unwrap().topic, "sensors/+/readings");

        assert!(Configs::from_toml(&format!("{}topic = \"sensors/#/x\"", base)).is_err());
        assert!(Configs::from_toml(&format!("{}topic = \"\"", base)).is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(Configs::from_toml("[api\nport = ").is_err());
    }
}
