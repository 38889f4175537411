use std::path::{Path, PathBuf};
use std::time::Duration;

use rumqttc::QoS;
use tracing::trace;

use crate::error::{MonitorError, MonitorResult};
use crate::util::{get_broker_host, get_broker_port, get_topic};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Sensor backend configuration (defaults to simulated sensors)
    #[serde(default)]
    pub sensors: SensorConfig,

    /// Seconds between two read/evaluate/publish cycles
    #[serde(default = "default_interval")]
    pub interval: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            thresholds: ThresholdConfig::default(),
            sensors: SensorConfig::default(),
            interval: default_interval(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Replace broker settings with values from the environment, if present.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(host) = get_broker_host() {
            self.broker.host = host;
        }
        if let Some(port) = get_broker_port() {
            self.broker.port = port;
        }
        if let Some(topic) = get_topic() {
            self.broker.topic = topic;
        }
        self
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.interval == 0 {
            return Err(MonitorError::InvalidConfig(
                "interval must be at least one second".to_string(),
            ));
        }
        self.broker.validate_topic()?;
        self.broker.qos()?;
        self.thresholds.validate()?;
        self.reconnect.validate()?;
        if let SensorConfig::Sysfs { adc_max, .. } = &self.sensors
            && !(adc_max.is_finite() && *adc_max > 0.0)
        {
            return Err(MonitorError::InvalidConfig(format!(
                "adc_max must be a positive number, got {adc_max}"
            )));
        }
        Ok(())
    }
}

/// MQTT broker connection settings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "crate::util::get_default_port")]
    pub port: u16,

    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,

    /// Seconds to wait for the broker's CONNACK on startup
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default)]
    pub qos: u8,

    /// Also subscribe to `topic` and log whatever arrives on it
    #[serde(default)]
    pub subscribe_own_topic: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: crate::util::get_default_port(),
            topic: default_topic(),
            client_id: default_client_id(),
            keep_alive: default_keep_alive(),
            connect_timeout: default_connect_timeout(),
            qos: 0,
            subscribe_own_topic: false,
        }
    }
}

impl BrokerConfig {
    pub fn qos(&self) -> MonitorResult<QoS> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(MonitorError::InvalidConfig(format!(
                "qos must be 0, 1 or 2, got {other}"
            ))),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Alerts are published to `topic`, so it has to be a concrete topic name.
    pub fn validate_topic(&self) -> MonitorResult<()> {
        if self.topic.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "broker topic must not be empty".to_string(),
            ));
        }
        if self.topic.contains(['+', '#']) {
            return Err(MonitorError::InvalidConfig(format!(
                "broker topic must not contain wildcards, got {}",
                self.topic
            )));
        }
        Ok(())
    }
}

/// Fixed alert thresholds, read-only after startup
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct ThresholdConfig {
    /// Raw soil reading above which the soil counts as dry
    #[serde(default = "default_soil_moisture")]
    pub soil_moisture: f32,

    #[serde(default = "default_temperature_min")]
    pub temperature_min: f32,

    #[serde(default = "default_temperature_max")]
    pub temperature_max: f32,

    /// Normalized light intensity below which the plant needs more light
    #[serde(default = "default_light_min")]
    pub light_min: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            soil_moisture: default_soil_moisture(),
            temperature_min: default_temperature_min(),
            temperature_max: default_temperature_max(),
            light_min: default_light_min(),
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        let ThresholdConfig {
            soil_moisture,
            temperature_min,
            temperature_max,
            light_min,
        } = *self;

        if ![soil_moisture, temperature_min, temperature_max, light_min]
            .iter()
            .all(|value| value.is_finite())
        {
            return Err(MonitorError::InvalidConfig(
                "thresholds must be finite numbers".to_string(),
            ));
        }
        if temperature_min > temperature_max {
            return Err(MonitorError::InvalidConfig(format!(
                "temperature_min ({temperature_min}) is above temperature_max ({temperature_max})"
            )));
        }
        if !(0.0..=1.0).contains(&light_min) {
            return Err(MonitorError::InvalidConfig(format!(
                "light_min must be within 0.0..=1.0, got {light_min}"
            )));
        }
        Ok(())
    }
}

/// Sensor backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SensorConfig {
    /// Fixed readings, no hardware required
    Simulated {
        /// `null` simulates a failing climate sensor
        #[serde(default = "default_simulated_humidity")]
        humidity: Option<f32>,

        #[serde(default = "default_simulated_temperature")]
        temperature: Option<f32>,

        #[serde(default = "default_simulated_soil_moisture")]
        soil_moisture: f32,

        #[serde(default = "default_simulated_light")]
        light_intensity: f32,
    },

    /// Linux IIO devices (dht11 driver and an MCP3008-style ADC)
    Sysfs {
        #[serde(default = "default_dht_device")]
        dht_device: PathBuf,

        #[serde(default = "default_adc_device")]
        adc_device: PathBuf,

        #[serde(default)]
        soil_channel: u8,

        #[serde(default = "default_light_channel")]
        light_channel: u8,

        /// Full-scale raw value of the ADC
        #[serde(default = "default_adc_max")]
        adc_max: f32,

        #[serde(default = "default_dht_attempts")]
        dht_attempts: u32,

        /// Milliseconds between two DHT read attempts
        #[serde(default = "default_dht_retry_delay")]
        dht_retry_delay: u64,
    },
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig::Simulated {
            humidity: default_simulated_humidity(),
            temperature: default_simulated_temperature(),
            soil_moisture: default_simulated_soil_moisture(),
            light_intensity: default_simulated_light(),
        }
    }
}

/// Backoff used by the MQTT event loop after the connection is lost
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ReconnectConfig {
    /// Milliseconds before the first reconnect attempt
    #[serde(default = "default_initial_delay")]
    pub initial_delay: u64,

    /// Upper bound in seconds
    #[serde(default = "default_max_delay")]
    pub max_delay: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl ReconnectConfig {
    pub fn validate(&self) -> MonitorResult<()> {
        if self.max_delay == 0 || self.max_delay > MAX_RECONNECT_DELAY {
            return Err(MonitorError::InvalidConfig(format!(
                "reconnect max_delay must be within 1..={MAX_RECONNECT_DELAY} seconds, got {}",
                self.max_delay
            )));
        }
        if self.initial_delay == 0 || self.initial_delay > self.max_delay * 1000 {
            return Err(MonitorError::InvalidConfig(format!(
                "reconnect initial_delay must be between 1 ms and max_delay, got {} ms",
                self.initial_delay
            )));
        }
        if !(1.0..=MAX_RECONNECT_MULTIPLIER).contains(&self.multiplier) {
            return Err(MonitorError::InvalidConfig(format!(
                "reconnect multiplier must be within 1.0..={MAX_RECONNECT_MULTIPLIER}, got {}",
                self.multiplier
            )));
        }
        Ok(())
    }
}

/// Upper bound for `ReconnectConfig::max_delay`, in seconds
const MAX_RECONNECT_DELAY: u64 = 3600;

const MAX_RECONNECT_MULTIPLIER: f32 = 10.0;

fn default_interval() -> u64 {
    60
}

fn default_host() -> String {
    String::from("localhost")
}

fn default_topic() -> String {
    String::from("smart-plant/monitoring")
}

fn default_client_id() -> String {
    String::from("smart-plant-monitor")
}

fn default_keep_alive() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_soil_moisture() -> f32 {
    300.0
}

fn default_temperature_min() -> f32 {
    15.0
}

fn default_temperature_max() -> f32 {
    30.0
}

fn default_light_min() -> f32 {
    0.2
}

fn default_simulated_humidity() -> Option<f32> {
    Some(50.0)
}

fn default_simulated_temperature() -> Option<f32> {
    Some(22.0)
}

fn default_simulated_soil_moisture() -> f32 {
    200.0
}

fn default_simulated_light() -> f32 {
    0.5
}

fn default_dht_device() -> PathBuf {
    PathBuf::from("/sys/bus/iio/devices/iio:device0")
}

fn default_adc_device() -> PathBuf {
    PathBuf::from("/sys/bus/iio/devices/iio:device1")
}

fn default_light_channel() -> u8 {
    1
}

fn default_adc_max() -> f32 {
    1023.0
}

fn default_dht_attempts() -> u32 {
    15
}

fn default_dht_retry_delay() -> u64 {
    2000
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    60
}

fn default_multiplier() -> f32 {
    2.0
}

pub fn read_config_file(path: impl AsRef<Path>) -> MonitorResult<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content).map_err(|e| {
        MonitorError::InvalidConfig(format!("{}: {e}", path.display()))
    })?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
