//! Sensor access
//!
//! Each physical sensor sits behind a capability trait so that the hardware
//! backends in [`sysfs`] can be swapped for the fixed values in [`simulated`]
//! (or for scripted fakes in tests). [`SensorReader`] combines the three
//! sources into one [`SensorSnapshot`] per cycle.

pub mod simulated;
pub mod sysfs;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace, warn};

use crate::config::SensorConfig;
use crate::error::MonitorResult;

use self::simulated::{FixedClimate, FixedLight, FixedSoilMoisture};
use self::sysfs::{IioAdcChannel, IioClimateSensor, IioLightSensor, IioSoilMoistureSensor};

/// One complete set of readings taken at a single point in time
///
/// `humidity` and `temperature` come from the same sensor and are either both
/// present or both absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Relative humidity in percent
    pub humidity: Option<f32>,

    /// Degrees Celsius
    pub temperature: Option<f32>,

    /// Raw ADC scale, higher means drier
    pub soil_moisture: f32,

    /// Normalized to 0.0..=1.0
    pub light_intensity: f32,
}

impl SensorSnapshot {
    pub fn new(
        climate: Option<ClimateReading>,
        soil_moisture: f32,
        light_intensity: f32,
    ) -> SensorSnapshot {
        Self {
            humidity: climate.map(|c| c.humidity),
            temperature: climate.map(|c| c.temperature),
            soil_moisture,
            light_intensity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub humidity: f32,
    pub temperature: f32,
}

/// Combined temperature and humidity source (DHT11 and friends)
#[async_trait]
pub trait ClimateSensor: Send {
    /// Returns `None` when the sensor did not deliver a reading.
    async fn read(&mut self) -> Option<ClimateReading>;
}

#[async_trait]
pub trait SoilMoistureSensor: Send {
    async fn read(&mut self) -> MonitorResult<f32>;
}

#[async_trait]
pub trait LightSensor: Send {
    async fn read(&mut self) -> MonitorResult<f32>;
}

pub struct SensorReader {
    climate: Box<dyn ClimateSensor>,
    soil: Box<dyn SoilMoistureSensor>,
    light: Box<dyn LightSensor>,
}

impl SensorReader {
    pub fn new(
        climate: Box<dyn ClimateSensor>,
        soil: Box<dyn SoilMoistureSensor>,
        light: Box<dyn LightSensor>,
    ) -> SensorReader {
        Self {
            climate,
            soil,
            light,
        }
    }

    pub fn from_config(config: &SensorConfig) -> SensorReader {
        match config {
            SensorConfig::Simulated {
                humidity,
                temperature,
                soil_moisture,
                light_intensity,
            } => {
                let climate = match (humidity, temperature) {
                    (Some(humidity), Some(temperature)) => Some(ClimateReading {
                        humidity: *humidity,
                        temperature: *temperature,
                    }),
                    _ => None,
                };
                SensorReader::new(
                    Box::new(FixedClimate::new(climate)),
                    Box::new(FixedSoilMoisture::new(*soil_moisture)),
                    Box::new(FixedLight::new(*light_intensity)),
                )
            }
            SensorConfig::Sysfs {
                dht_device,
                adc_device,
                soil_channel,
                light_channel,
                adc_max,
                dht_attempts,
                dht_retry_delay,
            } => SensorReader::new(
                Box::new(IioClimateSensor::new(
                    dht_device.clone(),
                    *dht_attempts,
                    Duration::from_millis(*dht_retry_delay),
                )),
                Box::new(IioSoilMoistureSensor::new(
                    IioAdcChannel::new(adc_device.clone(), *soil_channel),
                    *adc_max,
                )),
                Box::new(IioLightSensor::new(
                    IioAdcChannel::new(adc_device.clone(), *light_channel),
                    *adc_max,
                )),
            ),
        }
    }

    /// Take one reading from every sensor.
    ///
    /// A missing climate reading is part of the snapshot, not an error. Errors
    /// from the soil or light backends are passed through.
    #[instrument(skip_all)]
    pub async fn read(&mut self) -> MonitorResult<SensorSnapshot> {
        let climate = self.climate.read().await;
        if climate.is_none() {
            warn!("climate sensor did not deliver a reading");
        }

        let soil_moisture = self.soil.read().await?;
        let light_intensity = self.light.read().await?;

        let snapshot = SensorSnapshot::new(climate, soil_moisture, light_intensity);
        trace!("read snapshot: {snapshot:?}");
        Ok(snapshot)
    }
}
