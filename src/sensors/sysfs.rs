//! Sensors exposed by the Linux IIO subsystem
//!
//! The `dht11` kernel driver publishes `in_temp_input` (milli-degrees Celsius)
//! and `in_humidityrelative_input` (milli-percent). ADCs such as the MCP3008
//! publish one `in_voltage{N}_raw` file per channel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{ClimateReading, ClimateSensor, LightSensor, SoilMoistureSensor};
use crate::error::{MonitorError, MonitorResult};

/// Soil readings are reported on a 10-bit scale regardless of the ADC used.
const SOIL_SCALE: f32 = 1023.0;

async fn read_iio_value(path: &Path) -> std::io::Result<f32> {
    let content = tokio::fs::read_to_string(path).await?;
    content.trim().parse::<f32>().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: {e}", path.display()),
        )
    })
}

#[derive(Debug, Clone)]
pub struct IioClimateSensor {
    device: PathBuf,
    attempts: u32,
    retry_delay: Duration,
}

impl IioClimateSensor {
    pub fn new(device: PathBuf, attempts: u32, retry_delay: Duration) -> Self {
        Self {
            device,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    async fn read_once(&self) -> std::io::Result<ClimateReading> {
        let temperature = read_iio_value(&self.device.join("in_temp_input")).await?;
        let humidity = read_iio_value(&self.device.join("in_humidityrelative_input")).await?;

        Ok(ClimateReading {
            humidity: humidity / 1000.0,
            temperature: temperature / 1000.0,
        })
    }
}

#[async_trait]
impl ClimateSensor for IioClimateSensor {
    #[instrument(skip(self), fields(device = %self.device.display()))]
    async fn read(&mut self) -> Option<ClimateReading> {
        for attempt in 1..=self.attempts {
            match self.read_once().await {
                Ok(reading) => return Some(reading),
                Err(e) => {
                    // the dht11 driver regularly answers with EIO on checksum errors
                    debug!("attempt {attempt}/{} failed: {e}", self.attempts);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!("no climate reading after {} attempts", self.attempts);
        None
    }
}

/// One channel of an IIO ADC
#[derive(Debug, Clone)]
pub struct IioAdcChannel {
    path: PathBuf,
}

impl IioAdcChannel {
    pub fn new(device: PathBuf, channel: u8) -> Self {
        Self {
            path: device.join(format!("in_voltage{channel}_raw")),
        }
    }

    pub async fn raw(&self) -> std::io::Result<f32> {
        read_iio_value(&self.path).await
    }
}

#[derive(Debug, Clone)]
pub struct IioSoilMoistureSensor {
    channel: IioAdcChannel,
    adc_max: f32,
}

impl IioSoilMoistureSensor {
    pub fn new(channel: IioAdcChannel, adc_max: f32) -> Self {
        Self { channel, adc_max }
    }
}

#[async_trait]
impl SoilMoistureSensor for IioSoilMoistureSensor {
    async fn read(&mut self) -> MonitorResult<f32> {
        let raw = self
            .channel
            .raw()
            .await
            .map_err(|source| MonitorError::SensorRead {
                sensor: "soil moisture",
                source,
            })?;

        Ok(raw / self.adc_max * SOIL_SCALE)
    }
}

#[derive(Debug, Clone)]
pub struct IioLightSensor {
    channel: IioAdcChannel,
    adc_max: f32,
}

impl IioLightSensor {
    pub fn new(channel: IioAdcChannel, adc_max: f32) -> Self {
        Self { channel, adc_max }
    }
}

#[async_trait]
impl LightSensor for IioLightSensor {
    async fn read(&mut self) -> MonitorResult<f32> {
        let raw = self
            .channel
            .raw()
            .await
            .map_err(|source| MonitorError::SensorRead {
                sensor: "light",
                source,
            })?;

        Ok((raw / self.adc_max).clamp(0.0, 1.0))
    }
}
