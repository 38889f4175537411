//! Sensors returning fixed values, used when no hardware is attached

use async_trait::async_trait;

use super::{ClimateReading, ClimateSensor, LightSensor, SoilMoistureSensor};
use crate::error::MonitorResult;

#[derive(Debug, Clone, Copy)]
pub struct FixedClimate {
    reading: Option<ClimateReading>,
}

impl FixedClimate {
    pub fn new(reading: Option<ClimateReading>) -> Self {
        Self { reading }
    }
}

#[async_trait]
impl ClimateSensor for FixedClimate {
    async fn read(&mut self) -> Option<ClimateReading> {
        self.reading
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedSoilMoisture {
    value: f32,
}

impl FixedSoilMoisture {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

#[async_trait]
impl SoilMoistureSensor for FixedSoilMoisture {
    async fn read(&mut self) -> MonitorResult<f32> {
        Ok(self.value)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedLight {
    value: f32,
}

impl FixedLight {
    pub fn new(value: f32) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl LightSensor for FixedLight {
    async fn read(&mut self) -> MonitorResult<f32> {
        Ok(self.value)
    }
}
