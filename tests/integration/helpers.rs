//! Helper functions for integration tests

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use plant_monitor::{
    Alert, AlertEvaluator, MonitorError, MonitorResult, SensorReader,
    actors::monitor::MonitorHandle,
    publisher::{AlertPublisher, LocalOutput},
    sensors::{ClimateReading, ClimateSensor, LightSensor, SoilMoistureSensor},
};
use tokio::task::JoinHandle;

/// One reading per cycle: `(humidity, temperature, soil_moisture, light)`
pub type Reading = (Option<f32>, Option<f32>, f32, f32);

/// Sensors replaying a fixed script; the last reading repeats forever
#[derive(Clone)]
pub struct ScriptedSensors {
    script: Arc<Mutex<VecDeque<Reading>>>,
    last: Arc<Mutex<Option<Reading>>>,
}

impl ScriptedSensors {
    pub fn new(script: Vec<Reading>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Climate is read first in every cycle, so it advances the script.
    fn advance(&self) -> Reading {
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.expect("script must not be empty")
    }

    fn current(&self) -> Reading {
        self.last.lock().unwrap().expect("climate is read first")
    }

    pub fn reader(&self) -> SensorReader {
        SensorReader::new(
            Box::new(self.clone()),
            Box::new(SoilFromScript(self.clone())),
            Box::new(LightFromScript(self.clone())),
        )
    }
}

#[async_trait]
impl ClimateSensor for ScriptedSensors {
    async fn read(&mut self) -> Option<ClimateReading> {
        let (humidity, temperature, _, _) = self.advance();
        Some(ClimateReading {
            humidity: humidity?,
            temperature: temperature?,
        })
    }
}

struct SoilFromScript(ScriptedSensors);

#[async_trait]
impl SoilMoistureSensor for SoilFromScript {
    async fn read(&mut self) -> MonitorResult<f32> {
        Ok(self.0.current().2)
    }
}

struct LightFromScript(ScriptedSensors);

#[async_trait]
impl LightSensor for LightFromScript {
    async fn read(&mut self) -> MonitorResult<f32> {
        Ok(self.0.current().3)
    }
}

/// Light sensor that fails on every read
pub struct UnpluggedLight;

#[async_trait]
impl LightSensor for UnpluggedLight {
    async fn read(&mut self) -> MonitorResult<f32> {
        Err(MonitorError::SensorRead {
            sensor: "light",
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "in_voltage1_raw"),
        })
    }
}

/// Publisher that records payloads, optionally rejecting every publish
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    pub published: Arc<Mutex<Vec<String>>>,
    pub disconnects: Arc<Mutex<usize>>,
    pub reject: bool,
}

impl RecordingPublisher {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> usize {
        *self.disconnects.lock().unwrap()
    }
}

#[async_trait]
impl AlertPublisher for RecordingPublisher {
    async fn publish(&mut self, alert: &Alert) -> MonitorResult<()> {
        if self.reject {
            return Err(MonitorError::PublishFailed("request queue full".to_string()));
        }
        self.published.lock().unwrap().push(alert.to_string());
        Ok(())
    }

    async fn disconnect(&mut self) -> MonitorResult<()> {
        *self.disconnects.lock().unwrap() += 1;
        Ok(())
    }
}

/// In-memory stand-in for stdout
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Spawn a monitor with default thresholds and a long interval
pub fn spawn_monitor(
    reader: SensorReader,
    publisher: RecordingPublisher,
    output: SharedBuffer,
) -> (MonitorHandle, JoinHandle<MonitorResult<()>>) {
    spawn_monitor_with_interval(reader, publisher, output, Duration::from_secs(3600))
}

pub fn spawn_monitor_with_interval(
    reader: SensorReader,
    publisher: RecordingPublisher,
    output: SharedBuffer,
    interval: Duration,
) -> (MonitorHandle, JoinHandle<MonitorResult<()>>) {
    MonitorHandle::spawn(
        reader,
        AlertEvaluator::default(),
        LocalOutput::new(output),
        interval,
        async move { Ok(publisher) },
    )
}
