//! Alert delivery
//!
//! Alerts always go to the [`LocalOutput`] first and are then handed to an
//! [`AlertPublisher`]. Broker delivery is best-effort, so the local stream is
//! the one place where every alert is guaranteed to show up.

pub mod mqtt;

use std::io::Write;

use async_trait::async_trait;

use crate::alerts::Alert;
use crate::error::MonitorResult;

pub use self::mqtt::MqttPublisher;

#[async_trait]
pub trait AlertPublisher: Send {
    /// Hand one alert to the transport without waiting for delivery.
    async fn publish(&mut self, alert: &Alert) -> MonitorResult<()>;

    /// Release the connection. Further publishes fail.
    async fn disconnect(&mut self) -> MonitorResult<()>;
}

/// Line-oriented sink for alerts (stdout in the binary)
pub struct LocalOutput {
    writer: Box<dyn Write + Send>,
}

impl LocalOutput {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    pub fn stdout() -> Self {
        LocalOutput::new(std::io::stdout())
    }

    pub fn write(&mut self, alert: &Alert) -> MonitorResult<()> {
        writeln!(self.writer, "{alert}")?;
        self.writer.flush()?;
        Ok(())
    }
}
