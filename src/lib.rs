pub mod actors;
pub mod alerts;
pub mod backoff;
pub mod config;
pub mod error;
pub mod publisher;
pub mod sensors;
pub mod util;

pub use alerts::{Alert, AlertEvaluator};
pub use error::{MonitorError, MonitorResult};
pub use sensors::{SensorReader, SensorSnapshot};
