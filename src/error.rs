//! Error types for the plant monitor

use std::fmt;

/// Result type alias for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur while monitoring
#[derive(Debug)]
pub enum MonitorError {
    /// Configuration could not be loaded or is inconsistent
    InvalidConfig(String),

    /// A sensor backend failed in a way that is not modeled as a missing value
    SensorRead {
        sensor: &'static str,
        source: std::io::Error,
    },

    /// Connecting to the broker failed
    ConnectionFailed(String),

    /// Handing an alert to the broker client failed
    PublishFailed(String),

    /// I/O error (config file, local output, etc.)
    Io(std::io::Error),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            MonitorError::SensorRead { sensor, source } => {
                write!(f, "failed to read {} sensor: {}", sensor, source)
            }
            MonitorError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to broker: {}", msg)
            }
            MonitorError::PublishFailed(msg) => write!(f, "failed to publish alert: {}", msg),
            MonitorError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::SensorRead { source, .. } => Some(source),
            MonitorError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<rumqttc::ClientError> for MonitorError {
    fn from(err: rumqttc::ClientError) -> Self {
        MonitorError::PublishFailed(err.to_string())
    }
}

impl From<rumqttc::ConnectionError> for MonitorError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        MonitorError::ConnectionFailed(err.to_string())
    }
}
