use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::config::ThresholdConfig;
use crate::sensors::SensorSnapshot;

/// One triggered condition
///
/// The published payload is the `Display` rendering of the alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    /// Temperature and humidity could not be read
    SensorFailure,
    SoilTooDry,
    TemperatureTooLow { temperature: f32 },
    TemperatureTooHigh { temperature: f32 },
    NotEnoughLight,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::SensorFailure => write!(f, "Failed to retrieve data from DHT sensor"),
            Alert::SoilTooDry => write!(f, "Soil is too dry. Consider watering the plant."),
            Alert::TemperatureTooLow { temperature } => {
                write!(f, "Temperature is too low. Current temp: {temperature:.2} C")
            }
            Alert::TemperatureTooHigh { temperature } => {
                write!(f, "Temperature is too high. Current temp: {temperature:.2} C")
            }
            Alert::NotEnoughLight => write!(f, "Plant needs more light."),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertEvaluator {
    thresholds: ThresholdConfig,
}

impl AlertEvaluator {
    pub fn new(thresholds: ThresholdConfig) -> AlertEvaluator {
        Self { thresholds }
    }

    /// Apply the thresholds to one snapshot.
    ///
    /// A snapshot without temperature or humidity only yields
    /// [`Alert::SensorFailure`]. Otherwise every rule is checked and the alerts
    /// come out in the order moisture, temperature, light.
    #[instrument(skip_all)]
    pub fn evaluate(&self, snapshot: &SensorSnapshot) -> Vec<Alert> {
        let (Some(_humidity), Some(temperature)) = (snapshot.humidity, snapshot.temperature)
        else {
            debug!("climate reading missing, skipping threshold checks");
            return vec![Alert::SensorFailure];
        };

        let ThresholdConfig {
            soil_moisture,
            temperature_min,
            temperature_max,
            light_min,
        } = self.thresholds;

        let mut alerts = vec![];

        if snapshot.soil_moisture > soil_moisture {
            alerts.push(Alert::SoilTooDry);
        }

        if temperature < temperature_min {
            alerts.push(Alert::TemperatureTooLow { temperature });
        } else if temperature > temperature_max {
            alerts.push(Alert::TemperatureTooHigh { temperature });
        }

        if snapshot.light_intensity < light_min {
            alerts.push(Alert::NotEnoughLight);
        }

        trace!(
            "soil {} (max: {soil_moisture}), temperature {temperature} \
             ({temperature_min}..={temperature_max}), light {} (min: {light_min}) -> {} alert(s)",
            snapshot.soil_moisture,
            snapshot.light_intensity,
            alerts.len()
        );

        alerts
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        AlertEvaluator::new(ThresholdConfig::default())
    }
}
