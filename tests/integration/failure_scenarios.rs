//! Failure handling of the monitor actor
//!
//! - Broker unreachable at startup
//! - Sensor backend errors during a cycle
//! - Climate sensor dropping out between cycles
//! - Commands after shutdown

use assert_matches::assert_matches;
use plant_monitor::{
    AlertEvaluator, MonitorError, MonitorResult, SensorReader,
    actors::{messages::MonitorState, monitor::MonitorHandle},
    publisher::LocalOutput,
    sensors::simulated::{FixedClimate, FixedSoilMoisture},
};
use std::time::Duration;

use crate::helpers::*;

#[tokio::test]
async fn test_unreachable_broker_is_fatal() {
    let sensors = ScriptedSensors::new(vec![(Some(50.0), Some(10.0), 200.0, 0.5)]);
    let output = SharedBuffer::default();

    let (mut handle, task) = MonitorHandle::spawn(
        sensors.reader(),
        AlertEvaluator::default(),
        LocalOutput::new(output.clone()),
        Duration::from_secs(60),
        async {
            Err::<RecordingPublisher, _>(MonitorError::ConnectionFailed(
                "connection refused".to_string(),
            ))
        },
    );

    let result: MonitorResult<()> = task.await.unwrap();
    assert_matches!(result, Err(MonitorError::ConnectionFailed(_)));

    // no cycle ran
    assert!(output.lines().is_empty());
    assert_eq!(
        handle.wait_for_state(MonitorState::Running).await,
        MonitorState::Stopped
    );
}

#[tokio::test]
async fn test_sensor_error_stops_monitor_and_disconnects() {
    let reader = SensorReader::new(
        Box::new(FixedClimate::new(None)),
        Box::new(FixedSoilMoisture::new(400.0)),
        Box::new(UnpluggedLight),
    );
    let publisher = RecordingPublisher::default();
    let output = SharedBuffer::default();

    let (handle, task) = spawn_monitor(reader, publisher.clone(), output.clone());

    let result = task.await.unwrap();
    assert_matches!(result, Err(MonitorError::SensorRead { sensor: "light", .. }));

    assert_eq!(publisher.disconnects(), 1);
    assert!(publisher.published().is_empty());
    assert!(output.lines().is_empty());
    assert_eq!(handle.state(), MonitorState::Stopped);
}

#[tokio::test]
async fn test_climate_dropout_does_not_stop_monitor() {
    let sensors = ScriptedSensors::new(vec![
        (None, None, 999.0, 0.01),
        (Some(45.0), Some(22.0), 100.0, 0.5),
    ]);
    let publisher = RecordingPublisher::default();

    let (mut handle, task) =
        spawn_monitor(sensors.reader(), publisher.clone(), SharedBuffer::default());
    handle.wait_for_state(MonitorState::Running).await;

    let report = handle.cycle_now().await.unwrap();
    assert!(report.alerts.is_empty());
    assert_eq!(handle.state(), MonitorState::Running);

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(
        publisher.published(),
        vec!["Failed to retrieve data from DHT sensor"]
    );
}

#[tokio::test]
async fn test_cycle_now_after_shutdown_fails() {
    let sensors = ScriptedSensors::new(vec![(Some(45.0), Some(22.0), 100.0, 0.5)]);
    let publisher = RecordingPublisher::default();

    let (handle, task) =
        spawn_monitor(sensors.reader(), publisher.clone(), SharedBuffer::default());

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    assert!(handle.cycle_now().await.is_err());
    assert!(handle.shutdown().await.is_err());
    assert_eq!(publisher.disconnects(), 1);
}
