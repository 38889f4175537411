//! End-to-end tests for read → evaluate → publish through the monitor actor

use std::time::Duration;

use plant_monitor::{Alert, actors::messages::MonitorState};
use pretty_assertions::assert_eq;

use crate::helpers::*;

const SCENARIO_A: Reading = (Some(50.0), Some(10.0), 200.0, 0.5);
const SCENARIO_B: Reading = (Some(40.0), Some(22.0), 400.0, 0.1);
const SCENARIO_C: Reading = (None, None, 999.0, 0.01);
const SCENARIO_D: Reading = (Some(45.0), Some(22.0), 100.0, 0.5);

#[tokio::test]
async fn test_scenarios_publish_expected_alerts() {
    let sensors = ScriptedSensors::new(vec![SCENARIO_A, SCENARIO_B, SCENARIO_C, SCENARIO_D]);
    let publisher = RecordingPublisher::default();
    let output = SharedBuffer::default();

    let (mut handle, task) = spawn_monitor(sensors.reader(), publisher.clone(), output.clone());
    assert_eq!(
        handle.wait_for_state(MonitorState::Running).await,
        MonitorState::Running
    );

    // scenario A ran as the initial cycle; B, C and D on demand
    let b = handle.cycle_now().await.unwrap();
    assert_eq!(b.alerts, vec![Alert::SoilTooDry, Alert::NotEnoughLight]);

    let c = handle.cycle_now().await.unwrap();
    assert_eq!(c.alerts, vec![Alert::SensorFailure]);
    assert_eq!(c.snapshot.soil_moisture, 999.0);

    let d = handle.cycle_now().await.unwrap();
    assert!(d.alerts.is_empty());
    assert_eq!(d.published, 0);

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    let expected = vec![
        "Temperature is too low. Current temp: 10.00 C",
        "Soil is too dry. Consider watering the plant.",
        "Plant needs more light.",
        "Failed to retrieve data from DHT sensor",
    ];
    assert_eq!(publisher.published(), expected);
    assert_eq!(output.lines(), expected);
    assert_eq!(publisher.disconnects(), 1);
}

#[tokio::test]
async fn test_publish_failure_still_writes_locally() {
    let sensors = ScriptedSensors::new(vec![SCENARIO_B]);
    let publisher = RecordingPublisher::rejecting();
    let output = SharedBuffer::default();

    let (mut handle, task) = spawn_monitor(sensors.reader(), publisher.clone(), output.clone());
    handle.wait_for_state(MonitorState::Running).await;

    let report = handle.cycle_now().await.unwrap();
    assert_eq!(report.alerts.len(), 2);
    assert_eq!(report.published, 0);

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    assert!(publisher.published().is_empty());
    // initial cycle plus the CycleNow one
    assert_eq!(output.lines().len(), 4);
}

#[tokio::test]
async fn test_interval_drives_repeated_cycles() {
    let sensors = ScriptedSensors::new(vec![SCENARIO_A]);
    let publisher = RecordingPublisher::default();
    let output = SharedBuffer::default();

    let (handle, task) = spawn_monitor_with_interval(
        sensors.reader(),
        publisher.clone(),
        output,
        Duration::from_millis(20),
    );

    let wait = async {
        while publisher.published().len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("three cycles within five seconds");

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    assert!(
        publisher
            .published()
            .iter()
            .all(|message| message == "Temperature is too low. Current temp: 10.00 C")
    );
    assert_eq!(handle.state(), MonitorState::Stopped);
}

#[tokio::test]
async fn test_snapshot_reported_with_cycle() {
    let sensors = ScriptedSensors::new(vec![SCENARIO_D, (Some(60.0), Some(31.234), 120.0, 0.8)]);
    let publisher = RecordingPublisher::default();

    let (mut handle, task) =
        spawn_monitor(sensors.reader(), publisher.clone(), SharedBuffer::default());
    handle.wait_for_state(MonitorState::Running).await;

    let report = handle.cycle_now().await.unwrap();
    assert_eq!(report.snapshot.humidity, Some(60.0));
    assert_eq!(
        publisher.published(),
        vec!["Temperature is too high. Current temp: 31.23 C"]
    );

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();
}
