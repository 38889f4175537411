//! Message types for the monitor actor
//!
//! Commands go to the actor over an mpsc channel; the lifecycle state is
//! published on a watch channel so it can be observed at any time, including
//! while a cycle is running.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::{Alert, SensorSnapshot};

/// Lifecycle of the monitor
///
/// ```text
/// Connecting ──► Running ──► Draining ──► Stopped
///      │            │                        ▲
///      └────────────┴──── (fatal error) ─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Connecting,
    Running,
    Draining,
    Stopped,
}

/// Outcome of one read/evaluate/publish cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub snapshot: SensorSnapshot,

    /// Alerts in evaluation order
    pub alerts: Vec<Alert>,

    /// How many alerts the publisher accepted
    pub published: usize,

    pub timestamp: DateTime<Utc>,
}

/// Commands that can be sent to a MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run one cycle immediately (bypassing the interval timer)
    CycleNow {
        respond_to: oneshot::Sender<anyhow::Result<CycleReport>>,
    },

    /// Stop after the cycle in progress, if any
    Shutdown,
}
