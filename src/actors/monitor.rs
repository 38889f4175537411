//! MonitorActor - reads the sensors, evaluates thresholds and publishes alerts
//!
//! ## Lifecycle
//!
//! 1. **Connecting**: awaits the publisher's connect future. A failure is fatal;
//!    a `Shutdown` received meanwhile stops the actor without connecting.
//! 2. **Running**: one cycle per interval tick (the first one immediately) or
//!    per `CycleNow` command.
//! 3. **Draining**: entered as soon as `Shutdown` is requested (or when every
//!    handle is gone). Commands are only looked at between cycles, so a cycle in
//!    progress completes while the monitor is already draining.
//! 4. **Stopped**: the publisher is disconnected on every path out of
//!    `Running`, including a failed cycle.
//!
//! A failed cycle (an error from the soil or light backend) ends the actor with
//! that error. A missing climate reading is not a failure, it becomes an alert.

use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    alerts::AlertEvaluator,
    error::MonitorResult,
    publisher::{AlertPublisher, LocalOutput},
    sensors::SensorReader,
};

use super::messages::{CycleReport, MonitorCommand, MonitorState};

pub struct MonitorActor {
    reader: SensorReader,

    evaluator: AlertEvaluator,

    /// Every alert is written here before it is published
    output: LocalOutput,

    command_rx: mpsc::Receiver<MonitorCommand>,

    state_tx: Arc<watch::Sender<MonitorState>>,

    interval_duration: Duration,
}

impl MonitorActor {
    pub fn new(
        reader: SensorReader,
        evaluator: AlertEvaluator,
        output: LocalOutput,
        interval_duration: Duration,
        command_rx: mpsc::Receiver<MonitorCommand>,
        state_tx: Arc<watch::Sender<MonitorState>>,
    ) -> Self {
        Self {
            reader,
            evaluator,
            output,
            command_rx,
            state_tx,
            interval_duration,
        }
    }

    fn set_state(&self, state: MonitorState) {
        debug!("monitor state: {state:?}");
        self.state_tx.send_replace(state);
    }

    /// Run the actor until shutdown or a fatal error
    #[instrument(skip_all)]
    pub async fn run<P, F>(mut self, connect: F) -> MonitorResult<()>
    where
        P: AlertPublisher,
        F: Future<Output = MonitorResult<P>>,
    {
        self.set_state(MonitorState::Connecting);

        let Some(mut publisher) = self.connect(connect).await? else {
            self.set_state(MonitorState::Stopped);
            return Ok(());
        };

        self.set_state(MonitorState::Running);
        info!("monitoring started, cycle every {:?}", self.interval_duration);

        let result = self.run_cycles(&mut publisher).await;

        if let Err(e) = &result {
            error!("monitoring stopped after a failed cycle: {e}");
        }

        if let Err(e) = publisher.disconnect().await {
            warn!("failed to disconnect cleanly: {e}");
        }

        self.set_state(MonitorState::Stopped);
        debug!("monitor actor stopped");

        result
    }

    /// Await the connect future while still answering commands.
    ///
    /// Returns `Ok(None)` if a shutdown was requested before the connection
    /// was established.
    async fn connect<P, F>(&mut self, connect: F) -> MonitorResult<Option<P>>
    where
        F: Future<Output = MonitorResult<P>>,
    {
        tokio::pin!(connect);

        loop {
            tokio::select! {
                biased;

                result = &mut connect => {
                    return match result {
                        Ok(publisher) => Ok(Some(publisher)),
                        Err(e) => {
                            error!("could not connect: {e}");
                            self.set_state(MonitorState::Stopped);
                            Err(e)
                        }
                    };
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::CycleNow { respond_to }) => {
                            let err = anyhow::anyhow!("monitor is still connecting");
                            let _ = respond_to.send(Err(err));
                        }
                        Some(MonitorCommand::Shutdown) | None => {
                            debug!("shutdown requested while connecting");
                            return Ok(None);
                        }
                    }
                }
            }
        }
    }

    async fn run_cycles<P: AlertPublisher>(&mut self, publisher: &mut P) -> MonitorResult<()> {
        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // the first tick completes immediately
        ticker.tick().await;
        self.cycle(publisher).await?;

        loop {
            tokio::select! {
                // commands first, so a pending shutdown wins over a due tick
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::CycleNow { respond_to }) => {
                            debug!("received CycleNow command");
                            match self.cycle(publisher).await {
                                Ok(report) => {
                                    let _ = respond_to.send(Ok(report));
                                }
                                Err(e) => {
                                    let err = anyhow::anyhow!("cycle failed: {e}");
                                    let _ = respond_to.send(Err(err));
                                    return Err(e);
                                }
                            }
                        }

                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            self.set_state(MonitorState::Draining);
                            return Ok(());
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            self.set_state(MonitorState::Draining);
                            return Ok(());
                        }
                    }
                }

                _ = ticker.tick() => {
                    // shutdown requested, its command is still on the way
                    if *self.state_tx.borrow() == MonitorState::Draining {
                        continue;
                    }
                    self.cycle(publisher).await?;
                }
            }
        }
    }

    /// One read → evaluate → publish pass
    #[instrument(skip_all)]
    async fn cycle<P: AlertPublisher>(
        &mut self,
        publisher: &mut P,
    ) -> MonitorResult<CycleReport> {
        let snapshot = self.reader.read().await?;
        let alerts = self.evaluator.evaluate(&snapshot);

        let mut published = 0;
        for alert in &alerts {
            if let Err(e) = self.output.write(alert) {
                error!("failed to write alert locally: {e}");
            }

            match publisher.publish(alert).await {
                Ok(()) => published += 1,
                Err(e) => warn!("{e}"),
            }
        }

        debug!(
            "cycle finished: {} alert(s), {published} published",
            alerts.len()
        );

        Ok(CycleReport {
            snapshot,
            alerts,
            published,
            timestamp: Utc::now(),
        })
    }
}

/// Handle for controlling a MonitorActor
///
/// Cloneable; the actor drains and stops once every handle is dropped.
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    state_rx: watch::Receiver<MonitorState>,

    /// Owned by the actor; lets `shutdown` mark a running monitor as draining
    state_tx: Weak<watch::Sender<MonitorState>>,
}

impl MonitorHandle {
    /// Spawn the actor as a tokio task
    ///
    /// `connect` establishes the broker connection; it is awaited inside the
    /// actor so that the `Connecting` state is observable. The returned join
    /// handle yields the actor's final result.
    pub fn spawn<P, F>(
        reader: SensorReader,
        evaluator: AlertEvaluator,
        output: LocalOutput,
        interval_duration: Duration,
        connect: F,
    ) -> (Self, JoinHandle<MonitorResult<()>>)
    where
        P: AlertPublisher + 'static,
        F: Future<Output = MonitorResult<P>> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(MonitorState::Connecting);
        let state_tx = Arc::new(state_tx);
        let weak_state_tx = Arc::downgrade(&state_tx);

        let actor = MonitorActor::new(
            reader,
            evaluator,
            output,
            interval_duration,
            cmd_rx,
            state_tx,
        );

        let task = tokio::spawn(actor.run(connect));

        (
            Self {
                sender: cmd_tx,
                state_rx,
                state_tx: weak_state_tx,
            },
            task,
        )
    }

    pub fn state(&self) -> MonitorState {
        *self.state_rx.borrow()
    }

    /// Wait until the actor reaches `state` (or has stopped)
    pub async fn wait_for_state(&mut self, state: MonitorState) -> MonitorState {
        let result = self
            .state_rx
            .wait_for(|current| *current == state || *current == MonitorState::Stopped)
            .await;

        match result {
            Ok(current) => *current,
            Err(_) => MonitorState::Stopped,
        }
    }

    /// Run one cycle right away and return its report
    pub async fn cycle_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::CycleNow { respond_to: tx })
            .await
            .context("failed to send CycleNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Ask the actor to stop after the cycle in progress
    ///
    /// A running monitor reports `Draining` from here on.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(state_tx) = self.state_tx.upgrade() {
            state_tx.send_if_modified(|state| {
                let running = *state == MonitorState::Running;
                if running {
                    *state = MonitorState::Draining;
                }
                running
            });
        }

        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
