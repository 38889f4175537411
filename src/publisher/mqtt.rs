//! MQTT publisher backed by `rumqttc`
//!
//! ## Connection behavior
//!
//! [`MqttPublisher::connect`] polls the event loop itself until the broker
//! answers with CONNACK, so a broker that is down or refuses the client is
//! reported to the caller instead of being retried forever. After that the
//! event loop is moved into a background task which:
//!
//! - keeps the connection alive (pings, acks),
//! - logs messages arriving on the own topic when `subscribe_own_topic` is set,
//! - reconnects with [`Backoff`] after the connection is lost and re-issues the
//!   own-topic subscription on every new CONNACK.
//!
//! ## Delivery
//!
//! `publish` uses `try_publish`, which only queues the request for the event
//! loop. It never blocks the monitor; a full request queue (e.g. while the
//! broker is unreachable) surfaces as [`MonitorError::PublishFailed`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::AlertPublisher;
use crate::alerts::Alert;
use crate::backoff::Backoff;
use crate::config::{BrokerConfig, ReconnectConfig};
use crate::error::{MonitorError, MonitorResult};

/// Requests the client may queue while the event loop is busy or reconnecting
const REQUEST_CAPACITY: usize = 16;

/// How long `disconnect` waits for the event loop to flush the DISCONNECT packet
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
    qos: QoS,
    subscribed: bool,
    event_loop: Option<JoinHandle<()>>,
}

impl MqttPublisher {
    #[instrument(skip_all, fields(broker = %config.address()))]
    pub async fn connect(
        config: &BrokerConfig,
        reconnect: &ReconnectConfig,
    ) -> MonitorResult<MqttPublisher> {
        let qos = config.qos()?;

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive));

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);

        let timeout = Duration::from_secs(config.connect_timeout);
        tokio::time::timeout(timeout, wait_for_connack(&mut event_loop))
            .await
            .map_err(|_| {
                MonitorError::ConnectionFailed(format!(
                    "no answer from {} within {timeout:?}",
                    config.address()
                ))
            })??;

        info!("connected to broker");

        let own_topic = if config.subscribe_own_topic {
            client.subscribe(&config.topic, qos).await.map_err(|e| {
                MonitorError::ConnectionFailed(format!("subscribe to {}: {e}", config.topic))
            })?;
            debug!("subscribed to {}", config.topic);
            Some((config.topic.clone(), qos))
        } else {
            None
        };

        let task = tokio::spawn(drive_event_loop(
            event_loop,
            client.clone(),
            own_topic,
            Backoff::from(reconnect),
        ));

        Ok(Self {
            client,
            topic: config.topic.clone(),
            qos,
            subscribed: config.subscribe_own_topic,
            event_loop: Some(task),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.event_loop.is_some()
    }
}

#[async_trait]
impl AlertPublisher for MqttPublisher {
    async fn publish(&mut self, alert: &Alert) -> MonitorResult<()> {
        if !self.is_connected() {
            return Err(MonitorError::PublishFailed(
                "publisher is disconnected".to_string(),
            ));
        }

        self.client.try_publish(&self.topic, self.qos, false, alert.to_string())?;
        trace!("queued alert for {}", self.topic);
        Ok(())
    }

    #[instrument(skip(self), fields(topic = %self.topic))]
    async fn disconnect(&mut self) -> MonitorResult<()> {
        let Some(mut task) = self.event_loop.take() else {
            return Ok(());
        };

        if self.subscribed {
            if let Err(e) = self.client.try_unsubscribe(&self.topic) {
                warn!("failed to unsubscribe: {e}");
            }
            self.subscribed = false;
        }

        let result = self.client.try_disconnect();

        if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut task).await.is_err() {
            warn!("event loop did not stop within {DISCONNECT_TIMEOUT:?}, aborting it");
            task.abort();
        }

        info!("disconnected from broker");
        result.map_err(|e| MonitorError::ConnectionFailed(format!("disconnect: {e}")))
    }
}

impl fmt::Debug for MqttPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttPublisher")
            .field("topic", &self.topic)
            .field("qos", &self.qos)
            .field("subscribed", &self.subscribed)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop.take() {
            debug!("publisher dropped while connected, closing connection");
            let _ = self.client.try_disconnect();
            task.abort();
        }
    }
}

async fn wait_for_connack(event_loop: &mut EventLoop) -> MonitorResult<()> {
    loop {
        if let Event::Incoming(Packet::ConnAck(connack)) = event_loop.poll().await? {
            if connack.code == ConnectReturnCode::Success {
                return Ok(());
            }
            return Err(MonitorError::ConnectionFailed(format!(
                "broker refused connection: {:?}",
                connack.code
            )));
        }
    }
}

async fn drive_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    own_topic: Option<(String, QoS)>,
    mut backoff: Backoff,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                info!(
                    "{} {}",
                    publish.topic,
                    String::from_utf8_lossy(&publish.payload)
                );
            }
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                info!("reconnected to broker ({:?})", connack.code);
                backoff.reset();

                if let Some((topic, qos)) = &own_topic
                    && let Err(e) = client.try_subscribe(topic, *qos)
                {
                    warn!("failed to resubscribe to {topic}: {e}");
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("disconnect sent, stopping event loop");
                break;
            }
            Ok(event) => {
                trace!("mqtt event: {event:?}");
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!("connection to broker lost: {e}, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
