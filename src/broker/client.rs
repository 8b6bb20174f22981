//! MQTT subscription client.
//!
//! `BrokerClient::connect` spawns a driver task around the rumqttc event
//! loop. The driver owns the connection state machine, re-issues the
//! subscription on every ConnAck (clean sessions do not keep it), retries
//! on a fixed period after transport errors, and forwards everything to the
//! owner as `BrokerEvent`s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::broker::BrokerLink;
use crate::broker::message::{BrokerEvent, RawMessage};
use crate::broker::state::{ConnectionState, LinkEvent};
use crate::broker::topic::validate_topic;
use crate::config::MqttSettings;
use crate::utils::error::BrokerError;

pub const DEFAULT_PORT: u16 = 1883;

/// Capacity of rumqttc's internal request queue.
const REQUEST_CAPACITY: usize = 10;

/// Split `mqtt://host[:port]` or `tcp://host[:port]` into host and port.
pub fn broker_endpoint(address: &str) -> Result<(String, u16), BrokerError> {
    let invalid = |reason: String| BrokerError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "mqtt" | "tcp" => {}
        other => return Err(BrokerError::UnsupportedScheme(other.to_string())),
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host".to_string()))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    Ok((host, url.port().unwrap_or(DEFAULT_PORT)))
}

/// Handle on the subscription. Dropping it without `close` aborts the driver.
pub struct BrokerClient {
    client: AsyncClient,
    state: Arc<watch::Sender<ConnectionState>>,
    task: Option<JoinHandle<()>>,
    topic: String,
}

impl BrokerClient {
    /// Start connecting in the background. The returned receiver yields the
    /// connection's events until the client is closed.
    pub fn connect(
        settings: &MqttSettings,
    ) -> Result<(Self, mpsc::Receiver<BrokerEvent>), BrokerError> {
        validate_topic(&settings.topic)?;
        let (host, port) = broker_endpoint(&settings.broker)?;

        let mut options = MqttOptions::new(settings.client_id.clone(), host, port);
        options
            .set_keep_alive(Duration::from_secs(settings.keep_alive_secs.max(5)))
            .set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(settings.channel_capacity.max(1));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let state = Arc::new(state_tx);

        let driver = Driver {
            eventloop,
            client: client.clone(),
            topic: settings.topic.clone(),
            state: state.clone(),
            events: events_tx,
            reconnect_period: Duration::from_secs(settings.reconnect_period_secs),
            detached: false,
        };
        let task = tokio::spawn(driver.run());

        Ok((
            Self {
                client,
                state,
                task: Some(task),
                topic: settings.topic.clone(),
            },
            events_rx,
        ))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Disconnect and wait for the driver to stop. Later calls return
    /// immediately.
    pub async fn close(&mut self) -> Result<(), BrokerError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        let was_connected = self.state() == ConnectionState::Connected;
        transition(&self.state, LinkEvent::CloseRequested);

        if was_connected {
            if let Err(e) = self.client.disconnect().await {
                debug!(error = %e, "Disconnect request not delivered");
            }
        }

        if let Err(e) = task.await {
            warn!(error = %e, "Broker driver task ended abnormally");
        }
        self.state.send_replace(ConnectionState::Closed);
        Ok(())
    }
}

#[async_trait]
impl BrokerLink for BrokerClient {
    async fn close(&mut self) -> Result<(), BrokerError> {
        BrokerClient::close(self).await
    }
}

impl Drop for BrokerClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Apply `event` to the shared state; returns the new state if it changed.
fn transition(
    state: &watch::Sender<ConnectionState>,
    event: LinkEvent,
) -> Option<ConnectionState> {
    let mut changed = None;
    state.send_if_modified(|current| match current.apply(event) {
        Some(next) if next != *current => {
            *current = next;
            changed = Some(next);
            true
        }
        _ => false,
    });
    changed
}

struct Driver {
    eventloop: EventLoop,
    client: AsyncClient,
    topic: String,
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::Sender<BrokerEvent>,
    reconnect_period: Duration,
    /// Set once the owner has dropped its receiver.
    detached: bool,
}

impl Driver {
    async fn run(mut self) {
        let mut closing = self.state.subscribe();
        // while the link is up a close goes through a DISCONNECT packet,
        // otherwise there is nothing to tear down and the loop just stops
        let mut online = false;

        self.advance(LinkEvent::Dial).await;

        while !self.detached {
            let polled = tokio::select! {
                polled = self.eventloop.poll() => polled,
                _ = closing.wait_for(|s| s.is_closing()), if !online => break,
            };

            match polled {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    online = true;
                    if self.state.borrow().is_closing() {
                        if let Err(e) = self.client.try_disconnect() {
                            debug!(error = %e, "Disconnect request not delivered");
                        }
                        continue;
                    }
                    self.advance(LinkEvent::ConnAck).await;
                    if let Err(e) = self.client.try_subscribe(&self.topic, QoS::AtLeastOnce) {
                        self.emit(BrokerEvent::Error(e.to_string())).await;
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    let refused = ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure));
                    let event = if refused {
                        BrokerEvent::SubscribeFailed {
                            topic: self.topic.clone(),
                            reason: "broker refused the subscription".to_string(),
                        }
                    } else {
                        BrokerEvent::Subscribed {
                            topic: self.topic.clone(),
                        }
                    };
                    self.emit(event).await;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = RawMessage::new(publish.topic, publish.payload.to_vec());
                    self.emit(BrokerEvent::Message(message)).await;
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => {
                    online = false;
                    if self.state.borrow().is_closing() {
                        break;
                    }
                    self.emit(BrokerEvent::Error(e.to_string())).await;
                    self.advance(LinkEvent::LinkLost).await;

                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_period) => {}
                        _ = closing.wait_for(|s| s.is_closing()) => break,
                    }
                    self.advance(LinkEvent::Dial).await;
                }
            }
        }

        self.advance(LinkEvent::Stopped).await;
    }

    async fn advance(&mut self, event: LinkEvent) {
        if let Some(next) = transition(&self.state, event) {
            self.emit(BrokerEvent::State(next)).await;
        }
    }

    /// Hand `event` to the owner. Once a close has been requested the owner
    /// may have stopped reading, so a full channel drops the event instead of
    /// blocking the driver.
    async fn emit(&mut self, event: BrokerEvent) {
        let mut closing = self.state.subscribe();
        let delivered = tokio::select! {
            sent = self.events.send(event) => Some(sent.is_ok()),
            _ = closing.wait_for(|s| s.is_closing()) => None,
        };

        match delivered {
            Some(true) => {}
            Some(false) => self.detached = true,
            None => debug!("Event dropped while closing"),
        }
    }
}
