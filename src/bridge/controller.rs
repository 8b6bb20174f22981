//! Per-message pipeline and process lifetime.
//!
//! One controller owns the storage writer and the session counters. Its
//! `run` loop pulls broker events and the shutdown signal on a single task,
//! so each message is handled start to finish before the next event is
//! looked at; messages that arrive meanwhile wait in the broker channel.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::bridge::lifecycle::LifecycleState;
use crate::bridge::stats::SessionStats;
use crate::broker::{BrokerEvent, BrokerLink, RawMessage};
use crate::reading::{self, Violation};
use crate::storage::{PointSink, StorageWriter, WriteRecord};
use crate::utils::error::BridgeError;

/// How much of a raw payload is logged on receipt.
pub const PREVIEW_CHARS: usize = 100;

/// Where a single message ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Not JSON; the validator never saw it.
    Undecodable,
    Rejected(Vec<Violation>),
    Saved,
    /// Valid, but the write failed and the reading is lost.
    StorageFailed,
}

pub struct BridgeController<S> {
    writer: StorageWriter<S>,
    stats: SessionStats,
    state: LifecycleState,
    shutdown_timeout: Duration,
}

impl<S: PointSink> BridgeController<S> {
    pub fn new(writer: StorageWriter<S>, shutdown_timeout: Duration) -> Self {
        Self {
            writer,
            stats: SessionStats::default(),
            state: LifecycleState::Starting,
            shutdown_timeout,
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn writer(&self) -> &StorageWriter<S> {
        &self.writer
    }

    /// decode -> validate -> translate -> write, counting every outcome.
    ///
    /// Rejected messages are only logged; nothing is sent back to the
    /// publisher.
    pub async fn handle_message(&mut self, message: RawMessage) -> MessageOutcome {
        self.stats.received += 1;
        info!(
            topic = %message.topic,
            raw = %message.payload_preview(PREVIEW_CHARS),
            "Message received"
        );

        let payload = match reading::decode(&message.payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.invalid += 1;
                warn!(error = %e, "Invalid JSON, message dropped");
                return MessageOutcome::Undecodable;
            }
        };

        let reading = match reading::validate(&payload) {
            Ok(reading) => reading,
            Err(violations) => {
                self.stats.invalid += 1;
                let listed: Vec<String> = violations.iter().map(ToString::to_string).collect();
                warn!(violations = %listed.join(", "), "Validation failed, message dropped");
                return MessageOutcome::Rejected(violations);
            }
        };

        self.stats.valid += 1;
        let record = WriteRecord::from_reading(&reading, &message.topic);

        let written = match self.writer.enqueue(&record) {
            Ok(()) => self.writer.flush().await.map(|_| ()),
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                self.stats.saved += 1;
                info!(
                    machine_id = record.tag("machine_id").unwrap_or_default(),
                    temperature = reading.temperature,
                    "Saved to storage"
                );
                MessageOutcome::Saved
            }
            Err(e) => {
                self.stats.errors += 1;
                error!(error = %e, "Storage write failed, message dropped");
                MessageOutcome::StorageFailed
            }
        }
    }

    /// React to one broker event. Only a refused subscription while still
    /// starting is fatal.
    pub async fn handle_event(&mut self, event: BrokerEvent) -> Result<(), BridgeError> {
        match event {
            BrokerEvent::Message(message) => {
                self.handle_message(message).await;
            }
            BrokerEvent::State(state) => {
                info!(%state, "Broker connection state changed");
            }
            BrokerEvent::Subscribed { topic } => {
                info!(%topic, "Subscribed");
                if self.state == LifecycleState::Starting {
                    self.state = LifecycleState::Running;
                    info!(state = %self.state, "Listening for messages");
                }
            }
            BrokerEvent::SubscribeFailed { topic, reason } => {
                if self.state == LifecycleState::Starting {
                    error!(%topic, %reason, "Failed to subscribe");
                    return Err(BridgeError::Subscription { topic, reason });
                }
                self.stats.errors += 1;
                error!(%topic, %reason, "Re-subscription refused after reconnect");
            }
            BrokerEvent::Error(e) => {
                self.stats.errors += 1;
                warn!(error = %e, "Broker connection error");
            }
        }
        Ok(())
    }

    /// Drive the bridge until `shutdown` resolves (or the broker stream
    /// ends), then run the shutdown sequence.
    ///
    /// Returns the final counters on a clean shutdown.
    pub async fn run<L, F>(
        mut self,
        link: L,
        mut events: mpsc::Receiver<BrokerEvent>,
        shutdown: F,
    ) -> Result<SessionStats, BridgeError>
    where
        L: BrokerLink,
        F: Future<Output = &'static str>,
    {
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                signal = &mut shutdown => break signal,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        warn!("Broker event stream ended");
                        break "broker stream closed";
                    }
                },
            }
        };

        self.shutdown(link, reason).await
    }

    /// Report the counters, close storage (final flush), then the broker.
    ///
    /// The whole sequence races `shutdown_timeout`; losing the race gives
    /// up on the final flush and returns `ShutdownTimeout`.
    async fn shutdown<L: BrokerLink>(
        mut self,
        mut link: L,
        reason: &str,
    ) -> Result<SessionStats, BridgeError> {
        info!(state = %LifecycleState::ShuttingDown, %reason, "Shutting down");

        let stats = self.stats;
        stats.report();

        let writer = &mut self.writer;
        let sequence = async {
            match writer.close().await {
                Ok(()) => info!("Storage writer closed"),
                Err(e) => error!(error = %e, "Final flush failed"),
            }
            match link.close().await {
                Ok(()) => info!("Broker connection closed"),
                Err(e) => warn!(error = %e, "Error closing broker connection"),
            }
        };

        match tokio::time::timeout(self.shutdown_timeout, sequence).await {
            Ok(()) => {
                info!(state = %LifecycleState::Terminated, "Shutdown complete");
                Ok(stats)
            }
            Err(_) => {
                error!(timeout = ?self.shutdown_timeout, "Forced exit after shutdown timeout");
                Err(BridgeError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }
}
