//! The `bridge` module wires the broker subscription to the storage writer.
//!
//! `run` builds every component from `Settings` and hands them to a
//! `BridgeController`, which owns the per-message pipeline, the session
//! counters and the bounded shutdown sequence.

pub mod controller;
pub mod lifecycle;
pub mod stats;

use std::time::Duration;

use tracing::{info, warn};

use crate::broker::BrokerClient;
use crate::config::Settings;
use crate::storage::{InfluxSink, StorageWriter};
use crate::utils::error::BridgeError;

pub use controller::{BridgeController, MessageOutcome};
pub use lifecycle::{LifecycleState, shutdown_signal};
pub use stats::SessionStats;

/// Run the bridge until SIGINT/SIGTERM.
///
/// Returns the final counters on a clean shutdown; any error is fatal.
pub async fn run(settings: Settings) -> Result<SessionStats, BridgeError> {
    log_configuration(&settings);

    let sink = InfluxSink::new(&settings.influx)?;
    if let Err(e) = sink.health().await {
        warn!(error = %e, url = %settings.influx.url, "InfluxDB health check failed, writes will still be attempted");
    }
    let writer = StorageWriter::new(sink);

    let (client, events) = BrokerClient::connect(&settings.mqtt)?;

    let controller = BridgeController::new(
        writer,
        Duration::from_secs(settings.bridge.shutdown_timeout_secs),
    );
    controller.run(client, events, shutdown_signal()).await
}

fn log_configuration(settings: &Settings) {
    info!(
        broker = %settings.mqtt.broker,
        topic = %settings.mqtt.topic,
        client_id = %settings.mqtt.client_id,
        "MQTT configuration"
    );
    info!(
        url = %settings.influx.url,
        org = %settings.influx.org,
        bucket = %settings.influx.bucket,
        token = "<redacted>",
        "InfluxDB configuration"
    );
}
