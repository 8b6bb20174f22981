//! The `broker` module owns the subscription to the MQTT broker.
//!
//! A background task drives the MQTT event loop and hands everything it
//! sees (state changes, subscription acks, messages, transport errors) to
//! the owner through a channel, so the bridge pulls events instead of
//! reacting inside library callbacks.

pub mod client;
pub mod message;
pub mod state;
pub mod topic;

use async_trait::async_trait;

use crate::utils::error::BrokerError;

pub use client::BrokerClient;
pub use message::{BrokerEvent, RawMessage};
pub use state::{ConnectionState, LinkEvent};
pub use topic::validate_topic;

/// The handle the bridge keeps on its broker connection.
#[async_trait]
pub trait BrokerLink: Send {
    /// Release the connection. Terminal and idempotent: once it returns no
    /// further events are delivered.
    async fn close(&mut self) -> Result<(), BrokerError>;
}
