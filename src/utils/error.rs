//! The `error` module defines the error types used within the `telebridge` service.
//!
//! Errors are split by layer. `StorageError` and `BrokerError` are recovered
//! locally by the bridge controller while it is running; only `BridgeError`
//! escapes to `main`, and every variant of it is process-fatal.

use std::time::Duration;

use thiserror::Error;

/// Failures reported by the time-series storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected write (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid storage url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("storage writer is closed")]
    Closed,
}

/// Failures raised while setting up or tearing down the broker connection.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid broker address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unsupported broker scheme '{0}' (expected mqtt or tcp)")]
    UnsupportedScheme(String),

    #[error("invalid subscription topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: &'static str },
}

/// Process-fatal errors. `main` maps any of these to exit code 1.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to subscribe to '{topic}': {reason}")]
    Subscription { topic: String, reason: String },

    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}
