//! # telebridge
//!
//! `telebridge` subscribes to device telemetry on an MQTT broker, validates
//! and normalizes each reading, and writes the accepted ones to InfluxDB.
//!
//! ## Core Modules
//!
//! - `reading`: decoding and validation of device payloads into typed readings.
//! - `storage`: reading-to-point translation, line protocol, and the buffered InfluxDB writer.
//! - `broker`: the MQTT subscription client and its connection state machine.
//! - `bridge`: the controller that runs the pipeline, keeps session counters and shuts down cleanly.
//! - `config`: loading settings from file and environment.
//! - `utils`: error types and logging setup.

pub mod bridge;
pub mod broker;
pub mod config;
pub mod reading;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod tests;
