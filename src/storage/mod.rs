//! The `storage` module maps accepted readings onto the time-series store.
//!
//! ```text
//! Reading --> WriteRecord --> line protocol --> StorageWriter buffer --> PointSink (InfluxDB)
//! ```
//!
//! - `point`: the storage-side record and the reading-to-record translation.
//! - `line_protocol`: InfluxDB v2 line protocol encoding.
//! - `writer`: buffered writer with enqueue/flush/close semantics over a
//!   pluggable `PointSink`, plus the HTTP sink for InfluxDB.

pub mod line_protocol;
pub mod point;
pub mod writer;

pub use point::{FieldValue, MACHINE_ID_SENTINEL, MEASUREMENT, WriteRecord};
pub use writer::{InfluxSink, PointSink, StorageWriter};
