//! Buffered writes to the time-series backend.
//!
//! `StorageWriter` holds encoded lines until `flush` hands them to a
//! `PointSink`. A failed flush drops the batch: delivery from the bridge to
//! storage is at-most-once and there is no retry queue.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::InfluxSettings;
use crate::storage::line_protocol;
use crate::storage::point::WriteRecord;
use crate::utils::error::StorageError;

/// Tag added to every point so rows written by the bridge can be told apart.
pub const SERVICE_TAG: (&str, &str) = ("service", "alzettelink-bridge");

/// Destination for encoded line-protocol batches.
///
/// Resolves once the backend has acknowledged or rejected the whole batch.
#[async_trait]
pub trait PointSink: Send + Sync {
    async fn write_lines(&self, lines: &[String]) -> Result<(), StorageError>;
}

/// InfluxDB v2 HTTP write API.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    write_url: Url,
    health_url: Url,
    token: String,
}

impl InfluxSink {
    pub fn new(settings: &InfluxSettings) -> Result<Self, StorageError> {
        let invalid = |reason: String| StorageError::InvalidUrl {
            url: settings.url.clone(),
            reason,
        };

        // join() replaces the last path segment unless the base ends in '/'
        let mut base = Url::parse(&settings.url).map_err(|e| invalid(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut write_url = base
            .join("api/v2/write")
            .map_err(|e| invalid(e.to_string()))?;
        write_url
            .query_pairs_mut()
            .append_pair("org", &settings.org)
            .append_pair("bucket", &settings.bucket)
            .append_pair("precision", "ns");
        let health_url = base.join("health").map_err(|e| invalid(e.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            write_url,
            health_url,
            token: settings.token.clone(),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    /// Probe the server's health endpoint.
    pub async fn health(&self) -> Result<(), StorageError> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StorageError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl PointSink for InfluxSink {
    async fn write_lines(&self, lines: &[String]) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.write_url.clone())
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(lines.join("\n"))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StorageError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

/// Buffered writer over a `PointSink`.
pub struct StorageWriter<S> {
    sink: S,
    buffer: Vec<String>,
    default_tags: Vec<(String, String)>,
    closed: bool,
}

impl<S: PointSink> StorageWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffer: Vec::new(),
            default_tags: vec![(SERVICE_TAG.0.to_string(), SERVICE_TAG.1.to_string())],
            closed: false,
        }
    }

    /// Add a tag written on every point. Record tags with the same key win.
    pub fn with_default_tag(mut self, key: &str, value: &str) -> Self {
        self.default_tags.retain(|(k, _)| k != key);
        self.default_tags.push((key.to_string(), value.to_string()));
        self
    }

    /// Buffer a record, stamping it with the current time. Nothing is
    /// durable until `flush` succeeds.
    pub fn enqueue(&mut self, record: &WriteRecord) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        let timestamp_ns = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.buffer.push(line_protocol::encode(
            record,
            &self.default_tags,
            timestamp_ns,
        ));
        Ok(())
    }

    /// Send everything buffered to the sink. Returns the number of lines
    /// acknowledged. On failure the batch is discarded.
    pub async fn flush(&mut self) -> Result<usize, StorageError> {
        let lines = std::mem::take(&mut self.buffer);
        if lines.is_empty() {
            return Ok(0);
        }
        debug!(lines = lines.len(), "Flushing to storage");
        self.sink.write_lines(&lines).await?;
        Ok(lines.len())
    }

    /// Final flush, then refuse further writes. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<(), StorageError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.flush().await.map(|_| ())
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
